use crate::error::UnknownCharset;
use std::fmt;
use std::str::FromStr;

/// Character encoding applied when a formatted line is turned into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Charset {
    #[default]
    UsAscii,
    Iso8859_1,
    Utf8,
}

impl Charset {
    pub fn name(&self) -> &'static str {
        match self {
            Charset::UsAscii => "US-ASCII",
            Charset::Iso8859_1 => "ISO-8859-1",
            Charset::Utf8 => "UTF-8",
        }
    }

    /// Whether the JSON encoder must escape non-ASCII text for the output
    /// to survive this charset unchanged.
    pub fn requires_ascii_escaping(&self) -> bool {
        !matches!(self, Charset::Utf8)
    }

    /// Encode `text`, replacing unmappable characters with `?`.
    pub fn encode(&self, text: &str) -> Vec<u8> {
        match self {
            Charset::Utf8 => text.as_bytes().to_vec(),
            Charset::UsAscii => text
                .chars()
                .map(|c| if c.is_ascii() { c as u8 } else { b'?' })
                .collect(),
            Charset::Iso8859_1 => text
                .chars()
                .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
                .collect(),
        }
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = UnknownCharset;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('_', "-");
        match normalized.as_str() {
            "US-ASCII" | "ASCII" | "US" => Ok(Charset::UsAscii),
            "ISO-8859-1" | "ISO8859-1" | "LATIN1" | "LATIN-1" => Ok(Charset::Iso8859_1),
            "UTF-8" | "UTF8" => Ok(Charset::Utf8),
            _ => Err(UnknownCharset(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_common_aliases() {
        assert_eq!("us-ascii".parse::<Charset>().unwrap(), Charset::UsAscii);
        assert_eq!("Latin1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert_eq!("iso_8859_1".parse::<Charset>().unwrap(), Charset::Iso8859_1);
        assert_eq!("utf8".parse::<Charset>().unwrap(), Charset::Utf8);
        assert_eq!(
            "EBCDIC".parse::<Charset>(),
            Err(UnknownCharset("EBCDIC".to_string()))
        );
    }

    #[test]
    fn default_is_seven_bit() {
        assert_eq!(Charset::default(), Charset::UsAscii);
        assert!(Charset::default().requires_ascii_escaping());
        assert!(!Charset::Utf8.requires_ascii_escaping());
    }

    #[test]
    fn replaces_unmappable_characters() {
        assert_eq!(Charset::UsAscii.encode("né€"), b"n??".to_vec());
        assert_eq!(Charset::Iso8859_1.encode("né€"), vec![b'n', 0xe9, b'?']);
        assert_eq!(Charset::Utf8.encode("né"), "né".as_bytes().to_vec());
    }
}
