use serde::ser::Error as _;
use serde::Serialize;
use serde_json::ser::Formatter;
use std::io;

/// Terminator appended to every encoded record.
pub const LINE_TERMINATOR: &str = "\r\n";

const HEX: &[u8; 16] = b"0123456789abcdef";

/// Which characters the encoder writes as `\uXXXX` escapes beyond what
/// JSON itself requires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Escape every non-ASCII character, using surrogate pairs outside
    /// the BMP.
    pub escape_non_ascii: bool,
    /// Escape `<`, `>`, `&`, `=` and `'` so records can be embedded in
    /// HTML or XML unchanged.
    pub escape_html: bool,
}

impl EncodeOptions {
    fn needs_escape(&self, ch: char) -> bool {
        (self.escape_non_ascii && !ch.is_ascii())
            || (self.escape_html && matches!(ch, '<' | '>' | '&' | '=' | '\''))
    }
}

/// Compact JSON formatter applying the extra escapes of [`EncodeOptions`].
///
/// Control characters, quotes and backslashes are still escaped by
/// `serde_json` itself before fragments reach this formatter.
#[derive(Debug, Clone, Copy, Default)]
pub struct EscapingFormatter {
    options: EncodeOptions,
}

impl EscapingFormatter {
    pub fn new(options: EncodeOptions) -> Self {
        Self { options }
    }
}

impl Formatter for EscapingFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut start = 0;
        for (idx, ch) in fragment.char_indices() {
            if !self.options.needs_escape(ch) {
                continue;
            }
            if start < idx {
                writer.write_all(fragment[start..idx].as_bytes())?;
            }
            let mut units = [0u16; 2];
            for unit in ch.encode_utf16(&mut units) {
                let u = *unit as usize;
                writer.write_all(&[
                    b'\\',
                    b'u',
                    HEX[(u >> 12) & 0xf],
                    HEX[(u >> 8) & 0xf],
                    HEX[(u >> 4) & 0xf],
                    HEX[u & 0xf],
                ])?;
            }
            start = idx + ch.len_utf8();
        }
        writer.write_all(fragment[start..].as_bytes())
    }
}

/// Serialize `value` to a single compact JSON line ending in `\r\n`.
pub fn encode_line<T>(value: &T, options: EncodeOptions) -> Result<String, serde_json::Error>
where
    T: Serialize + ?Sized,
{
    let mut buf = Vec::with_capacity(256);
    if options == EncodeOptions::default() {
        serde_json::to_writer(&mut buf, value)?;
    } else {
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, EscapingFormatter::new(options));
        value.serialize(&mut ser)?;
    }
    buf.extend_from_slice(LINE_TERMINATOR.as_bytes());
    String::from_utf8(buf).map_err(serde_json::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const ASCII: EncodeOptions = EncodeOptions { escape_non_ascii: true, escape_html: false };
    const HTML: EncodeOptions = EncodeOptions { escape_non_ascii: false, escape_html: true };

    #[test]
    fn appends_crlf_and_nothing_else() {
        let line = encode_line(&json!({"a": 1}), EncodeOptions::default()).unwrap();
        assert_eq!(line, "{\"a\":1}\r\n");
    }

    #[test]
    fn escapes_control_characters() {
        let line = encode_line(&json!({"m": "a\nb\tc\u{1}"}), ASCII).unwrap();
        assert_eq!(line, "{\"m\":\"a\\nb\\tc\\u0001\"}\r\n");
        assert_eq!(line.matches("\r\n").count(), 1);
    }

    #[test]
    fn escapes_non_ascii_when_requested() {
        let line = encode_line(&json!({"m": "café 🚀"}), ASCII).unwrap();
        assert!(line.is_ascii());
        assert_eq!(line, "{\"m\":\"caf\\u00e9 \\ud83d\\ude80\"}\r\n");

        let back: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(back["m"], "café 🚀");
    }

    #[test]
    fn keeps_utf8_when_not_escaping() {
        let line = encode_line(&json!({"m": "café"}), EncodeOptions::default()).unwrap();
        assert_eq!(line, "{\"m\":\"café\"}\r\n");
    }

    #[test]
    fn escapes_html_sensitive_characters() {
        let line = encode_line(&json!({"m": "<a href='x'>&b=c</a>"}), HTML).unwrap();
        assert_eq!(
            line,
            "{\"m\":\"\\u003ca href\\u003d\\u0027x\\u0027\\u003e\\u0026b\\u003dc\\u003c/a\\u003e\"}\r\n"
        );

        let back: serde_json::Value = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(back["m"], "<a href='x'>&b=c</a>");
    }

    #[test]
    fn html_escaping_leaves_utf8_alone() {
        let line = encode_line(&json!({"m": "é<"}), HTML).unwrap();
        assert_eq!(line, "{\"m\":\"é\\u003c\"}\r\n");
    }
}
