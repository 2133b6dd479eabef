use crate::charset::Charset;
use crate::clock::{Clock, SystemClock};
use crate::encode::{encode_line, EncodeOptions};
use crate::env::{env_or, LOG_LAYOUT_APPLICATION_NAME_ENV, LOG_LAYOUT_CHARSET_ENV};
use crate::error::{LayoutError, UnknownCharset};
use crate::event::{LogEvent, SourceLocation, ThrownDescriptor};
use crate::record::{ExceptionFields, LogRecord, SourceRecord};
use std::fmt;
use std::sync::Arc;

/// Application name written into records when none is configured.
pub const DEFAULT_APPLICATION_NAME: &str = "MyApp";

/// Configuration of the [`JsonLayout`].
///
/// **Fields**
/// - `application_name`: constant written as `application_name` in every
///   record.
/// - `charset`: encoding applied by [`JsonLayout::to_bytes`]. Anything
///   other than UTF-8 also makes the encoder escape non-ASCII text.
/// - `escape_html`: write `<`, `>`, `&`, `=` and `'` as `\uXXXX` escapes.
///   On by default.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LayoutConfig {
    pub application_name: String,
    pub charset: Charset,
    pub escape_html: bool,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            application_name: DEFAULT_APPLICATION_NAME.to_string(),
            charset: Charset::default(),
            escape_html: true,
        }
    }
}

impl LayoutConfig {
    /// Build a config from `LOG_LAYOUT_APPLICATION_NAME` and
    /// `LOG_LAYOUT_CHARSET`, falling back to the defaults.
    pub fn from_env() -> Result<Self, UnknownCharset> {
        let defaults = Self::default();
        let charset = env_or(LOG_LAYOUT_CHARSET_ENV, defaults.charset.name()).parse()?;
        Ok(Self {
            application_name: env_or(LOG_LAYOUT_APPLICATION_NAME_ENV, &defaults.application_name),
            charset,
            ..defaults
        })
    }
}

/// Scalar fields pulled off an event before the nested parts are added.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScalarFields<'a> {
    pub application_name: &'a str,
    pub timestamp: String,
    pub level: &'static str,
    pub thread: &'a str,
    pub thread_id: u64,
    pub logger_name: &'a str,
}

/// Formats log events as single-line JSON records.
///
/// A layout is immutable once built and is shared across threads behind
/// an `Arc`. Every call works on its own local record, so concurrent
/// callers never contend.
#[derive(Clone)]
pub struct JsonLayout {
    config: LayoutConfig,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for JsonLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonLayout")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Default for JsonLayout {
    fn default() -> Self {
        Self::new(LayoutConfig::default())
    }
}

impl JsonLayout {
    pub fn new(config: LayoutConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the timestamp source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn charset(&self) -> Charset {
        self.config.charset
    }

    fn encode_options(&self) -> EncodeOptions {
        EncodeOptions {
            escape_non_ascii: self.config.charset.requires_ascii_escaping(),
            escape_html: self.config.escape_html,
        }
    }

    /// Scalar fields of the record. The timestamp is read from the clock
    /// now, not taken from the event.
    pub fn extract_fields<'a, E>(&'a self, event: &'a E) -> ScalarFields<'a>
    where
        E: LogEvent + ?Sized,
    {
        ScalarFields {
            application_name: &self.config.application_name,
            timestamp: self.clock.now_millis().to_string(),
            level: event.level().as_str(),
            thread: event.thread_name(),
            thread_id: event.thread_id(),
            logger_name: event.logger_name(),
        }
    }

    /// Nested `source` object. A missing location is fatal.
    pub fn encode_source(source: Option<&SourceLocation>) -> Result<SourceRecord<'_>, LayoutError> {
        let source = source.ok_or(LayoutError::MissingSourceLocation)?;
        Ok(SourceRecord {
            class: &source.class_name,
            method: &source.method_name,
            file: &source.file_name,
            line: source.line_number,
        })
    }

    /// Exception keys, each present only when its value is known.
    pub fn encode_exception(thrown: Option<&ThrownDescriptor>) -> ExceptionFields<'_> {
        match thrown {
            None => ExceptionFields::default(),
            Some(thrown) => ExceptionFields {
                exception: thrown.canonical_name.as_deref(),
                cause: thrown.message.as_deref(),
                stacktrace: thrown.extended_stack_trace.as_deref(),
            },
        }
    }

    /// Assemble the full record for `event`.
    pub fn build_record<'a, E>(&'a self, event: &'a E) -> Result<LogRecord<'a>, LayoutError>
    where
        E: LogEvent + ?Sized,
    {
        let source = Self::encode_source(event.source())?;
        let fields = self.extract_fields(event);
        Ok(LogRecord {
            application_name: fields.application_name,
            timestamp: fields.timestamp,
            level: fields.level,
            thread: fields.thread,
            thread_id: fields.thread_id,
            logger_name: fields.logger_name,
            source,
            message: event.message(),
            exception: Self::encode_exception(event.thrown()),
        })
    }

    /// Format `event` as one JSON line terminated by `\r\n`.
    pub fn to_serializable<E>(&self, event: &E) -> Result<String, LayoutError>
    where
        E: LogEvent + ?Sized,
    {
        let record = self.build_record(event)?;
        Ok(encode_line(&record, self.encode_options())?)
    }

    /// Format `event` and encode the line with the configured charset.
    pub fn to_bytes<E>(&self, event: &E) -> Result<Vec<u8>, LayoutError>
    where
        E: LogEvent + ?Sized,
    {
        let line = self.to_serializable(event)?;
        Ok(self.config.charset.encode(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::event::{EventSnapshot, Level};
    use serde_json::{json, Value};

    fn layout() -> JsonLayout {
        JsonLayout::default().with_clock(Arc::new(FixedClock(1_700_000_000_123)))
    }

    fn base_event() -> EventSnapshot {
        EventSnapshot::new(Level::Info, "com.foo.Bar", "hello")
            .with_thread("main", 1)
            .with_source(SourceLocation::new("com.foo.Bar", "run", "Bar.java", 42))
    }

    fn parse(line: &str) -> Value {
        assert!(line.ends_with("\r\n"));
        serde_json::from_str(line.trim_end_matches("\r\n")).unwrap()
    }

    fn keys(value: &Value) -> Vec<&str> {
        let mut keys: Vec<&str> = value.as_object().unwrap().keys().map(String::as_str).collect();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn plain_event_has_fixed_key_set() {
        let line = layout().to_serializable(&base_event()).unwrap();
        let value = parse(&line);

        assert_eq!(
            keys(&value),
            vec![
                "application_name",
                "level",
                "logger_name",
                "message",
                "source",
                "thread",
                "thread_id",
                "timestamp",
            ]
        );
        assert_eq!(value["application_name"], "MyApp");
        assert_eq!(value["timestamp"], "1700000000123");
        assert_eq!(value["level"], "INFO");
        assert_eq!(value["thread"], "main");
        assert_eq!(value["thread_id"], 1);
        assert_eq!(value["logger_name"], "com.foo.Bar");
        assert_eq!(
            value["source"],
            json!({"class": "com.foo.Bar", "method": "run", "file": "Bar.java", "line": 42})
        );
        assert_eq!(value["message"], "hello");
    }

    #[test]
    fn keys_follow_insertion_order() {
        let line = layout().to_serializable(&base_event()).unwrap();
        assert!(line.starts_with(
            "{\"application_name\":\"MyApp\",\"timestamp\":\"1700000000123\",\"level\":\"INFO\","
        ));
        assert!(line.ends_with("\"message\":\"hello\"}\r\n"));
    }

    #[test]
    fn full_exception_adds_three_keys() {
        let event = base_event().with_thrown(
            ThrownDescriptor::new()
                .with_canonical_name("java.lang.RuntimeException")
                .with_message("boom")
                .with_extended_stack_trace("trace-text"),
        );
        let value = parse(&layout().to_serializable(&event).unwrap());

        assert_eq!(value["exception"], "java.lang.RuntimeException");
        assert_eq!(value["cause"], "boom");
        assert_eq!(value["stacktrace"], "trace-text");
    }

    #[test]
    fn exception_keys_are_independent() {
        let event = base_event()
            .with_thrown(ThrownDescriptor::new().with_extended_stack_trace("trace-text"));
        let value = parse(&layout().to_serializable(&event).unwrap());

        assert!(value.get("exception").is_none());
        assert!(value.get("cause").is_none());
        assert_eq!(value["stacktrace"], "trace-text");

        let event = base_event().with_thrown(ThrownDescriptor::new().with_message("boom"));
        let value = parse(&layout().to_serializable(&event).unwrap());
        assert_eq!(value["cause"], "boom");
        assert!(value.get("exception").is_none());
        assert!(value.get("stacktrace").is_none());
    }

    #[test]
    fn empty_descriptor_emits_nothing_and_empty_string_is_kept() {
        let event = base_event().with_thrown(ThrownDescriptor::new());
        let line = layout().to_serializable(&event).unwrap();
        assert!(!line.contains("null"));
        assert_eq!(keys(&parse(&line)).len(), 8);

        let event = base_event().with_thrown(ThrownDescriptor::new().with_message(""));
        let value = parse(&layout().to_serializable(&event).unwrap());
        assert_eq!(value["cause"], "");
    }

    #[test]
    fn missing_source_is_fatal() {
        let event = base_event().without_source();
        let err = layout().to_serializable(&event).unwrap_err();
        assert!(matches!(err, LayoutError::MissingSourceLocation));
        assert!(layout().to_bytes(&event).is_err());
    }

    #[test]
    fn identical_events_differ_only_in_timestamp() {
        let first = JsonLayout::default().with_clock(Arc::new(FixedClock(1)));
        let second = JsonLayout::default().with_clock(Arc::new(FixedClock(2)));

        let mut a = parse(&first.to_serializable(&base_event()).unwrap());
        let mut b = parse(&second.to_serializable(&base_event()).unwrap());
        assert_ne!(a["timestamp"], b["timestamp"]);

        a.as_object_mut().unwrap().remove("timestamp");
        b.as_object_mut().unwrap().remove("timestamp");
        assert_eq!(a, b);
    }

    #[test]
    fn system_clock_timestamp_is_non_negative_integer() {
        let value = parse(&JsonLayout::default().to_serializable(&base_event()).unwrap());
        let millis: u64 = value["timestamp"].as_str().unwrap().parse().unwrap();
        assert!(millis > 0);
    }

    #[test]
    fn ascii_charset_escapes_and_utf8_does_not() {
        let event = EventSnapshot::new(Level::Warn, "app", "naïve ✓")
            .with_thread("main", 1)
            .with_source(SourceLocation::new("app", "f", "app.rs", 1));

        let ascii = layout().to_bytes(&event).unwrap();
        assert!(ascii.is_ascii());
        let value = parse(std::str::from_utf8(&ascii).unwrap());
        assert_eq!(value["message"], "naïve ✓");

        let utf8 = JsonLayout::new(LayoutConfig {
            application_name: "svc".into(),
            charset: Charset::Utf8,
            ..LayoutConfig::default()
        });
        let line = utf8.to_serializable(&event).unwrap();
        assert!(line.contains("naïve ✓"));
        assert!(line.contains("\"application_name\":\"svc\""));
    }

    #[test]
    fn html_sensitive_characters_follow_config() {
        let event = EventSnapshot::new(Level::Info, "app", "a<b & c='d'")
            .with_thread("main", 1)
            .with_source(SourceLocation::new("app", "f", "app.rs", 1));

        let line = layout().to_serializable(&event).unwrap();
        assert!(line.contains("\"message\":\"a\\u003cb \\u0026 c\\u003d\\u0027d\\u0027\""));
        assert_eq!(parse(&line)["message"], "a<b & c='d'");

        let plain = JsonLayout::new(LayoutConfig {
            escape_html: false,
            ..LayoutConfig::default()
        });
        let line = plain.to_serializable(&event).unwrap();
        assert!(line.contains("\"message\":\"a<b & c='d'\""));
    }

    #[test]
    fn layout_is_shareable_across_threads() {
        let layout = Arc::new(layout());
        let handles: Vec<_> = (0..4u64)
            .map(|id| {
                let layout = Arc::clone(&layout);
                std::thread::spawn(move || {
                    let event = base_event().with_thread(format!("t{id}"), id);
                    parse(&layout.to_serializable(&event).unwrap())
                })
            })
            .collect();

        for (id, handle) in handles.into_iter().enumerate() {
            let value = handle.join().unwrap();
            assert_eq!(value["thread_id"], id as u64);
            assert_eq!(value["thread"], format!("t{id}"));
        }
    }
}
