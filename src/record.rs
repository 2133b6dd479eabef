use serde::Serialize;

/// One output record, borrowed from the event it was built from.
///
/// Field order here is the key order of the emitted JSON. Optional
/// exception fields are omitted when absent rather than written as `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord<'a> {
    pub application_name: &'a str,
    /// Milliseconds since the Unix epoch, as a decimal string.
    pub timestamp: String,
    pub level: &'a str,
    pub thread: &'a str,
    pub thread_id: u64,
    pub logger_name: &'a str,
    pub source: SourceRecord<'a>,
    pub message: &'a str,
    #[serde(flatten)]
    pub exception: ExceptionFields<'a>,
}

/// Nested `source` object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRecord<'a> {
    pub class: &'a str,
    pub method: &'a str,
    pub file: &'a str,
    pub line: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExceptionFields<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exception: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cause: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stacktrace: Option<&'a str>,
}

impl ExceptionFields<'_> {
    pub fn is_empty(&self) -> bool {
        self.exception.is_none() && self.cause.is_none() && self.stacktrace.is_none()
    }
}
