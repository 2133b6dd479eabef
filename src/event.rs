use crate::error::ParseLevelError;
use std::error::Error;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

/// Severity of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    Fatal,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl Level {
    /// Upper-case severity name as written into records.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Fatal => "FATAL",
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        }
    }

    /// Closest `tracing` level; `Fatal` collapses into `ERROR`.
    pub fn to_tracing(self) -> tracing::Level {
        match self {
            Level::Fatal | Level::Error => tracing::Level::ERROR,
            Level::Warn => tracing::Level::WARN,
            Level::Info => tracing::Level::INFO,
            Level::Debug => tracing::Level::DEBUG,
            Level::Trace => tracing::Level::TRACE,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::ERROR => Level::Error,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::INFO => Level::Info,
            tracing::Level::DEBUG => Level::Debug,
            _ => Level::Trace,
        }
    }
}

impl FromStr for Level {
    type Err = ParseLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fatal" => Ok(Level::Fatal),
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "debug" => Ok(Level::Debug),
            "trace" => Ok(Level::Trace),
            _ => Err(ParseLevelError(s.to_string())),
        }
    }
}

/// Call site where a log statement was issued.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub class_name: String,
    pub method_name: String,
    pub file_name: String,
    pub line_number: u32,
}

impl SourceLocation {
    pub fn new(
        class_name: impl Into<String>,
        method_name: impl Into<String>,
        file_name: impl Into<String>,
        line_number: u32,
    ) -> Self {
        Self {
            class_name: class_name.into(),
            method_name: method_name.into(),
            file_name: file_name.into(),
            line_number,
        }
    }
}

/// Metadata about an error attached to a log event.
///
/// Every field is independently optional. An absent value means the
/// matching key is left out of the record; it is never the same thing as
/// an empty string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ThrownDescriptor {
    /// Fully-qualified type name of the error, when one is known.
    pub canonical_name: Option<String>,
    pub message: Option<String>,
    /// Rendered cause chain.
    pub extended_stack_trace: Option<String>,
}

impl ThrownDescriptor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_canonical_name(mut self, name: impl Into<String>) -> Self {
        self.canonical_name = Some(name.into());
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_extended_stack_trace(mut self, trace: impl Into<String>) -> Self {
        self.extended_stack_trace = Some(trace.into());
        self
    }

    /// Describe a concrete error, naming it by its static type.
    ///
    /// The name is that of `E` exactly, so pass the error itself: a
    /// `&Box<MyErr>` or `&Arc<MyErr>` would be named after the wrapper.
    /// Deref first (`from_error(&*boxed)`), or use [`from_dyn_error`]
    /// when the concrete type is erased.
    ///
    /// [`from_dyn_error`]: ThrownDescriptor::from_dyn_error
    pub fn from_error<E: Error + 'static>(err: &E) -> Self {
        let name = std::any::type_name::<E>();
        Self {
            canonical_name: Some(name.to_string()),
            message: Some(err.to_string()),
            extended_stack_trace: Some(render_stack_trace(Some(name), err)),
        }
    }

    /// Describe a type-erased error. No canonical name is available.
    pub fn from_dyn_error(err: &(dyn Error + 'static)) -> Self {
        Self {
            canonical_name: None,
            message: Some(err.to_string()),
            extended_stack_trace: Some(render_stack_trace(None, err)),
        }
    }
}

/// Render an error and its `source()` chain, one line per link.
pub fn render_stack_trace(name: Option<&str>, err: &(dyn Error + 'static)) -> String {
    let mut out = match name {
        Some(name) => format!("{}: {}", name, err),
        None => err.to_string(),
    };

    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\nCaused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

/// Read-only view of a log event, exposing exactly what the layout needs.
pub trait LogEvent {
    fn level(&self) -> Level;
    fn thread_name(&self) -> &str;
    fn thread_id(&self) -> u64;
    fn logger_name(&self) -> &str;
    /// Fully formatted message text.
    fn message(&self) -> &str;
    /// Call site of the log statement. `None` breaks the caller contract
    /// and makes formatting fail.
    fn source(&self) -> Option<&SourceLocation>;
    fn thrown(&self) -> Option<&ThrownDescriptor>;
}

/// Owned [`LogEvent`] captured at the point of logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSnapshot {
    pub level: Level,
    pub thread_name: String,
    pub thread_id: u64,
    pub logger_name: String,
    pub message: String,
    pub source: Option<SourceLocation>,
    pub thrown: Option<ThrownDescriptor>,
}

impl EventSnapshot {
    /// Create an event attributed to the calling thread. The source
    /// location starts out empty and must be set before formatting.
    pub fn new(level: Level, logger_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level,
            thread_name: current_thread_name(),
            thread_id: current_thread_id(),
            logger_name: logger_name.into(),
            message: message.into(),
            source: None,
            thrown: None,
        }
    }

    pub fn with_thread(mut self, name: impl Into<String>, id: u64) -> Self {
        self.thread_name = name.into();
        self.thread_id = id;
        self
    }

    pub fn with_source(mut self, source: SourceLocation) -> Self {
        self.source = Some(source);
        self
    }

    pub fn without_source(mut self) -> Self {
        self.source = None;
        self
    }

    pub fn with_thrown(mut self, thrown: ThrownDescriptor) -> Self {
        self.thrown = Some(thrown);
        self
    }
}

impl LogEvent for EventSnapshot {
    fn level(&self) -> Level {
        self.level
    }

    fn thread_name(&self) -> &str {
        &self.thread_name
    }

    fn thread_id(&self) -> u64 {
        self.thread_id
    }

    fn logger_name(&self) -> &str {
        &self.logger_name
    }

    fn message(&self) -> &str {
        &self.message
    }

    fn source(&self) -> Option<&SourceLocation> {
        self.source.as_ref()
    }

    fn thrown(&self) -> Option<&ThrownDescriptor> {
        self.thrown.as_ref()
    }
}

static NEXT_THREAD_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    static THREAD_ID: u64 = NEXT_THREAD_ID.fetch_add(1, Ordering::Relaxed);
}

/// Process-unique numeric id of the calling thread, assigned on first use.
pub fn current_thread_id() -> u64 {
    THREAD_ID.with(|id| *id)
}

/// Name of the calling thread, or `<unnamed>`.
pub fn current_thread_name() -> String {
    std::thread::current()
        .name()
        .unwrap_or("<unnamed>")
        .to_string()
}
