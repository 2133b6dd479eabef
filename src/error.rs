/// Error type returned when an event cannot be turned into a record.
///
/// A failed call never yields partial output: either a complete line is
/// returned or one of these variants is.
#[derive(thiserror::Error, Debug)]
pub enum LayoutError {
    /// The event carried no source location. This is a caller contract
    /// breach; the logging subsystem decides whether to drop or abort.
    #[error("log event has no source location")]
    MissingSourceLocation,

    #[error("failed to serialize log record: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Error type returned when parsing a severity name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown log level: {0}")]
pub struct ParseLevelError(pub String);

/// Error type returned when parsing a charset name.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown or unsupported charset: {0}")]
pub struct UnknownCharset(pub String);

/// Error type returned when building configuration from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Charset(#[from] UnknownCharset),

    #[error(transparent)]
    Level(#[from] ParseLevelError),
}

/// Error type returned when installing the global subscriber.
#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("failed to set global subscriber: {0}")]
    SetGlobalDefault(#[from] tracing::subscriber::SetGlobalDefaultError),
}
