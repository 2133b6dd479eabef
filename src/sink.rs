use async_trait::async_trait;
use std::error::Error;

/// Boxed error returned by sinks.
pub type BoxError = Box<dyn Error + Send + Sync>;

/// Asynchronous destination for encoded log lines.
///
/// Each line is one complete record, already charset-encoded and
/// terminated by `\r\n`. Implementations move the bytes to a concrete
/// destination (file, socket, stdout, etc). The layer calls `send` from a
/// background task and never awaits it on the application thread.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Write a single encoded line.
    ///
    /// **Returns**
    /// - `Ok(())` if the line was accepted.
    /// - `Err(..)` if the destination failed. The layer treats this as a
    ///   transient failure and retries the remaining batch with backoff.
    async fn send(&self, line: &[u8]) -> Result<(), BoxError>;

    /// Flush any buffered lines, if the sink implements buffering.
    ///
    /// Default implementation is a no-op.
    async fn flush(&self) -> Result<(), BoxError> {
        Ok(())
    }
}
