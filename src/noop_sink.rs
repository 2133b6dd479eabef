use crate::sink::{BoxError, LogSink};
use async_trait::async_trait;

/// A sink that simply drops all lines.
///
/// Useful for measuring the overhead of formatting without any external
/// I/O, and for tests that don't care about output.
#[derive(Clone, Default)]
pub struct NoopSink;

#[async_trait]
impl LogSink for NoopSink {
    async fn send(&self, _line: &[u8]) -> Result<(), BoxError> {
        Ok(())
    }
}
