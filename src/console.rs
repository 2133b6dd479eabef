use crate::sink::{BoxError, LogSink};
use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;

/// Sink that writes every line to one async writer.
///
/// The writer is held for the sink's whole life and locked per call, so
/// lines reach it in the order `send` was called and `flush` waits for
/// every earlier write.
pub struct WriterSink<W> {
    writer: Mutex<W>,
}

impl<W> WriterSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Sink that writes every line to the process's standard output.
pub type StdoutSink = WriterSink<Stdout>;

impl Default for WriterSink<Stdout> {
    fn default() -> Self {
        Self::new(tokio::io::stdout())
    }
}

#[async_trait]
impl<W> LogSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&self, line: &[u8]) -> Result<(), BoxError> {
        self.writer.lock().await.write_all(line).await?;
        Ok(())
    }

    async fn flush(&self) -> Result<(), BoxError> {
        self.writer.lock().await.flush().await?;
        Ok(())
    }
}
