use std::sync::Arc;

use async_trait::async_trait;
use tokio::time::{sleep, Duration};
use tracing::{error, info};
use tracing_json_layout::{
    init::{init_tracing_with_config, LayerConfig},
    sink::{BoxError, LogSink},
};

/// Example of shipping lines to a destination this crate does not know
/// about by implementing `LogSink` directly. Here the "destination" is
/// stderr, prefixed so the JSON is easy to spot.
struct PrefixedStderrSink;

#[async_trait]
impl LogSink for PrefixedStderrSink {
    async fn send(&self, line: &[u8]) -> Result<(), BoxError> {
        eprint!("[shipper] {}", String::from_utf8_lossy(line));
        Ok(())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("upstream timed out")]
struct UpstreamTimeout;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let sink: Arc<dyn LogSink> = Arc::new(PrefixedStderrSink);
    init_tracing_with_config(sink, LayerConfig::from_env()?)?;

    info!("custom sink example started");
    let err = UpstreamTimeout;
    error!(error = &err as &(dyn std::error::Error + 'static), "request to upstream failed");
    error!(
        exception.class = "com.example.UpstreamTimeout",
        exception.message = "upstream timed out",
        "request to upstream failed"
    );

    sleep(Duration::from_millis(1_500)).await;
    Ok(())
}
