use crate::env::{env_or, LOG_LAYOUT_LEVEL_ENV};
use crate::error::{ConfigError, InitError};
use crate::event::Level;
use crate::layer::JsonLogLayer;
use crate::layout::{JsonLayout, LayoutConfig};
use crate::sink::LogSink;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

/// Configuration of the logging layer.
///
/// **Fields**
/// - `channel_buffer`: maximum number of encoded lines queued before new
///   records start being dropped.
/// - `batch_size`: number of lines handed to the sink in one go.
/// - `flush_interval`: longest time a partial batch waits before it is
///   sent anyway.
/// - `enable_stdout`: if `true`, a `tracing_subscriber::fmt::Layer` is
///   stacked on top so events are also printed to the console.
/// - `max_level`: least severe level the layer captures.
/// - `layout`: [`LayoutConfig`] for the JSON records.
#[derive(Clone, Debug)]
pub struct LayerConfig {
    pub channel_buffer: usize,
    pub batch_size: usize,
    pub flush_interval: Duration,
    pub enable_stdout: bool,
    pub max_level: tracing::Level,
    pub layout: LayoutConfig,
}

impl Default for LayerConfig {
    fn default() -> Self {
        Self {
            channel_buffer: 1024,
            batch_size: 128,
            flush_interval: Duration::from_secs(1),
            enable_stdout: false,
            max_level: tracing::Level::INFO,
            layout: LayoutConfig::default(),
        }
    }
}

impl LayerConfig {
    /// Defaults overridden by `LOG_LAYOUT_LEVEL`, `LOG_LAYOUT_CHARSET` and
    /// `LOG_LAYOUT_APPLICATION_NAME`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let level: Level = env_or(LOG_LAYOUT_LEVEL_ENV, defaults.max_level.as_str()).parse()?;
        Ok(Self {
            max_level: level.to_tracing(),
            layout: LayoutConfig::from_env()?,
            ..defaults
        })
    }
}

/// Initialize the global `tracing` subscriber using the provided sink and
/// [`LayerConfig`].
///
/// **Parameters**
/// - `sink`: implementation of [`LogSink`] that will receive encoded
///   JSON lines.
/// - `config`: [`LayerConfig`] controlling buffering, batching, level and
///   record layout.
///
/// **Returns**
/// - The handle of the background task delivering lines to the sink.
/// - `Err(InitError)` if a global subscriber was already installed.
///
/// Must be called from within a Tokio runtime.
pub fn init_tracing_with_config(
    sink: Arc<dyn LogSink>,
    config: LayerConfig,
) -> Result<JoinHandle<()>, InitError> {
    let layout = Arc::new(JsonLayout::new(config.layout));
    let (layer, handle) = JsonLogLayer::new(
        layout,
        sink,
        config.channel_buffer,
        config.batch_size,
        config.flush_interval,
    );
    let layer = layer.with_max_level(config.max_level);

    // The two subscriber shapes have different types, so each branch
    // installs its own.
    if config.enable_stdout {
        let fmt_layer = tracing_subscriber::fmt::layer();
        let subscriber = Registry::default().with(layer).with(fmt_layer);
        tracing::subscriber::set_global_default(subscriber)?;
    } else {
        let subscriber = Registry::default().with(layer);
        tracing::subscriber::set_global_default(subscriber)?;
    }
    Ok(handle)
}

/// Initialize tracing with [`LayerConfig::default`].
pub fn init_tracing(sink: Arc<dyn LogSink>) -> Result<JoinHandle<()>, InitError> {
    init_tracing_with_config(sink, LayerConfig::default())
}
