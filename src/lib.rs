//! Single-line JSON layout for log events.
//!
//! [`layout::JsonLayout`] turns any [`event::LogEvent`] into one compact
//! JSON record terminated by `\r\n`. [`layer::JsonLogLayer`] wires the
//! layout into `tracing` and ships the encoded lines to a [`sink::LogSink`].

pub mod charset;
pub mod clock;
pub mod encode;
pub mod env;
pub mod error;
pub mod event;
pub mod layout;
pub mod record;
pub mod sink;
pub mod layer;

#[cfg(feature = "console")]
pub mod console;

pub mod init;
pub mod noop_sink;

pub use charset::Charset;
pub use error::LayoutError;
pub use event::{EventSnapshot, Level, LogEvent, SourceLocation, ThrownDescriptor};
pub use layout::{JsonLayout, LayoutConfig};
