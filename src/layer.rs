use crate::event::{EventSnapshot, Level, SourceLocation, ThrownDescriptor};
use crate::layout::JsonLayout;
use crate::sink::{BoxError, LogSink};
use std::error::Error;
use std::fmt::{self, Write as _};
use std::sync::{Arc, atomic::{AtomicU64, Ordering}};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, Duration, MissedTickBehavior};
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::registry::LookupSpan;

/// How many times a batch is offered to the sink before it is dropped.
const MAX_SEND_ATTEMPTS: u32 = 5;

/// `tracing_subscriber` layer that formats events with a [`JsonLayout`]
/// and forwards the encoded lines to an asynchronous [`LogSink`] via a
/// bounded channel and background task.
///
/// Formatting happens inline on the thread that emitted the event, so the
/// thread name and id in the record are the caller's and the timestamp is
/// taken at that moment. Sink I/O is fully decoupled from application
/// threads.
pub struct JsonLogLayer {
    layout: Arc<JsonLayout>,
    max_level: tracing::Level,
    sender: mpsc::Sender<Vec<u8>>,
    /// Total events seen by the layer (before filtering by level).
    pub total_events: Arc<AtomicU64>,
    /// Successfully enqueued into channel.
    pub enqueued_events: Arc<AtomicU64>,
    /// Dropped because the channel was full.
    pub dropped_events: Arc<AtomicU64>,
    /// Dropped because the background task is gone.
    pub closed_events: Arc<AtomicU64>,
    /// Dropped because the layout refused the event.
    pub rejected_events: Arc<AtomicU64>,
}

impl JsonLogLayer {
    /// Create a new layer and spawn a background task that pulls encoded
    /// lines from a bounded channel and sends them to the provided
    /// [`LogSink`].
    ///
    /// Minimal thresholds are enforced for `buffer`, `batch_size` and
    /// `flush_interval` to avoid degenerate configurations. The task ends
    /// once the layer is dropped and the remaining lines are delivered.
    /// Must be called from within a Tokio runtime.
    pub fn new(
        layout: Arc<JsonLayout>,
        sink: Arc<dyn LogSink>,
        buffer: usize,
        batch_size: usize,
        flush_interval: Duration,
    ) -> (Self, JoinHandle<()>) {
        let buffer = buffer.max(16);
        let batch_size = batch_size.max(1);
        let flush_interval = flush_interval.max(Duration::from_millis(10));

        let (tx, mut rx) = mpsc::channel::<Vec<u8>>(buffer);

        let handle = tokio::spawn(async move {
            let mut batch = Vec::with_capacity(batch_size);
            let mut ticker = interval(flush_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let backoff = Duration::from_millis(100);
            let max_backoff = Duration::from_secs(10);

            loop {
                tokio::select! {
                    line = rx.recv() => match line {
                        Some(line) => {
                            batch.push(line);
                            if batch.len() >= batch_size {
                                if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                    eprintln!("error sending log batch: {}", e);
                                }
                            }
                        }
                        None => {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                eprintln!("error sending final log batch: {}", e);
                            }
                            if let Err(e) = sink.flush().await {
                                eprintln!("error flushing log sink: {}", e);
                            }
                            break;
                        }
                    },
                    _ = ticker.tick() => {
                        if !batch.is_empty() {
                            if let Err(e) = send_batch(&*sink, &mut batch, backoff, max_backoff).await {
                                eprintln!("error flushing log batch: {}", e);
                            }
                            if let Err(e) = sink.flush().await {
                                eprintln!("error flushing log sink: {}", e);
                            }
                        }
                    }
                }
            }
        });

        (
            Self {
                layout,
                max_level: tracing::Level::TRACE,
                sender: tx,
                total_events: Arc::new(AtomicU64::new(0)),
                enqueued_events: Arc::new(AtomicU64::new(0)),
                dropped_events: Arc::new(AtomicU64::new(0)),
                closed_events: Arc::new(AtomicU64::new(0)),
                rejected_events: Arc::new(AtomicU64::new(0)),
            },
            handle,
        )
    }

    /// Only capture events at `level` or more severe.
    pub fn with_max_level(mut self, level: tracing::Level) -> Self {
        self.max_level = level;
        self
    }
}

/// Deliver `batch` in order, retrying the undelivered tail with
/// exponential backoff. Lines that were accepted are never resent.
async fn send_batch(
    sink: &dyn LogSink,
    batch: &mut Vec<Vec<u8>>,
    mut backoff: Duration,
    max_backoff: Duration,
) -> Result<(), BoxError> {
    let mut attempt = 1;
    loop {
        let mut sent = 0;
        let mut last_err: Option<BoxError> = None;
        for line in batch.iter() {
            if let Err(e) = sink.send(line).await {
                last_err = Some(e);
                break;
            }
            sent += 1;
        }
        batch.drain(..sent);

        let err = match last_err {
            None => return Ok(()),
            Some(err) => err,
        };
        if attempt >= MAX_SEND_ATTEMPTS {
            eprintln!("log sink failed {} times, dropping {} lines", attempt, batch.len());
            batch.clear();
            return Err(err);
        }

        eprintln!("log sink send failed ({}), retrying in {:?}", err, backoff);
        sleep(backoff).await;
        backoff = std::cmp::min(backoff * 2, max_backoff);
        attempt += 1;
    }
}

impl<S> Layer<S> for JsonLogLayer
where
    S: Subscriber + for<'span> LookupSpan<'span>,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        self.total_events.fetch_add(1, Ordering::Relaxed);
        if *event.metadata().level() > self.max_level {
            return;
        }

        let snapshot = snapshot_event(event);
        let line = match self.layout.to_bytes(&snapshot) {
            Ok(line) => line,
            Err(e) => {
                self.rejected_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("dropping log record: {}", e);
                return;
            }
        };

        match self.sender.try_send(line) {
            Ok(()) => {
                self.enqueued_events.fetch_add(1, Ordering::Relaxed);
            }
            Err(TrySendError::Full(_)) => {
                self.dropped_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log channel full, dropping log record");
            }
            Err(TrySendError::Closed(_)) => {
                self.closed_events.fetch_add(1, Ordering::Relaxed);
                eprintln!("log sink task has stopped, dropping log record");
            }
        }
    }
}

/// Capture a `tracing` event as an [`EventSnapshot`] on the current thread.
///
/// The call site maps to `class` = module path (or target), `method` =
/// the `code.function` field when given (else the callsite name), plus
/// the file and line. Without a file or line there is no source location.
pub fn snapshot_event(event: &Event<'_>) -> EventSnapshot {
    let meta = event.metadata();
    let mut visitor = FieldVisitor::default();
    event.record(&mut visitor);

    let source = match (meta.file(), meta.line()) {
        (Some(file), Some(line)) => Some(SourceLocation::new(
            meta.module_path().unwrap_or_else(|| meta.target()),
            visitor.function.take().unwrap_or_else(|| meta.name().to_string()),
            file,
            line,
        )),
        _ => None,
    };

    let mut snapshot = EventSnapshot::new(Level::from(*meta.level()), meta.target(), visitor.message());
    snapshot.source = source;
    snapshot.thrown = visitor.thrown();
    snapshot
}

/// Collects event fields into message text and exception metadata.
///
/// `exception.type` (or `exception.class`), `exception.message` and
/// `exception.stacktrace` fill
/// the matching descriptor fields; an error recorded through
/// `record_error` fills whatever they leave unset. Any other field is
/// appended to the message as ` key=value`.
#[derive(Default)]
pub struct FieldVisitor {
    message: Option<String>,
    extra: String,
    function: Option<String>,
    exception_type: Option<String>,
    exception_message: Option<String>,
    exception_stacktrace: Option<String>,
    error: Option<ThrownDescriptor>,
}

impl FieldVisitor {
    fn put(&mut self, field: &Field, value: String) {
        match field.name() {
            "message" => self.message = Some(value),
            "code.function" => self.function = Some(value),
            "exception.type" | "exception.class" => self.exception_type = Some(value),
            "exception.message" => self.exception_message = Some(value),
            "exception.stacktrace" => self.exception_stacktrace = Some(value),
            name => {
                let _ = write!(self.extra, " {}={}", name, value);
            }
        }
    }

    /// Formatted message followed by any extra fields.
    pub fn message(&self) -> String {
        let mut message = self.message.clone().unwrap_or_default();
        message.push_str(&self.extra);
        message
    }

    pub fn thrown(&mut self) -> Option<ThrownDescriptor> {
        let explicit = self.exception_type.is_some()
            || self.exception_message.is_some()
            || self.exception_stacktrace.is_some();
        if !explicit && self.error.is_none() {
            return None;
        }

        let mut thrown = self.error.take().unwrap_or_default();
        if let Some(name) = self.exception_type.take() {
            thrown.canonical_name = Some(name);
        }
        if let Some(message) = self.exception_message.take() {
            thrown.message = Some(message);
        }
        if let Some(trace) = self.exception_stacktrace.take() {
            thrown.extended_stack_trace = Some(trace);
        }
        Some(thrown)
    }
}

impl Visit for FieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.put(field, value.to_string());
    }

    fn record_error(&mut self, field: &Field, value: &(dyn Error + 'static)) {
        if self.error.is_none() {
            self.error = Some(ThrownDescriptor::from_dyn_error(value));
        } else {
            self.put(field, value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put(field, format!("{:?}", value));
    }
}
