//! Log forwarding to the host
//!
//! The host owns the log output of an embedded core. [`HostLogLayer`] is a
//! `tracing` layer that renders each event to a single line and hands it to a
//! [`LogSink`], which the ABI layer backs with the host's log callback.

use std::fmt::{self, Write as _};
use std::sync::Once;
use tracing::field::{Field, Visit};
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Environment variable holding the log filter
pub const LOG_ENV: &str = "RETROPSP_LOG";

/// Destination for rendered log lines
pub trait LogSink: Send + Sync + 'static {
    fn write(&self, level: Level, line: &str);
}

/// `tracing` layer forwarding events to a [`LogSink`]
pub struct HostLogLayer<S> {
    sink: S,
}

impl<S: LogSink> HostLogLayer<S> {
    pub fn new(sink: S) -> Self {
        Self { sink }
    }
}

impl<S, Sub> Layer<Sub> for HostLogLayer<S>
where
    S: LogSink,
    Sub: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, Sub>) {
        let mut line = LineVisitor::default();
        event.record(&mut line);
        self.sink.write(*event.metadata().level(), &line.finish());
    }
}

/// Collects the message first, then `name=value` pairs
#[derive(Default)]
struct LineVisitor {
    message: String,
    fields: String,
}

impl LineVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl Visit for LineVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Filter from [`LOG_ENV`], `info` when unset or invalid
pub fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"))
}

static INSTALL: Once = Once::new();

/// Install the global subscriber once per process
///
/// Events go to `sink` when the host offered one, to stderr otherwise.
/// Returns `false` when this call did not install anything: either an
/// earlier call already did, or the embedding process owns the global
/// subscriber.
pub fn install<S: LogSink>(sink: Option<S>) -> bool {
    let mut installed = false;
    INSTALL.call_once(|| {
        let stderr = sink.is_none().then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
        });
        installed = tracing_subscriber::registry()
            .with(env_filter())
            .with(sink.map(HostLogLayer::new))
            .with(stderr)
            .try_init()
            .is_ok();
    });
    installed
}
