//! Two log streams sharing one sink:
//!
//! - `bot`: events from this crate
//! - `discord`: events from the Discord client library, minus its
//!   "Unhandled event" chatter
//!
//! Lines look like `2024-05-01 12:00:00,123 - [INFO] bot: message`.

use std::fmt;
use std::io::{self, LineWriter, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::{Context as _, Result};
use chrono::Local;
use regex::Regex;
use tracing::field::{Field, Visit};
use tracing::{Event, Metadata, Subscriber};
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, MakeWriter};
use tracing_subscriber::layer::{Context, Filter, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S,%3f";
const DEFAULT_FILTER: &str = "info,emoji_reactor=debug";

const BOT_TARGETS: &[&str] = &["emoji_reactor"];
const LIBRARY_TARGETS: &[&str] = &["serenity", "tokio_tungstenite"];
const LIBRARY_SUPPRESS: &str = r"(?i)Unhandled event";

/// Install the global subscriber. Keep the guard alive for the life of the
/// process; dropping it flushes the sink.
pub fn init() -> Result<LogGuard> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let sink = LogSink::new(LineWriter::new(io::stderr()));

    subscriber(filter, sink.clone())?
        .try_init()
        .context("Failed to install log subscriber")?;

    Ok(LogGuard { sink })
}

fn subscriber(filter: EnvFilter, sink: LogSink) -> Result<impl Subscriber + Send + Sync + 'static> {
    let library = StreamFilter {
        targets: LIBRARY_TARGETS,
        suppress: Some(Regex::new(LIBRARY_SUPPRESS).context("Invalid log suppression pattern")?),
    };
    let bot = StreamFilter {
        targets: BOT_TARGETS,
        suppress: None,
    };

    Ok(tracing_subscriber::registry()
        .with(filter)
        .with(stream_layer("bot", bot, sink.clone()))
        .with(stream_layer("discord", library, sink)))
}

fn stream_layer<S>(name: &'static str, filter: StreamFilter, sink: LogSink) -> impl Layer<S>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .event_format(LineFormat { stream: name })
        .with_writer(sink)
        .with_filter(filter)
}

/// Flushes the log sink when dropped.
pub struct LogGuard {
    sink: LogSink,
}

impl Drop for LogGuard {
    fn drop(&mut self) {
        self.sink.flush();
    }
}

#[derive(Clone)]
struct LogSink {
    inner: Arc<Mutex<Box<dyn Write + Send>>>,
}

impl LogSink {
    fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Box<dyn Write + Send>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flush(&self) {
        let _ = self.lock().flush();
    }
}

struct SinkWriter<'a>(MutexGuard<'a, Box<dyn Write + Send>>);

impl Write for SinkWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = SinkWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SinkWriter(self.lock())
    }
}

/// Routes events to a stream by target prefix, optionally dropping events
/// whose message matches `suppress`.
struct StreamFilter {
    targets: &'static [&'static str],
    suppress: Option<Regex>,
}

impl<S> Filter<S> for StreamFilter {
    fn enabled(&self, meta: &Metadata<'_>, _cx: &Context<'_, S>) -> bool {
        self.targets.iter().any(|t| meta.target().starts_with(t))
    }

    fn event_enabled(&self, event: &Event<'_>, _cx: &Context<'_, S>) -> bool {
        let Some(pattern) = &self.suppress else {
            return true;
        };
        let mut message = MessageVisitor::default();
        event.record(&mut message);
        !pattern.is_match(&message.0)
    }
}

#[derive(Default)]
struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.0 = value.to_string();
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{:?}", value);
        }
    }
}

struct LineFormat {
    stream: &'static str,
}

impl<S, N> FormatEvent<S, N> for LineFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        write!(
            writer,
            "{} - [{}] {}: ",
            Local::now().format(TIME_FORMAT),
            event.metadata().level(),
            self.stream
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// In-memory log capture for tests, scoped to the current thread.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

#[cfg(test)]
impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[cfg(test)]
impl Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub fn capture() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let subscriber = subscriber(EnvFilter::new("debug"), LogSink::new(logs.clone()))
        .expect("test subscriber");
    let guard = tracing::subscriber::set_default(subscriber);
    (logs, guard)
}
