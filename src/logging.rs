use std::fmt;
use std::future::Future;

use clap::ValueEnum;
use tracing::instrument::WithSubscriber;
use tracing::{Dispatch, Instrument, Level, Span};
use tracing_subscriber::fmt::MakeWriter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&Level::from(*self), f)
    }
}

/// Logging context for one process: a subscriber plus a root span carrying
/// `service` and `pid`. Nothing is installed globally; futures run under it
/// via [`Logging::scope`].
#[derive(Clone)]
pub struct Logging {
    dispatch: Dispatch,
    root: Span,
    level: LogLevel,
}

impl Logging {
    /// Logs to stderr. `pretty` selects the compact human format, otherwise
    /// one JSON object per line.
    pub fn new(service: &str, level: LogLevel, pretty: bool) -> Self {
        Self::with_writer(service, level, pretty, std::io::stderr)
    }

    pub fn with_writer<W>(service: &str, level: LogLevel, pretty: bool, writer: W) -> Self
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let builder = tracing_subscriber::fmt()
            .with_max_level(Level::from(level))
            .with_target(false)
            .with_writer(writer);

        let dispatch = if pretty {
            Dispatch::new(builder.compact().finish())
        } else {
            Dispatch::new(builder.json().finish())
        };

        let root = tracing::dispatcher::with_default(&dispatch, || {
            tracing::info_span!("offset_test", service, pid = std::process::id())
        });

        Self {
            dispatch,
            root,
            level,
        }
    }

    pub fn level(&self) -> LogLevel {
        self.level
    }

    /// Runs `fut` with this context as its subscriber, inside the root span.
    pub async fn scope<F: Future>(&self, fut: F) -> F::Output {
        fut.instrument(self.root.clone())
            .with_subscriber(self.dispatch.clone())
            .await
    }
}
