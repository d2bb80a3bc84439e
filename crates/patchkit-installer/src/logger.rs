#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Sink for engine progress and non-fatal problems.
///
/// The engine never writes to a concrete output itself; callers inject the
/// sink when building a [`crate::PatchApplier`].
pub trait PatchLogger {
    fn log(&self, level: LogLevel, message: &str);

    fn debug(&self, message: &str) {
        self.log(LogLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(LogLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(LogLevel::Error, message);
    }
}

impl<L: PatchLogger + ?Sized> PatchLogger for &L {
    fn log(&self, level: LogLevel, message: &str) {
        (**self).log(level, message);
    }
}

/// Forwards engine messages to the `tracing` facade under the `patchkit` target.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl PatchLogger for TracingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Debug => tracing::debug!(target: "patchkit", "{message}"),
            LogLevel::Info => tracing::info!(target: "patchkit", "{message}"),
            LogLevel::Warn => tracing::warn!(target: "patchkit", "{message}"),
            LogLevel::Error => tracing::error!(target: "patchkit", "{message}"),
        }
    }
}
