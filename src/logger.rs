use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Log level enum for type-safe logging
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug = 0,
    #[default]
    Info = 1,
    Warn = 2,
    Error = 3,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "debug" => Some(LogLevel::Debug),
            "info" => Some(LogLevel::Info),
            "warn" => Some(LogLevel::Warn),
            "error" => Some(LogLevel::Error),
            _ => None,
        }
    }
}

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level`. Output goes to stderr because
/// stdout carries pipeline data. Calling this twice is harmless.
pub fn init_logging(level: LogLevel) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_level(true)
        .try_init();
}

// Macro for easy logging
#[macro_export]
macro_rules! app_log {
    ($level:expr, $source:expr, $($arg:tt)*) => {
        {
            let source: &str = $source;
            let message = format!($($arg)*);
            match $level {
                $crate::logger::LogLevel::Error => ::tracing::error!(source = source, "{}", message),
                $crate::logger::LogLevel::Warn => ::tracing::warn!(source = source, "{}", message),
                $crate::logger::LogLevel::Info => ::tracing::info!(source = source, "{}", message),
                $crate::logger::LogLevel::Debug => ::tracing::debug!(source = source, "{}", message),
            }
        }
    };
}
