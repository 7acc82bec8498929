//! Logging configuration.

use serde::{Deserialize, Serialize};

/// Log level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
#[derive(Default)]
pub enum LogLevel {
    Debug,
    #[default]
    Info,
    Warning,
    Error,
}

impl LogLevel {
    /// The matching `tracing` filter directive.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warning => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct LoggingConfig {
    pub level: LogLevel,
}

impl LoggingConfig {
    /// Default `EnvFilter` string when `RUST_LOG` is not set.
    pub fn filter(&self) -> String {
        let level = self.level.as_directive();
        format!(
            "tandem_relay={level},tandem_store={level},tandem_config={level},tandem_client={level}"
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_parses_uppercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            level: LogLevel,
        }
        let w: Wrapper = toml::from_str("level = \"WARNING\"").unwrap();
        assert_eq!(w.level, LogLevel::Warning);
    }

    #[test]
    fn filter_scopes_to_tandem_crates() {
        let logging = LoggingConfig {
            level: LogLevel::Debug,
        };
        let filter = logging.filter();
        assert!(filter.contains("tandem_relay=debug"));
        assert!(filter.contains("tandem_store=debug"));
    }
}
