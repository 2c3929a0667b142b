//! Log subscriber setup for programs built on pcanport.
//!
//! The library crates only emit `tracing` events; installing a subscriber is
//! left to the application. Output goes to stderr as text or JSON.
//!
//! Without `RUST_LOG` the chosen level applies to the pcanport crates while
//! every other target is held at warnings. `RUST_LOG` replaces that default.

use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

/// Target prefix shared by every pcanport crate (`pcanport_native`,
/// `pcanport_port`, ...).
const CRATE_TARGET: &str = "pcanport";

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Filter directives used when `RUST_LOG` is unset.
pub fn default_directives(level: LogLevel) -> String {
    let others = if level == LogLevel::Error {
        LogLevel::Error
    } else {
        LogLevel::Warn
    };
    format!(
        "{},{CRATE_TARGET}={}",
        others.directive(),
        level.directive()
    )
}

fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install a global subscriber. Does nothing if one is already installed.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let builder = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(env_filter(level))
        .with_ansi(false)
        .with_target(true);

    match format {
        LogFormat::Text => {
            let _ = builder.try_init();
        }
        LogFormat::Json => {
            let _ = builder.json().try_init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_map_to_filters() {
        assert_eq!(LogLevel::Warn.as_filter(), LevelFilter::WARN);
        assert_eq!(LogLevel::Trace.as_filter(), LevelFilter::TRACE);
    }

    #[test]
    fn default_directives_scope_level_to_pcanport() {
        assert_eq!(default_directives(LogLevel::Debug), "warn,pcanport=debug");
        assert_eq!(default_directives(LogLevel::Info), "warn,pcanport=info");
        assert_eq!(default_directives(LogLevel::Error), "error,pcanport=error");
    }

    #[test]
    fn default_directives_parse() {
        for level in LogLevel::value_variants() {
            let directives = default_directives(*level);
            assert!(
                EnvFilter::try_new(&directives).is_ok(),
                "{directives} should parse"
            );
        }
    }

    #[test]
    fn parses_from_cli_names() {
        assert_eq!(LogFormat::from_str("json", true), Ok(LogFormat::Json));
        assert_eq!(LogLevel::from_str("debug", true), Ok(LogLevel::Debug));
        assert!(LogLevel::from_str("loud", true).is_err());
    }

    #[test]
    fn init_twice_is_harmless() {
        init_logging(LogFormat::Text, LogLevel::Error);
        init_logging(LogFormat::Json, LogLevel::Error);
    }
}
