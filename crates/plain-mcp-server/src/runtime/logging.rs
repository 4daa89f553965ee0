//! Logging config and utilities
//!
//! This module is only used by the main binary and provides logging config structures and setup
//! helper functions. Logs never go to stdout, which carries the MCP protocol in stdio mode.

mod log_rotation_kind;
mod parsers;

use std::path::PathBuf;

use log_rotation_kind::LogRotationKind;
use schemars::JsonSchema;
use serde::Deserialize;
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Prefix of rotated log files
const LOG_FILE_PREFIX: &str = "plain_mcp_server";

/// Logging related options
#[derive(Debug, Deserialize, JsonSchema)]
pub struct Logging {
    /// The log level to use for tracing
    #[serde(
        default = "default_level",
        deserialize_with = "parsers::level"
    )]
    #[schemars(schema_with = "level")]
    pub level: Level,

    /// A directory to write log files to instead of stderr
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Log file rotation period to use when log file path provided
    /// [default: hourly]
    #[serde(default)]
    pub rotation: LogRotationKind,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_level(),
            path: None,
            rotation: LogRotationKind::default(),
        }
    }
}

impl Logging {
    /// Filter honouring `RUST_LOG`, with the MCP protocol chatter quietened at the default level
    pub fn env_filter(&self) -> Result<EnvFilter, anyhow::Error> {
        let mut env_filter = EnvFilter::from_default_env().add_directive(self.level.into());

        if self.level == Level::INFO {
            env_filter = env_filter.add_directive("rmcp=warn".parse()?);
        }
        Ok(env_filter)
    }

    /// Install the global subscriber
    ///
    /// The returned guard flushes buffered file output and must be held until shutdown.
    pub fn setup(&self) -> Result<Option<WorkerGuard>, anyhow::Error> {
        let (writer, guard, with_ansi) = self.writer();

        tracing_subscriber::registry()
            .with(self.env_filter()?)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(with_ansi)
                    .with_target(false),
            )
            .init();

        Ok(guard)
    }

    /// Rolling file output when a path is configured, falling back to stderr on failure
    fn writer(&self) -> (BoxMakeWriter, Option<WorkerGuard>, bool) {
        macro_rules! log_error {
            () => {
                |e| eprintln!("Failed to setup logging: {e:?}")
            };
        }

        match self.path.clone() {
            Some(path) => std::fs::create_dir_all(&path)
                .map(|_| path)
                .inspect_err(log_error!())
                .ok()
                .and_then(|path| {
                    RollingFileAppender::builder()
                        .rotation(self.rotation.clone().into())
                        .filename_prefix(LOG_FILE_PREFIX)
                        .filename_suffix("log")
                        .build(path)
                        .inspect_err(log_error!())
                        .ok()
                })
                .map(|appender| {
                    let (non_blocking_appender, guard) = tracing_appender::non_blocking(appender);
                    (
                        BoxMakeWriter::new(non_blocking_appender),
                        Some(guard),
                        false,
                    )
                })
                .unwrap_or_else(|| {
                    eprintln!("Log file setup failed - falling back to stderr");
                    (BoxMakeWriter::new(std::io::stderr), None, true)
                }),
            None => (BoxMakeWriter::new(std::io::stderr), None, true),
        }
    }
}

const fn default_level() -> Level {
    Level::INFO
}

fn level(generator: &mut schemars::SchemaGenerator) -> schemars::Schema {
    /// Log level
    #[derive(JsonSchema)]
    #[schemars(rename_all = "lowercase")]
    // This is just an intermediate type to auto create schema information for,
    // so it is OK if it is never used
    #[allow(dead_code)]
    enum Level {
        Trace,
        Debug,
        Info,
        Warn,
        Error,
    }

    Level::json_schema(generator)
}
