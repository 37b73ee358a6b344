use std::path::PathBuf;

use chrono::{Datelike, Timelike};
// Re-export logging functions for convenience.
pub use log::*;
use log4rs::{
    append::{console::ConsoleAppender, file::FileAppender},
    config::{Appender, Root},
    encode::pattern::PatternEncoder,
    Config,
};
use thiserror::Error;

const PATTERN: &str = "{d} {l} {t} - {m}{n}";

/// Where and how much to log.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Removes all logs below this level.
    pub filter: LevelFilter,
    /// Folder to write a timestamped log file into. Console only when `None`.
    pub log_dir: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("unable to create log file: {0}")]
    File(#[from] std::io::Error),
    #[error("invalid logging configuration: {0}")]
    Config(#[from] log4rs::config::runtime::ConfigErrors),
    #[error("a logger has already been installed")]
    AlreadyInitialized(#[from] SetLoggerError),
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: LevelFilter::Info,
            log_dir: None,
        }
    }
}

impl LogConfig {
    pub fn new(filter: LevelFilter) -> Self {
        Self {
            filter,
            log_dir: None,
        }
    }

    pub fn with_log_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.log_dir = Some(dir.into());
        self
    }

    /// Path of the log file for a session starting now. Name of the file is based on the
    /// current time.
    pub fn log_file_path(&self) -> Option<PathBuf> {
        let now = chrono::Utc::now();
        self.log_dir.as_ref().map(|dir| {
            dir.join(format!(
                "{} {} {} {} {} {}.txt",
                now.year(),
                now.month(),
                now.day(),
                now.hour(),
                now.minute(),
                now.second()
            ))
        })
    }
}

/// Initializes logging. Should be called before any other logging functions.
pub fn init(config: LogConfig) -> Result<(), LogInitError> {
    // Output to console
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let mut builder =
        Config::builder().appender(Appender::builder().build("stdout", Box::new(stdout)));
    let mut root = Root::builder().appender("stdout");

    // Output to log file
    if let Some(path) = config.log_file_path() {
        let log_file = FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build(path)?;
        builder = builder.appender(Appender::builder().build("log_file", Box::new(log_file)));
        root = root.appender("log_file");
    }

    let log_config = builder.build(root.build(config.filter))?;
    log4rs::init_config(log_config)?;

    log_panics::init();

    Ok(())
}
