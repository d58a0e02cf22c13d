use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Mutex;

use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use once_cell::sync::Lazy;

use crate::common::constants::LOG_TARGET;
use crate::common::errors::WorkspaceError;

/// Handle of the installed log4rs logger, kept so the configuration can be swapped later.
pub static LOG4RS_HANDLE: Lazy<Mutex<Option<Handle>>> = Lazy::new(|| Mutex::new(None));

const LOG_PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l})} [{T}] {t} - {m}{n}";
const LOG_FILE_NAME: &str = "index_workspace.log";

/// Logging setup for the library.
///
/// - `log_directory`: where `index_workspace.log` is written when `log_in_file` is set.
/// - `log_level`: one of `error`, `warn`, `info`, `debug`, `trace`.
/// - `console_display`: also log to stdout.
/// - `only_record_workspace`: drop records whose target is not this library.
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    log_directory: String,
    log_level: String,
    log_in_file: bool,
    console_display: bool,
    only_record_workspace: bool,
}

impl LoggerConfig {
    pub fn new(
        log_directory: String,
        log_level: String,
        log_in_file: bool,
        console_display: bool,
        only_record_workspace: bool,
    ) -> Self {
        LoggerConfig { log_directory, log_level, log_in_file, console_display, only_record_workspace }
    }

    fn level_filter(&self) -> crate::Result<LevelFilter> {
        LevelFilter::from_str(&self.log_level).map_err(|_| {
            WorkspaceError::InvalidArgument(format!("unsupported log level: {}", self.log_level))
        })
    }

    /// Builds the log4rs configuration described by this object.
    pub fn build_logger_config(&self) -> crate::Result<Config> {
        let level = self.level_filter()?;
        let mut appenders: Vec<&str> = Vec::new();
        let mut builder = Config::builder();

        if self.console_display {
            let console = ConsoleAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build();
            builder = builder.appender(Appender::builder().build("console", Box::new(console)));
            appenders.push("console");
        }
        if self.log_in_file {
            let log_path = PathBuf::from(&self.log_directory).join(LOG_FILE_NAME);
            let file = FileAppender::builder()
                .encoder(Box::new(PatternEncoder::new(LOG_PATTERN)))
                .build(log_path)?;
            builder = builder.appender(Appender::builder().build("file", Box::new(file)));
            appenders.push("file");
        }

        let root_level = if self.only_record_workspace { LevelFilter::Off } else { level };
        builder = builder.logger(
            Logger::builder()
                .appenders(appenders.iter().copied())
                .additive(false)
                .build(LOG_TARGET, level),
        );
        builder
            .build(Root::builder().appenders(appenders).build(root_level))
            .map_err(|e| WorkspaceError::SystemError(format!("invalid log4rs config: {e}")))
    }
}

pub struct WorkspaceLogger;

impl WorkspaceLogger {
    /// Installs `config`, or replaces the configuration if a logger is already installed.
    pub fn update_log4rs_handler(
        handle: &Lazy<Mutex<Option<Handle>>>,
        config: Config,
    ) -> crate::Result<()> {
        let mut guard = handle
            .lock()
            .map_err(|e| WorkspaceError::SystemError(format!("log4rs handle poisoned: {e}")))?;
        match guard.as_ref() {
            Some(installed) => installed.set_config(config),
            None => {
                let installed = log4rs::init_config(config)
                    .map_err(|e| WorkspaceError::SystemError(format!("set logger failed: {e}")))?;
                *guard = Some(installed);
            }
        }
        Ok(())
    }
}

/// Initializes logging for the library, see [`LoggerConfig`].
pub fn initialize_logger(logger_config: &LoggerConfig) -> crate::Result<()> {
    let config = logger_config.build_logger_config()?;
    WorkspaceLogger::update_log4rs_handler(&LOG4RS_HANDLE, config)
}
