//! Generic logger utility functions
//!
//! All executables log through the `log` facade. The logger set up here
//! writes records to stdout and to the session's log file, prefixed with the
//! number of seconds elapsed since the session epoch.
//!
//! The two outputs have their own levels. Control modules log every cycle at
//! `trace`, which is usually wanted in the log file for post-run analysis but
//! would flood the terminal.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use log::{self, info};
use fern;
use colored::{ColoredString, Colorize};
use thiserror::Error;

// Internal imports
use crate::session;

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Levels at which records are passed to each output of the logger.
#[derive(Debug, Clone)]
pub struct LogLevels {
    /// Most verbose level printed to stdout
    pub stdout: LevelFilter,

    /// Most verbose level written to the session log file
    pub file: LevelFilter,

    /// Caps for particular targets (module paths), applied to both outputs
    pub targets: Vec<(&'static str, LevelFilter)>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level less than `INFO`, found `{0}`")]
    InvalidMinLogLevel(log::LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
/// 
/// # Notes
/// 
/// - Both output levels must include `log::Level::Info`.
/// 
/// # Safety
/// 
/// - This function must only be called once to prevent corrupting logs.
pub fn logger_init(
    levels: LogLevels,
    session: &session::Session
) -> Result<(), LoggerInitError> {

    levels.validate()?;

    let log_file = fern::log_file(session.log_file_path.clone())
        .map_err(LoggerInitError::LogFileInitError)?;

    let mut dispatch = fern::Dispatch::new()
        .format(|out, message, record| {

            // If debug or trace include the target, otherwise don't include it
            if record.level() > log::Level::Info {
                out.finish(format_args!(
                    "[{:10.6} {}] {}: {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    record.target(),
                    message
                ))
            }
            else {
                out.finish(format_args!(
                    "[{:10.6} {}] {}",
                    session::get_elapsed_seconds(),
                    level_to_str(record.level()),
                    message
                ))
            }

        })
        .level(levels.max_level());

    for (target, level) in levels.targets.iter() {
        dispatch = dispatch.level_for(*target, *level);
    }

    dispatch
        .chain(
            fern::Dispatch::new()
                .level(levels.stdout)
                .chain(std::io::stdout())
        )
        .chain(
            fern::Dispatch::new()
                .level(levels.file)
                .chain(log_file)
        )
        .apply()
        .map_err(LoggerInitError::FernInitError)?;
    
    info!("Logging initialised");
    info!("    Session epoch: {}", session::get_epoch());
    info!("    Stdout log level: {:?}", levels.stdout);
    info!("    File log level: {:?}", levels.file);
    for (target, level) in levels.targets.iter() {
        info!("    {} capped at {:?}", target, level);
    }
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl LogLevels {
    /// Use the given levels for stdout and the log file, with no per-target
    /// caps.
    pub fn new(stdout: LevelFilter, file: LevelFilter) -> Self {
        Self {
            stdout,
            file,
            targets: Vec::new()
        }
    }

    /// Cap the level of records from `target` and its submodules.
    pub fn with_target(mut self, target: &'static str, level: LevelFilter) -> Self {
        self.targets.push((target, level));
        self
    }

    /// The most verbose level of either output.
    pub fn max_level(&self) -> LevelFilter {
        self.stdout.max(self.file)
    }

    fn validate(&self) -> Result<(), LoggerInitError> {
        for level in [self.stdout, self.file].iter() {
            if *level < log::Level::Info {
                return Err(LoggerInitError::InvalidMinLogLevel(*level))
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the string representation of a log level
fn level_to_str(level: log::Level) -> ColoredString {
    match level {
        log::Level::Trace => "TRC".dimmed().italic(),
        log::Level::Debug => "DBG".dimmed(),
        log::Level::Info  => "INF".normal(),
        log::Level::Warn  => "WRN".yellow(),
        log::Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_levels() {
        let levels = LogLevels::new(LevelFilter::Info, LevelFilter::Trace)
            .with_target("veh_lib::pid", LevelFilter::Debug);

        assert_eq!(levels.max_level(), LevelFilter::Trace);
        assert_eq!(levels.targets, vec![("veh_lib::pid", LevelFilter::Debug)]);
        assert!(levels.validate().is_ok());

        assert!(matches!(
            LogLevels::new(LevelFilter::Warn, LevelFilter::Trace).validate(),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
        assert!(matches!(
            LogLevels::new(LevelFilter::Info, LevelFilter::Off).validate(),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Off))
        ));
    }
}
