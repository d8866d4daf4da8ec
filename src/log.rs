//! Logging for the program, built on `fern`.
//!
//! Messages go to the console (warnings and errors on stderr, everything else on stdout) and,
//! when running a model, to a pair of log files in the output folder. Console output is
//! colourised when it is a terminal.
use anyhow::{Context, Result, bail, ensure};
use chrono::Local;
use fern::colors::{Color, ColoredLevelConfig};
use fern::{Dispatch, FormatCallback};
use log::{LevelFilter, Record};
use std::env;
use std::fmt::{Arguments, Display};
use std::fs::{File, OpenOptions};
use std::io::IsTerminal;
use std::path::Path;
use std::sync::OnceLock;

/// Set once the logger has been installed
static LOGGER_INIT: OnceLock<()> = OnceLock::new();

/// The log level used when neither the environment nor the settings file gives one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Environment variable which takes precedence over the settings file
const LOG_LEVEL_ENV_VAR: &str = "CITYSIM_LOG_LEVEL";

/// Log file for messages below warning level
const LOG_INFO_FILE_NAME: &str = "citysim_info.log";

/// Log file for warnings and errors
const LOG_ERROR_FILE_NAME: &str = "citysim_error.log";

/// Whether the program logger has been initialised
pub fn is_logger_initialised() -> bool {
    LOGGER_INIT.get().is_some()
}

/// Initialise the program logger.
///
/// The level is taken from the `CITYSIM_LOG_LEVEL` environment variable if set, otherwise from
/// `log_level_from_settings`, otherwise [`DEFAULT_LOG_LEVEL`]. Valid levels are `off`, `error`,
/// `warn`, `info`, `debug` and `trace` (case-insensitive).
///
/// # Arguments
///
/// * `log_level_from_settings`: The log level specified in `settings.toml`
/// * `log_file_path`: Folder in which to create log files, if any
pub fn init(log_level_from_settings: Option<&str>, log_file_path: Option<&Path>) -> Result<()> {
    ensure!(!is_logger_initialised(), "Logger already initialised");

    let env_level = env::var(LOG_LEVEL_ENV_VAR).ok();
    let log_level = resolve_log_level(env_level.as_deref(), log_level_from_settings)?;

    let mut dispatch = Dispatch::new().chain(console_dispatch(log_level));
    if let Some(dir) = log_file_path {
        dispatch = dispatch.chain(file_dispatch(dir, log_level)?);
    }

    dispatch.apply().context("Logger already initialised")?;
    let _ = LOGGER_INIT.set(());

    Ok(())
}

/// Pick the log level from the environment, the settings file or the default, in that order
fn resolve_log_level(from_env: Option<&str>, from_settings: Option<&str>) -> Result<LevelFilter> {
    parse_log_level(from_env.or(from_settings).unwrap_or(DEFAULT_LOG_LEVEL))
}

/// Convert a log level string to a [`LevelFilter`]
fn parse_log_level(log_level: &str) -> Result<LevelFilter> {
    let level = match log_level.to_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "warn" => LevelFilter::Warn,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        unknown => bail!("Unknown log level: {unknown}"),
    };

    Ok(level)
}

/// Console output: warnings and errors on stderr, other messages on stdout
fn console_dispatch(log_level: LevelFilter) -> Dispatch {
    let colours = ColoredLevelConfig::new()
        .error(Color::Red)
        .warn(Color::Yellow)
        .info(Color::Green)
        .debug(Color::Blue)
        .trace(Color::Magenta);
    let stdout_colours = std::io::stdout().is_terminal().then_some(colours);
    let stderr_colours = std::io::stderr().is_terminal().then_some(colours);

    Dispatch::new()
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .format(move |out, message, record| {
                    format_record(out, message, record, stdout_colours.as_ref());
                })
                .level(log_level)
                .chain(std::io::stdout()),
        )
        .chain(
            Dispatch::new()
                .format(move |out, message, record| {
                    format_record(out, message, record, stderr_colours.as_ref());
                })
                .level(log_level.min(LevelFilter::Warn))
                .chain(std::io::stderr()),
        )
}

/// Log file output in `dir`.
///
/// The info file records at least info-level messages whatever the console level, so that a run
/// always leaves a record of what happened.
fn file_dispatch(dir: &Path, log_level: LevelFilter) -> Result<Dispatch> {
    let info_file = create_log_file(dir, LOG_INFO_FILE_NAME)?;
    let error_file = create_log_file(dir, LOG_ERROR_FILE_NAME)?;

    Ok(Dispatch::new()
        .format(|out, message, record| format_record(out, message, record, None))
        .chain(
            Dispatch::new()
                .filter(|metadata| metadata.level() > LevelFilter::Warn)
                .level(log_level.max(LevelFilter::Info))
                .chain(info_file),
        )
        .chain(Dispatch::new().level(LevelFilter::Warn).chain(error_file)))
}

/// Create (or truncate) a log file
fn create_log_file(dir: &Path, file_name: &str) -> Result<File> {
    let path = dir.join(file_name);
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&path)
        .with_context(|| format!("Could not create log file {}", path.display()))
}

/// Format a log record as `[time level target] message`, colouring the level if requested
fn format_record(
    out: FormatCallback,
    message: &Arguments,
    record: &Record,
    colours: Option<&ColoredLevelConfig>,
) {
    match colours {
        Some(colours) => write_line(out, colours.color(record.level()), record.target(), message),
        None => write_line(out, record.level(), record.target(), message),
    }
}

fn write_line<T: Display>(out: FormatCallback, level: T, target: &str, message: &Arguments) {
    let timestamp = Local::now().format("%H:%M:%S");
    out.finish(format_args!("[{timestamp} {level} {target}] {message}"));
}
