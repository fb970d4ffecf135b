use log::LevelFilter;
use log4rs::Handle;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::append::rolling_file::RollingFileAppender;
use log4rs::append::rolling_file::policy::compound::{
    CompoundPolicy, roll::fixed_window::FixedWindowRoller, trigger::size::SizeTrigger,
};
use log4rs::config::{Appender, Config, Logger, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::path::Path;
use std::sync::OnceLock;

use crate::errors::QueryError;

/// Log target for mutating operations (update, delete, index creation).
pub const AUDIT_TARGET: &str = "bookstore::audit";

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} [{l}] {t} - {m}{n}";
const ROLL_SIZE: u64 = 10 * 1024 * 1024;
const RETENTION: u32 = 7;

static HANDLE: OnceLock<Handle> = OnceLock::new();

#[must_use]
pub fn parse_level(level: &str) -> LevelFilter {
    match level.to_ascii_lowercase().as_str() {
        "off" => LevelFilter::Off,
        "error" => LevelFilter::Error,
        "info" => LevelFilter::Info,
        "debug" => LevelFilter::Debug,
        "trace" => LevelFilter::Trace,
        _ => LevelFilter::Warn,
    }
}

fn rolling(dir: &Path, stem: &str) -> Result<RollingFileAppender, QueryError> {
    let roller = FixedWindowRoller::builder()
        .build(&format!("{}", dir.join(format!("{stem}.{{}}.log")).display()), RETENTION)
        .map_err(|e| QueryError::Logging(e.to_string()))?;
    let policy = CompoundPolicy::new(Box::new(SizeTrigger::new(ROLL_SIZE)), Box::new(roller));
    RollingFileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(dir.join(format!("{stem}.log")), Box::new(policy))
        .map_err(|e| QueryError::Logging(e.to_string()))
}

/// Builds the logging config: stderr always, plus `bookstore.log` and
/// `audit.log` rolling files under `dir` when given. Stdout carries results only.
///
/// # Errors
/// Returns an error if the log directory or an appender cannot be created.
pub fn build_config(dir: Option<&Path>, level: &str) -> Result<Config, QueryError> {
    let lvl = parse_level(level);
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("[{l}] {m}{n}")))
        .build();
    let mut builder =
        Config::builder().appender(Appender::builder().build("stderr", Box::new(stderr)));
    let mut root = Root::builder().appender("stderr");

    if let Some(dir) = dir {
        std::fs::create_dir_all(dir)?;
        builder = builder
            .appender(Appender::builder().build("app", Box::new(rolling(dir, "bookstore")?)))
            .appender(Appender::builder().build("audit", Box::new(rolling(dir, "audit")?)))
            .logger(
                Logger::builder()
                    .appender("audit")
                    .appender("stderr")
                    .additive(false)
                    .build(AUDIT_TARGET, lvl.max(LevelFilter::Info)),
            );
        root = root.appender("app");
    }

    builder.build(root.build(lvl)).map_err(|e| QueryError::Logging(e.to_string()))
}

/// Installs the logging config. Calling again replaces the active config.
///
/// # Errors
/// Returns an error if the config cannot be built or the logger cannot be installed.
pub fn configure_logging(dir: Option<&Path>, level: &str) -> Result<(), QueryError> {
    let config = build_config(dir, level)?;
    if let Some(handle) = HANDLE.get() {
        handle.set_config(config);
        return Ok(());
    }
    let handle = log4rs::init_config(config).map_err(|e| QueryError::Logging(e.to_string()))?;
    let _ = HANDLE.set(handle);
    Ok(())
}

/// Initializes logging from a log4rs YAML file instead of the built-in layout.
///
/// # Errors
/// Returns an error if the file cannot be loaded.
pub fn init_path(path: &Path) -> Result<(), QueryError> {
    log4rs::init_file(path, log4rs::config::Deserializers::default())
        .map_err(|e| QueryError::Logging(format!("{}: {e}", path.display())))
}
