// Diagnostics go to stderr through the `log` facade, so that stdout only
// ever carries report lines. The level comes from RUST_LOG and is enforced
// by `log::set_max_level`.

use log::{LevelFilter, Log};

use regex_bench::error::Error;

#[derive(Debug)]
pub struct Logger(());

const LOGGER: &'static Logger = &Logger(());

impl Logger {
    /// Installs the stderr logger with the given maximum level.
    pub fn init(level: LevelFilter) -> Result<(), log::SetLoggerError> {
        log::set_logger(LOGGER)?;
        log::set_max_level(level);
        Ok(())
    }
}

impl Log for Logger {
    fn enabled(&self, _: &log::Metadata<'_>) -> bool {
        true
    }

    fn log(&self, record: &log::Record<'_>) {
        eprintln!(
            "[{:<5} {}] {}",
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// Parses a RUST_LOG value. An unset or empty value turns logging off.
/// Level names are case insensitive.
pub fn level(rust_log: Option<&str>) -> Result<LevelFilter, Error> {
    match rust_log.map(str::trim) {
        None | Some("") => Ok(LevelFilter::Off),
        Some(name) => name.parse().map_err(|_| {
            Error::usage(format!("unrecognized log level '{name}'"))
        }),
    }
}
