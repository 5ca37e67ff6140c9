//! A minimal `log::Log` implementation that writes records to stderr.

use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

pub struct StderrLogger;

static LOGGER: StderrLogger = StderrLogger;

/// Install [`StderrLogger`] as the global `log` facade backend and raise the
/// max level to `max_level`. Call once at the start of `main`.
pub fn init(max_level: LevelFilter) -> Result<(), SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(max_level);
    Ok(())
}

impl Log for StderrLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
    }

    fn flush(&self) {}
}
