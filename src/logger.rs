// src/logger.rs — `log` facade backend writing through the UART console.

use log::{Level, LevelFilter, Log, Metadata, Record};

use crate::println;

struct KernelLogger;

static LOGGER: KernelLogger = KernelLogger;

impl Log for KernelLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let level = match record.level() {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
        };
        println!("[{}] {}", level, record.args());
    }

    fn flush(&self) {}
}

/// Install the kernel logger as the global `log` backend. Must run
/// before anything calls `log::info!`/`log::error!`; the UART must
/// already be initialized.
pub fn init() {
    log::set_logger(&LOGGER)
        .map(|()| log::set_max_level(LevelFilter::Trace))
        .expect("logger installed twice");
}
