//! Stderr backend for the `log` facade used by the binaries.
//!
//! Lines look like `INFO  optim: iteration 003 - norm ...`: the level padded
//! to five columns, then the emitting crate with its `mvcalib_` prefix
//! stripped. Libraries never install a logger themselves.

use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

use log::{Level, LevelFilter, Log, Metadata, Record};

static INSTALLED: AtomicBool = AtomicBool::new(false);

struct CalibLogger {
    filter: LevelFilter,
}

fn source_label(target: &str) -> &str {
    let krate = target.split("::").next().unwrap_or(target);
    krate.strip_prefix("mvcalib_").unwrap_or(krate)
}

fn format_line(level: Level, target: &str, message: &fmt::Arguments<'_>) -> String {
    format!("{:<5} {}: {}", level, source_label(target), message)
}

impl Log for CalibLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let line = format_line(record.level(), record.target(), record.args());
            let _ = writeln!(std::io::stderr().lock(), "{line}");
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

/// Route `log` records at or above `level` to stderr.
///
/// Only the first call installs the logger; later calls return `Ok(())`
/// and keep the original filter.
pub fn init_with_level(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    if INSTALLED.swap(true, Ordering::SeqCst) {
        return Ok(());
    }
    log::set_boxed_logger(Box::new(CalibLogger { filter: level }))?;
    log::set_max_level(level);
    Ok(())
}
