// src/utils/logger.rs

use log::{Level, LevelFilter, Metadata, Record, SetLoggerError};
use std::io::Write;
use std::sync::OnceLock;

static MAX_LEVEL: OnceLock<LevelFilter> = OnceLock::new();
static LOGGER: ConsoleLogger = ConsoleLogger;

struct ConsoleLogger;

/// Level from `CVIEW_LOG` (error, warn, info, debug, trace), else `fallback`.
pub fn level_from_env(fallback: LevelFilter) -> LevelFilter {
  std::env::var("CVIEW_LOG")
    .ok()
    .and_then(|v| v.parse().ok())
    .unwrap_or(fallback)
}

pub fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
  let _ = MAX_LEVEL.set(level);
  log::set_logger(&LOGGER).map(|()| log::set_max_level(level))
}

impl log::Log for ConsoleLogger {
  fn enabled(&self, metadata: &Metadata) -> bool {
    metadata.level() <= *MAX_LEVEL.get().unwrap_or(&LevelFilter::Info)
  }

  fn log(&self, record: &Record) {
    if self.enabled(record.metadata()) {
      let icon = match record.level() {
        Level::Error => "🔴",
        Level::Warn => "🟠",
        Level::Info => "🔵",
        Level::Debug => "⚪",
        Level::Trace => "▫️",
      };

      // Format: "🔴  structure viewer: Failed to fetch ..."
      let mut err = std::io::stderr().lock();
      let _ = writeln!(err, "{}  {}", icon, record.args());
    }
  }

  fn flush(&self) {
    let _ = std::io::stderr().flush();
  }
}
