use colored::Colorize;
use log::{Level, LevelFilter};
use std::sync::OnceLock;

#[derive(Clone)]
pub struct Logger {
  level: LevelFilter,
}

impl Logger {
  pub fn new(level: Level) -> Self {
    Logger {
      level: level.to_level_filter(),
    }
  }
}

impl log::Log for Logger {
  fn enabled(&self, metadata: &log::Metadata) -> bool {
    metadata.level() <= self.level
  }

  fn log(&self, record: &log::Record) {
    if !self.enabled(record.metadata()) {
      return;
    }

    let time = chrono::Local::now()
      .format("%Y-%m-%d %H:%M:%S%.3f")
      .to_string()
      .magenta();

    let level = match record.level() {
      Level::Error => "ERROR".red(),
      Level::Warn => "WARN".yellow(),
      Level::Info => "INFO".green(),
      Level::Debug => "DEBUG".blue(),
      Level::Trace => "TRACE".dimmed(),
    };

    let location = match (record.file(), record.line()) {
      (Some(file), Some(line)) => format!("{}:{} ", file, line).cyan(),
      _ => String::new().normal(),
    };

    // Reconcile loops interleave many TaskRuns, the target tells them apart
    let target = format!("[{}]", record.target()).bold();

    eprintln!("{}{} {} {} {}", location, time, level, target, record.args());
  }

  fn flush(&self) {}
}

static LOGGER: OnceLock<Logger> = OnceLock::new();

pub fn init_logger() {
  init_logger_with_level(Level::Debug);
}

/// Installs the colored logger once per process. Later calls are no-ops,
/// whatever level they ask for.
pub fn init_logger_with_level(level: Level) {
  if LOGGER.get().is_some() {
    return;
  }

  let logger = LOGGER.get_or_init(|| Logger::new(level));

  if log::set_logger(logger).is_ok() {
    log::set_max_level(logger.level);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use log::Log;

  #[test]
  fn filters_by_level() {
    let logger = Logger::new(Level::Info);
    let debug = log::Metadata::builder().level(Level::Debug).build();
    let warn = log::Metadata::builder().level(Level::Warn).build();

    assert!(!logger.enabled(&debug));
    assert!(logger.enabled(&warn));
  }

  #[test]
  fn init_is_idempotent() {
    init_logger_with_level(Level::Trace);
    init_logger();

    assert_eq!(log::max_level(), LevelFilter::Trace);
  }
}
