use super::StatusAssembler;
use crate::result_source::{self, ResultSource};
use crate::sidecar_logs::PodLogReader;
use crate::{FeatureFlags, Result};
use std::sync::Arc;

pub struct StatusAssemblerBuilder {
  flags: Option<FeatureFlags>,
  log_reader: Option<Arc<dyn PodLogReader>>,
  source: Option<Box<dyn ResultSource>>,
}

impl StatusAssemblerBuilder {
  pub fn new() -> Self {
    StatusAssemblerBuilder {
      flags: None,
      log_reader: None,
      source: None,
    }
  }

  pub fn flags(mut self, flags: FeatureFlags) -> Self {
    self.flags = Some(flags);
    self
  }

  /// Reader for the results sidecar log, required for sidecar-logs result
  /// extraction.
  pub fn log_reader<T>(mut self, reader: T) -> Self
  where
    T: PodLogReader + 'static,
  {
    self.log_reader = Some(Arc::new(reader));
    self
  }

  /// Replaces the result source the flags would pick.
  pub fn result_source<T>(mut self, source: T) -> Self
  where
    T: ResultSource + 'static,
  {
    self.source = Some(Box::new(source));
    self
  }

  pub fn build(self) -> Result<StatusAssembler> {
    let flags = self.flags.unwrap_or_default();

    let source = match self.source {
      Some(source) => source,
      None => result_source::source_for(&flags, self.log_reader)?,
    };

    Ok(StatusAssembler { flags, source })
  }
}

impl Default for StatusAssemblerBuilder {
  fn default() -> Self {
    Self::new()
  }
}
