use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const DEFAULT_MAX_RESULT_SIZE: usize = 4096;
/// Largest value a single result may be configured to, just under 1.5MiB.
pub const MAX_RESULT_SIZE_LIMIT: usize = 1_572_863;

const RESULTS_FROM_KEY: &str = "results-from";
const MAX_RESULT_SIZE_KEY: &str = "max-result-size";
const ENABLE_ARTIFACTS_KEY: &str = "enable-artifacts";

#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ResultExtractionMethod {
  #[default]
  TerminationMessage,
  SidecarLogs,
}

impl TryFrom<&str> for ResultExtractionMethod {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self> {
    match value.trim() {
      "termination-message" => Ok(ResultExtractionMethod::TerminationMessage),
      "sidecar-logs" => Ok(ResultExtractionMethod::SidecarLogs),
      other => Err(Error::config_error(format!(
        "{} must be one of termination-message or sidecar-logs, got {:?}",
        RESULTS_FROM_KEY, other
      ))),
    }
  }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "kebab-case", default)]
pub struct FeatureFlags {
  #[serde(rename = "results-from")]
  pub result_extraction_method: ResultExtractionMethod,
  pub max_result_size: usize,
  pub enable_artifacts: bool,
}

impl Default for FeatureFlags {
  fn default() -> Self {
    FeatureFlags {
      result_extraction_method: ResultExtractionMethod::default(),
      max_result_size: DEFAULT_MAX_RESULT_SIZE,
      enable_artifacts: false,
    }
  }
}

impl FeatureFlags {
  fn validate(&self) -> Result<()> {
    if self.max_result_size == 0 || self.max_result_size > MAX_RESULT_SIZE_LIMIT {
      return Err(Error::config_error(format!(
        "{} must be between 1 and {}, got {}",
        MAX_RESULT_SIZE_KEY, MAX_RESULT_SIZE_LIMIT, self.max_result_size
      )));
    }

    Ok(())
  }

  /// Reads flags from ConfigMap data, where every value is a string.
  /// Missing keys keep their defaults, unknown keys are ignored.
  pub fn from_config_map(data: &BTreeMap<String, String>) -> Result<Self> {
    let mut flags = FeatureFlags::default();

    if let Some(method) = data.get(RESULTS_FROM_KEY) {
      flags.result_extraction_method = ResultExtractionMethod::try_from(method.as_str())?;
    }

    if let Some(size) = data.get(MAX_RESULT_SIZE_KEY) {
      flags.max_result_size = size.trim().parse().map_err(|e| {
        Error::config_error(format!("{} {:?}: {}", MAX_RESULT_SIZE_KEY, size, e))
      })?;
    }

    if let Some(enabled) = data.get(ENABLE_ARTIFACTS_KEY) {
      flags.enable_artifacts = enabled.trim().eq_ignore_ascii_case("true");
    }

    flags.validate()?;

    log::debug!("Loaded feature flags {:?}", flags);

    Ok(flags)
  }
}

impl TryFrom<&str> for FeatureFlags {
  type Error = Error;

  fn try_from(value: &str) -> Result<Self> {
    let flags: FeatureFlags = serde_yaml::from_str(value)
      .map_err(|e| Error::config_error(format!("Failed to parse feature flags: {}", e)))?;

    flags.validate()?;

    Ok(flags)
  }
}

impl TryFrom<String> for FeatureFlags {
  type Error = Error;

  fn try_from(value: String) -> Result<Self> {
    Self::try_from(value.as_str())
  }
}
