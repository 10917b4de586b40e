use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ResultsType {
  #[default]
  String,
  Array,
  Object,
}

/// A result value decoded according to its declared type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum ResultValue {
  String(String),
  Array(Vec<String>),
  Object(BTreeMap<String, String>),
}

impl ResultValue {
  /// Decodes a raw result payload. Strings are taken verbatim, arrays and
  /// objects must be JSON of strings.
  pub fn decode(name: &str, raw: &str, results_type: ResultsType) -> Result<Self> {
    match results_type {
      ResultsType::String => Ok(ResultValue::String(raw.to_string())),
      ResultsType::Array => serde_json::from_str::<Vec<String>>(raw)
        .map(ResultValue::Array)
        .map_err(|err| Error::invalid_result_value(name, err)),
      ResultsType::Object => serde_json::from_str::<BTreeMap<String, String>>(raw)
        .map(ResultValue::Object)
        .map_err(|err| Error::invalid_result_value(name, err)),
    }
  }

  pub fn results_type(&self) -> ResultsType {
    match self {
      ResultValue::String(_) => ResultsType::String,
      ResultValue::Array(_) => ResultsType::Array,
      ResultValue::Object(_) => ResultsType::Object,
    }
  }
}

impl From<&str> for ResultValue {
  fn from(value: &str) -> Self {
    ResultValue::String(value.to_string())
  }
}

impl From<Vec<&str>> for ResultValue {
  fn from(values: Vec<&str>) -> Self {
    ResultValue::Array(values.into_iter().map(|v| v.to_string()).collect())
  }
}
