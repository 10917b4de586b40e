use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// Kind of a [`RunResult`]. Encoded on the wire as a small integer, but
/// producers may also send the string alias.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ResultType {
  #[default]
  Unspecified,
  TaskRun,
  Internal,
  Step,
  StepArtifacts,
  TaskRunArtifacts,
  Unknown(i64),
}

impl ResultType {
  pub fn code(&self) -> i64 {
    match self {
      ResultType::Unspecified => 0,
      ResultType::TaskRun => 1,
      ResultType::Internal => 3,
      ResultType::Step => 4,
      ResultType::StepArtifacts => 5,
      ResultType::TaskRunArtifacts => 6,
      ResultType::Unknown(code) => *code,
    }
  }

  pub fn from_code(code: i64) -> Self {
    match code {
      0 => ResultType::Unspecified,
      1 => ResultType::TaskRun,
      3 => ResultType::Internal,
      4 => ResultType::Step,
      5 => ResultType::StepArtifacts,
      6 => ResultType::TaskRunArtifacts,
      code => ResultType::Unknown(code),
    }
  }

  /// Legacy producers name the kind instead of sending its code.
  pub fn from_alias(alias: &str) -> Self {
    match alias {
      "TaskRunResult" => ResultType::TaskRun,
      "InternalTektonResult" => ResultType::Internal,
      "StepResult" => ResultType::Step,
      "StepArtifactsResult" => ResultType::StepArtifacts,
      "TaskRunArtifactsResult" => ResultType::TaskRunArtifacts,
      _ => ResultType::Unspecified,
    }
  }

  pub fn is_unspecified(&self) -> bool {
    self.code() == 0
  }
}

impl Serialize for ResultType {
  fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(self.code())
  }
}

struct ResultTypeVisitor;

impl<'de> Visitor<'de> for ResultTypeVisitor {
  type Value = ResultType;

  fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
    formatter.write_str("an integer result type code or its string alias")
  }

  fn visit_i64<E: de::Error>(self, value: i64) -> Result<ResultType, E> {
    Ok(ResultType::from_code(value))
  }

  fn visit_u64<E: de::Error>(self, value: u64) -> Result<ResultType, E> {
    i64::try_from(value)
      .map(ResultType::from_code)
      .map_err(|_| E::custom(format!("result type {} out of range", value)))
  }

  fn visit_str<E: de::Error>(self, value: &str) -> Result<ResultType, E> {
    Ok(ResultType::from_alias(value))
  }

  fn visit_unit<E: de::Error>(self) -> Result<ResultType, E> {
    Ok(ResultType::Unspecified)
  }

  fn visit_none<E: de::Error>(self) -> Result<ResultType, E> {
    Ok(ResultType::Unspecified)
  }
}

impl<'de> Deserialize<'de> for ResultType {
  fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
    deserializer.deserialize_any(ResultTypeVisitor)
  }
}

/// One key/value record carried out of a step, either in its termination
/// message or on the results sidecar's log.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(default)]
pub struct RunResult {
  pub key: String,
  pub value: String,
  #[serde(rename = "resourceName", skip_serializing_if = "String::is_empty")]
  pub resource_name: String,
  #[serde(rename = "type", skip_serializing_if = "ResultType::is_unspecified")]
  pub result_type: ResultType,
}

impl RunResult {
  pub fn new<K: ToString, V: ToString>(key: K, value: V, result_type: ResultType) -> Self {
    RunResult {
      key: key.to_string(),
      value: value.to_string(),
      resource_name: String::new(),
      result_type,
    }
  }

  pub fn is_empty(&self) -> bool {
    *self == RunResult::default()
  }

  pub fn is_internal(&self) -> bool {
    self.result_type == ResultType::Internal
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn decodes_codes_and_aliases() {
    let records: Vec<RunResult> = serde_json::from_str(
      r#"[
        {"key":"a","value":"1","type":1},
        {"key":"b","value":"2","type":"InternalTektonResult"},
        {"key":"c","value":"3","type":"StepResult"},
        {"key":"d","value":"4","type":5},
        {"key":"e","value":"5"},
        {"key":"f","value":"6","type":42}
      ]"#,
    )
    .unwrap();

    let kinds: Vec<ResultType> = records.iter().map(|r| r.result_type).collect();
    assert_eq!(
      kinds,
      vec![
        ResultType::TaskRun,
        ResultType::Internal,
        ResultType::Step,
        ResultType::StepArtifacts,
        ResultType::Unspecified,
        ResultType::Unknown(42),
      ]
    );
  }

  #[test]
  fn serializes_in_wire_order() {
    let mut record = RunResult::new("digest", "sha256:1234", ResultType::Unspecified);
    record.resource_name = "source-image".to_string();

    assert_eq!(
      serde_json::to_string(&record).unwrap(),
      r#"{"key":"digest","value":"sha256:1234","resourceName":"source-image"}"#
    );
    assert_eq!(
      serde_json::to_string(&RunResult::new("r", "v", ResultType::TaskRun)).unwrap(),
      r#"{"key":"r","value":"v","type":1}"#
    );
  }

  #[test]
  fn unknown_fields_leave_an_empty_record() {
    let records: Vec<RunResult> =
      serde_json::from_str(r#"[{"invalid":"resultName","invalid":"resultValue"}]"#).unwrap();

    assert_eq!(records.len(), 1);
    assert!(records[0].is_empty());
  }
}
