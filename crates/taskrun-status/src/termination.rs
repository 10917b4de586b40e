//! Decoding of the run-result records a step writes into its termination
//! message.

use crate::{Error, Result, ResultType, RunResult, Time};
use std::collections::BTreeMap;

/// Internal record carrying the exit code a step reported before its
/// failure was tolerated.
pub const EXIT_CODE_KEY: &str = "ExitCode";
/// Internal record carrying the RFC 3339 time the step started its work.
pub const STARTED_AT_KEY: &str = "StartedAt";
/// Internal record overriding the step's termination reason.
pub const REASON_KEY: &str = "Reason";

pub const TERMINATION_REASON_COMPLETED: &str = "Completed";
pub const TERMINATION_REASON_ERROR: &str = "Error";
pub const TERMINATION_REASON_CONTINUED: &str = "Continued";
pub const TERMINATION_REASON_SKIPPED: &str = "Skipped";
pub const TERMINATION_REASON_TIMEOUT_EXCEEDED: &str = "TimeoutExceeded";

/// Decodes a termination message into run-result records, keeping their
/// order. An empty message has no records; empty records are dropped.
pub fn parse_message(message: &str) -> Result<Vec<RunResult>> {
  if message.is_empty() {
    return Ok(vec![]);
  }

  let records: Vec<RunResult> = serde_json::from_str(message)
    .map_err(|err| Error::decode_error(format!("{}, msg: {}", err, message)))?;

  Ok(
    records
      .into_iter()
      .filter(|r| {
        if r.is_empty() {
          log::error!("dropping empty run result from termination message {:?}", message);
        }
        !r.is_empty()
      })
      .collect(),
  )
}

/// Re-encodes records for display. Later records replace earlier ones with
/// the same key and the output is sorted by key, so the message is stable
/// across reconciles. No records encode to the empty string.
pub fn create_message(records: &[RunResult]) -> Result<String> {
  if records.is_empty() {
    return Ok(String::new());
  }

  let deduped: BTreeMap<&str, &RunResult> = records.iter().map(|r| (r.key.as_str(), r)).collect();
  let sorted: Vec<&RunResult> = deduped.into_values().collect();

  serde_json::to_string(&sorted).map_err(Error::from)
}

/// Metadata a step reported about itself through internal records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InternalRecords {
  pub exit_code: Option<i32>,
  pub started_at: Option<Time>,
  pub reason: Option<String>,
}

impl InternalRecords {
  /// Collects the internal records among `records`. Malformed values are
  /// reported and otherwise ignored.
  pub fn collect(records: &[RunResult], errors: &mut Vec<Error>) -> Self {
    let mut internal = InternalRecords::default();

    for record in records.iter().filter(|r| r.is_internal()) {
      match record.key.as_str() {
        EXIT_CODE_KEY => match record.value.trim().parse::<i32>() {
          Ok(code) => internal.exit_code = Some(code),
          Err(err) => errors.push(Error::invalid_result_value(EXIT_CODE_KEY, err)),
        },
        STARTED_AT_KEY => match chrono::DateTime::parse_from_rfc3339(record.value.trim()) {
          Ok(time) => internal.started_at = Some(time.with_timezone(&chrono::Utc)),
          Err(err) => errors.push(Error::invalid_result_value(STARTED_AT_KEY, err)),
        },
        REASON_KEY => internal.reason = Some(record.value.clone()),
        other => log::trace!("ignoring internal record {:?}", other),
      }
    }

    internal
  }
}

/// Classifies how a terminated step ended. A reason the step reported wins,
/// then a recorded exit code marks a tolerated failure, then the real exit
/// code decides.
pub fn termination_reason(internal: &InternalRecords, exit_code: i32) -> String {
  match (&internal.reason, internal.exit_code) {
    (Some(reason), _) => reason.clone(),
    (None, Some(_)) => TERMINATION_REASON_CONTINUED.to_string(),
    (None, None) if exit_code != 0 => TERMINATION_REASON_ERROR.to_string(),
    (None, None) => TERMINATION_REASON_COMPLETED.to_string(),
  }
}

/// Records visible to operators: everything but internal metadata.
pub fn public_records(records: &[RunResult]) -> Vec<RunResult> {
  records
    .iter()
    .filter(|r| r.result_type != ResultType::Internal)
    .cloned()
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_records_in_order() {
    let records = parse_message(
      r#"[{"key":"resultName","value":"resultValue", "type":1}, {"key":"digest","value":"sha256:1234","resourceName":"source-image"}]"#,
    )
    .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].key, "resultName");
    assert_eq!(records[1].resource_name, "source-image");
  }

  #[test]
  fn empty_message_has_no_records() {
    assert_eq!(parse_message("").unwrap(), vec![]);
  }

  #[test]
  fn rejects_plain_text() {
    let error = parse_message("this is a non-json termination message. dont panic!").unwrap_err();

    assert!(matches!(error, Error::DecodeError(_)));
    assert!(error.to_string().starts_with("parsing message json: "));
    assert!(error
      .to_string()
      .ends_with("msg: this is a non-json termination message. dont panic!"));
  }

  #[test]
  fn drops_empty_records() {
    let records = parse_message(r#"[{"invalid":"resultName","invalid":"resultValue"}]"#).unwrap();

    assert!(records.is_empty());
    assert_eq!(create_message(&records).unwrap(), "");
  }

  #[test]
  fn creates_sorted_deduplicated_message() {
    let records = vec![
      RunResult::new("resultName", "first", ResultType::TaskRun),
      RunResult::new("digest", "sha256:1234", ResultType::Unspecified),
      RunResult::new("resultName", "second", ResultType::TaskRun),
    ];

    assert_eq!(
      create_message(&records).unwrap(),
      r#"[{"key":"digest","value":"sha256:1234"},{"key":"resultName","value":"second","type":1}]"#
    );
  }

  #[test]
  fn strips_legacy_internal_alias() {
    let records = parse_message(
      r#"[{"key":"resultNameTwo","value":"","type":"InternalTektonResult"}, {"key":"resultNameThree","value":"","type":"TaskRunResult"}]"#,
    )
    .unwrap();

    assert_eq!(records[0].result_type, ResultType::Internal);
    assert_eq!(
      create_message(&public_records(&records)).unwrap(),
      r#"[{"key":"resultNameThree","value":"","type":1}]"#
    );
  }

  #[test]
  fn keeps_unknown_kinds_on_reencode() {
    let records = parse_message(r#"[{"key":"future","value":"v","type":42}]"#).unwrap();

    assert_eq!(records[0].result_type, ResultType::Unknown(42));
    assert_eq!(
      create_message(&public_records(&records)).unwrap(),
      r#"[{"key":"future","value":"v","type":42}]"#
    );
  }

  #[test]
  fn collects_internal_records() {
    let records = parse_message(
      r#"[{"key":"ExitCode","value":"11","type":3},{"key":"StartedAt","value":"2023-01-02T03:04:05Z","type":"InternalTektonResult"},{"key":"Reason","value":"Skipped","type":3},{"key":"out","value":"x","type":1}]"#,
    )
    .unwrap();

    let mut errors = vec![];
    let internal = InternalRecords::collect(&records, &mut errors);

    assert!(errors.is_empty());
    assert_eq!(internal.exit_code, Some(11));
    assert_eq!(internal.reason.as_deref(), Some("Skipped"));
    assert_eq!(
      internal.started_at.map(|t| t.to_rfc3339()),
      Some("2023-01-02T03:04:05+00:00".to_string())
    );
    assert_eq!(public_records(&records).len(), 1);
  }

  #[test]
  fn classifies_termination() {
    let reason = |reason: Option<&str>, recorded: Option<i32>, exit_code: i32| {
      let internal = InternalRecords {
        exit_code: recorded,
        started_at: None,
        reason: reason.map(|r| r.to_string()),
      };
      termination_reason(&internal, exit_code)
    };

    assert_eq!(reason(Some("Skipped"), None, 0), "Skipped");
    assert_eq!(reason(Some("TimeoutExceeded"), Some(1), 1), "TimeoutExceeded");
    assert_eq!(reason(None, Some(11), 0), "Continued");
    assert_eq!(reason(None, None, 1), "Error");
    assert_eq!(reason(None, None, 0), "Completed");
  }

  #[test]
  fn reports_malformed_internal_records() {
    let records = vec![RunResult::new(EXIT_CODE_KEY, "eleven", ResultType::Internal)];

    let mut errors = vec![];
    let internal = InternalRecords::collect(&records, &mut errors);

    assert_eq!(internal.exit_code, None);
    assert_eq!(errors.len(), 1);
  }
}
