use super::Time;
use serde::{Deserialize, Serialize};
use std::fmt;

pub const CONDITION_SUCCEEDED: &str = "Succeeded";

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionStatus {
  True,
  False,
  Unknown,
}

/// Reason codes published on the `Succeeded` condition.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskRunReason {
  Running,
  Succeeded,
  Failed,
  FailureIgnored,
  Pending,
  PullImageFailed,
  ExceededNodeResources,
  CreateContainerConfigError,
}

impl fmt::Display for TaskRunReason {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let reason = match self {
      TaskRunReason::Running => "Running",
      TaskRunReason::Succeeded => "Succeeded",
      TaskRunReason::Failed => "Failed",
      TaskRunReason::FailureIgnored => "FailureIgnored",
      TaskRunReason::Pending => "Pending",
      TaskRunReason::PullImageFailed => "PullImageFailed",
      TaskRunReason::ExceededNodeResources => "ExceededNodeResources",
      TaskRunReason::CreateContainerConfigError => "CreateContainerConfigError",
    };

    f.write_str(reason)
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
  #[serde(rename = "type")]
  pub condition_type: String,
  pub status: ConditionStatus,
  #[serde(default)]
  pub reason: String,
  #[serde(default)]
  pub message: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub last_transition_time: Option<Time>,
}

impl Condition {
  fn succeeded<M: ToString>(status: ConditionStatus, reason: TaskRunReason, message: M) -> Self {
    Condition {
      condition_type: CONDITION_SUCCEEDED.to_string(),
      status,
      reason: reason.to_string(),
      message: message.to_string(),
      last_transition_time: None,
    }
  }

  pub fn running() -> Self {
    Self::succeeded(
      ConditionStatus::Unknown,
      TaskRunReason::Running,
      "Not all Steps in the Task have finished executing",
    )
  }

  pub fn pending<M: ToString>(reason: TaskRunReason, message: M) -> Self {
    Self::succeeded(ConditionStatus::Unknown, reason, message)
  }

  pub fn success() -> Self {
    Self::succeeded(
      ConditionStatus::True,
      TaskRunReason::Succeeded,
      "All Steps have completed executing",
    )
  }

  pub fn failure<M: ToString>(reason: TaskRunReason, message: M) -> Self {
    Self::succeeded(ConditionStatus::False, reason, message)
  }

  pub fn is_terminal(&self) -> bool {
    self.status != ConditionStatus::Unknown
  }

  /// Same state as `other`, ignoring the transition time.
  pub fn same_state(&self, other: &Condition) -> bool {
    self.condition_type == other.condition_type
      && self.status == other.status
      && self.reason == other.reason
      && self.message == other.message
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn builds_conditions() {
    let running = Condition::running();
    assert_eq!(running.status, ConditionStatus::Unknown);
    assert_eq!(running.reason, "Running");
    assert!(!running.is_terminal());

    let failed = Condition::failure(TaskRunReason::FailureIgnored, "boom");
    assert_eq!(failed.reason, "FailureIgnored");
    assert!(failed.is_terminal());

    assert!(Condition::success().is_terminal());
    assert!(!Condition::success().same_state(&failed));
  }
}
