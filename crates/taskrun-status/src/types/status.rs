use super::{Artifact, Artifacts, Condition, ResultValue, ResultsType, Time};
use k8s_openapi::api::core::v1::ContainerState;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Annotation a pipeline puts on a TaskRun when it is allowed to continue
/// past the TaskRun's failure.
pub const PIPELINE_TASK_ON_ERROR_ANNOTATION: &str = "pipeline.dev/pipeline-task-on-error";

/// The owning TaskRun, reduced to what status synthesis reads.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct TaskRun {
  #[serde(default)]
  pub metadata: ObjectMeta,
  #[serde(default)]
  pub status: TaskRunStatus,
}

impl TaskRun {
  /// Whether the owning pipeline continues when this TaskRun fails.
  pub fn failure_ignored(&self) -> bool {
    self
      .metadata
      .annotations
      .as_ref()
      .and_then(|a| a.get(PIPELINE_TASK_ON_ERROR_ANNOTATION))
      .is_some_and(|v| v == "continue")
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskRunStatus {
  #[serde(skip_serializing_if = "Option::is_none")]
  pub condition: Option<Condition>,
  pub pod_name: String,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub start_time: Option<Time>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub completion_time: Option<Time>,
  pub steps: Vec<StepState>,
  pub sidecars: Vec<SidecarState>,
  pub results: Vec<TaskRunResult>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub artifacts: Option<Artifacts>,
  pub retries_status: Vec<TaskRunStatus>,
}

impl TaskRunStatus {
  pub fn is_done(&self) -> bool {
    self.condition.as_ref().is_some_and(|c| c.is_terminal())
  }

  pub fn step(&self, name: &str) -> Option<&StepState> {
    self.steps.iter().find(|s| s.name == name)
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
  #[serde(default)]
  pub state: ContainerState,
  pub name: String,
  pub container: String,
  #[serde(default, rename = "imageID")]
  pub image_id: String,
  #[serde(default)]
  pub results: Vec<TaskRunResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub provenance: Option<Provenance>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub termination_reason: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub inputs: Option<Vec<Artifact>>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub outputs: Option<Vec<Artifact>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SidecarState {
  #[serde(default)]
  pub state: ContainerState,
  pub name: String,
  pub container: String,
  #[serde(default, rename = "imageID")]
  pub image_id: String,
}

/// A typed result, either of a step or of the whole TaskRun.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TaskRunResult {
  pub name: String,
  #[serde(rename = "type")]
  pub results_type: ResultsType,
  pub value: ResultValue,
}

impl TaskRunResult {
  pub fn new<T: ToString>(name: T, value: ResultValue) -> Self {
    TaskRunResult {
      name: name.to_string(),
      results_type: value.results_type(),
      value,
    }
  }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Provenance {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub ref_source: Option<RefSource>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RefSource {
  pub uri: String,
  #[serde(default)]
  pub digest: BTreeMap<String, String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub entry_point: Option<String>,
}
