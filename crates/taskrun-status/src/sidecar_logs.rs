//! Results replayed on the log of the results sidecar, for outputs too large
//! for a termination message.

use crate::{containers, Error, Result, ResultType, RunResult};
use k8s_openapi::api::core::v1::Pod;
use kube::api::{Api, LogParams};
use serde::Deserialize;
use std::collections::HashMap;

/// Reads the log of one container of a pod.
#[async_trait::async_trait]
pub trait PodLogReader: Send + Sync {
  async fn read_log(&self, namespace: &str, pod: &str, container: &str) -> Result<String>;
}

/// [`PodLogReader`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeLogReader {
  client: kube::Client,
}

impl KubeLogReader {
  pub fn new(client: kube::Client) -> Self {
    KubeLogReader { client }
  }

  /// Connects with the ambient kubeconfig or in-cluster service account.
  pub async fn try_default() -> Result<Self> {
    let client = kube::Client::try_default()
      .await
      .map_err(|e| Error::cluster_api(format!("Failed to create client: {}", e)))?;

    Ok(Self::new(client))
  }
}

#[async_trait::async_trait]
impl PodLogReader for KubeLogReader {
  async fn read_log(&self, namespace: &str, pod: &str, container: &str) -> Result<String> {
    let pods: Api<Pod> = Api::namespaced(self.client.clone(), namespace);
    let params = LogParams {
      container: Some(container.to_string()),
      ..LogParams::default()
    };

    log::trace!("Reading logs of {}/{} container {}", namespace, pod, container);

    pods.logs(pod, &params).await.map_err(|e| {
      Error::cluster_api(format!(
        "failed to read logs of {}/{} container {}: {}",
        namespace, pod, container, e
      ))
    })
  }
}

#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
#[serde(rename_all = "camelCase")]
enum SidecarLogResultType {
  Task,
  Step,
  StepArtifact,
  TaskArtifact,
}

#[derive(Deserialize, Debug)]
struct SidecarLogResult {
  name: String,
  value: String,
  #[serde(rename = "type")]
  kind: SidecarLogResultType,
}

impl From<SidecarLogResult> for RunResult {
  fn from(result: SidecarLogResult) -> Self {
    let result_type = match result.kind {
      SidecarLogResultType::Task => ResultType::TaskRun,
      SidecarLogResultType::Step => ResultType::Step,
      SidecarLogResultType::StepArtifact => ResultType::StepArtifacts,
      SidecarLogResultType::TaskArtifact => ResultType::TaskRunArtifacts,
    };

    RunResult::new(result.name, result.value, result_type)
  }
}

/// Parses a results sidecar log, one JSON record per line. A line longer
/// than `max_result_size` bytes fails the whole log.
pub fn parse_log(log: &str, max_result_size: usize) -> Result<Vec<RunResult>> {
  let mut records = vec![];

  for line in log.lines() {
    if line.len() > max_result_size {
      return Err(Error::size_exceeded(max_result_size));
    }

    let line = line.trim();
    if line.is_empty() {
      continue;
    }

    let result: SidecarLogResult = serde_json::from_str(line)
      .map_err(|e| Error::invalid_result(format!("invalid result {:?}: {}", line, e)))?;

    records.push(RunResult::from(result));
  }

  Ok(records)
}

/// Splits a step-scoped key `<stepName>.<resultName>` on its first dot.
pub fn split_step_key(key: &str) -> Result<(&str, &str)> {
  match key.split_once('.') {
    Some((step, name)) if !step.is_empty() && !name.is_empty() => Ok((step, name)),
    _ => Err(Error::invalid_result_name(key)),
  }
}

/// Side-channel records grouped by the scope they apply to.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SideChannelResults {
  pub task: Vec<RunResult>,
  steps: HashMap<String, Vec<RunResult>>,
}

impl SideChannelResults {
  /// Groups records by step. Step-scoped records are re-keyed to their bare
  /// result name; keys without a step part are reported and skipped.
  pub fn from_records(records: Vec<RunResult>, errors: &mut Vec<Error>) -> Self {
    let mut grouped = SideChannelResults::default();

    for mut record in records {
      match record.result_type {
        ResultType::Step | ResultType::StepArtifacts => {
          let (step, name) = match split_step_key(&record.key) {
            Ok((step, name)) => (step.to_string(), name.to_string()),
            Err(err) => {
              errors.push(err);
              continue;
            }
          };
          record.key = name;
          grouped.steps.entry(step).or_default().push(record);
        }
        _ => grouped.task.push(record),
      }
    }

    grouped
  }

  /// Records of the step running in `container`.
  pub fn for_container(&self, container: &str) -> &[RunResult] {
    self
      .steps
      .get(containers::trim_step_prefix(container))
      .map(Vec::as_slice)
      .unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool {
    self.task.is_empty() && self.steps.is_empty()
  }
}
