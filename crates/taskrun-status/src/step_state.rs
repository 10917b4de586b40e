use crate::containers::{trim_sidecar_prefix, trim_step_prefix};
use crate::pod::ContainerStatusExt;
use crate::sidecar_logs::SideChannelResults;
use crate::termination::{self, InternalRecords};
use crate::{
  Artifacts, Error, FeatureFlags, OnError, ResultType, ResultValue, RunResult, SidecarState,
  StepState, TaskRunResult, TaskRunStatus, TaskSpec, ARTIFACTS_FILE_SUFFIX,
};
use k8s_openapi::api::core::v1::ContainerStatus;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;

/// Everything a step state is derived from besides its container status.
pub struct StepContext<'a> {
  pub task_spec: &'a TaskSpec,
  pub flags: &'a FeatureFlags,
  pub side_channel: &'a SideChannelResults,
  pub previous: &'a TaskRunStatus,
}

/// A step state and the facts about its container that decide the
/// TaskRun's condition.
#[derive(Debug, Clone)]
pub struct BuiltStep<'a> {
  pub status: &'a ContainerStatus,
  pub state: StepState,
  /// The termination message was present but not a run-result array.
  pub decode_failed: bool,
  /// A nonzero exit of this step does not fail the TaskRun.
  pub tolerated: bool,
  /// Task-level records the step published, still raw.
  pub task_records: Vec<RunResult>,
  /// The step's artifacts document, when it published one.
  pub artifacts: Option<Artifacts>,
}

impl BuiltStep<'_> {
  /// Exit code the runtime reported, ignoring internal overrides.
  pub fn exit_code(&self) -> Option<i32> {
    self.status.terminated().map(|t| t.exit_code)
  }

  pub fn failed(&self) -> bool {
    self.exit_code().is_some_and(|code| code != 0) && !self.tolerated
  }

  pub fn has_started(&self) -> bool {
    self.status.running().is_some() || self.status.is_terminated()
  }
}

pub fn build_step<'a>(
  status: &'a ContainerStatus,
  ctx: &StepContext,
  errors: &mut Vec<Error>,
) -> BuiltStep<'a> {
  let container = status.name.as_str();
  let mut state = status.state.clone().unwrap_or_default();
  let mut records = vec![];
  let mut decode_failed = false;

  if let Some(terminated) = state.terminated.as_mut() {
    let message = terminated.message.as_deref().unwrap_or_default();

    match termination::parse_message(message) {
      Ok(parsed) => {
        match termination::create_message(&termination::public_records(&parsed)) {
          Ok(filtered) if filtered.is_empty() => terminated.message = None,
          Ok(filtered) => terminated.message = Some(filtered),
          Err(err) => errors.push(err),
        }
        records = parsed;
      }
      Err(err) => {
        log::error!("termination message of {} could not be decoded: {}", container, err);
        errors.push(err);
        decode_failed = true;
      }
    }
  }

  let internal = InternalRecords::collect(&records, errors);
  let mut termination_reason = None;

  if let Some(terminated) = state.terminated.as_mut() {
    termination_reason = Some(termination::termination_reason(&internal, terminated.exit_code));

    if let Some(exit_code) = internal.exit_code {
      terminated.exit_code = exit_code;
    }
    if let Some(started_at) = internal.started_at {
      terminated.started_at = Some(Time(started_at));
    }
  }

  let declared_continue = ctx
    .task_spec
    .step_for_container(container)
    .is_some_and(|s| s.on_error == Some(OnError::Continue));
  let tolerated = declared_continue
    || matches!(
      termination_reason.as_deref(),
      Some(termination::TERMINATION_REASON_CONTINUED) | Some(termination::TERMINATION_REASON_SKIPPED)
    );

  let side_records = ctx.side_channel.for_container(container);

  let step_records = records
    .iter()
    .chain(side_records)
    .filter(|r| r.result_type == ResultType::Step);
  let results = decode_step_results(container, step_records, ctx.task_spec, errors);

  // Sidecar-log artifacts are only trusted when artifacts are enabled
  let side_artifacts: &[RunResult] = if ctx.flags.enable_artifacts {
    side_records
  } else {
    &[]
  };
  let documents = records
    .iter()
    .filter(|r| r.result_type == ResultType::StepArtifacts && r.key.ends_with(ARTIFACTS_FILE_SUFFIX))
    .chain(
      side_artifacts
        .iter()
        .filter(|r| r.result_type == ResultType::StepArtifacts),
    );
  let artifacts = merge_artifact_documents(documents, errors);

  let name = trim_step_prefix(container).to_string();
  let provenance = ctx.previous.step(&name).and_then(|s| s.provenance.clone());

  let task_records = records
    .iter()
    .filter(|r| matches!(r.result_type, ResultType::TaskRun | ResultType::TaskRunArtifacts))
    .cloned()
    .collect();

  BuiltStep {
    status,
    state: StepState {
      state,
      name,
      container: container.to_string(),
      image_id: status.image_id.clone(),
      results,
      provenance,
      termination_reason,
      inputs: artifacts.as_ref().map(|a| a.inputs.clone()),
      outputs: artifacts.as_ref().map(|a| a.outputs.clone()),
    },
    decode_failed,
    tolerated,
    task_records,
    artifacts,
  }
}

pub fn build_sidecar(status: &ContainerStatus) -> SidecarState {
  SidecarState {
    state: status.state.clone().unwrap_or_default(),
    name: trim_sidecar_prefix(&status.name).to_string(),
    container: status.name.clone(),
    image_id: status.image_id.clone(),
  }
}

/// Keeps the records matching a result the step declares, decoded to its
/// declared type.
fn decode_step_results<'r>(
  container: &str,
  records: impl Iterator<Item = &'r RunResult>,
  task_spec: &TaskSpec,
  errors: &mut Vec<Error>,
) -> Vec<TaskRunResult> {
  let mut results = vec![];

  for record in records {
    let Some(declared) = task_spec.step_result(container, &record.key) else {
      log::trace!("{} reported undeclared result {:?}", container, record.key);
      continue;
    };

    match ResultValue::decode(&record.key, &record.value, declared.results_type) {
      Ok(value) => results.push(TaskRunResult::new(&record.key, value)),
      Err(err) => errors.push(err),
    }
  }

  dedupe_results(results)
}

pub fn merge_artifact_documents<'r>(
  records: impl Iterator<Item = &'r RunResult>,
  errors: &mut Vec<Error>,
) -> Option<Artifacts> {
  let mut merged: Option<Artifacts> = None;

  for record in records {
    match serde_json::from_str::<Artifacts>(&record.value) {
      Ok(document) => merged.get_or_insert_with(Artifacts::default).merge(&document),
      Err(err) => errors.push(Error::invalid_result_value(&record.key, err)),
    }
  }

  merged
}

/// Collapses results by name: the first occurrence keeps its position, the
/// last one provides the value.
pub fn dedupe_results(results: Vec<TaskRunResult>) -> Vec<TaskRunResult> {
  let mut deduped: Vec<TaskRunResult> = Vec::with_capacity(results.len());

  for result in results {
    match deduped.iter_mut().find(|r| r.name == result.name) {
      Some(existing) => *existing = result,
      None => deduped.push(result),
    }
  }

  deduped
}
