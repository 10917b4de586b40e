mod builder;

pub use builder::*;

use crate::conditions::{self, ConditionInput};
use crate::containers;
use crate::pod::PodExt;
use crate::result_source::ResultSource;
use crate::sidecar_logs::SideChannelResults;
use crate::step_state::{self, BuiltStep, StepContext};
use crate::{
  Artifacts, Error, FeatureFlags, Result, ResultType, ResultValue, RunResult, TaskRun,
  TaskRunResult, TaskRunStatus, TaskSpec,
};
use k8s_openapi::api::core::v1::Pod;

/// A freshly synthesized status and the non-fatal problems met on the way.
#[derive(Debug)]
pub struct StatusReport {
  pub status: TaskRunStatus,
  pub error: Option<Error>,
}

/// Derives TaskRun statuses from pods. Holds no state between calls.
pub struct StatusAssembler {
  flags: FeatureFlags,
  source: Box<dyn ResultSource>,
}

impl StatusAssembler {
  pub fn builder() -> StatusAssemblerBuilder {
    StatusAssemblerBuilder::new()
  }

  pub fn flags(&self) -> &FeatureFlags {
    &self.flags
  }

  /// Builds the status of `task_run` from the observed state of its `pod`.
  ///
  /// Decode problems do not stop the computation: they are returned in
  /// [`StatusReport::error`] next to a best-effort status. Oversized or
  /// unreadable side-channel results abort with an error.
  pub async fn make_task_run_status(
    &self,
    task_run: &TaskRun,
    pod: &Pod,
    task_spec: &TaskSpec,
  ) -> Result<StatusReport> {
    let previous = &task_run.status;
    let mut errors = vec![];

    for result in &task_spec.results {
      if let Some(Err(err)) = result.step_reference() {
        errors.push(err);
      }
    }

    let mut results_ready = true;
    let side_channel = if task_spec.declares_results() || self.flags.enable_artifacts {
      match self.source.fetch(pod).await {
        Ok(records) => SideChannelResults::from_records(records, &mut errors),
        Err(err) if err.is_not_ready() => {
          log::debug!("pod {}: {}", pod.name(), err);
          results_ready = false;
          SideChannelResults::default()
        }
        Err(err) if err.is_fatal() => {
          log::error!("pod {}: {}", pod.name(), err);
          return Err(err);
        }
        Err(err) => {
          log::warn!("pod {}: {}", pod.name(), err);
          errors.push(err);
          SideChannelResults::default()
        }
      }
    } else {
      SideChannelResults::default()
    };

    let classified =
      containers::classify_and_order(pod.declared_containers(), pod.container_statuses());

    let ctx = StepContext {
      task_spec,
      flags: &self.flags,
      side_channel: &side_channel,
      previous,
    };
    let steps: Vec<BuiltStep> = classified
      .steps
      .iter()
      .map(|&status| step_state::build_step(status, &ctx, &mut errors))
      .collect();

    let sidecars = classified
      .sidecars
      .iter()
      .map(|&status| step_state::build_sidecar(status))
      .collect();

    let mut condition = conditions::synthesize(&ConditionInput {
      pod,
      steps: &steps,
      results_ready,
      failure_ignored: task_run.failure_ignored(),
    });
    let terminal = condition.is_terminal();

    let now = chrono::Utc::now();
    condition.last_transition_time = match &previous.condition {
      Some(old) if old.same_state(&condition) => old.last_transition_time.or(Some(now)),
      _ => Some(now),
    };

    let completion_time = if terminal {
      previous
        .completion_time
        .filter(|_| previous.is_done())
        .or(Some(now))
    } else {
      None
    };

    let results = if terminal {
      task_results(&steps, &side_channel, task_spec, &mut errors)
    } else {
      vec![]
    };

    let artifacts = if terminal || steps.iter().any(|s| s.has_started()) {
      Some(aggregate_artifacts(&steps, &side_channel, &self.flags, &mut errors))
    } else {
      None
    };

    let steps = steps
      .into_iter()
      .map(|step| {
        let mut state = step.state;
        if !terminal {
          state.results.clear();
        }
        state
      })
      .collect();

    log::debug!(
      "TaskRun {:?} pod {}: {} {} {:?}",
      task_run.metadata.name,
      pod.name(),
      condition.reason,
      condition.message,
      completion_time
    );

    let status = TaskRunStatus {
      condition: Some(condition),
      pod_name: pod.name().to_string(),
      start_time: previous.start_time,
      completion_time,
      steps,
      sidecars,
      results,
      artifacts,
      retries_status: previous.retries_status.clone(),
    };

    Ok(StatusReport {
      status,
      error: Error::aggregate(errors),
    })
  }
}

/// Whether `pod` belongs to an earlier attempt recorded in the retry history.
pub fn is_pod_archived(pod: &Pod, status: &TaskRunStatus) -> bool {
  status
    .retries_status
    .iter()
    .any(|retry| retry.pod_name == pod.name())
}

fn decode_task_record(
  record: &RunResult,
  task_spec: &TaskSpec,
  errors: &mut Vec<Error>,
) -> Option<TaskRunResult> {
  let declared = task_spec.task_result(&record.key)?;

  match ResultValue::decode(&record.key, &record.value, declared.results_type) {
    Ok(value) => Some(TaskRunResult::new(&declared.name, value)),
    Err(err) => {
      errors.push(err);
      None
    }
  }
}

/// Declared task results, in step order, from the steps' task records, from
/// step results forwarded to the task, then from the side channel.
fn task_results(
  steps: &[BuiltStep],
  side_channel: &SideChannelResults,
  task_spec: &TaskSpec,
  errors: &mut Vec<Error>,
) -> Vec<TaskRunResult> {
  let mut results = vec![];

  for step in steps {
    for record in step
      .task_records
      .iter()
      .filter(|r| r.result_type == ResultType::TaskRun)
    {
      results.extend(decode_task_record(record, task_spec, errors));
    }

    for declared in &task_spec.results {
      let source_name = match declared.step_reference() {
        Some(Ok((step_name, result_name))) if step_name == step.state.name => result_name,
        Some(_) => continue,
        None => declared.name.clone(),
      };

      if let Some(found) = step.state.results.iter().find(|r| r.name == source_name) {
        results.push(TaskRunResult {
          name: declared.name.clone(),
          results_type: found.results_type,
          value: found.value.clone(),
        });
      }
    }
  }

  for record in side_channel
    .task
    .iter()
    .filter(|r| r.result_type == ResultType::TaskRun)
  {
    results.extend(decode_task_record(record, task_spec, errors));
  }

  step_state::dedupe_results(results)
}

fn aggregate_artifacts(
  steps: &[BuiltStep],
  side_channel: &SideChannelResults,
  flags: &FeatureFlags,
  errors: &mut Vec<Error>,
) -> Artifacts {
  let mut aggregate = Artifacts::default();

  for step in steps {
    if let Some(artifacts) = &step.artifacts {
      aggregate.merge(artifacts);
    }
  }

  let side_documents: &[RunResult] = if flags.enable_artifacts {
    &side_channel.task
  } else {
    &[]
  };
  let task_documents = steps
    .iter()
    .flat_map(|s| s.task_records.iter())
    .chain(side_documents.iter())
    .filter(|r| r.result_type == ResultType::TaskRunArtifacts);
  if let Some(artifacts) = step_state::merge_artifact_documents(task_documents, errors) {
    aggregate.merge(&artifacts);
  }

  aggregate
}
