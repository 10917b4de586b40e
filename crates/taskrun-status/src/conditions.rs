//! Maps pod phase and step states to the TaskRun's `Succeeded` condition.

use crate::containers::{is_sidecar, is_step};
use crate::pod::{
  ContainerStatusExt, PodExt, PodPhase, REASON_EVICTED, REASON_POD_INITIALIZING,
  REASON_UNSCHEDULABLE,
};
use crate::step_state::BuiltStep;
use crate::{Condition, TaskRunReason};
use k8s_openapi::api::core::v1::{Pod, PodStatus};

const REASON_CREATE_CONTAINER_CONFIG_ERROR: &str = "CreateContainerConfigError";
const IMAGE_PULL_FAILURE_REASONS: [&str; 3] = ["ImagePullBackOff", "ErrImagePull", "InvalidImageName"];
const SUB_PATH_DIRECTORY_MARKER: &str = "subPath directory";
const INSUFFICIENT_RESOURCES_MARKER: &str = "Insufficient";

const MESSAGE_SUB_PATH_PENDING: &str = "Waiting for subPath directory creation to complete";
const MESSAGE_CONFIG_ERROR: &str = "Failed to create pod due to config error";
const MESSAGE_EXCEEDED_NODE_RESOURCES: &str = "TaskRun Pod exceeded available resources";
const MESSAGE_UNSPECIFIED_FAILURE: &str = "build failed for unspecified reasons.";

pub struct ConditionInput<'p, 's> {
  pub pod: &'p Pod,
  pub steps: &'s [BuiltStep<'p>],
  /// The out-of-band result producer, if any, has finished.
  pub results_ready: bool,
  pub failure_ignored: bool,
}

pub fn synthesize(input: &ConditionInput) -> Condition {
  let pod = input.pod;
  let phase = pod.phase();

  let oom_killed = input.steps.iter().any(|s| s.status.is_oom_killed());
  let steps_done = phase.is_terminal()
    || oom_killed
    || (phase == PodPhase::Running && steps_completed(pod, input.results_ready));

  if steps_done {
    if did_task_run_fail(pod, input.steps) {
      let reason = if input.failure_ignored {
        TaskRunReason::FailureIgnored
      } else {
        TaskRunReason::Failed
      };
      let message = failure_message(pod, input.steps);

      log::debug!("pod {} failed: {}", pod.name(), message);

      return Condition::failure(reason, message);
    }

    if phase.is_terminal() || sidecars_settled(pod) {
      return Condition::success();
    }

    log::trace!("pod {} steps finished, waiting for sidecars", pod.name());
    return Condition::running();
  }

  match phase {
    PodPhase::Pending => pending_condition(pod),
    _ => Condition::running(),
  }
}

/// Every step reported a terminated state and the result producer is done.
fn steps_completed(pod: &Pod, results_ready: bool) -> bool {
  let statuses = pod.container_statuses();

  !statuses.is_empty()
    && results_ready
    && statuses
      .iter()
      .filter(|s| is_step(&s.name))
      .all(|s| s.is_terminated())
}

/// No sidecar is still starting up.
fn sidecars_settled(pod: &Pod) -> bool {
  pod
    .container_statuses()
    .iter()
    .filter(|s| is_sidecar(&s.name))
    .all(|s| (s.running().is_some() && s.ready) || s.is_terminated())
}

/// Whether all sidecars of a running pod are ready or already terminated.
pub fn sidecars_ready(status: &PodStatus) -> bool {
  if status.phase.as_deref() != Some("Running") {
    return false;
  }

  status
    .container_statuses
    .as_deref()
    .unwrap_or_default()
    .iter()
    .filter(|s| is_sidecar(&s.name))
    .all(|s| {
      let ready = (s.running().is_some() && s.ready) || s.is_terminated();
      if !ready {
        log::debug!("sidecar {} is not ready", s.name);
      }
      ready
    })
}

pub fn did_task_run_fail(pod: &Pod, steps: &[BuiltStep]) -> bool {
  pod.phase() == PodPhase::Failed
    || steps
      .iter()
      .any(|s| s.failed() || s.status.is_oom_killed())
}

fn failure_message(pod: &Pod, steps: &[BuiltStep]) -> String {
  if let Some(step) = steps.iter().find(|s| s.status.is_oom_killed()) {
    return match step.exit_code() {
      Some(code) if code != 0 => format!("{:?} exited with code {}: OOMKilled", step.status.name, code),
      _ => crate::pod::REASON_OOM_KILLED.to_string(),
    };
  }

  if pod.status_reason() == REASON_EVICTED && !pod.status_message().is_empty() {
    return pod.status_message().to_string();
  }

  let step_initializing = steps
    .iter()
    .any(|s| s.status.waiting_reason() == REASON_POD_INITIALIZING);
  if step_initializing {
    let failed_init = pod
      .init_container_statuses()
      .iter()
      .find_map(|s| s.terminated().filter(|t| t.exit_code != 0).map(|t| (s, t.exit_code)));

    if let Some((init, code)) = failed_init {
      return format!("init container failed, {:?} exited with code {}", init.name, code);
    }
  }

  let undecodable = steps
    .iter()
    .find(|s| s.decode_failed && s.exit_code().is_some_and(|c| c != 0));
  if let Some(step) = undecodable.or_else(|| steps.iter().find(|s| s.failed())) {
    if let Some(code) = step.exit_code() {
      return format!("{:?} exited with code {}", step.status.name, code);
    }
  }

  if !pod.status_message().is_empty() {
    return pod.status_message().to_string();
  }

  MESSAGE_UNSPECIFIED_FAILURE.to_string()
}

fn pending_condition(pod: &Pod) -> Condition {
  if is_pod_hit_config_error(pod) {
    return Condition::failure(TaskRunReason::CreateContainerConfigError, MESSAGE_CONFIG_ERROR);
  }

  if is_sub_path_directory_error(pod) {
    return Condition::pending(TaskRunReason::Pending, MESSAGE_SUB_PATH_PENDING);
  }

  if is_pull_image_error(pod) {
    return Condition::pending(TaskRunReason::PullImageFailed, waiting_message(pod));
  }

  if is_pod_exceeding_node_resources(pod) {
    return Condition::pending(
      TaskRunReason::ExceededNodeResources,
      MESSAGE_EXCEEDED_NODE_RESOURCES,
    );
  }

  Condition::pending(TaskRunReason::Pending, waiting_message(pod))
}

fn config_error_messages(pod: &Pod) -> impl Iterator<Item = &str> {
  pod
    .container_statuses()
    .iter()
    .filter(|s| s.waiting_reason() == REASON_CREATE_CONTAINER_CONFIG_ERROR)
    .map(|s| s.waiting_message())
}

/// A container waits for kubelet to create a subPath directory, which
/// resolves on its own.
pub fn is_sub_path_directory_error(pod: &Pod) -> bool {
  config_error_messages(pod).any(|m| m.contains(SUB_PATH_DIRECTORY_MARKER))
}

/// A container cannot be created because of its configuration, which does
/// not resolve on its own.
pub fn is_pod_hit_config_error(pod: &Pod) -> bool {
  config_error_messages(pod).any(|m| !m.contains(SUB_PATH_DIRECTORY_MARKER))
}

pub fn is_pull_image_error(pod: &Pod) -> bool {
  pod
    .container_statuses()
    .iter()
    .any(|s| IMAGE_PULL_FAILURE_REASONS.contains(&s.waiting_reason()))
}

pub fn is_pod_exceeding_node_resources(pod: &Pod) -> bool {
  pod.conditions().iter().any(|c| {
    c.reason.as_deref() == Some(REASON_UNSCHEDULABLE)
      && c
        .message
        .as_deref()
        .is_some_and(|m| m.contains(INSUFFICIENT_RESOURCES_MARKER))
  })
}

fn waiting_message(pod: &Pod) -> String {
  let waiting = pod
    .container_statuses()
    .iter()
    .find(|s| !s.waiting_message().is_empty());
  if let Some(status) = waiting {
    return format!(
      "build step {:?} is pending with reason {:?}",
      status.name,
      status.waiting_message()
    );
  }

  let condition = pod
    .conditions()
    .iter()
    .find(|c| c.message.as_deref().is_some_and(|m| !m.is_empty()));
  if let Some(condition) = condition {
    return format!(
      "pod status {:?}:{:?}; message: {:?}",
      condition.type_,
      condition.status,
      condition.message.as_deref().unwrap_or_default()
    );
  }

  if !pod.status_message().is_empty() {
    return pod.status_message().to_string();
  }

  TaskRunReason::Pending.to_string()
}
