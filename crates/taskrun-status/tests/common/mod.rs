#![allow(dead_code)]

use k8s_openapi::api::core::v1::{
  Container, ContainerState, ContainerStateRunning, ContainerStateTerminated,
  ContainerStateWaiting, ContainerStatus, Pod, PodSpec, PodStatus,
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use taskrun_status::{StatusAssembler, StatusReport, TaskRun, TaskRunStatus, TaskSpec};

pub fn terminated(name: &str, exit_code: i32, message: &str) -> ContainerStatus {
  terminated_with_reason(name, exit_code, "", message)
}

pub fn terminated_with_reason(
  name: &str,
  exit_code: i32,
  reason: &str,
  message: &str,
) -> ContainerStatus {
  status(
    name,
    false,
    ContainerState {
      terminated: Some(ContainerStateTerminated {
        exit_code,
        reason: (!reason.is_empty()).then(|| reason.to_string()),
        message: (!message.is_empty()).then(|| message.to_string()),
        ..Default::default()
      }),
      ..Default::default()
    },
  )
}

pub fn running(name: &str, ready: bool) -> ContainerStatus {
  status(
    name,
    ready,
    ContainerState {
      running: Some(ContainerStateRunning::default()),
      ..Default::default()
    },
  )
}

pub fn waiting(name: &str, reason: &str, message: &str) -> ContainerStatus {
  status(
    name,
    false,
    ContainerState {
      waiting: Some(ContainerStateWaiting {
        reason: Some(reason.to_string()),
        message: (!message.is_empty()).then(|| message.to_string()),
      }),
      ..Default::default()
    },
  )
}

fn status(name: &str, ready: bool, state: ContainerState) -> ContainerStatus {
  ContainerStatus {
    name: name.to_string(),
    image: "busybox".to_string(),
    image_id: format!("docker-pullable://busybox@sha256:{}", name.len()),
    ready,
    state: Some(state),
    ..Default::default()
  }
}

/// A pod declaring its containers in the order their statuses are given.
pub fn pod(phase: &str, statuses: Vec<ContainerStatus>) -> Pod {
  let names: Vec<String> = statuses.iter().map(|s| s.name.clone()).collect();
  let declared: Vec<&str> = names.iter().map(String::as_str).collect();
  pod_with_declared(phase, &declared, statuses)
}

pub fn pod_with_declared(phase: &str, declared: &[&str], statuses: Vec<ContainerStatus>) -> Pod {
  Pod {
    metadata: ObjectMeta {
      name: Some("pod".to_string()),
      namespace: Some("default".to_string()),
      ..Default::default()
    },
    spec: Some(PodSpec {
      containers: declared
        .iter()
        .map(|name| Container {
          name: name.to_string(),
          ..Default::default()
        })
        .collect(),
      ..Default::default()
    }),
    status: Some(PodStatus {
      phase: Some(phase.to_string()),
      container_statuses: Some(statuses),
      ..Default::default()
    }),
  }
}

pub fn task_spec(yaml: &str) -> TaskSpec {
  serde_yaml::from_str(yaml).unwrap()
}

pub async fn make_status(task_run: &TaskRun, pod: &Pod, task_spec: &TaskSpec) -> StatusReport {
  StatusAssembler::builder()
    .build()
    .unwrap()
    .make_task_run_status(task_run, pod, task_spec)
    .await
    .unwrap()
}

/// Drops the fields stamped with the current time.
pub fn without_timestamps(mut status: TaskRunStatus) -> TaskRunStatus {
  if let Some(condition) = status.condition.as_mut() {
    condition.last_transition_time = None;
  }
  status.completion_time = None;
  status
}
