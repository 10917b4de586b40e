use k8s_openapi::api::core::v1::{
  Container, ContainerStateRunning, ContainerStateTerminated, ContainerStateWaiting,
  ContainerStatus, Pod, PodCondition,
};

pub const REASON_OOM_KILLED: &str = "OOMKilled";
pub const REASON_EVICTED: &str = "Evicted";
pub const REASON_POD_INITIALIZING: &str = "PodInitializing";
pub const REASON_UNSCHEDULABLE: &str = "Unschedulable";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PodPhase {
  Unset,
  Pending,
  Running,
  Succeeded,
  Failed,
  Unknown,
}

impl PodPhase {
  pub fn is_terminal(&self) -> bool {
    matches!(self, PodPhase::Succeeded | PodPhase::Failed)
  }
}

impl From<Option<&str>> for PodPhase {
  fn from(phase: Option<&str>) -> Self {
    match phase {
      None | Some("") => PodPhase::Unset,
      Some("Pending") => PodPhase::Pending,
      Some("Running") => PodPhase::Running,
      Some("Succeeded") => PodPhase::Succeeded,
      Some("Failed") => PodPhase::Failed,
      Some(_) => PodPhase::Unknown,
    }
  }
}

/// Read accessors over the optional-everything Pod model.
pub trait PodExt {
  fn name(&self) -> &str;
  fn namespace(&self) -> &str;
  fn phase(&self) -> PodPhase;
  fn declared_containers(&self) -> &[Container];
  fn container_statuses(&self) -> &[ContainerStatus];
  fn init_container_statuses(&self) -> &[ContainerStatus];
  fn conditions(&self) -> &[PodCondition];
  fn status_message(&self) -> &str;
  fn status_reason(&self) -> &str;
}

impl PodExt for Pod {
  fn name(&self) -> &str {
    self.metadata.name.as_deref().unwrap_or_default()
  }

  fn namespace(&self) -> &str {
    self.metadata.namespace.as_deref().unwrap_or_default()
  }

  fn phase(&self) -> PodPhase {
    PodPhase::from(self.status.as_ref().and_then(|s| s.phase.as_deref()))
  }

  fn declared_containers(&self) -> &[Container] {
    self
      .spec
      .as_ref()
      .map(|s| s.containers.as_slice())
      .unwrap_or_default()
  }

  fn container_statuses(&self) -> &[ContainerStatus] {
    self
      .status
      .as_ref()
      .and_then(|s| s.container_statuses.as_deref())
      .unwrap_or_default()
  }

  fn init_container_statuses(&self) -> &[ContainerStatus] {
    self
      .status
      .as_ref()
      .and_then(|s| s.init_container_statuses.as_deref())
      .unwrap_or_default()
  }

  fn conditions(&self) -> &[PodCondition] {
    self
      .status
      .as_ref()
      .and_then(|s| s.conditions.as_deref())
      .unwrap_or_default()
  }

  fn status_message(&self) -> &str {
    self
      .status
      .as_ref()
      .and_then(|s| s.message.as_deref())
      .unwrap_or_default()
  }

  fn status_reason(&self) -> &str {
    self
      .status
      .as_ref()
      .and_then(|s| s.reason.as_deref())
      .unwrap_or_default()
  }
}

pub trait ContainerStatusExt {
  fn waiting(&self) -> Option<&ContainerStateWaiting>;
  fn running(&self) -> Option<&ContainerStateRunning>;
  fn terminated(&self) -> Option<&ContainerStateTerminated>;

  fn is_terminated(&self) -> bool {
    self.terminated().is_some()
  }

  fn is_oom_killed(&self) -> bool {
    self
      .terminated()
      .is_some_and(|t| t.reason.as_deref() == Some(REASON_OOM_KILLED))
  }

  fn waiting_reason(&self) -> &str {
    self
      .waiting()
      .and_then(|w| w.reason.as_deref())
      .unwrap_or_default()
  }

  fn waiting_message(&self) -> &str {
    self
      .waiting()
      .and_then(|w| w.message.as_deref())
      .unwrap_or_default()
  }

  fn termination_message(&self) -> &str {
    self
      .terminated()
      .and_then(|t| t.message.as_deref())
      .unwrap_or_default()
  }
}

impl ContainerStatusExt for ContainerStatus {
  fn waiting(&self) -> Option<&ContainerStateWaiting> {
    self.state.as_ref().and_then(|s| s.waiting.as_ref())
  }

  fn running(&self) -> Option<&ContainerStateRunning> {
    self.state.as_ref().and_then(|s| s.running.as_ref())
  }

  fn terminated(&self) -> Option<&ContainerStateTerminated> {
    self.state.as_ref().and_then(|s| s.terminated.as_ref())
  }
}
