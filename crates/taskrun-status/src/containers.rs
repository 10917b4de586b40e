use k8s_openapi::api::core::v1::{Container, ContainerStatus};
use std::collections::HashMap;

pub const STEP_PREFIX: &str = "step-";
pub const SIDECAR_PREFIX: &str = "sidecar-";
/// The sidecar that replays step results onto its log.
pub const RESULTS_SIDECAR_NAME: &str = "sidecar-tekton-log-results";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerRole {
  Step,
  Sidecar,
  Ignored,
}

pub fn classify(name: &str) -> ContainerRole {
  if name.starts_with(STEP_PREFIX) {
    ContainerRole::Step
  } else if name.starts_with(SIDECAR_PREFIX) {
    ContainerRole::Sidecar
  } else {
    ContainerRole::Ignored
  }
}

pub fn is_step(name: &str) -> bool {
  classify(name) == ContainerRole::Step
}

pub fn is_sidecar(name: &str) -> bool {
  classify(name) == ContainerRole::Sidecar
}

pub fn trim_step_prefix(name: &str) -> &str {
  name.strip_prefix(STEP_PREFIX).unwrap_or(name)
}

pub fn trim_sidecar_prefix(name: &str) -> &str {
  name.strip_prefix(SIDECAR_PREFIX).unwrap_or(name)
}

/// Container name a step runs in. Unnamed steps are numbered by position.
pub fn step_container_name(step_name: &str, index: usize) -> String {
  if step_name.is_empty() {
    format!("{}unnamed-{}", STEP_PREFIX, index)
  } else {
    format!("{}{}", STEP_PREFIX, step_name)
  }
}

/// Observed statuses split by role, each group in declared container order.
#[derive(Debug, Default)]
pub struct Classified<'a> {
  pub steps: Vec<&'a ContainerStatus>,
  pub sidecars: Vec<&'a ContainerStatus>,
}

/// Orders the observed statuses by the declared container list. Declared
/// containers that have not reported yet are left out, as are observed
/// statuses for names that were never declared. With no declared list the
/// observed order is kept.
pub fn classify_and_order<'a>(
  declared: &[Container],
  observed: &'a [ContainerStatus],
) -> Classified<'a> {
  let mut index: HashMap<&str, &'a ContainerStatus> = HashMap::with_capacity(observed.len());
  for status in observed {
    index.entry(status.name.as_str()).or_insert(status);
  }

  let ordered: Vec<&'a ContainerStatus> = if declared.is_empty() {
    observed.iter().collect()
  } else {
    declared
      .iter()
      .filter_map(|c| index.get(c.name.as_str()).copied())
      .collect()
  };

  let mut classified = Classified::default();
  for status in ordered {
    match classify(&status.name) {
      ContainerRole::Step => classified.steps.push(status),
      ContainerRole::Sidecar => classified.sidecars.push(status),
      ContainerRole::Ignored => {
        log::trace!("ignoring container {:?}", status.name);
      }
    }
  }

  classified
}
