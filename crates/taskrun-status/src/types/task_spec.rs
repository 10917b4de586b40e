use super::ResultsType;
use crate::{containers, Error, Result};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum OnError {
  Continue,
  StopAndFail,
}

/// The parts of a task definition the status engine reads: declared results
/// and the steps that may produce them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct TaskSpec {
  pub results: Vec<TaskResult>,
  pub steps: Vec<StepSpec>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TaskResult {
  pub name: String,
  #[serde(rename = "type", default)]
  pub results_type: ResultsType,
  /// `$(steps.<step>.results.<name>)` when the task result is forwarded from
  /// a step result.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub value: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepSpec {
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub results: Vec<StepResult>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub on_error: Option<OnError>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct StepResult {
  pub name: String,
  #[serde(rename = "type", default)]
  pub results_type: ResultsType,
}

impl TaskResult {
  pub fn new<T: ToString>(name: T, results_type: ResultsType) -> Self {
    TaskResult {
      name: name.to_string(),
      results_type,
      value: None,
    }
  }

  /// Resolves the step result this task result is forwarded from, as
  /// `(step name, result name)`.
  pub fn step_reference(&self) -> Option<Result<(String, String)>> {
    let reference = self.value.as_deref().filter(|v| !v.trim().is_empty())?;

    let parsed = reference
      .trim()
      .strip_prefix("$(")
      .and_then(|r| r.strip_suffix(')'))
      .and_then(|r| {
        let parts: Vec<&str> = r.split('.').collect();
        match parts.as_slice() {
          ["steps", step, "results", name] if !step.is_empty() && !name.is_empty() => {
            Some((step.to_string(), name.to_string()))
          }
          _ => None,
        }
      });

    Some(parsed.ok_or_else(|| Error::invalid_result_reference(reference)))
  }
}

impl StepResult {
  pub fn new<T: ToString>(name: T, results_type: ResultsType) -> Self {
    StepResult {
      name: name.to_string(),
      results_type,
    }
  }
}

impl TaskSpec {
  pub fn task_result(&self, name: &str) -> Option<&TaskResult> {
    self.results.iter().find(|r| r.name == name)
  }

  /// Finds the step that runs in the named container.
  pub fn step_for_container(&self, container: &str) -> Option<&StepSpec> {
    self
      .steps
      .iter()
      .enumerate()
      .find(|(index, step)| containers::step_container_name(&step.name, *index) == container)
      .map(|(_, step)| step)
  }

  pub fn step_result(&self, container: &str, name: &str) -> Option<&StepResult> {
    self
      .step_for_container(container)
      .and_then(|step| step.results.iter().find(|r| r.name == name))
  }

  pub fn declares_results(&self) -> bool {
    !self.results.is_empty() || self.steps.iter().any(|s| !s.results.is_empty())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn parses_step_reference() {
    let mut result = TaskResult::new("uri", ResultsType::String);
    assert!(result.step_reference().is_none());

    result.value = Some("$(steps.one.results.uri)".to_string());
    assert_eq!(
      result.step_reference().unwrap().unwrap(),
      ("one".to_string(), "uri".to_string())
    );

    result.value = Some("$(steps.one.uri)".to_string());
    assert_eq!(
      result.step_reference().unwrap(),
      Err(Error::invalid_result_reference("$(steps.one.uri)"))
    );
  }

  #[test]
  fn finds_steps_by_container() {
    let spec: TaskSpec = serde_yaml::from_str(
      r#"
results:
  - name: digest
steps:
  - name: build
    onError: continue
    results:
      - name: images
        type: array
  - results:
      - name: out
"#,
    )
    .unwrap();

    assert_eq!(
      spec.step_for_container("step-build").unwrap().on_error,
      Some(OnError::Continue)
    );
    assert_eq!(
      spec.step_result("step-build", "images").unwrap().results_type,
      ResultsType::Array
    );
    assert!(spec.step_result("step-unnamed-1", "out").is_some());
    assert!(spec.step_result("step-build", "out").is_none());
    assert!(spec.declares_results());
    assert!(!TaskSpec::default().declares_results());
  }
}
