use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File name, relative to a step's artifacts directory, whose content is
/// reported as the step's artifacts document.
pub const ARTIFACTS_FILE_SUFFIX: &str = "artifacts/provenance.json";

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Artifacts {
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub inputs: Vec<Artifact>,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub outputs: Vec<Artifact>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
  pub name: String,
  #[serde(default)]
  pub values: Vec<ArtifactValue>,
  #[serde(default, skip_serializing_if = "std::ops::Not::not")]
  pub build_output: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct ArtifactValue {
  pub uri: String,
  /// Algorithm name to hex digest, e.g. `sha256`.
  #[serde(default)]
  pub digest: BTreeMap<String, String>,
}

impl Artifacts {
  pub fn is_empty(&self) -> bool {
    self.inputs.is_empty() && self.outputs.is_empty()
  }

  /// Merges another document into this one. Groups are matched by name and
  /// keep their first-seen position; values are matched by URI and their
  /// digest maps are unioned, later algorithms overriding earlier ones.
  pub fn merge(&mut self, other: &Artifacts) {
    merge_groups(&mut self.inputs, &other.inputs);
    merge_groups(&mut self.outputs, &other.outputs);
  }
}

fn merge_groups(into: &mut Vec<Artifact>, from: &[Artifact]) {
  for artifact in from {
    match into.iter_mut().find(|a| a.name == artifact.name) {
      Some(existing) => {
        existing.build_output |= artifact.build_output;
        for value in &artifact.values {
          merge_value(&existing.name, &mut existing.values, value);
        }
      }
      None => {
        let mut fresh = Artifact {
          name: artifact.name.clone(),
          values: Vec::with_capacity(artifact.values.len()),
          build_output: artifact.build_output,
        };
        for value in &artifact.values {
          merge_value(&fresh.name, &mut fresh.values, value);
        }
        into.push(fresh);
      }
    }
  }
}

fn merge_value(name: &str, values: &mut Vec<ArtifactValue>, value: &ArtifactValue) {
  let Some(existing) = values.iter_mut().find(|v| v.uri == value.uri) else {
    values.push(value.clone());
    return;
  };

  for (algorithm, digest) in &value.digest {
    match existing.digest.insert(algorithm.clone(), digest.clone()) {
      Some(previous) if previous != *digest => {
        log::warn!(
          "artifact {:?} value {:?} reported conflicting {} digests, keeping {} over {}",
          name,
          value.uri,
          algorithm,
          digest,
          previous
        );
      }
      _ => {}
    }
  }
}
