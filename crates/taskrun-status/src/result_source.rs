use crate::containers::RESULTS_SIDECAR_NAME;
use crate::pod::{ContainerStatusExt, PodExt, PodPhase};
use crate::sidecar_logs::{self, PodLogReader};
use crate::{Error, FeatureFlags, Result, ResultExtractionMethod, RunResult};
use k8s_openapi::api::core::v1::Pod;
use std::sync::Arc;

/// Where step results come from besides termination messages.
#[async_trait::async_trait]
pub trait ResultSource: Send + Sync {
  /// Records published out of band for `pod`. `Error::NotReady` means the
  /// producer has not finished yet.
  async fn fetch(&self, pod: &Pod) -> Result<Vec<RunResult>>;
}

/// Results travel inline in each step's termination message, so there is
/// nothing to fetch.
pub struct TerminationMessageSource;

#[async_trait::async_trait]
impl ResultSource for TerminationMessageSource {
  async fn fetch(&self, _pod: &Pod) -> Result<Vec<RunResult>> {
    Ok(vec![])
  }
}

/// Results replayed by the results sidecar on its log.
pub struct SidecarLogSource {
  reader: Arc<dyn PodLogReader>,
  max_result_size: usize,
}

impl SidecarLogSource {
  pub fn new(reader: Arc<dyn PodLogReader>, max_result_size: usize) -> Self {
    SidecarLogSource {
      reader,
      max_result_size,
    }
  }
}

#[async_trait::async_trait]
impl ResultSource for SidecarLogSource {
  async fn fetch(&self, pod: &Pod) -> Result<Vec<RunResult>> {
    let phase = pod.phase();
    if phase == PodPhase::Pending {
      return Ok(vec![]);
    }

    let sidecar_done = pod
      .container_statuses()
      .iter()
      .any(|s| s.name == RESULTS_SIDECAR_NAME && s.is_terminated());

    if !sidecar_done && !phase.is_terminal() {
      return Err(Error::not_ready(format!(
        "{} in pod {} has not terminated",
        RESULTS_SIDECAR_NAME,
        pod.name()
      )));
    }

    let log = self
      .reader
      .read_log(pod.namespace(), pod.name(), RESULTS_SIDECAR_NAME)
      .await?;

    sidecar_logs::parse_log(&log, self.max_result_size)
  }
}

/// Picks the result source the flags ask for.
pub fn source_for(
  flags: &FeatureFlags,
  reader: Option<Arc<dyn PodLogReader>>,
) -> Result<Box<dyn ResultSource>> {
  match flags.result_extraction_method {
    ResultExtractionMethod::TerminationMessage => Ok(Box::new(TerminationMessageSource)),
    ResultExtractionMethod::SidecarLogs => {
      let reader = reader.ok_or(Error::init_error(
        "sidecar-logs result extraction requires a pod log reader",
      ))?;

      Ok(Box::new(SidecarLogSource::new(reader, flags.max_result_size)))
    }
  }
}
