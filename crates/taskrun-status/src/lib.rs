mod assembler;
mod config;
mod types;

pub mod conditions;
pub mod containers;
pub mod pod;
pub mod result_source;
pub mod sidecar_logs;
pub mod step_state;
pub mod termination;

pub use assembler::*;
pub use conditions::sidecars_ready;
pub use config::*;
pub use result_source::{ResultSource, SidecarLogSource, TerminationMessageSource};
pub use sidecar_logs::{KubeLogReader, PodLogReader};
pub use types::*;

pub use async_trait::async_trait;
pub use k8s_openapi;

pub type Result<T> = std::result::Result<T, Error>;
