mod artifacts;
mod condition;
mod error;
mod result_value;
mod run_result;
mod status;
mod task_spec;

pub use artifacts::*;
pub use condition::*;
pub use error::*;
pub use result_value::*;
pub use run_result::*;
pub use status::*;
pub use task_spec::*;

pub type Time = chrono::DateTime<chrono::Utc>;
