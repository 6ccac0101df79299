//! Engine port used by the threat detection job.

use crate::domain::{AppError, Step};
use crate::ports::ActionResolver;

/// Steps that install and run an AI engine on a prompt file.
pub trait DetectionEngine {
    fn id(&self) -> &str;

    fn installation_steps(&self, actions: &dyn ActionResolver) -> Result<Vec<Step>, AppError>;

    /// Steps that run the engine on `prompt_file` and append its output to `log_file`.
    fn execution_steps(&self, prompt_file: &str, log_file: &str) -> Vec<Step>;
}

/// Lookup of engines by id.
pub trait EngineCatalog {
    fn engine(&self, id: &str) -> Result<Box<dyn DetectionEngine>, AppError>;
}
