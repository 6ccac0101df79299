pub mod condition;
pub mod credential;
pub mod error;
pub mod job;
pub mod job_graph;
pub mod permissions;
pub mod safe_inputs;
pub mod safe_outputs;
pub mod target;
pub mod workflow_spec;

pub use condition::{Condition, EvalContext};
pub use credential::{Credential, CredentialChain};
pub use error::AppError;
pub use job::{Job, Step, VarMap};
pub use job_graph::JobGraph;
pub use permissions::{PermissionLevel, PermissionScope, Permissions};
pub use target::{EntityScope, TargetMode, TargetSpec, TriggerEvents};
pub use workflow_spec::WorkflowSpec;
