//! aw-compile: compiles agent safe-output declarations into a
//! permission-partitioned GitHub Actions job graph.

pub mod adapters;
pub mod app;
pub mod domain;
pub mod ports;

pub use app::api::{CheckReport, CompileOptions, check_file, compile_file, compile_str, kinds};
pub use app::compiler::{CompileFlags, CompiledWorkflow, Compiler};
pub use domain::{AppError, Job, JobGraph, Step, WorkflowSpec};
