//! API facade: wires the embedded adapters into the compiler.

use std::fs;
use std::path::{Path, PathBuf};

use crate::adapters::{ActionPinCache, BuiltinEngines, EMBEDDED, EmbeddedScriptCatalog};
use crate::app::compiler::{CompileFlags, CompiledWorkflow, Compiler};
use crate::domain::safe_outputs::{KINDS, KindDescriptor};
use crate::domain::{AppError, WorkflowSpec};
use crate::ports::ActionResolver;

/// Options shared by `compile` and `check`.
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    pub staged: bool,
    /// Pin table to use instead of the embedded one.
    pub action_pins: Option<PathBuf>,
}

/// Summary of a successful validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub workflow_name: String,
    /// Emitted jobs in dependency order.
    pub jobs: Vec<String>,
    /// Environment names the main job receives from safe-input tools.
    pub safe_input_env: Vec<String>,
}

/// Compile a WorkflowSpec document.
pub fn compile_str(source: &str, options: &CompileOptions) -> Result<CompiledWorkflow, AppError> {
    let spec = WorkflowSpec::from_yaml_str(source)?;
    compile_spec(&spec, options)
}

/// Compile the WorkflowSpec at `path`.
pub fn compile_file(path: &Path, options: &CompileOptions) -> Result<CompiledWorkflow, AppError> {
    compile_str(&read_spec(path)?, options)
}

/// Validate the WorkflowSpec at `path` without rendering it.
pub fn check_file(path: &Path, options: &CompileOptions) -> Result<CheckReport, AppError> {
    let spec = WorkflowSpec::from_yaml_str(&read_spec(path)?)?;
    let compiled = compile_spec(&spec, options)?;
    let jobs = compiled
        .graph
        .topological_order()?
        .into_iter()
        .map(|job| job.name.clone())
        .collect();
    Ok(CheckReport {
        workflow_name: compiled.workflow_name,
        jobs,
        safe_input_env: spec.safe_inputs.collect_env()?.into_keys().collect(),
    })
}

/// Every supported kind.
pub fn kinds() -> &'static [KindDescriptor] {
    &KINDS
}

fn compile_spec(spec: &WorkflowSpec, options: &CompileOptions) -> Result<CompiledWorkflow, AppError> {
    let custom_pins;
    let actions: &dyn ActionResolver = match &options.action_pins {
        Some(path) => {
            custom_pins = ActionPinCache::from_file(path).map_err(|e| {
                AppError::config_error(format!("Failed to read action pins {}: {}", path.display(), e))
            })?;
            &custom_pins
        }
        None => &EMBEDDED,
    };
    let scripts = EmbeddedScriptCatalog::shared()?;
    let compiler = Compiler::new(actions, scripts, &BuiltinEngines);
    compiler.compile(spec, CompileFlags { staged: options.staged })
}

fn read_spec(path: &Path) -> Result<String, AppError> {
    fs::read_to_string(path)
        .map_err(|e| AppError::config_error(format!("Failed to read {}: {}", path.display(), e)))
}
