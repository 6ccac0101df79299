//! WorkflowSpec to job graph.

use tracing::{debug, info};

use crate::app::builder::{BuildContext, build_job};
use crate::app::detection::build_detection_job;
use crate::domain::{AppError, JobGraph, WorkflowSpec};
use crate::ports::{ActionResolver, EngineCatalog, ScriptCatalog};

/// Compile-time switches that override the workflow file.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileFlags {
    /// Force staged mode regardless of `safe-outputs.staged`.
    pub staged: bool,
}

/// The emitted graph plus what the header reports about it.
#[derive(Debug)]
pub struct CompiledWorkflow {
    pub workflow_name: String,
    pub main_job: String,
    pub graph: JobGraph,
    pub staged: bool,
    pub pins_fingerprint: Option<String>,
    /// Secrets the main job needs for its safe-input tools.
    pub safe_input_secrets: Vec<String>,
}

impl CompiledWorkflow {
    /// The `jobs:` document, preceded by a comment header.
    pub fn to_yaml(&self) -> Result<String, AppError> {
        let mut out = String::new();
        out.push_str("# Generated by aw-compile. Do not edit by hand.\n");
        out.push_str(&format!("# Workflow: {}\n", self.workflow_name.replace('\n', " ")));
        if let Some(fingerprint) = &self.pins_fingerprint {
            out.push_str(&format!("# Action pins: sha256:{}\n", fingerprint));
        }
        if self.staged {
            out.push_str("# Staged: safe outputs are previewed, not applied\n");
        }
        if !self.safe_input_secrets.is_empty() {
            out.push_str(&format!("# Safe-input secrets: {}\n", self.safe_input_secrets.join(", ")));
        }
        out.push_str(&self.graph.to_yaml()?);
        Ok(out)
    }
}

pub struct Compiler<'a> {
    actions: &'a dyn ActionResolver,
    scripts: &'a dyn ScriptCatalog,
    engines: &'a dyn EngineCatalog,
}

impl<'a> Compiler<'a> {
    pub fn new(
        actions: &'a dyn ActionResolver,
        scripts: &'a dyn ScriptCatalog,
        engines: &'a dyn EngineCatalog,
    ) -> Self {
        Self { actions, scripts, engines }
    }

    pub fn compile(&self, spec: &WorkflowSpec, flags: CompileFlags) -> Result<CompiledWorkflow, AppError> {
        let safe_input_secrets = spec.safe_inputs.secret_names()?;
        let mut graph = JobGraph::new([spec.main_job.as_str()]);

        let Some(safe_outputs) = &spec.safe_outputs else {
            info!(workflow = %spec.name, "no safe outputs configured");
            return Ok(CompiledWorkflow {
                workflow_name: spec.name.clone(),
                main_job: spec.main_job.clone(),
                graph,
                staged: flags.staged,
                pins_fingerprint: self.actions.fingerprint(),
                safe_input_secrets,
            });
        };

        let staged = flags.staged || safe_outputs.staged;
        debug!(
            kinds = ?safe_outputs.kinds.iter().map(|k| k.key()).collect::<Vec<_>>(),
            staged,
            "parsed safe outputs"
        );

        let detection = !safe_outputs.kinds.is_empty() && safe_outputs.threat_detection.is_enabled();
        let ctx = BuildContext {
            spec,
            safe_outputs,
            staged,
            detection,
            actions: self.actions,
            scripts: self.scripts,
        };

        if detection {
            if let Some(gate) = build_detection_job(&ctx, self.engines)? {
                graph.add_job(gate)?;
            }
        }
        for kind in &safe_outputs.kinds {
            graph.add_job(build_job(&ctx, kind)?)?;
        }

        let order: Vec<&str> = graph.topological_order()?.iter().map(|job| job.name.as_str()).collect();
        info!(workflow = %spec.name, jobs = order.len(), detection, "compiled job graph");
        debug!(order = ?order, "job order");

        Ok(CompiledWorkflow {
            workflow_name: spec.name.clone(),
            main_job: spec.main_job.clone(),
            graph,
            staged,
            pins_fingerprint: self.actions.fingerprint(),
            safe_input_secrets,
        })
    }
}
