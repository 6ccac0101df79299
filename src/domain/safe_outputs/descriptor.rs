//! Declarative description of an output kind.
//!
//! Every kind is a row in [`KINDS`]. The generic job builder reads the row and
//! the parsed [`KindConfig`]; no kind assembles its own job.

use std::fmt;

use serde_yaml::Value;

use crate::domain::AppError;
use crate::domain::credential::Credential;
use crate::domain::job::{Step, VarMap};
use crate::domain::permissions::{PermissionLevel, PermissionScope, Permissions};
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::target::TargetSupport;
use crate::ports::ActionResolver;

/// Working tree a kind needs before its script runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Workspace {
    None,
    /// Patch artifact, full-history checkout and git identity.
    Patch,
    /// Asset artifact, checkout and git identity.
    Assets,
}

/// Outputs of a sibling job handed to this kind's script.
#[derive(Debug, Clone, Copy)]
pub struct Consumes {
    pub job: &'static str,
    /// `(env var, sibling output)` pairs.
    pub vars: &'static [(&'static str, &'static str)],
}

/// Collects a kind's configuration variables for the script step.
#[derive(Debug)]
pub struct KindEnv<'a> {
    prefix: &'static str,
    pub workflow_name: &'a str,
    pub max_patch_size: u32,
    vars: VarMap,
}

impl<'a> KindEnv<'a> {
    pub fn new(prefix: &'static str, workflow_name: &'a str, max_patch_size: u32) -> Self {
        Self { prefix, workflow_name, max_patch_size, vars: VarMap::new() }
    }

    /// `GH_AW_<PREFIX>_<suffix>`.
    pub fn name(&self, suffix: &str) -> String {
        format!("GH_AW_{}_{}", self.prefix, suffix)
    }

    pub fn set(&mut self, suffix: &str, value: impl Into<String>) {
        let name = self.name(suffix);
        self.vars.insert(name, value);
    }

    pub fn set_opt(&mut self, suffix: &str, value: Option<&str>) {
        if let Some(value) = value {
            self.set(suffix, value);
        }
    }

    /// Comma-joined list, skipped when empty.
    pub fn set_list(&mut self, suffix: &str, values: &[String]) {
        if !values.is_empty() {
            self.set(suffix, values.join(","));
        }
    }

    pub fn set_flag(&mut self, suffix: &str, enabled: bool) {
        if enabled {
            self.set(suffix, "true");
        }
    }

    /// A variable outside the kind's prefix.
    pub fn set_raw(&mut self, name: &str, value: impl Into<String>) {
        self.vars.insert(name, value);
    }

    pub fn into_vars(self) -> VarMap {
        self.vars
    }
}

/// Inputs available to post-steps.
pub struct PostStepContext<'a> {
    pub credential: &'a Credential,
    pub actions: &'a dyn ActionResolver,
    /// Step id of the kind's script step.
    pub step_id: &'a str,
    pub target_repo: Option<&'a str>,
}

/// Parsed configuration of one kind.
pub trait KindConfig: fmt::Debug + Send + Sync {
    fn base(&self) -> &BaseOutputConfig;

    /// Raw `target` value, for kinds that address an entity.
    fn target(&self) -> Option<&str> {
        None
    }

    /// Kind-specific variables, in declaration order.
    fn env(&self, _env: &mut KindEnv<'_>) {}

    fn post_steps(&self, _ctx: &PostStepContext<'_>) -> Result<Vec<Step>, AppError> {
        Ok(Vec::new())
    }
}

type ParseFn = fn(&ConfigMap<'_>, &KindDescriptor) -> Result<Box<dyn KindConfig>, AppError>;

/// Static facts about one kind.
pub struct KindDescriptor {
    /// Front-matter key, e.g. `add-reviewer`.
    pub key: &'static str,
    /// Job name and script step id.
    pub job_name: &'static str,
    /// Item `type` in the agent output.
    pub output_type: &'static str,
    pub step_name: &'static str,
    pub env_prefix: &'static str,
    pub permissions: &'static [(PermissionScope, PermissionLevel)],
    pub default_max: u32,
    pub target: TargetSupport,
    pub consumes: &'static [Consumes],
    pub outputs: &'static [&'static str],
    pub workspace: Workspace,
    pub parse: ParseFn,
}

impl fmt::Debug for KindDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindDescriptor").field("key", &self.key).field("job", &self.job_name).finish()
    }
}

impl KindDescriptor {
    /// Parse the value under this kind's key. `None` when the key is absent.
    pub fn parse_config(
        &'static self,
        value: Option<&Value>,
    ) -> Result<Option<ConfiguredKind>, AppError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let map = ConfigMap::new(self.key, value)?;
        let config = (self.parse)(&map, self)?;
        map.finish()?;
        if let Some(repo) = &config.base().target_repo {
            if !self.target.cross_repo {
                return Err(AppError::UnsupportedTarget {
                    kind: self.key.to_string(),
                    target: repo.clone(),
                    reason: "this kind cannot act on another repository".to_string(),
                });
            }
        }
        Ok(Some(ConfiguredKind { descriptor: self, config }))
    }

    pub fn permissions(&self) -> Permissions {
        Permissions::from_grants(self.permissions)
    }

    pub fn timeout_minutes(&self) -> u32 {
        match self.workspace {
            Workspace::None => 10,
            Workspace::Patch | Workspace::Assets => 15,
        }
    }

    pub fn script_name(&self) -> &'static str {
        self.job_name
    }
}

/// A kind present in the workflow with its parsed configuration.
#[derive(Debug)]
pub struct ConfiguredKind {
    pub descriptor: &'static KindDescriptor,
    pub config: Box<dyn KindConfig>,
}

impl ConfiguredKind {
    pub fn key(&self) -> &'static str {
        self.descriptor.key
    }
}

/// `gh` CLI step gated on the script step having produced `output`.
pub(crate) fn gh_cli_step(
    name: String,
    ctx: &PostStepContext<'_>,
    output: &str,
    subject_var: &str,
    command: String,
) -> Step {
    let mut step = Step::named(name)
        .when(format!("steps.{}.outputs.{} != ''", ctx.step_id, output))
        .env("GH_TOKEN", ctx.credential.as_str())
        .env(subject_var, format!("${{{{ steps.{}.outputs.{} }}}}", ctx.step_id, output));
    if let Some(repo) = ctx.target_repo {
        step = step.env("GH_REPO", repo);
    }
    step.run(command)
}

/// Checkout so that `gh` finds a repository context.
pub(crate) fn gh_checkout_step(ctx: &PostStepContext<'_>, output: &str) -> Result<Step, AppError> {
    Ok(Step::named("Checkout repository for gh CLI")
        .when(format!("steps.{}.outputs.{} != ''", ctx.step_id, output))
        .uses(ctx.actions.resolve("actions/checkout")?)
        .with("persist-credentials", "false"))
}
