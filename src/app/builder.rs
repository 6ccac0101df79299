//! The generic safe-output job builder.
//!
//! Every kind goes through [`build_job`]; the descriptor and parsed config
//! supply the only kind-specific inputs.

use std::collections::BTreeMap;

use tracing::debug;

use crate::app::app_token;
use crate::domain::credential::Credential;
use crate::domain::safe_outputs::SafeOutputsConfig;
use crate::domain::safe_outputs::descriptor::{ConfiguredKind, KindEnv, PostStepContext, Workspace};
use crate::domain::target::resolve_target;
use crate::domain::{AppError, Condition, CredentialChain, Job, Step, TargetSpec, VarMap, WorkflowSpec};
use crate::ports::{ActionResolver, ScriptCatalog, ScriptVars};

/// Directory the agent output artifact is downloaded to.
pub const SAFE_OUTPUTS_DIR: &str = "/tmp/gh-aw/safeoutputs/";
pub const AGENT_OUTPUT_ARTIFACT: &str = "agent_output.json";
pub const PATCH_ARTIFACT: &str = "aw.patch";
pub const ASSETS_ARTIFACT: &str = "safe-outputs-assets";
pub const DETECTION_JOB: &str = "detection";

/// Inputs shared by all jobs of one compilation.
pub struct BuildContext<'a> {
    pub spec: &'a WorkflowSpec,
    pub safe_outputs: &'a SafeOutputsConfig,
    pub staged: bool,
    /// Whether the detection gate is emitted.
    pub detection: bool,
    pub actions: &'a dyn ActionResolver,
    pub scripts: &'a dyn ScriptCatalog,
}

impl BuildContext<'_> {
    fn credential(&self, kind_token: Option<&str>) -> Credential {
        if self.safe_outputs.app.is_some() {
            return Credential::app_token();
        }
        CredentialChain {
            kind: kind_token,
            safe_outputs: self.safe_outputs.github_token.as_deref(),
            workflow: self.spec.github_token.as_deref(),
        }
        .resolve()
    }
}

/// Build the job for one configured kind.
pub fn build_job(ctx: &BuildContext<'_>, kind: &ConfiguredKind) -> Result<Job, AppError> {
    let descriptor = kind.descriptor;
    let base = kind.config.base();
    let main_job = ctx.spec.main_job.as_str();

    let target = resolve_target(
        descriptor.key,
        kind.config.target(),
        base.target_repo.as_deref(),
        descriptor.target,
        &ctx.spec.triggers,
    )?;

    let mut conjuncts = vec![Condition::kind_present(main_job, descriptor.output_type, base.min)];
    conjuncts.extend(target.conjunct());
    if ctx.detection {
        conjuncts.push(detection_passed());
    }
    let condition = Condition::and(conjuncts);

    let permissions = descriptor.permissions();
    let credential = ctx.credential(base.github_token.as_deref());

    let consumed: Vec<_> =
        descriptor.consumes.iter().filter(|c| ctx.safe_outputs.has_job(c.job)).collect();
    let mut needs = vec![main_job.to_string()];
    if ctx.detection {
        needs.push(DETECTION_JOB.to_string());
    }
    needs.extend(consumed.iter().map(|c| c.job.to_string()));

    let mut env = VarMap::new();
    env.insert("GH_AW_AGENT_OUTPUT", "${{ env.GH_AW_AGENT_OUTPUT }}");
    let mut kind_env = KindEnv::new(descriptor.env_prefix, &ctx.spec.name, ctx.safe_outputs.max_patch_size);
    kind_env.set("MAX_COUNT", base.max.to_string());
    if base.min > 0 {
        kind_env.set("MIN_COUNT", base.min.to_string());
    }
    if let Some(value) = target.env_value() {
        kind_env.set("TARGET", value);
    }
    kind.config.env(&mut kind_env);
    env.extend(kind_env.into_vars().iter());
    for sibling in &consumed {
        for (var, output) in sibling.vars {
            env.insert(*var, format!("${{{{ needs.{}.outputs.{} }}}}", sibling.job, output));
        }
    }
    env.insert("GH_AW_WORKFLOW_NAME", ctx.spec.name.as_str());
    if ctx.staged {
        env.insert("GH_AW_SAFE_OUTPUTS_STAGED", "true");
    }
    if let Some(repo) = &target.repo_slug {
        env.insert("GH_AW_TARGET_REPO_SLUG", repo.as_str());
    }
    if !ctx.safe_outputs.allowed_domains.is_empty() {
        env.insert("GH_AW_ALLOWED_DOMAINS", ctx.safe_outputs.allowed_domains.join(","));
    }
    env.extend(ctx.safe_outputs.env.iter());

    let script_vars = ScriptVars::from([
        ("output_type", descriptor.output_type.to_string()),
        ("env_prefix", descriptor.env_prefix.to_string()),
        ("step_name", descriptor.step_name.to_string()),
    ]);
    let script = ctx.scripts.render_script(descriptor.script_name(), &script_vars)?;

    let mut steps = Vec::new();
    if let Some(app) = &ctx.safe_outputs.app {
        steps.push(app_token::mint_step(app, &permissions, ctx.actions)?);
    }
    steps.extend(agent_output_steps(ctx.actions)?);
    steps.extend(workspace_steps(descriptor.workspace, &credential, &target, ctx.actions)?);
    steps.push(Step {
        name: descriptor.step_name.to_string(),
        id: Some(descriptor.job_name.to_string()),
        uses: Some(ctx.actions.resolve("actions/github-script")?),
        env,
        with: VarMap::from_iter([
            ("github-token", credential.as_str()),
            ("script", script.as_str()),
        ]),
        ..Step::default()
    });
    steps.extend(kind.config.post_steps(&PostStepContext {
        credential: &credential,
        actions: ctx.actions,
        step_id: descriptor.job_name,
        target_repo: target.repo_slug.as_deref(),
    })?);
    if ctx.safe_outputs.app.is_some() {
        steps.push(app_token::revoke_step());
    }

    let outputs: BTreeMap<String, String> = descriptor
        .outputs
        .iter()
        .map(|output| {
            (
                output.to_string(),
                format!("${{{{ steps.{}.outputs.{} }}}}", descriptor.job_name, output),
            )
        })
        .collect();

    debug!(kind = descriptor.key, job = descriptor.job_name, needs = ?needs, "built safe-output job");

    Ok(Job {
        name: descriptor.job_name.to_string(),
        needs,
        condition: Some(condition.render()),
        runs_on: ctx.spec.safe_output_runs_on().to_string(),
        permissions,
        timeout_minutes: descriptor.timeout_minutes(),
        outputs,
        steps,
    })
}

/// `needs.detection.outputs.success == 'true'`
pub fn detection_passed() -> Condition {
    Condition::equals(
        Condition::property(format!("needs.{}.outputs.success", DETECTION_JOB)),
        Condition::literal("true"),
    )
}

/// Download the agent output and export its path as `GH_AW_AGENT_OUTPUT`.
fn agent_output_steps(actions: &dyn ActionResolver) -> Result<Vec<Step>, AppError> {
    Ok(vec![
        Step::named("Download agent output artifact")
            .continue_on_error()
            .uses(actions.resolve("actions/download-artifact")?)
            .with("name", AGENT_OUTPUT_ARTIFACT)
            .with("path", SAFE_OUTPUTS_DIR),
        Step::named("Setup agent output environment variable").run(format!(
            "mkdir -p {dir}\nfind \"{dir}\" -type f -print\necho \"GH_AW_AGENT_OUTPUT={dir}{file}\" >> \"$GITHUB_ENV\"\n",
            dir = SAFE_OUTPUTS_DIR,
            file = AGENT_OUTPUT_ARTIFACT,
        )),
    ])
}

fn workspace_steps(
    workspace: Workspace,
    credential: &Credential,
    target: &TargetSpec,
    actions: &dyn ActionResolver,
) -> Result<Vec<Step>, AppError> {
    let download = match workspace {
        Workspace::None => return Ok(Vec::new()),
        Workspace::Patch => Step::named("Download patch artifact")
            .continue_on_error()
            .uses(actions.resolve("actions/download-artifact")?)
            .with("name", PATCH_ARTIFACT)
            .with("path", "/tmp/gh-aw/"),
        Workspace::Assets => Step::named("Download assets")
            .continue_on_error()
            .uses(actions.resolve("actions/download-artifact")?)
            .with("name", ASSETS_ARTIFACT)
            .with("path", format!("{}assets/", SAFE_OUTPUTS_DIR)),
    };

    let mut checkout = Step::named("Checkout repository")
        .uses(actions.resolve("actions/checkout")?)
        .with("token", credential.as_str())
        .with("persist-credentials", "false")
        .with("fetch-depth", "0");
    if let Some(repo) = &target.repo_slug {
        checkout = checkout.with("repository", repo.as_str());
    }

    let repo_name = target.repo_slug.as_deref().unwrap_or("${{ github.repository }}");
    let configure = Step::named("Configure Git credentials")
        .env("REPO_NAME", repo_name)
        .env("SERVER_URL", "${{ github.server_url }}")
        .env("GIT_TOKEN", credential.as_str())
        .run(
            "git config --global user.email \"github-actions[bot]@users.noreply.github.com\"\n\
             git config --global user.name \"github-actions[bot]\"\n\
             SERVER_URL_STRIPPED=\"${SERVER_URL#https://}\"\n\
             git remote set-url origin \"https://x-access-token:${GIT_TOKEN}@${SERVER_URL_STRIPPED}/${REPO_NAME}.git\"\n",
        );

    Ok(vec![download, checkout, configure])
}
