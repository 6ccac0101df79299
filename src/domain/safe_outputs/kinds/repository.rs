use crate::domain::AppError;
use crate::domain::job::Step;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{KindConfig, KindDescriptor, KindEnv, PostStepContext};

const DEFAULT_ASSET_EXTS: &[&str] = &[".png", ".jpg", ".jpeg"];
const DEFAULT_ASSET_MAX_KB: u32 = 10240;

#[derive(Debug)]
pub(super) struct UploadAsset {
    base: BaseOutputConfig,
    branch: String,
    max_size_kb: u32,
    allowed_exts: Vec<String>,
}

pub(super) fn parse_upload_asset(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let branch = map.string("branch")?.unwrap_or_else(|| "assets/${{ github.workflow }}".into());
    if branch.trim().is_empty() {
        return Err(AppError::invalid_config(map.kind(), "'branch' cannot be empty"));
    }
    let max_size_kb = map.u32("max-size")?.unwrap_or(DEFAULT_ASSET_MAX_KB);
    if max_size_kb == 0 {
        return Err(AppError::invalid_config(map.kind(), "'max-size' must be at least 1 KB"));
    }
    let mut allowed_exts = map.string_list("allowed-exts")?;
    if allowed_exts.is_empty() {
        allowed_exts = DEFAULT_ASSET_EXTS.iter().map(|e| e.to_string()).collect();
    }
    if let Some(bad) = allowed_exts.iter().find(|e| !e.starts_with('.')) {
        return Err(AppError::invalid_config(
            map.kind(),
            format!("extension '{}' must start with a dot", bad),
        ));
    }
    Ok(Box::new(UploadAsset { base, branch, max_size_kb, allowed_exts }))
}

impl KindConfig for UploadAsset {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set("BRANCH", self.branch.as_str());
        env.set("MAX_SIZE_KB", self.max_size_kb.to_string());
        env.set_list("ALLOWED_EXTS", &self.allowed_exts);
    }
}

#[derive(Debug)]
pub(super) struct UpdateRelease {
    base: BaseOutputConfig,
}

pub(super) fn parse_update_release(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(UpdateRelease { base: map.base(descriptor.default_max)? }))
}

impl KindConfig for UpdateRelease {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }
}

#[derive(Debug)]
pub(super) struct CreateCommitStatus {
    base: BaseOutputConfig,
    context: Option<String>,
}

pub(super) fn parse_create_commit_status(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(CreateCommitStatus { base, context: map.string("context")? }))
}

impl KindConfig for CreateCommitStatus {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        let context = self.context.clone().unwrap_or_else(|| env.workflow_name.to_string());
        env.set("CONTEXT", context);
        env.set("SHA", "${{ github.event.pull_request.head.sha || github.sha }}");
    }
}

#[derive(Debug)]
pub(super) struct DispatchWorkflow {
    base: BaseOutputConfig,
    workflows: Vec<String>,
}

pub(super) fn parse_dispatch_workflow(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let workflows = map.string_list("workflows")?;
    if workflows.is_empty() {
        return Err(AppError::invalid_config(map.kind(), "'workflows' must list at least one workflow"));
    }
    Ok(Box::new(DispatchWorkflow { base, workflows }))
}

impl KindConfig for DispatchWorkflow {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("ALLOWED_WORKFLOWS", &self.workflows);
        env.set("REF", "${{ github.ref }}");
    }
}

#[derive(Debug)]
pub(super) struct CreateCodeScanningAlert {
    base: BaseOutputConfig,
    driver: Option<String>,
}

pub(super) fn parse_create_code_scanning_alert(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(CreateCodeScanningAlert { base, driver: map.string("driver")? }))
}

impl KindConfig for CreateCodeScanningAlert {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        let filename = workflow_filename(env.workflow_name);
        env.set_raw("GH_AW_WORKFLOW_FILENAME", filename);
        env.set_opt("DRIVER", self.driver.as_deref());
    }

    fn post_steps(&self, ctx: &PostStepContext<'_>) -> Result<Vec<Step>, AppError> {
        let produced = format!("steps.{}.outputs.sarif_file != ''", ctx.step_id);
        let sarif = format!("${{{{ steps.{}.outputs.sarif_file }}}}", ctx.step_id);
        Ok(vec![
            Step::named("Upload SARIF artifact")
                .when(produced.clone())
                .uses(ctx.actions.resolve("actions/upload-artifact")?)
                .with("name", "code-scanning-alert.sarif")
                .with("path", sarif.clone()),
            Step::named("Upload SARIF to GitHub Security")
                .when(produced)
                .uses(ctx.actions.resolve("github/codeql-action/upload-sarif")?)
                .with("sarif_file", sarif)
                .with("token", ctx.credential.as_str()),
        ])
    }
}

/// Lower-cased, dash-separated workflow name.
fn workflow_filename(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.ends_with('-') && !out.is_empty() {
            out.push('-');
        }
    }
    out.trim_end_matches('-').to_string()
}
