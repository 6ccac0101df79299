//! The threat detection gate.
//!
//! The gate runs between the main job and every safe-output job. Its parse
//! step sets `success` to `false` before reading the verdict and fails the job
//! on any flagged, missing or malformed verdict, so dependents are skipped.

use tracing::debug;

use crate::app::builder::{AGENT_OUTPUT_ARTIFACT, BuildContext, DETECTION_JOB, PATCH_ARTIFACT};
use crate::domain::safe_outputs::threat_detection::{DetectionMode, EngineOverride};
use crate::domain::{AppError, Condition, Job, Permissions, Step};
use crate::ports::{EngineCatalog, ScriptVars};

const DETECTION_DIR: &str = "/tmp/gh-aw/threat-detection";
const PARSE_STEP_ID: &str = "parse_results";

fn prompt_file() -> String {
    format!("{}/prompt.txt", DETECTION_DIR)
}

fn log_file() -> String {
    format!("{}/detection.log", DETECTION_DIR)
}

fn verdict_file() -> String {
    format!("{}/verdict.json", DETECTION_DIR)
}

/// Build the gate job, or `None` when detection is disabled.
pub fn build_detection_job(
    ctx: &BuildContext<'_>,
    engines: &dyn EngineCatalog,
) -> Result<Option<Job>, AppError> {
    let config = &ctx.safe_outputs.threat_detection;
    let mode = config.mode();
    if mode == DetectionMode::Disabled {
        return Ok(None);
    }
    let main_job = ctx.spec.main_job.as_str();

    let download = |name: &str, artifact: &str| -> Result<Step, AppError> {
        Ok(Step::named(name)
            .continue_on_error()
            .uses(ctx.actions.resolve("actions/download-artifact")?)
            .with("name", artifact)
            .with("path", format!("{}/", DETECTION_DIR)))
    };

    let mut steps = vec![
        download("Download agent output artifact", AGENT_OUTPUT_ARTIFACT)?,
        download("Download patch artifact", PATCH_ARTIFACT)?,
        Step::named("Ensure threat-detection directory and log").run(format!(
            "mkdir -p {}\ntouch {}\n",
            DETECTION_DIR,
            log_file()
        )),
    ];

    if config.runs_ai() {
        let engine_id = match &config.engine {
            EngineOverride::Named(id) => id.as_str(),
            EngineOverride::Inherit | EngineOverride::Disabled => ctx.spec.engine.as_str(),
        };
        let engine = engines.engine(engine_id)?;

        let prompt = ctx.scripts.render_prompt(
            "threat_detection",
            &ScriptVars::from([
                ("workflow_name", ctx.spec.name.clone()),
                ("custom_prompt", config.prompt.clone().unwrap_or_default()),
            ]),
        )?;
        let prompt_json = serde_json::to_string(&prompt).map_err(|e| {
            AppError::InternalError(format!("Failed to encode detection prompt: {}", e))
        })?;
        let setup = ctx
            .scripts
            .render_script("setup_threat_detection", &ScriptVars::from([("prompt_json", prompt_json)]))?;

        steps.push(
            Step::named("Setup threat detection")
                .uses(ctx.actions.resolve("actions/github-script")?)
                .env("GH_AW_DETECTION_PROMPT", prompt_file())
                .with("script", setup),
        );
        steps.extend(engine.installation_steps(ctx.actions)?);
        steps.extend(engine.execution_steps(&prompt_file(), &log_file()));
        debug!(engine = engine.id(), "threat detection runs AI analysis");
    }

    steps.extend(config.steps.iter().cloned());

    let parse = ctx.scripts.render_script("parse_threat_detection", &ScriptVars::new())?;
    steps.push(
        Step::named("Parse threat detection results")
            .id(PARSE_STEP_ID)
            .uses(ctx.actions.resolve("actions/github-script")?)
            .env("GH_AW_DETECTION_MODE", mode.label())
            .env("GH_AW_DETECTION_LOG", log_file())
            .env("GH_AW_DETECTION_VERDICT", verdict_file())
            .with("script", parse),
    );
    steps.push(
        Step::named("Upload threat detection log")
            .when("always()")
            .uses(ctx.actions.resolve("actions/upload-artifact")?)
            .with("name", "threat-detection.log")
            .with("path", log_file())
            .with("if-no-files-found", "ignore"),
    );

    let condition = Condition::and([
        Condition::negate(Condition::call("cancelled", vec![])),
        Condition::equals(
            Condition::property(format!("needs.{}.result", main_job)),
            Condition::literal("success"),
        ),
    ]);

    debug!(mode = ?mode, "built threat detection job");

    Ok(Some(Job {
        name: DETECTION_JOB.to_string(),
        needs: vec![main_job.to_string()],
        condition: Some(condition.render()),
        runs_on: ctx.spec.safe_output_runs_on().to_string(),
        permissions: Permissions::new(),
        timeout_minutes: 10,
        outputs: [(
            "success".to_string(),
            format!("${{{{ steps.{}.outputs.success }}}}", PARSE_STEP_ID),
        )]
        .into_iter()
        .collect(),
        steps,
    }))
}
