//! The parsed workflow front matter consumed by the compiler.

use serde::Deserialize;
use serde_yaml::Value;

use crate::domain::AppError;
use crate::domain::safe_inputs::SafeInputsConfig;
use crate::domain::safe_outputs::SafeOutputsConfig;
use crate::domain::safe_outputs::config_map::type_name;
use crate::domain::target::TriggerEvents;

pub const DEFAULT_MAIN_JOB: &str = "agent";
pub const DEFAULT_RUNS_ON: &str = "ubuntu-latest";
pub const DEFAULT_ENGINE: &str = "copilot";

/// Front-matter keys read here. Other keys belong to other subsystems and
/// are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct RawSpec {
    name: Option<String>,
    main_job: Option<String>,
    on: Option<Value>,
    github_token: Option<String>,
    runs_on: Option<String>,
    engine: Option<Value>,
    safe_outputs: Option<Value>,
    safe_inputs: Option<Value>,
}

#[derive(Debug)]
pub struct WorkflowSpec {
    pub name: String,
    pub main_job: String,
    pub triggers: TriggerEvents,
    pub github_token: Option<String>,
    pub runs_on: String,
    /// Engine id of the main job; the default for detection.
    pub engine: String,
    pub safe_outputs: Option<SafeOutputsConfig>,
    pub safe_inputs: SafeInputsConfig,
}

impl WorkflowSpec {
    pub fn from_yaml_str(source: &str) -> Result<Self, AppError> {
        let raw: RawSpec = serde_yaml::from_str(source).map_err(|e| AppError::ParseError {
            what: "workflow spec".into(),
            details: e.to_string(),
        })?;

        let name = raw.name.map(|n| n.trim().to_string()).filter(|n| !n.is_empty());
        let name = name.ok_or_else(|| AppError::config_error("workflow 'name' is required"))?;

        let main_job = raw.main_job.unwrap_or_else(|| DEFAULT_MAIN_JOB.to_string());
        if !is_job_name(&main_job) {
            return Err(AppError::config_error(format!(
                "main-job '{}' is not a valid job name",
                main_job
            )));
        }

        let triggers = match &raw.on {
            None => TriggerEvents::default(),
            Some(on) => parse_triggers(on)?,
        };

        let engine = match raw.engine {
            None => DEFAULT_ENGINE.to_string(),
            Some(Value::String(id)) => id,
            Some(Value::Mapping(map)) => map
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| AppError::config_error("engine mapping needs an 'id'"))?,
            Some(other) => {
                return Err(AppError::config_error(format!(
                    "engine must be an id or a mapping, got {}",
                    type_name(&other)
                )));
            }
        };

        let safe_outputs = match &raw.safe_outputs {
            None | Some(Value::Null) => None,
            Some(value) => Some(SafeOutputsConfig::parse(value)?),
        };

        let safe_inputs = match &raw.safe_inputs {
            None | Some(Value::Null) => SafeInputsConfig::default(),
            Some(value) => SafeInputsConfig::parse(value)?,
        };

        Ok(Self {
            name,
            main_job,
            triggers,
            github_token: raw.github_token.filter(|t| !t.trim().is_empty()),
            runs_on: raw.runs_on.unwrap_or_else(|| DEFAULT_RUNS_ON.to_string()),
            engine,
            safe_outputs,
            safe_inputs,
        })
    }

    /// Run target of the safe-output jobs.
    pub fn safe_output_runs_on(&self) -> &str {
        self.safe_outputs
            .as_ref()
            .and_then(|so| so.runs_on.as_deref())
            .unwrap_or(&self.runs_on)
    }
}

/// `on:` as a single event, a list of events, or a map keyed by event.
fn parse_triggers(on: &Value) -> Result<TriggerEvents, AppError> {
    match on {
        Value::String(event) => Ok(TriggerEvents::new([event.clone()])),
        Value::Sequence(events) => {
            let names = events
                .iter()
                .map(|e| {
                    e.as_str().map(str::to_string).ok_or_else(|| {
                        AppError::config_error(format!("trigger events must be names, got {}", type_name(e)))
                    })
                })
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TriggerEvents::new(names))
        }
        Value::Mapping(map) => Ok(TriggerEvents::new(map.keys().filter_map(Value::as_str))),
        other => Err(AppError::config_error(format!(
            "'on' must be an event name, a list or a mapping, got {}",
            type_name(other)
        ))),
    }
}

fn is_job_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
