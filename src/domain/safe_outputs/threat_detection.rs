//! `safe-outputs.threat-detection` configuration.

use serde_yaml::Value;

use crate::domain::AppError;
use crate::domain::job::Step;
use crate::domain::safe_outputs::config_map::{ConfigMap, type_name};

const KEY: &str = "threat-detection";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectionMode {
    Disabled,
    AiAnalysis,
    CustomSteps,
    AiAnalysisWithCustomSteps,
}

impl DetectionMode {
    /// Value of `GH_AW_DETECTION_MODE` read by the verdict parser.
    pub fn label(self) -> &'static str {
        match self {
            DetectionMode::Disabled => "disabled",
            DetectionMode::AiAnalysis => "ai",
            DetectionMode::CustomSteps => "custom",
            DetectionMode::AiAnalysisWithCustomSteps => "ai+custom",
        }
    }
}

/// Engine used for the AI analysis.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum EngineOverride {
    /// The workflow's engine.
    #[default]
    Inherit,
    Named(String),
    /// `engine: false`: no AI analysis.
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThreatDetectionConfig {
    enabled: bool,
    /// Appended to the built-in analysis prompt.
    pub prompt: Option<String>,
    pub engine: EngineOverride,
    /// Run after the analysis, or instead of it when the engine is disabled.
    pub steps: Vec<Step>,
}

impl Default for ThreatDetectionConfig {
    fn default() -> Self {
        Self { enabled: true, prompt: None, engine: EngineOverride::Inherit, steps: Vec::new() }
    }
}

impl ThreatDetectionConfig {
    pub fn disabled() -> Self {
        Self { enabled: false, ..Self::default() }
    }

    /// Parse the value of `threat-detection`: a boolean shorthand or a map.
    pub fn parse(value: &Value) -> Result<Self, AppError> {
        match value {
            Value::Null | Value::Bool(true) => Ok(Self::default()),
            Value::Bool(false) => Ok(Self::disabled()),
            Value::Mapping(_) => Self::parse_map(value),
            other => Err(AppError::invalid_config(
                KEY,
                format!("expected a boolean or a mapping, got {}", type_name(other)),
            )),
        }
    }

    fn parse_map(value: &Value) -> Result<Self, AppError> {
        let map = ConfigMap::new(KEY, value)?;
        let enabled = map.bool("enabled")?.unwrap_or(true);
        let prompt = map.string("prompt")?.filter(|p| !p.trim().is_empty());

        let engine = match map.value("engine") {
            None | Some(Value::Null) => EngineOverride::Inherit,
            Some(Value::Bool(false)) => EngineOverride::Disabled,
            Some(Value::String(id)) if !id.trim().is_empty() => EngineOverride::Named(id.trim().to_string()),
            Some(Value::Mapping(engine)) => match engine.get("id").and_then(Value::as_str) {
                Some(id) if !id.trim().is_empty() => EngineOverride::Named(id.trim().to_string()),
                _ => return Err(AppError::invalid_config(KEY, "engine mapping needs an 'id'")),
            },
            Some(other) => {
                return Err(AppError::invalid_config(
                    KEY,
                    format!("'engine' must be an engine id or false, got {}", type_name(other)),
                ));
            }
        };

        let steps = match map.value("steps") {
            None | Some(Value::Null) => Vec::new(),
            Some(steps) => serde_yaml::from_value::<Vec<Step>>(steps.clone()).map_err(|e| {
                AppError::invalid_config(KEY, format!("invalid steps: {}", e))
            })?,
        };
        map.finish()?;

        if enabled && engine == EngineOverride::Disabled && steps.is_empty() {
            return Err(AppError::invalid_config(
                KEY,
                "engine: false leaves nothing to run; add steps or disable threat detection",
            ));
        }

        Ok(Self { enabled, prompt, engine, steps })
    }

    pub fn mode(&self) -> DetectionMode {
        if !self.enabled {
            return DetectionMode::Disabled;
        }
        match (self.engine == EngineOverride::Disabled, self.steps.is_empty()) {
            (false, true) => DetectionMode::AiAnalysis,
            (true, _) => DetectionMode::CustomSteps,
            (false, false) => DetectionMode::AiAnalysisWithCustomSteps,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.mode() != DetectionMode::Disabled
    }

    pub fn runs_ai(&self) -> bool {
        matches!(self.mode(), DetectionMode::AiAnalysis | DetectionMode::AiAnalysisWithCustomSteps)
    }
}
