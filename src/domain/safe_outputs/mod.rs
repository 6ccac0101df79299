//! The `safe-outputs` block: global settings plus one entry per kind.

pub mod config_map;
pub mod descriptor;
pub mod kinds;
pub mod threat_detection;

use serde_yaml::Value;

use crate::domain::AppError;
use crate::domain::job::{VarMap, scalar_to_string};
use crate::domain::safe_outputs::config_map::{ConfigMap, type_name};
use crate::domain::safe_outputs::descriptor::ConfiguredKind;
use crate::domain::safe_outputs::threat_detection::ThreatDetectionConfig;

pub use descriptor::{KindConfig, KindDescriptor, Workspace};
pub use kinds::{KINDS, lookup};

/// Default cap on the patch produced by the agent, in KB.
pub const DEFAULT_MAX_PATCH_SIZE: u32 = 1024;

const GLOBAL_KEYS: &[&str] = &[
    "github-token",
    "staged",
    "env",
    "threat-detection",
    "app",
    "max-patch-size",
    "runs-on",
    "allowed-domains",
];

/// GitHub App used to mint a job-scoped token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitHubAppConfig {
    pub app_id: String,
    pub private_key: String,
    pub owner: Option<String>,
    pub repositories: Vec<String>,
}

impl GitHubAppConfig {
    fn parse(value: &Value) -> Result<Self, AppError> {
        let map = ConfigMap::new("app", value)?;
        let app_id = map.string("app-id")?.filter(|s| !s.trim().is_empty());
        let private_key = map.string("private-key")?.filter(|s| !s.trim().is_empty());
        let owner = map.string("owner")?;
        let repositories = map.string_list("repositories")?;
        map.finish()?;
        match (app_id, private_key) {
            (Some(app_id), Some(private_key)) => Ok(Self { app_id, private_key, owner, repositories }),
            _ => Err(AppError::invalid_config("app", "both 'app-id' and 'private-key' are required")),
        }
    }
}

#[derive(Debug)]
pub struct SafeOutputsConfig {
    /// Configured kinds in declaration order.
    pub kinds: Vec<ConfiguredKind>,
    pub github_token: Option<String>,
    pub staged: bool,
    /// Appended last to every script step.
    pub env: VarMap,
    pub threat_detection: ThreatDetectionConfig,
    pub app: Option<GitHubAppConfig>,
    pub max_patch_size: u32,
    pub runs_on: Option<String>,
    pub allowed_domains: Vec<String>,
}

impl SafeOutputsConfig {
    pub fn parse(value: &Value) -> Result<Self, AppError> {
        let Value::Mapping(map) = value else {
            return Err(AppError::config_error(format!(
                "safe-outputs must be a mapping, got {}",
                type_name(value)
            )));
        };

        let mut kinds = Vec::new();
        for (key, entry) in map {
            let Some(key) = key.as_str() else {
                return Err(AppError::config_error("safe-outputs keys must be strings"));
            };
            if GLOBAL_KEYS.contains(&key) {
                continue;
            }
            if let Some(kind) = lookup(key)?.parse_config(Some(entry))? {
                kinds.push(kind);
            }
        }

        let globals = ConfigMap::new("safe-outputs", value)?;
        let github_token = globals.string("github-token")?.filter(|t| !t.trim().is_empty());
        let staged = globals.bool("staged")?.unwrap_or(false);
        let env = match globals.value("env") {
            None | Some(Value::Null) => VarMap::new(),
            Some(Value::Mapping(vars)) => {
                let mut env = VarMap::new();
                for (name, value) in vars {
                    let (Some(name), Some(value)) = (name.as_str(), scalar_to_string(value)) else {
                        return Err(AppError::config_error(
                            "safe-outputs.env must map names to scalar values",
                        ));
                    };
                    env.insert(name, value);
                }
                env
            }
            Some(other) => {
                return Err(AppError::config_error(format!(
                    "safe-outputs.env must be a mapping, got {}",
                    type_name(other)
                )));
            }
        };
        let threat_detection = match globals.value("threat-detection") {
            None => ThreatDetectionConfig::default(),
            Some(value) => ThreatDetectionConfig::parse(value)?,
        };
        let app = globals.value("app").map(GitHubAppConfig::parse).transpose()?;
        let max_patch_size = globals.u32("max-patch-size")?.unwrap_or(DEFAULT_MAX_PATCH_SIZE);
        if max_patch_size == 0 {
            return Err(AppError::config_error("safe-outputs.max-patch-size must be at least 1"));
        }
        let runs_on = globals.string("runs-on")?;
        let allowed_domains = globals.string_list("allowed-domains")?;

        Ok(Self {
            kinds,
            github_token,
            staged,
            env,
            threat_detection,
            app,
            max_patch_size,
            runs_on,
            allowed_domains,
        })
    }

    pub fn kind(&self, key: &str) -> Option<&ConfiguredKind> {
        self.kinds.iter().find(|k| k.key() == key)
    }

    /// Whether a kind whose job is `job_name` is configured.
    pub fn has_job(&self, job_name: &str) -> bool {
        self.kinds.iter().any(|k| k.descriptor.job_name == job_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::safe_outputs::threat_detection::DetectionMode;

    fn parse(src: &str) -> Result<SafeOutputsConfig, AppError> {
        SafeOutputsConfig::parse(&serde_yaml::from_str(src).unwrap())
    }

    #[test]
    fn globals_and_kinds_are_separated() {
        let config = parse(
            "staged: true\nmax-patch-size: 2048\nenv:\n  TEAM: core\n  RETRIES: 3\ncreate-issue:\nadd-comment:\n  max: 2\n",
        )
        .unwrap();
        assert!(config.staged);
        assert_eq!(config.max_patch_size, 2048);
        assert_eq!(config.env.get("RETRIES"), Some("3"));
        let keys: Vec<_> = config.kinds.iter().map(|k| k.key()).collect();
        assert_eq!(keys, ["create-issue", "add-comment"]);
        assert_eq!(config.kind("add-comment").unwrap().config.base().max, 2);
        assert!(config.has_job("create_issue"));
    }

    #[test]
    fn detection_defaults_on() {
        let config = parse("noop:").unwrap();
        assert_eq!(config.threat_detection.mode(), DetectionMode::AiAnalysis);
        assert_eq!(parse("noop:\nthreat-detection: false").unwrap().threat_detection.mode(), DetectionMode::Disabled);
    }

    #[test]
    fn unknown_kind_is_reported_by_name() {
        let err = parse("create-isue:").unwrap_err();
        assert!(matches!(err, AppError::UnknownKind { ref name, .. } if name == "create-isue"));
    }

    #[test]
    fn app_requires_id_and_key() {
        assert!(parse("app:\n  app-id: ${{ vars.APP_ID }}").is_err());
        let config = parse(
            "app:\n  app-id: ${{ vars.APP_ID }}\n  private-key: ${{ secrets.APP_KEY }}\n  repositories: [docs]\n",
        )
        .unwrap();
        let app = config.app.unwrap();
        assert_eq!(app.repositories, ["docs"]);
        assert_eq!(app.owner, None);
    }

    #[test]
    fn nested_env_values_are_rejected() {
        assert!(parse("env:\n  NESTED: {a: 1}").is_err());
    }
}
