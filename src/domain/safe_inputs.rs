//! `safe-inputs` tools and the secrets they pass to the main job.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::domain::AppError;
use crate::domain::job::VarMap;

/// One tool definition. Only the environment matters to this crate; the
/// remaining fields belong to the tool gateway.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SafeInputTool {
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub env: VarMap,
    #[serde(flatten)]
    pub other: BTreeMap<String, serde_yaml::Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(transparent)]
pub struct SafeInputsConfig {
    pub tools: BTreeMap<String, SafeInputTool>,
}

impl SafeInputsConfig {
    pub fn parse(value: &serde_yaml::Value) -> Result<Self, AppError> {
        serde_yaml::from_value(value.clone()).map_err(|e| AppError::ParseError {
            what: "safe-inputs".into(),
            details: e.to_string(),
        })
    }

    /// Union of the tools' environment variables, sorted by name.
    ///
    /// Two tools binding the same name to different values is an error.
    pub fn collect_env(&self) -> Result<BTreeMap<String, String>, AppError> {
        let mut collected: BTreeMap<String, (String, &str)> = BTreeMap::new();
        for (tool, definition) in &self.tools {
            for (name, value) in definition.env.iter() {
                match collected.get(name) {
                    Some((existing, owner)) if existing != value => {
                        return Err(AppError::config_error(format!(
                            "safe-inputs: '{}' is bound to different values by tools '{}' and '{}'",
                            name, owner, tool
                        )));
                    }
                    Some(_) => {}
                    None => {
                        collected.insert(name.to_string(), (value.to_string(), tool.as_str()));
                    }
                }
            }
        }
        Ok(collected.into_iter().map(|(name, (value, _))| (name, value)).collect())
    }

    /// Names of the secrets referenced by [`Self::collect_env`].
    pub fn secret_names(&self) -> Result<Vec<String>, AppError> {
        let mut names: Vec<String> = self
            .collect_env()?
            .values()
            .flat_map(|value| secret_references(value))
            .collect();
        names.sort();
        names.dedup();
        Ok(names)
    }
}

/// `secrets.NAME` references inside an expression.
fn secret_references(expression: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = expression;
    while let Some(pos) = rest.find("secrets.") {
        let tail = &rest[pos + "secrets.".len()..];
        let name: String =
            tail.chars().take_while(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
        if !name.is_empty() {
            found.push(name);
        }
        rest = tail;
    }
    found
}
