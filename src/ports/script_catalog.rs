use std::collections::BTreeMap;

use crate::domain::AppError;

/// Variables substituted into a script or prompt template.
pub type ScriptVars = BTreeMap<&'static str, String>;

/// Port for the runtime scripts and prompts embedded in emitted steps.
pub trait ScriptCatalog {
    /// Render the runtime script `name` (without extension).
    fn render_script(&self, name: &str, vars: &ScriptVars) -> Result<String, AppError>;

    /// Render the prompt `name` (without extension).
    fn render_prompt(&self, name: &str, vars: &ScriptVars) -> Result<String, AppError>;

    fn has_script(&self, name: &str) -> bool;
}
