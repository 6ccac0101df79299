//! Runtime scripts and prompts rendered with minijinja.

use std::sync::OnceLock;

use minijinja::{Environment, UndefinedBehavior};

use crate::adapters::embedded_assets;
use crate::domain::AppError;
use crate::ports::{ScriptCatalog, ScriptVars};

const SCRIPT_DIR: &str = "scripts";
const PROMPT_DIR: &str = "prompts";
const SCRIPT_EXT: &str = ".cjs";
const PROMPT_EXT: &str = ".md";

/// Templates from `src/assets/scripts` and `src/assets/prompts`, registered by file name.
pub struct EmbeddedScriptCatalog {
    env: Environment<'static>,
}

static SHARED: OnceLock<Result<EmbeddedScriptCatalog, String>> = OnceLock::new();

impl EmbeddedScriptCatalog {
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        for dir in [SCRIPT_DIR, PROMPT_DIR] {
            for (name, source) in embedded_assets::files_in(dir)? {
                env.add_template(name, source).map_err(|e| {
                    AppError::InternalError(format!("Failed to register template '{}': {}", name, e))
                })?;
            }
        }

        Ok(Self { env })
    }

    /// Process-wide catalog, built on first use.
    pub fn shared() -> Result<&'static Self, AppError> {
        SHARED
            .get_or_init(|| Self::new().map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| AppError::InternalError(e.clone()))
    }

    fn render(&self, template_name: &str, vars: &ScriptVars) -> Result<String, AppError> {
        let template = self.env.get_template(template_name).map_err(|e| {
            AppError::InternalError(format!("Failed to load template '{}': {}", template_name, e))
        })?;
        template.render(vars).map_err(|e| {
            AppError::InternalError(format!("Failed to render template '{}': {}", template_name, e))
        })
    }
}

impl ScriptCatalog for EmbeddedScriptCatalog {
    fn render_script(&self, name: &str, vars: &ScriptVars) -> Result<String, AppError> {
        self.render(&format!("{}{}", name, SCRIPT_EXT), vars)
    }

    fn render_prompt(&self, name: &str, vars: &ScriptVars) -> Result<String, AppError> {
        self.render(&format!("{}{}", name, PROMPT_EXT), vars)
    }

    fn has_script(&self, name: &str) -> bool {
        self.env.get_template(&format!("{}{}", name, SCRIPT_EXT)).is_ok()
    }
}
