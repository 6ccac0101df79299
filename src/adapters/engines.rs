//! Built-in detection engines: each one installs a CLI with npm and runs it once.

use crate::domain::{AppError, Step};
use crate::ports::{ActionResolver, DetectionEngine, EngineCatalog};

const NODE_VERSION: &str = "24";

#[derive(Debug, Clone, Copy)]
pub struct CliEngine {
    id: &'static str,
    display_name: &'static str,
    package: &'static str,
    /// `(env var, expression)` pairs the CLI authenticates with.
    secrets: &'static [(&'static str, &'static str)],
    /// Shell command; `$PROMPT` holds the prompt text.
    command: &'static str,
}

const ENGINES: &[CliEngine] = &[
    CliEngine {
        id: "claude",
        display_name: "Claude Code",
        package: "@anthropic-ai/claude-code",
        secrets: &[("ANTHROPIC_API_KEY", "${{ secrets.ANTHROPIC_API_KEY }}")],
        command: "claude --print --allowed-tools Read \"$PROMPT\"",
    },
    CliEngine {
        id: "codex",
        display_name: "Codex",
        package: "@openai/codex",
        secrets: &[
            ("CODEX_API_KEY", "${{ secrets.CODEX_API_KEY || secrets.OPENAI_API_KEY }}"),
        ],
        command: "codex exec --skip-git-repo-check --sandbox read-only \"$PROMPT\"",
    },
    CliEngine {
        id: "copilot",
        display_name: "GitHub Copilot CLI",
        package: "@github/copilot",
        secrets: &[("COPILOT_GITHUB_TOKEN", "${{ secrets.COPILOT_GITHUB_TOKEN }}")],
        command: "copilot --allow-tool 'shell(cat)' --prompt \"$PROMPT\"",
    },
];

impl DetectionEngine for CliEngine {
    fn id(&self) -> &str {
        self.id
    }

    fn installation_steps(&self, actions: &dyn ActionResolver) -> Result<Vec<Step>, AppError> {
        Ok(vec![
            Step::named("Setup Node.js")
                .uses(actions.resolve("actions/setup-node")?)
                .with("node-version", NODE_VERSION),
            Step::named(format!("Install {}", self.display_name))
                .run(format!("npm install -g {}\n", self.package)),
        ])
    }

    fn execution_steps(&self, prompt_file: &str, log_file: &str) -> Vec<Step> {
        let script = format!(
            "set -o pipefail\nPROMPT=\"$(cat {prompt})\"\n{command} 2>&1 | tee -a {log}\n",
            prompt = prompt_file,
            command = self.command,
            log = log_file,
        );
        let mut step = Step::named(format!("Execute {}", self.display_name)).id("detection_engine");
        for (name, value) in self.secrets {
            step = step.env(*name, *value);
        }
        vec![step.run(script)]
    }
}

/// The engines shipped with the binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct BuiltinEngines;

impl BuiltinEngines {
    pub fn ids() -> impl Iterator<Item = &'static str> {
        ENGINES.iter().map(|engine| engine.id)
    }
}

impl EngineCatalog for BuiltinEngines {
    fn engine(&self, id: &str) -> Result<Box<dyn DetectionEngine>, AppError> {
        ENGINES
            .iter()
            .find(|engine| engine.id == id)
            .map(|engine| Box::new(*engine) as Box<dyn DetectionEngine>)
            .ok_or_else(|| {
                AppError::invalid_config(
                    "threat-detection",
                    format!(
                        "unknown engine '{}'; available: {}",
                        id,
                        Self::ids().collect::<Vec<_>>().join(", ")
                    ),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::action_pins::EMBEDDED;

    #[test]
    fn every_engine_installs_and_runs() {
        for id in BuiltinEngines::ids() {
            let engine = BuiltinEngines.engine(id).unwrap();
            assert_eq!(engine.id(), id);
            let install = engine.installation_steps(&EMBEDDED).unwrap();
            assert!(install[0].uses.as_deref().unwrap().starts_with("actions/setup-node@"));

            let run = engine.execution_steps("/tmp/p.txt", "/tmp/l.log");
            assert_eq!(run.len(), 1);
            let script = run[0].run.as_deref().unwrap();
            assert!(script.contains("cat /tmp/p.txt"));
            assert!(script.contains("tee -a /tmp/l.log"));
            assert!(!run[0].env.is_empty());
        }
    }

    #[test]
    fn unknown_engine_lists_the_available_ones() {
        let err = BuiltinEngines.engine("gemini").err().unwrap();
        let message = err.to_string();
        assert!(message.contains("threat-detection"), "{}", message);
        assert!(message.contains("claude, codex, copilot"), "{}", message);
    }
}
