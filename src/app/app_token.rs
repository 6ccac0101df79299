//! GitHub App token steps shared by every safe-output job.

use crate::domain::credential::APP_TOKEN;
use crate::domain::safe_outputs::GitHubAppConfig;
use crate::domain::{AppError, Permissions, Step};
use crate::ports::ActionResolver;

pub const MINT_STEP_ID: &str = "app-token";

/// Mint a token limited to `permissions`.
pub fn mint_step(
    app: &GitHubAppConfig,
    permissions: &Permissions,
    actions: &dyn ActionResolver,
) -> Result<Step, AppError> {
    let mut step = Step::named("Generate GitHub App token")
        .id(MINT_STEP_ID)
        .uses(actions.resolve("actions/create-github-app-token")?)
        .with("app-id", app.app_id.as_str())
        .with("private-key", app.private_key.as_str())
        .with("owner", app.owner.as_deref().unwrap_or("${{ github.repository_owner }}"));

    let repositories = if app.repositories.is_empty() {
        "${{ github.event.repository.name }}".to_string()
    } else {
        app.repositories.join(",")
    };
    step = step.with("repositories", repositories);

    for (input, level) in permissions.app_token_inputs() {
        step = step.with(input, level);
    }
    Ok(step)
}

/// Revoke the minted token even when earlier steps failed.
pub fn revoke_step() -> Step {
    Step::named("Invalidate GitHub App token")
        .when(format!("always() && steps.{}.outputs.token != ''", MINT_STEP_ID))
        .env("GH_TOKEN", APP_TOKEN)
        .run("gh api --method DELETE /installation/token\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::EMBEDDED;
    use crate::domain::{PermissionLevel, PermissionScope};

    fn app(repositories: &[&str]) -> GitHubAppConfig {
        GitHubAppConfig {
            app_id: "${{ vars.APP_ID }}".into(),
            private_key: "${{ secrets.APP_KEY }}".into(),
            owner: None,
            repositories: repositories.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn mint_step_scopes_token_to_job_permissions() {
        let permissions = Permissions::from_grants(&[
            (PermissionScope::Contents, PermissionLevel::Read),
            (PermissionScope::PullRequests, PermissionLevel::Write),
        ]);
        let step = mint_step(&app(&[]), &permissions, &EMBEDDED).unwrap();
        assert_eq!(step.id.as_deref(), Some("app-token"));
        assert!(step.uses.as_deref().unwrap().starts_with("actions/create-github-app-token@"));
        assert_eq!(step.with.get("permission-contents"), Some("read"));
        assert_eq!(step.with.get("permission-pull-requests"), Some("write"));
        assert_eq!(step.with.get("permission-issues"), None);
        assert_eq!(step.with.get("repositories"), Some("${{ github.event.repository.name }}"));
    }

    #[test]
    fn listed_repositories_are_joined() {
        let step = mint_step(&app(&["docs", "site"]), &Permissions::new(), &EMBEDDED).unwrap();
        assert_eq!(step.with.get("repositories"), Some("docs,site"));
    }

    #[test]
    fn revoke_runs_always_when_a_token_exists() {
        let step = revoke_step();
        assert_eq!(step.condition.as_deref(), Some("always() && steps.app-token.outputs.token != ''"));
        assert!(step.run.as_deref().unwrap().contains("DELETE"));
    }
}
