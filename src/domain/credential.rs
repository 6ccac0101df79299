//! Credential precedence for safe-output jobs.

use std::fmt;

/// Token used when no level configures one.
pub const DEFAULT_GITHUB_TOKEN: &str = "${{ secrets.GH_AW_GITHUB_TOKEN || secrets.GITHUB_TOKEN }}";

/// Token minted by the GitHub App step of the same job.
pub const APP_TOKEN: &str = "${{ steps.app-token.outputs.token }}";

/// The configured token at each precedence level, highest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct CredentialChain<'a> {
    pub kind: Option<&'a str>,
    pub safe_outputs: Option<&'a str>,
    pub workflow: Option<&'a str>,
}

/// A token expression baked into a job at compile time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn app_token() -> Self {
        Credential(APP_TOKEN.to_string())
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl CredentialChain<'_> {
    /// Highest-precedence non-empty value, or the platform default.
    pub fn resolve(&self) -> Credential {
        [self.kind, self.safe_outputs, self.workflow]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|token| !token.is_empty())
            .map(|token| Credential(token.to_string()))
            .unwrap_or_else(|| Credential(DEFAULT_GITHUB_TOKEN.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn falls_back_to_platform_default() {
        assert_eq!(CredentialChain::default().resolve().as_str(), DEFAULT_GITHUB_TOKEN);
    }

    #[test]
    fn empty_levels_are_skipped() {
        let chain = CredentialChain {
            kind: Some(""),
            safe_outputs: Some("  "),
            workflow: Some("${{ secrets.WORKFLOW_PAT }}"),
        };
        assert_eq!(chain.resolve().as_str(), "${{ secrets.WORKFLOW_PAT }}");
    }

    #[test]
    fn kind_level_wins() {
        let chain = CredentialChain {
            kind: Some("${{ secrets.KIND }}"),
            safe_outputs: Some("${{ secrets.BLOCK }}"),
            workflow: Some("${{ secrets.WORKFLOW }}"),
        };
        assert_eq!(chain.resolve().as_str(), "${{ secrets.KIND }}");
    }

    fn level() -> impl Strategy<Value = Option<String>> {
        prop_oneof![
            Just(None),
            Just(Some(String::new())),
            "[A-Z]{1,8}".prop_map(|s| Some(format!("${{{{ secrets.{} }}}}", s))),
        ]
    }

    proptest! {
        #[test]
        fn resolution_is_highest_non_empty(kind in level(), block in level(), workflow in level()) {
            let chain = CredentialChain {
                kind: kind.as_deref(),
                safe_outputs: block.as_deref(),
                workflow: workflow.as_deref(),
            };
            let expected = [&kind, &block, &workflow]
                .into_iter()
                .flatten()
                .find(|v| !v.is_empty())
                .cloned()
                .unwrap_or_else(|| DEFAULT_GITHUB_TOKEN.to_string());
            let resolved = chain.resolve();
            prop_assert_eq!(resolved.as_str(), expected.as_str());
        }
    }
}
