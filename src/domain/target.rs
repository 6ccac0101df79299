//! Target resolution: which issue, pull request or discussion a kind acts on,
//! and in which repository.

use std::collections::BTreeSet;

use crate::domain::AppError;
use crate::domain::condition::Condition;

/// Entities a kind can act upon through the triggering event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityScope {
    Issue,
    PullRequest,
    Discussion,
    IssueOrPullRequest,
    /// Issue, pull request or discussion.
    AnyEntity,
    /// The kind does not address an entity.
    None,
}

impl EntityScope {
    pub fn label(&self) -> &'static str {
        match self {
            EntityScope::Issue => "issue",
            EntityScope::PullRequest => "pull request",
            EntityScope::Discussion => "discussion",
            EntityScope::IssueOrPullRequest => "issue or pull request",
            EntityScope::AnyEntity => "issue, pull request or discussion",
            EntityScope::None => "none",
        }
    }

    fn entity_paths(&self) -> &'static [&'static str] {
        match self {
            EntityScope::Issue => &["github.event.issue.number"],
            EntityScope::PullRequest => &["github.event.pull_request.number"],
            EntityScope::Discussion => &["github.event.discussion.number"],
            EntityScope::IssueOrPullRequest => {
                &["github.event.issue.number", "github.event.pull_request.number"]
            }
            EntityScope::AnyEntity => &[
                "github.event.issue.number",
                "github.event.pull_request.number",
                "github.event.discussion.number",
            ],
            EntityScope::None => &[],
        }
    }

    /// Conjunct requiring the triggering event to carry the entity number.
    pub fn triggering_conjunct(&self) -> Option<Condition> {
        match self.entity_paths() {
            [] => None,
            [single] => Some(Condition::property(*single)),
            many => Some(Condition::or(many.iter().map(|p| Condition::property(*p)))),
        }
    }
}

/// Trigger events of the workflow, as declared under `on:`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TriggerEvents {
    events: BTreeSet<String>,
}

impl TriggerEvents {
    pub fn new<I, S>(events: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { events: events.into_iter().map(Into::into).collect() }
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.events.iter().map(String::as_str)
    }

    /// Whether at least one declared event can carry an entity in `scope`.
    pub fn can_carry(&self, scope: EntityScope) -> bool {
        self.events.iter().any(|event| {
            let carries_issue = matches!(event.as_str(), "issues" | "issue_comment");
            let carries_pr = matches!(
                event.as_str(),
                "pull_request"
                    | "pull_request_target"
                    | "pull_request_review"
                    | "pull_request_review_comment"
            );
            let carries_discussion = matches!(event.as_str(), "discussion" | "discussion_comment");
            match scope {
                EntityScope::Issue => carries_issue,
                EntityScope::PullRequest => carries_pr,
                EntityScope::Discussion => carries_discussion,
                EntityScope::IssueOrPullRequest => carries_issue || carries_pr,
                EntityScope::AnyEntity => carries_issue || carries_pr || carries_discussion,
                EntityScope::None => false,
            }
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// The entity of the triggering event.
    Triggering,
    /// Any entity; the agent names it in its output.
    Any,
    /// A number compiled into the workflow.
    Explicit,
    /// Another repository, addressed by slug.
    CrossRepo,
}

/// Resolved target of one kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetSpec {
    pub mode: TargetMode,
    pub repo_slug: Option<String>,
    pub item_number: Option<u64>,
    scope: EntityScope,
}

impl TargetSpec {
    /// Extra scheduling conjunct. Only the triggering mode constrains scheduling.
    pub fn conjunct(&self) -> Option<Condition> {
        match self.mode {
            TargetMode::Triggering => self.scope.triggering_conjunct(),
            TargetMode::Any | TargetMode::Explicit | TargetMode::CrossRepo => None,
        }
    }

    /// Value exposed to the runtime script, if the mode is not the default.
    pub fn env_value(&self) -> Option<String> {
        match self.mode {
            TargetMode::Triggering | TargetMode::CrossRepo => None,
            TargetMode::Any => Some("*".to_string()),
            TargetMode::Explicit => self.item_number.map(|n| n.to_string()),
        }
    }
}

/// What a kind supports, as declared by its descriptor.
#[derive(Debug, Clone, Copy)]
pub struct TargetSupport {
    pub scope: EntityScope,
    pub cross_repo: bool,
}

/// Resolve a kind's `target` and `target-repo` into a [`TargetSpec`].
pub fn resolve_target(
    kind: &str,
    target: Option<&str>,
    target_repo: Option<&str>,
    support: TargetSupport,
    triggers: &TriggerEvents,
) -> Result<TargetSpec, AppError> {
    let target = target.map(str::trim).filter(|t| !t.is_empty());

    if let Some(repo) = target_repo {
        if !support.cross_repo {
            return Err(AppError::UnsupportedTarget {
                kind: kind.to_string(),
                target: repo.to_string(),
                reason: "this kind cannot act on another repository".to_string(),
            });
        }
        validate_repo_slug(kind, repo)?;
    }

    let (mode, item_number) = match target {
        None | Some("triggering") => (TargetMode::Triggering, None),
        Some("*") => (TargetMode::Any, None),
        Some(other) => match other.parse::<u64>() {
            Ok(n) if n > 0 => (TargetMode::Explicit, Some(n)),
            _ => {
                return Err(AppError::invalid_config(
                    kind,
                    format!(
                        "target must be \"triggering\", \"*\" or a positive item number, got '{}'",
                        other
                    ),
                ));
            }
        },
    };

    if support.scope == EntityScope::None && mode != TargetMode::Triggering {
        return Err(AppError::UnsupportedTarget {
            kind: kind.to_string(),
            target: target.unwrap_or_default().to_string(),
            reason: "this kind does not act on an issue, pull request or discussion".to_string(),
        });
    }

    if let Some(repo) = target_repo {
        return Ok(TargetSpec {
            mode: if mode == TargetMode::Triggering { TargetMode::CrossRepo } else { mode },
            repo_slug: Some(repo.to_string()),
            item_number,
            scope: support.scope,
        });
    }

    if mode == TargetMode::Triggering
        && support.scope != EntityScope::None
        && !triggers.is_empty()
        && !triggers.can_carry(support.scope)
    {
        return Err(AppError::UnsupportedTarget {
            kind: kind.to_string(),
            target: "triggering".to_string(),
            reason: format!(
                "none of the trigger events ({}) carry a {}; set target to \"*\" or an item number",
                triggers.names().collect::<Vec<_>>().join(", "),
                support.scope.label()
            ),
        });
    }

    Ok(TargetSpec { mode, repo_slug: None, item_number, scope: support.scope })
}

/// Validate an `owner/repo` slug. The bare wildcard is always rejected.
pub fn validate_repo_slug(kind: &str, slug: &str) -> Result<(), AppError> {
    if slug.trim() == "*" {
        return Err(AppError::WildcardTargetRepo { kind: kind.to_string() });
    }
    let valid_part = |part: &str| {
        !part.is_empty()
            && part.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    match slug.split_once('/') {
        Some((owner, repo)) if valid_part(owner) && valid_part(repo) => Ok(()),
        _ => Err(AppError::invalid_config(
            kind,
            format!("target-repo must be an owner/repo slug, got '{}'", slug),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PR_ONLY: TargetSupport = TargetSupport { scope: EntityScope::PullRequest, cross_repo: false };
    const CROSS_REPO: TargetSupport = TargetSupport { scope: EntityScope::None, cross_repo: true };

    fn pr_events() -> TriggerEvents {
        TriggerEvents::new(["pull_request"])
    }

    #[test]
    fn default_target_adds_entity_conjunct() {
        let spec = resolve_target("add-reviewer", None, None, PR_ONLY, &pr_events()).unwrap();
        assert_eq!(spec.mode, TargetMode::Triggering);
        assert_eq!(spec.conjunct().unwrap().render(), "github.event.pull_request.number");
        assert_eq!(spec.env_value(), None);
    }

    #[test]
    fn wildcard_target_drops_conjunct() {
        let spec = resolve_target("add-reviewer", Some("*"), None, PR_ONLY, &pr_events()).unwrap();
        assert_eq!(spec.mode, TargetMode::Any);
        assert!(spec.conjunct().is_none());
        assert_eq!(spec.env_value().as_deref(), Some("*"));
    }

    #[test]
    fn explicit_number_behaves_like_wildcard_at_compile_time() {
        let spec = resolve_target("add-reviewer", Some("17"), None, PR_ONLY, &pr_events()).unwrap();
        assert_eq!(spec.mode, TargetMode::Explicit);
        assert_eq!(spec.item_number, Some(17));
        assert!(spec.conjunct().is_none());
    }

    #[test]
    fn pull_request_kind_rejects_issue_only_triggers() {
        let err = resolve_target("add-reviewer", None, None, PR_ONLY, &TriggerEvents::new(["issues"]))
            .unwrap_err();
        assert!(matches!(err, AppError::UnsupportedTarget { .. }));
    }

    #[test]
    fn malformed_target_is_rejected() {
        let err = resolve_target("add-reviewer", Some("issue"), None, PR_ONLY, &pr_events()).unwrap_err();
        assert!(matches!(err, AppError::InvalidConfig { .. }));
        assert!(resolve_target("add-reviewer", Some("0"), None, PR_ONLY, &pr_events()).is_err());
    }

    #[test]
    fn wildcard_repo_is_always_rejected() {
        let err = resolve_target("create-issue", None, Some("*"), CROSS_REPO, &pr_events()).unwrap_err();
        assert!(matches!(err, AppError::WildcardTargetRepo { .. }));
    }

    #[test]
    fn concrete_repo_resolves_to_cross_repo_mode() {
        let spec =
            resolve_target("create-issue", None, Some("octo/tracker"), CROSS_REPO, &pr_events()).unwrap();
        assert_eq!(spec.mode, TargetMode::CrossRepo);
        assert_eq!(spec.repo_slug.as_deref(), Some("octo/tracker"));
        assert!(spec.conjunct().is_none());
    }

    #[test]
    fn repo_on_same_repo_kind_is_unsupported() {
        let err =
            resolve_target("add-reviewer", None, Some("octo/tracker"), PR_ONLY, &pr_events()).unwrap_err();
        assert!(matches!(err, AppError::UnsupportedTarget { .. }));
    }

    #[test]
    fn slug_validation() {
        assert!(validate_repo_slug("k", "octo/hello-world.rs").is_ok());
        assert!(validate_repo_slug("k", "octo").is_err());
        assert!(validate_repo_slug("k", "octo/*").is_err());
        assert!(validate_repo_slug("k", "/repo").is_err());
        assert!(validate_repo_slug("k", "a/b/c").is_err());
    }

    #[test]
    fn unknown_triggers_do_not_block_default_target() {
        let spec =
            resolve_target("add-reviewer", None, None, PR_ONLY, &TriggerEvents::default()).unwrap();
        assert!(spec.conjunct().is_some());
    }
}
