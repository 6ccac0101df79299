//! The kind table.

mod assignments;
mod comments;
mod discussions;
mod issues;
mod pull_requests;
mod reporting;
mod repository;

use crate::domain::AppError;
use crate::domain::permissions::PermissionLevel::{Read, Write};
use crate::domain::permissions::PermissionScope::{
    Actions, Contents, Discussions, Issues, PullRequests, SecurityEvents, Statuses,
};
use crate::domain::safe_outputs::descriptor::{Consumes, KindDescriptor, Workspace};
use crate::domain::target::{EntityScope, TargetSupport};

const fn same_repo(scope: EntityScope) -> TargetSupport {
    TargetSupport { scope, cross_repo: false }
}

const fn cross_repo(scope: EntityScope) -> TargetSupport {
    TargetSupport { scope, cross_repo: true }
}

const CREATED_ISSUE: Consumes = Consumes {
    job: "create_issue",
    vars: &[
        ("GH_AW_CREATED_ISSUE_URL", "issue_url"),
        ("GH_AW_CREATED_ISSUE_NUMBER", "issue_number"),
        ("GH_AW_TEMPORARY_ID_MAP", "temporary_id_map"),
    ],
};

const CREATED_DISCUSSION: Consumes = Consumes {
    job: "create_discussion",
    vars: &[
        ("GH_AW_CREATED_DISCUSSION_URL", "discussion_url"),
        ("GH_AW_CREATED_DISCUSSION_NUMBER", "discussion_number"),
    ],
};

const CREATED_PULL_REQUEST: Consumes = Consumes {
    job: "create_pull_request",
    vars: &[
        ("GH_AW_CREATED_PULL_REQUEST_URL", "pull_request_url"),
        ("GH_AW_CREATED_PULL_REQUEST_NUMBER", "pull_request_number"),
    ],
};

/// Every supported kind, in front-matter key order.
pub static KINDS: [KindDescriptor; 27] = [
    KindDescriptor {
        key: "add-comment",
        job_name: "add_comment",
        output_type: "add_comment",
        step_name: "Add Issue Comment",
        env_prefix: "COMMENT",
        permissions: &[(Contents, Read), (Issues, Write), (PullRequests, Write), (Discussions, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::AnyEntity),
        consumes: &[CREATED_ISSUE, CREATED_DISCUSSION, CREATED_PULL_REQUEST],
        outputs: &["comment_id", "comment_url"],
        workspace: Workspace::None,
        parse: comments::parse_add_comment,
    },
    KindDescriptor {
        key: "add-labels",
        job_name: "add_labels",
        output_type: "add_labels",
        step_name: "Add Labels",
        env_prefix: "LABELS",
        permissions: &[(Contents, Read), (Issues, Write), (PullRequests, Write)],
        default_max: 3,
        target: cross_repo(EntityScope::IssueOrPullRequest),
        consumes: &[],
        outputs: &["labels_added"],
        workspace: Workspace::None,
        parse: assignments::parse_add_labels,
    },
    KindDescriptor {
        key: "add-reviewer",
        job_name: "add_reviewer",
        output_type: "add_reviewer",
        step_name: "Add Reviewers",
        env_prefix: "REVIEWERS",
        permissions: &[(Contents, Read), (PullRequests, Write)],
        default_max: 3,
        target: same_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["reviewers_added"],
        workspace: Workspace::None,
        parse: pull_requests::parse_add_reviewer,
    },
    KindDescriptor {
        key: "assign-milestone",
        job_name: "assign_milestone",
        output_type: "assign_milestone",
        step_name: "Assign Milestone",
        env_prefix: "MILESTONE",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: same_repo(EntityScope::Issue),
        consumes: &[],
        outputs: &["milestone_assigned"],
        workspace: Workspace::None,
        parse: assignments::parse_assign_milestone,
    },
    KindDescriptor {
        key: "assign-to-agent",
        job_name: "assign_to_agent",
        output_type: "assign_to_agent",
        step_name: "Assign To Agent",
        env_prefix: "AGENT",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: same_repo(EntityScope::Issue),
        consumes: &[],
        outputs: &["assigned_agents"],
        workspace: Workspace::None,
        parse: assignments::parse_assign_to_agent,
    },
    KindDescriptor {
        key: "assign-to-user",
        job_name: "assign_to_user",
        output_type: "assign_to_user",
        step_name: "Assign To User",
        env_prefix: "ASSIGNEES",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: same_repo(EntityScope::Issue),
        consumes: &[],
        outputs: &["assigned_users"],
        workspace: Workspace::None,
        parse: assignments::parse_assign_to_user,
    },
    KindDescriptor {
        key: "close-discussion",
        job_name: "close_discussion",
        output_type: "close_discussion",
        step_name: "Close Discussion",
        env_prefix: "CLOSE_DISCUSSION",
        permissions: &[(Contents, Read), (Discussions, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::Discussion),
        consumes: &[],
        outputs: &["discussion_number", "discussion_url"],
        workspace: Workspace::None,
        parse: discussions::parse_close_discussion,
    },
    KindDescriptor {
        key: "close-issue",
        job_name: "close_issue",
        output_type: "close_issue",
        step_name: "Close Issue",
        env_prefix: "CLOSE_ISSUE",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::Issue),
        consumes: &[],
        outputs: &["issue_number", "issue_url"],
        workspace: Workspace::None,
        parse: issues::parse_close_issue,
    },
    KindDescriptor {
        key: "close-pull-request",
        job_name: "close_pull_request",
        output_type: "close_pull_request",
        step_name: "Close Pull Request",
        env_prefix: "CLOSE_PR",
        permissions: &[(Contents, Read), (PullRequests, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["pull_request_number", "pull_request_url"],
        workspace: Workspace::None,
        parse: pull_requests::parse_close_pull_request,
    },
    KindDescriptor {
        key: "create-code-scanning-alert",
        job_name: "create_code_scanning_alert",
        output_type: "create_code_scanning_alert",
        step_name: "Create Code Scanning Alert",
        env_prefix: "SECURITY_REPORT",
        permissions: &[(Contents, Read), (SecurityEvents, Write), (Actions, Read)],
        default_max: 0,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["sarif_file", "findings_count", "artifact_uploaded", "codeql_uploaded"],
        workspace: Workspace::None,
        parse: repository::parse_create_code_scanning_alert,
    },
    KindDescriptor {
        key: "create-commit-status",
        job_name: "create_commit_status",
        output_type: "create_commit_status",
        step_name: "Create Commit Status",
        env_prefix: "COMMIT_STATUS",
        permissions: &[(Contents, Read), (Statuses, Write)],
        default_max: 1,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["status_state", "status_url"],
        workspace: Workspace::None,
        parse: repository::parse_create_commit_status,
    },
    KindDescriptor {
        key: "create-discussion",
        job_name: "create_discussion",
        output_type: "create_discussion",
        step_name: "Create Output Discussion",
        env_prefix: "DISCUSSION",
        permissions: &[(Contents, Read), (Discussions, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::None),
        consumes: &[],
        outputs: &["discussion_number", "discussion_url"],
        workspace: Workspace::None,
        parse: discussions::parse_create_discussion,
    },
    KindDescriptor {
        key: "create-issue",
        job_name: "create_issue",
        output_type: "create_issue",
        step_name: "Create Output Issue",
        env_prefix: "ISSUE",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::None),
        consumes: &[],
        outputs: &["issue_number", "issue_url", "temporary_id_map"],
        workspace: Workspace::None,
        parse: issues::parse_create_issue,
    },
    KindDescriptor {
        key: "create-pull-request",
        job_name: "create_pull_request",
        output_type: "create_pull_request",
        step_name: "Create Pull Request",
        env_prefix: "PR",
        permissions: &[(Contents, Write), (Issues, Write), (PullRequests, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::None),
        consumes: &[],
        outputs: &["pull_request_number", "pull_request_url", "branch_name"],
        workspace: Workspace::Patch,
        parse: pull_requests::parse_create_pull_request,
    },
    KindDescriptor {
        key: "create-pull-request-review-comment",
        job_name: "create_pr_review_comment",
        output_type: "create_pull_request_review_comment",
        step_name: "Create PR Review Comment",
        env_prefix: "PR_REVIEW_COMMENT",
        permissions: &[(Contents, Read), (PullRequests, Write)],
        default_max: 10,
        target: same_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["review_comment_id", "review_comment_url"],
        workspace: Workspace::None,
        parse: pull_requests::parse_create_pr_review_comment,
    },
    KindDescriptor {
        key: "dispatch-workflow",
        job_name: "dispatch_workflow",
        output_type: "dispatch_workflow",
        step_name: "Dispatch Workflow",
        env_prefix: "DISPATCH",
        permissions: &[(Contents, Read), (Actions, Write)],
        default_max: 1,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["dispatched_workflows"],
        workspace: Workspace::None,
        parse: repository::parse_dispatch_workflow,
    },
    KindDescriptor {
        key: "hide-comment",
        job_name: "hide_comment",
        output_type: "hide_comment",
        step_name: "Hide Comment",
        env_prefix: "HIDE_COMMENT",
        permissions: &[(Contents, Read), (Issues, Write), (PullRequests, Write), (Discussions, Write)],
        default_max: 5,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["hidden_comments"],
        workspace: Workspace::None,
        parse: comments::parse_hide_comment,
    },
    KindDescriptor {
        key: "link-sub-issue",
        job_name: "link_sub_issue",
        output_type: "link_sub_issue",
        step_name: "Link Sub-Issue",
        env_prefix: "LINK_SUB_ISSUE",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 5,
        target: same_repo(EntityScope::Issue),
        consumes: &[CREATED_ISSUE],
        outputs: &["linked_issues"],
        workspace: Workspace::None,
        parse: issues::parse_link_sub_issue,
    },
    KindDescriptor {
        key: "mark-pull-request-as-ready-for-review",
        job_name: "mark_pull_request_as_ready_for_review",
        output_type: "mark_pull_request_as_ready_for_review",
        step_name: "Mark Pull Request as Ready for Review",
        env_prefix: "READY_FOR_REVIEW",
        permissions: &[(Contents, Read), (PullRequests, Write)],
        default_max: 1,
        target: same_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["pull_request_number", "pull_request_url"],
        workspace: Workspace::None,
        parse: pull_requests::parse_mark_ready_for_review,
    },
    KindDescriptor {
        key: "missing-tool",
        job_name: "missing_tool",
        output_type: "missing_tool",
        step_name: "Record Missing Tool",
        env_prefix: "MISSING_TOOL",
        permissions: &[(Contents, Read)],
        default_max: 0,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["tools_reported", "total_count"],
        workspace: Workspace::None,
        parse: reporting::parse_missing_tool,
    },
    KindDescriptor {
        key: "noop",
        job_name: "noop",
        output_type: "noop",
        step_name: "Process No-Op Messages",
        env_prefix: "NOOP",
        permissions: &[(Contents, Read)],
        default_max: 1,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["noop_message"],
        workspace: Workspace::None,
        parse: reporting::parse_noop,
    },
    KindDescriptor {
        key: "push-to-pull-request-branch",
        job_name: "push_to_pull_request_branch",
        output_type: "push_to_pull_request_branch",
        step_name: "Push to Branch",
        env_prefix: "PUSH",
        permissions: &[(Contents, Write), (PullRequests, Read), (Issues, Read)],
        default_max: 1,
        target: same_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["branch_name", "commit_sha", "push_url"],
        workspace: Workspace::Patch,
        parse: pull_requests::parse_push_to_pull_request_branch,
    },
    KindDescriptor {
        key: "update-discussion",
        job_name: "update_discussion",
        output_type: "update_discussion",
        step_name: "Update Discussion",
        env_prefix: "UPDATE",
        permissions: &[(Contents, Read), (Discussions, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::Discussion),
        consumes: &[],
        outputs: &["discussion_number", "discussion_url"],
        workspace: Workspace::None,
        parse: discussions::parse_update_discussion,
    },
    KindDescriptor {
        key: "update-issue",
        job_name: "update_issue",
        output_type: "update_issue",
        step_name: "Update Issue",
        env_prefix: "UPDATE",
        permissions: &[(Contents, Read), (Issues, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::Issue),
        consumes: &[],
        outputs: &["issue_number", "issue_url"],
        workspace: Workspace::None,
        parse: issues::parse_update_issue,
    },
    KindDescriptor {
        key: "update-pull-request",
        job_name: "update_pull_request",
        output_type: "update_pull_request",
        step_name: "Update Pull Request",
        env_prefix: "UPDATE",
        permissions: &[(Contents, Read), (PullRequests, Write)],
        default_max: 1,
        target: cross_repo(EntityScope::PullRequest),
        consumes: &[],
        outputs: &["pull_request_number", "pull_request_url"],
        workspace: Workspace::None,
        parse: pull_requests::parse_update_pull_request,
    },
    KindDescriptor {
        key: "update-release",
        job_name: "update_release",
        output_type: "update_release",
        step_name: "Update Release",
        env_prefix: "RELEASE",
        permissions: &[(Contents, Write)],
        default_max: 1,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["release_id", "release_url", "release_tag"],
        workspace: Workspace::None,
        parse: repository::parse_update_release,
    },
    KindDescriptor {
        key: "upload-asset",
        job_name: "upload_assets",
        output_type: "upload_asset",
        step_name: "Upload Assets to Orphaned Branch",
        env_prefix: "ASSETS",
        permissions: &[(Contents, Write)],
        default_max: 10,
        target: same_repo(EntityScope::None),
        consumes: &[],
        outputs: &["branch_name", "published_count"],
        workspace: Workspace::Assets,
        parse: repository::parse_upload_asset,
    },
];

/// Descriptor for a front-matter key.
pub fn descriptor(key: &str) -> Option<&'static KindDescriptor> {
    KINDS.iter().find(|d| d.key == key)
}

/// Like [`descriptor`], but an unknown key is an error listing the known ones.
pub fn lookup(key: &str) -> Result<&'static KindDescriptor, AppError> {
    descriptor(key).ok_or_else(|| AppError::UnknownKind {
        name: key.to_string(),
        available: KINDS.iter().map(|d| d.key).collect::<Vec<_>>().join(", "),
    })
}

/// Descriptor whose job has `job_name`.
pub fn by_job_name(job_name: &str) -> Option<&'static KindDescriptor> {
    KINDS.iter().find(|d| d.job_name == job_name)
}

#[cfg(test)]
fn env_of(key: &str, yaml: &str) -> crate::domain::job::VarMap {
    use crate::domain::safe_outputs::descriptor::KindEnv;

    let descriptor = lookup(key).unwrap();
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    let kind = descriptor.parse_config(Some(&value)).unwrap().unwrap();
    let mut env = KindEnv::new(descriptor.env_prefix, "Triage", 1024);
    kind.config.env(&mut env);
    env.into_vars()
}

#[cfg(test)]
fn parse_err(key: &str, yaml: &str) -> AppError {
    let value: serde_yaml::Value = serde_yaml::from_str(yaml).unwrap();
    lookup(key).unwrap().parse_config(Some(&value)).unwrap_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn keys_and_job_names_are_unique() {
        let keys: HashSet<_> = KINDS.iter().map(|d| d.key).collect();
        let jobs: HashSet<_> = KINDS.iter().map(|d| d.job_name).collect();
        assert_eq!(keys.len(), KINDS.len());
        assert_eq!(jobs.len(), KINDS.len());
    }

    #[test]
    fn table_is_sorted_by_key() {
        let keys: Vec<_> = KINDS.iter().map(|d| d.key).collect();
        let mut sorted = keys.clone();
        sorted.sort_unstable();
        assert_eq!(keys, sorted);
    }

    #[test]
    fn consumed_jobs_are_kinds() {
        for kind in &KINDS {
            for consumed in kind.consumes {
                assert!(by_job_name(consumed.job).is_some(), "{} consumes {}", kind.key, consumed.job);
            }
        }
    }

    #[test]
    fn declared_outputs_are_snake_case() {
        for kind in &KINDS {
            for output in kind.outputs {
                assert!(output.chars().all(|c| c.is_ascii_lowercase() || c == '_'), "{}", output);
            }
        }
    }

    #[test]
    fn every_kind_reads_contents() {
        for kind in &KINDS {
            assert!(kind.permissions().get(Contents).is_some(), "{}", kind.key);
        }
    }

    #[test]
    fn patch_kinds_get_the_longer_timeout() {
        assert_eq!(lookup("create-pull-request").unwrap().timeout_minutes(), 15);
        assert_eq!(lookup("upload-asset").unwrap().timeout_minutes(), 15);
        assert_eq!(lookup("noop").unwrap().timeout_minutes(), 10);
    }

    #[test]
    fn unknown_key_lists_available_kinds() {
        let err = lookup("create-isue").unwrap_err();
        assert!(err.to_string().contains("create-issue"), "{}", err);
    }

    fn with_required_lists(key: &str, base: &str) -> serde_yaml::Value {
        let extra = match key {
            "add-reviewer" => "\nreviewers: [alice]",
            "assign-milestone" => "\nallowed: [v1.0]",
            "dispatch-workflow" => "\nworkflows: [deploy]",
            _ => "",
        };
        serde_yaml::from_str(&format!("{}{}", base, extra)).unwrap()
    }

    #[test]
    fn wildcard_target_repo_is_rejected_for_every_kind() {
        for kind in &KINDS {
            let value = with_required_lists(kind.key, "target-repo: \"*\"");
            let err = kind.parse_config(Some(&value)).unwrap_err();
            assert!(matches!(err, AppError::WildcardTargetRepo { .. }), "{}: {:?}", kind.key, err);
        }
    }

    #[test]
    fn concrete_target_repo_parses_only_where_supported() {
        for kind in &KINDS {
            let value = with_required_lists(kind.key, "target-repo: octo/tracker");
            match kind.parse_config(Some(&value)) {
                Ok(parsed) => {
                    assert!(kind.target.cross_repo, "{} accepted target-repo", kind.key);
                    let parsed = parsed.unwrap();
                    assert_eq!(parsed.config.base().target_repo.as_deref(), Some("octo/tracker"));
                }
                Err(err) => {
                    assert!(!kind.target.cross_repo, "{}: {}", kind.key, err);
                    assert!(matches!(err, AppError::UnsupportedTarget { kind: ref name, .. } if name == kind.key));
                }
            }
        }
    }

    #[test]
    fn entity_editing_kinds_reach_other_repositories() {
        for key in ["add-labels", "update-issue", "close-issue", "close-pull-request", "update-discussion"] {
            assert!(lookup(key).unwrap().target.cross_repo, "{}", key);
        }
        assert!(!lookup("add-reviewer").unwrap().target.cross_repo);
    }

    #[test]
    fn absent_key_parses_to_none() {
        for kind in &KINDS {
            assert!(kind.parse_config(None).unwrap().is_none());
        }
    }
}
