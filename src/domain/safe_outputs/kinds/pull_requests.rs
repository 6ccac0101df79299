use crate::domain::AppError;
use crate::domain::job::Step;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{
    KindConfig, KindDescriptor, KindEnv, PostStepContext, gh_checkout_step, gh_cli_step,
};

use super::issues::CloseEntity;

const IF_NO_CHANGES: &[&str] = &["warn", "error", "ignore"];

/// A user login or an `org/team` slug.
fn validate_reviewers(map: &ConfigMap<'_>, reviewers: &[String]) -> Result<(), AppError> {
    let is_name = |part: &str| {
        !part.is_empty()
            && part.len() <= 39
            && !part.starts_with('-')
            && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    };
    for reviewer in reviewers {
        let mut parts = reviewer.splitn(2, '/');
        let valid = parts.next().is_some_and(is_name) && parts.next().is_none_or(is_name);
        if !valid {
            return Err(AppError::invalid_config(
                map.kind(),
                format!("'{}' is not a GitHub login or org/team slug", reviewer),
            ));
        }
    }
    Ok(())
}

#[derive(Debug)]
pub(super) struct CreatePullRequest {
    base: BaseOutputConfig,
    title_prefix: Option<String>,
    labels: Vec<String>,
    allowed_labels: Vec<String>,
    reviewers: Vec<String>,
    draft: bool,
    if_no_changes: String,
    allow_empty: bool,
    expires: Option<u32>,
}

pub(super) fn parse_create_pull_request(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let reviewers = map.string_list("reviewers")?;
    validate_reviewers(map, &reviewers)?;
    Ok(Box::new(CreatePullRequest {
        base,
        title_prefix: map.string("title-prefix")?,
        labels: map.string_list("labels")?,
        allowed_labels: map.string_list("allowed-labels")?,
        reviewers,
        draft: map.bool("draft")?.unwrap_or(true),
        if_no_changes: map.one_of("if-no-changes", IF_NO_CHANGES)?.unwrap_or_else(|| "warn".into()),
        allow_empty: map.bool("allow-empty")?.unwrap_or(false),
        expires: map.u32("expires")?,
    }))
}

impl KindConfig for CreatePullRequest {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_raw("GH_AW_BASE_BRANCH", "${{ github.ref_name }}");
        env.set_opt("TITLE_PREFIX", self.title_prefix.as_deref());
        env.set_list("LABELS", &self.labels);
        env.set_list("ALLOWED_LABELS", &self.allowed_labels);
        env.set("DRAFT", self.draft.to_string());
        env.set("IF_NO_CHANGES", self.if_no_changes.as_str());
        env.set_flag("ALLOW_EMPTY", self.allow_empty);
        let max_patch_size = env.max_patch_size.to_string();
        env.set_raw("GH_AW_MAX_PATCH_SIZE", max_patch_size);
        if let Some(days) = self.expires {
            env.set("EXPIRES", days.to_string());
        }
    }

    fn post_steps(&self, ctx: &PostStepContext<'_>) -> Result<Vec<Step>, AppError> {
        if self.reviewers.is_empty() {
            return Ok(Vec::new());
        }
        let mut steps = vec![gh_checkout_step(ctx, "pull_request_url")?];
        for reviewer in &self.reviewers {
            steps.push(
                gh_cli_step(
                    format!("Add {} as reviewer", reviewer),
                    ctx,
                    "pull_request_url",
                    "PR_URL",
                    "gh pr edit \"$PR_URL\" --add-reviewer \"$REVIEWER\"".to_string(),
                )
                .env("REVIEWER", reviewer.as_str()),
            );
        }
        Ok(steps)
    }
}

#[derive(Debug)]
pub(super) struct PushToPullRequestBranch {
    base: BaseOutputConfig,
    target: Option<String>,
    required_title_prefix: Option<String>,
    required_labels: Vec<String>,
    if_no_changes: String,
    commit_title_suffix: Option<String>,
}

pub(super) fn parse_push_to_pull_request_branch(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(PushToPullRequestBranch {
        base,
        target: map.target()?,
        required_title_prefix: map.string("title-prefix")?,
        required_labels: map.string_list("labels")?,
        if_no_changes: map.one_of("if-no-changes", IF_NO_CHANGES)?.unwrap_or_else(|| "warn".into()),
        commit_title_suffix: map.string("commit-title-suffix")?,
    }))
}

impl KindConfig for PushToPullRequestBranch {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set("IF_NO_CHANGES", self.if_no_changes.as_str());
        env.set_opt("REQUIRED_TITLE_PREFIX", self.required_title_prefix.as_deref());
        env.set_list("REQUIRED_LABELS", &self.required_labels);
        if let Some(suffix) = &self.commit_title_suffix {
            env.set_raw("GH_AW_COMMIT_TITLE_SUFFIX", suffix.as_str());
        }
        let max_patch_size = env.max_patch_size.to_string();
        env.set_raw("GH_AW_MAX_PATCH_SIZE", max_patch_size);
    }
}

#[derive(Debug)]
pub(super) struct UpdatePullRequest {
    base: BaseOutputConfig,
    target: Option<String>,
    title: bool,
    body: bool,
}

pub(super) fn parse_update_pull_request(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(UpdatePullRequest {
        base,
        target: map.target()?,
        title: map.enable_flag("title")?,
        body: map.enable_flag("body")?,
    }))
}

impl KindConfig for UpdatePullRequest {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_flag("TITLE", self.title);
        env.set_flag("BODY", self.body);
    }
}

pub(super) fn parse_close_pull_request(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(CloseEntity::parse(map, descriptor, false)?))
}

pub(super) fn parse_mark_ready_for_review(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(CloseEntity::parse(map, descriptor, false)?))
}

#[derive(Debug)]
pub(super) struct CreatePrReviewComment {
    base: BaseOutputConfig,
    target: Option<String>,
    side: String,
}

pub(super) fn parse_create_pr_review_comment(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(CreatePrReviewComment {
        base,
        target: map.target()?,
        side: map.one_of("side", &["LEFT", "RIGHT"])?.unwrap_or_else(|| "RIGHT".into()),
    }))
}

impl KindConfig for CreatePrReviewComment {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set("SIDE", self.side.as_str());
    }
}

/// `add-reviewer`: the agent picks reviewers from a mandatory allow-list.
#[derive(Debug)]
pub(super) struct AddReviewer {
    base: BaseOutputConfig,
    target: Option<String>,
    reviewers: Vec<String>,
}

pub(super) fn parse_add_reviewer(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let reviewers = map.string_list("reviewers")?;
    if reviewers.is_empty() {
        return Err(AppError::invalid_config(map.kind(), "'reviewers' must list at least one reviewer"));
    }
    validate_reviewers(map, &reviewers)?;
    Ok(Box::new(AddReviewer { base, target: map.target()?, reviewers }))
}

impl KindConfig for AddReviewer {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("ALLOWED", &self.reviewers);
    }
}
