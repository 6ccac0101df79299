use crate::domain::AppError;
use crate::domain::job::Step;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{
    KindConfig, KindDescriptor, KindEnv, PostStepContext, gh_checkout_step, gh_cli_step,
};

#[derive(Debug)]
pub(super) struct CreateIssue {
    base: BaseOutputConfig,
    title_prefix: Option<String>,
    labels: Vec<String>,
    allowed_labels: Vec<String>,
    assignees: Vec<String>,
    allowed_repos: Vec<String>,
    expires: Option<u32>,
}

pub(super) fn parse_create_issue(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let allowed_repos = map.string_list("allowed-repos")?;
    for repo in &allowed_repos {
        crate::domain::target::validate_repo_slug(map.kind(), repo)?;
    }
    Ok(Box::new(CreateIssue {
        base,
        title_prefix: map.string("title-prefix")?,
        labels: map.string_list("labels")?,
        allowed_labels: map.string_list("allowed-labels")?,
        assignees: map.string_list("assignees")?,
        allowed_repos,
        expires: map.u32("expires")?,
    }))
}

impl KindConfig for CreateIssue {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_opt("TITLE_PREFIX", self.title_prefix.as_deref());
        env.set_list("LABELS", &self.labels);
        env.set_list("ALLOWED_LABELS", &self.allowed_labels);
        if let Some(days) = self.expires {
            env.set("EXPIRES", days.to_string());
        }
        if !self.allowed_repos.is_empty() {
            env.set_raw("GH_AW_ALLOWED_REPOS", self.allowed_repos.join(","));
        }
    }

    fn post_steps(&self, ctx: &PostStepContext<'_>) -> Result<Vec<Step>, AppError> {
        if self.assignees.is_empty() {
            return Ok(Vec::new());
        }
        let mut steps = vec![gh_checkout_step(ctx, "issue_number")?];
        for assignee in &self.assignees {
            steps.push(gh_cli_step(
                format!("Assign issue to {}", assignee),
                ctx,
                "issue_number",
                "ISSUE_NUMBER",
                format!("gh issue edit \"$ISSUE_NUMBER\" --add-assignee {}", assignee),
            ));
        }
        Ok(steps)
    }
}

/// `update-issue`: which fields the agent may change.
#[derive(Debug)]
pub(super) struct UpdateIssue {
    base: BaseOutputConfig,
    target: Option<String>,
    status: bool,
    title: bool,
    body: bool,
}

pub(super) fn parse_update_issue(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(UpdateIssue {
        base,
        target: map.target()?,
        status: map.enable_flag("status")?,
        title: map.enable_flag("title")?,
        body: map.enable_flag("body")?,
    }))
}

impl KindConfig for UpdateIssue {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_flag("STATUS", self.status);
        env.set_flag("TITLE", self.title);
        env.set_flag("BODY", self.body);
    }
}

/// Close kinds share the required-label and title-prefix filters.
#[derive(Debug)]
pub(super) struct CloseEntity {
    pub(super) base: BaseOutputConfig,
    pub(super) target: Option<String>,
    pub(super) required_labels: Vec<String>,
    pub(super) required_title_prefix: Option<String>,
    pub(super) required_category: Option<String>,
}

impl CloseEntity {
    pub(super) fn parse(
        map: &ConfigMap<'_>,
        descriptor: &KindDescriptor,
        with_category: bool,
    ) -> Result<Self, AppError> {
        let base = map.base(descriptor.default_max)?;
        Ok(CloseEntity {
            base,
            target: map.target()?,
            required_labels: map.string_list("required-labels")?,
            required_title_prefix: map.string("required-title-prefix")?,
            required_category: if with_category { map.string("required-category")? } else { None },
        })
    }
}

pub(super) fn parse_close_issue(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(CloseEntity::parse(map, descriptor, false)?))
}

impl KindConfig for CloseEntity {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("REQUIRED_LABELS", &self.required_labels);
        env.set_opt("REQUIRED_TITLE_PREFIX", self.required_title_prefix.as_deref());
        env.set_opt("REQUIRED_CATEGORY", self.required_category.as_deref());
    }
}

#[derive(Debug)]
pub(super) struct LinkSubIssue {
    base: BaseOutputConfig,
    target: Option<String>,
    parent_required_labels: Vec<String>,
    parent_title_prefix: Option<String>,
    sub_required_labels: Vec<String>,
    sub_title_prefix: Option<String>,
}

pub(super) fn parse_link_sub_issue(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(LinkSubIssue {
        base,
        target: map.target()?,
        parent_required_labels: map.string_list("parent-required-labels")?,
        parent_title_prefix: map.string("parent-title-prefix")?,
        sub_required_labels: map.string_list("sub-required-labels")?,
        sub_title_prefix: map.string("sub-title-prefix")?,
    }))
}

impl KindConfig for LinkSubIssue {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("PARENT_REQUIRED_LABELS", &self.parent_required_labels);
        env.set_opt("PARENT_TITLE_PREFIX", self.parent_title_prefix.as_deref());
        env.set_list("SUB_REQUIRED_LABELS", &self.sub_required_labels);
        env.set_opt("SUB_TITLE_PREFIX", self.sub_title_prefix.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::safe_outputs::kinds::{env_of, lookup};

    #[test]
    fn create_issue_env_follows_declaration_order() {
        let env = env_of(
            "create-issue",
            "title-prefix: \"[bot] \"\nlabels: [automation, triage]\nexpires: 7\nallowed-repos: [octo/a]",
        );
        let keys: Vec<_> = env.keys().collect();
        assert_eq!(
            keys,
            ["GH_AW_ISSUE_TITLE_PREFIX", "GH_AW_ISSUE_LABELS", "GH_AW_ISSUE_EXPIRES", "GH_AW_ALLOWED_REPOS"]
        );
        assert_eq!(env.get("GH_AW_ISSUE_LABELS"), Some("automation,triage"));
        assert_eq!(env.get("GH_AW_ISSUE_TITLE_PREFIX"), Some("[bot] "));
    }

    #[test]
    fn update_issue_rejects_false_flags() {
        for name in ["status", "title", "body"] {
            let value: serde_yaml::Value = serde_yaml::from_str(&format!("{}: false", name)).unwrap();
            let err = lookup("update-issue").unwrap().parse_config(Some(&value)).unwrap_err();
            assert!(matches!(err, AppError::ContradictoryFlag { ref flag, .. } if flag == name), "{:?}", err);
        }
    }

    #[test]
    fn update_issue_exposes_enabled_fields() {
        let env = env_of("update-issue", "title:\nbody: true");
        assert_eq!(env.get("GH_AW_UPDATE_TITLE"), Some("true"));
        assert_eq!(env.get("GH_AW_UPDATE_BODY"), Some("true"));
        assert_eq!(env.get("GH_AW_UPDATE_STATUS"), None);
    }

    #[test]
    fn close_issue_exposes_filters() {
        let env = env_of("close-issue", "required-labels: [stale]\nrequired-title-prefix: \"[ci]\"");
        assert_eq!(env.get("GH_AW_CLOSE_ISSUE_REQUIRED_LABELS"), Some("stale"));
        assert_eq!(env.get("GH_AW_CLOSE_ISSUE_REQUIRED_TITLE_PREFIX"), Some("[ci]"));
    }

    #[test]
    fn close_issue_has_no_category_field() {
        let value: serde_yaml::Value = serde_yaml::from_str("required-category: General").unwrap();
        assert!(lookup("close-issue").unwrap().parse_config(Some(&value)).is_err());
    }

    #[test]
    fn allowed_repos_must_be_slugs() {
        let value: serde_yaml::Value = serde_yaml::from_str("allowed-repos: [\"*\"]").unwrap();
        let err = lookup("create-issue").unwrap().parse_config(Some(&value)).unwrap_err();
        assert!(matches!(err, AppError::WildcardTargetRepo { .. }));
    }
}
