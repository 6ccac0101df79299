use crate::domain::AppError;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{KindConfig, KindDescriptor, KindEnv};

const HIDE_REASONS: &[&str] = &["spam", "abuse", "off_topic", "outdated", "resolved", "duplicate"];

#[derive(Debug)]
pub(super) struct AddComment {
    base: BaseOutputConfig,
    target: Option<String>,
    hide_older_comments: bool,
    discussion: bool,
}

pub(super) fn parse_add_comment(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(AddComment {
        base,
        target: map.target()?,
        hide_older_comments: map.enable_flag("hide-older-comments")?,
        discussion: map.bool("discussion")?.unwrap_or(false),
    }))
}

impl KindConfig for AddComment {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        if self.hide_older_comments {
            env.set_raw("GH_AW_HIDE_OLDER_COMMENTS", "true");
        }
        env.set_flag("DISCUSSION", self.discussion);
    }
}

#[derive(Debug)]
pub(super) struct HideComment {
    base: BaseOutputConfig,
    allowed_reasons: Vec<String>,
}

pub(super) fn parse_hide_comment(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let allowed_reasons = map.string_list("allowed-reasons")?;
    if let Some(bad) = allowed_reasons.iter().find(|r| !HIDE_REASONS.contains(&r.as_str())) {
        return Err(AppError::invalid_config(
            map.kind(),
            format!("unknown reason '{}'; expected one of {}", bad, HIDE_REASONS.join(", ")),
        ));
    }
    Ok(Box::new(HideComment { base, allowed_reasons }))
}

impl KindConfig for HideComment {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("ALLOWED_REASONS", &self.allowed_reasons);
    }
}
