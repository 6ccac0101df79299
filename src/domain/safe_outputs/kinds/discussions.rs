use crate::domain::AppError;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{KindConfig, KindDescriptor, KindEnv};

use super::issues::CloseEntity;

#[derive(Debug)]
pub(super) struct CreateDiscussion {
    base: BaseOutputConfig,
    title_prefix: Option<String>,
    category: Option<String>,
    labels: Vec<String>,
    close_older_discussions: bool,
    expires: Option<u32>,
}

pub(super) fn parse_create_discussion(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(CreateDiscussion {
        base,
        title_prefix: map.string("title-prefix")?,
        category: map.string("category")?,
        labels: map.string_list("labels")?,
        close_older_discussions: map.bool("close-older-discussions")?.unwrap_or(false),
        expires: map.u32("expires")?,
    }))
}

impl KindConfig for CreateDiscussion {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_opt("TITLE_PREFIX", self.title_prefix.as_deref());
        env.set_opt("CATEGORY", self.category.as_deref());
        env.set_list("LABELS", &self.labels);
        if self.close_older_discussions {
            env.set_raw("GH_AW_CLOSE_OLDER_DISCUSSIONS", "true");
        }
        if let Some(days) = self.expires {
            env.set("EXPIRES", days.to_string());
        }
    }
}

#[derive(Debug)]
pub(super) struct UpdateDiscussion {
    base: BaseOutputConfig,
    target: Option<String>,
    title: bool,
    body: bool,
    labels: bool,
    allowed_labels: Vec<String>,
}

pub(super) fn parse_update_discussion(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    let config = UpdateDiscussion {
        base,
        target: map.target()?,
        title: map.enable_flag("title")?,
        body: map.enable_flag("body")?,
        labels: map.enable_flag("labels")?,
        allowed_labels: map.string_list("allowed-labels")?,
    };
    if !config.allowed_labels.is_empty() && !config.labels {
        return Err(AppError::invalid_config(
            map.kind(),
            "allowed-labels requires labels to be enabled",
        ));
    }
    Ok(Box::new(config))
}

impl KindConfig for UpdateDiscussion {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_flag("TITLE", self.title);
        env.set_flag("BODY", self.body);
        env.set_flag("LABELS", self.labels);
        env.set_list("ALLOWED_LABELS", &self.allowed_labels);
    }
}

pub(super) fn parse_close_discussion(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(CloseEntity::parse(map, descriptor, true)?))
}
