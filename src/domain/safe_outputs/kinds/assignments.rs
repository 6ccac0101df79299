use crate::domain::AppError;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{KindConfig, KindDescriptor, KindEnv};

const DEFAULT_AGENT: &str = "copilot";

/// Kinds whose only extra field is an allow-list of names.
#[derive(Debug)]
pub(super) struct AllowListed {
    base: BaseOutputConfig,
    target: Option<String>,
    allowed: Vec<String>,
}

impl AllowListed {
    fn parse(map: &ConfigMap<'_>, descriptor: &KindDescriptor, required: bool) -> Result<Self, AppError> {
        let base = map.base(descriptor.default_max)?;
        let allowed = map.string_list("allowed")?;
        if required && allowed.is_empty() {
            return Err(AppError::invalid_config(map.kind(), "'allowed' must list at least one entry"));
        }
        Ok(AllowListed { base, target: map.target()?, allowed })
    }
}

impl KindConfig for AllowListed {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set_list("ALLOWED", &self.allowed);
    }
}

pub(super) fn parse_add_labels(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(AllowListed::parse(map, descriptor, false)?))
}

pub(super) fn parse_assign_milestone(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(AllowListed::parse(map, descriptor, true)?))
}

pub(super) fn parse_assign_to_user(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(AllowListed::parse(map, descriptor, false)?))
}

#[derive(Debug)]
pub(super) struct AssignToAgent {
    base: BaseOutputConfig,
    target: Option<String>,
    name: String,
}

pub(super) fn parse_assign_to_agent(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    let base = map.base(descriptor.default_max)?;
    Ok(Box::new(AssignToAgent {
        base,
        target: map.target()?,
        name: map.string("name")?.unwrap_or_else(|| DEFAULT_AGENT.to_string()),
    }))
}

impl KindConfig for AssignToAgent {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }

    fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    fn env(&self, env: &mut KindEnv<'_>) {
        env.set("DEFAULT", self.name.as_str());
    }
}
