use crate::domain::AppError;
use crate::domain::safe_outputs::config_map::{BaseOutputConfig, ConfigMap};
use crate::domain::safe_outputs::descriptor::{KindConfig, KindDescriptor};

/// Kinds that only report back and take no options beyond the shared ones.
#[derive(Debug)]
pub(super) struct ReportOnly {
    base: BaseOutputConfig,
}

impl KindConfig for ReportOnly {
    fn base(&self) -> &BaseOutputConfig {
        &self.base
    }
}

pub(super) fn parse_missing_tool(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(ReportOnly { base: map.base(descriptor.default_max)? }))
}

pub(super) fn parse_noop(
    map: &ConfigMap<'_>,
    descriptor: &KindDescriptor,
) -> Result<Box<dyn KindConfig>, AppError> {
    Ok(Box::new(ReportOnly { base: map.base(descriptor.default_max)? }))
}
