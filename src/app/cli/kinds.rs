use crate::app::api;
use crate::domain::AppError;

pub fn run_kinds() -> Result<(), AppError> {
    let kinds = api::kinds();
    let width = kinds.iter().map(|k| k.key.len()).max().unwrap_or(0);

    for kind in kinds {
        let max = match kind.default_max {
            0 => "unlimited".to_string(),
            n => n.to_string(),
        };
        println!(
            "{:<width$}  job={}  max={}  permissions={}",
            kind.key,
            kind.job_name,
            max,
            kind.permissions(),
            width = width
        );
    }
    Ok(())
}
