use std::path::{Path, PathBuf};

use crate::app::api::{self, CompileOptions};
use crate::domain::AppError;

pub fn run_check(spec: &Path, action_pins: Option<PathBuf>) -> Result<(), AppError> {
    let report = api::check_file(spec, &CompileOptions { staged: false, action_pins })?;

    println!("✅ {} compiles to {} job(s)", report.workflow_name, report.jobs.len());
    for job in &report.jobs {
        println!("  • {}", job);
    }
    if !report.safe_input_env.is_empty() {
        println!("Safe-input environment: {}", report.safe_input_env.join(", "));
    }
    Ok(())
}
