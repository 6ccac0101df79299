use std::fs;
use std::path::{Path, PathBuf};

use crate::app::api::{self, CompileOptions};
use crate::domain::AppError;

pub fn run_compile(
    spec: &Path,
    staged: bool,
    action_pins: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), AppError> {
    let compiled = api::compile_file(spec, &CompileOptions { staged, action_pins })?;
    let yaml = compiled.to_yaml()?;

    match output {
        Some(path) => {
            fs::write(&path, yaml)?;
            eprintln!("✅ Wrote {} job(s) to {}", compiled.graph.len(), path.display());
        }
        None => print!("{}", yaml),
    }
    Ok(())
}
