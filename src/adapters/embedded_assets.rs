//! Files compiled into the binary from `src/assets`.

use include_dir::{Dir, include_dir};

use crate::domain::AppError;

static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/src/assets");

/// Text of the asset at `path`, relative to the asset root.
pub fn asset_text(path: &str) -> Result<&'static str, AppError> {
    let file = ASSETS
        .get_file(path)
        .ok_or_else(|| AppError::InternalError(format!("Embedded asset not found: {}", path)))?;
    file.contents_utf8()
        .ok_or_else(|| AppError::InternalError(format!("Embedded asset is not UTF-8: {}", path)))
}

/// `(file name, text)` of every file directly under `dir`, sorted by name.
pub fn files_in(dir: &str) -> Result<Vec<(&'static str, &'static str)>, AppError> {
    let dir = ASSETS
        .get_dir(dir)
        .ok_or_else(|| AppError::InternalError(format!("Embedded asset directory not found: {}", dir)))?;

    let mut files = Vec::new();
    for file in dir.files() {
        let path = file.path();
        let name = path.file_name().and_then(|n| n.to_str()).ok_or_else(|| {
            AppError::InternalError(format!(
                "Embedded asset has unexpected path: {}",
                path.to_string_lossy()
            ))
        })?;
        let text = file.contents_utf8().ok_or_else(|| {
            AppError::InternalError(format!(
                "Embedded asset is not UTF-8: {}",
                path.to_string_lossy()
            ))
        })?;
        files.push((name, text));
    }
    files.sort_by(|a, b| a.0.cmp(b.0));
    Ok(files)
}
