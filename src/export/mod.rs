pub mod csv;
pub mod png;

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub fn save_export(export_dir: &Path, file_name: &str, content: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(export_dir).with_context(|| {
        format!(
            "Failed to create export directory: {}",
            export_dir.display()
        )
    })?;

    let path = export_dir.join(file_name);
    fs::write(&path, content)
        .with_context(|| format!("Failed to write export file: {}", path.display()))?;

    Ok(path)
}
