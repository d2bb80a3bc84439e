use anyhow::{Context, Result};
use std::fs;
use std::io::{self, Read, Write};
use std::path::Path;

pub(crate) fn remove_file_if_exists(path: &Path) -> io::Result<bool> {
    if path.exists() {
        fs::remove_file(path)?;
        return Ok(true);
    }
    Ok(false)
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    Ok(())
}

pub(crate) fn write_stream(content: &mut dyn Read, destination: &Path) -> Result<u64> {
    ensure_parent_dir(destination)?;
    let mut file = fs::File::create(destination)
        .with_context(|| format!("failed to create {}", destination.display()))?;
    let written = io::copy(content, &mut file)
        .with_context(|| format!("failed to write {}", destination.display()))?;
    file.flush()
        .with_context(|| format!("failed to flush {}", destination.display()))?;
    Ok(written)
}

/// Writes `bytes` next to `path` and renames the result into place, so readers
/// never observe a half-written file.
pub(crate) fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    ensure_parent_dir(path)?;
    let file_name = path
        .file_name()
        .and_then(|value| value.to_str())
        .unwrap_or("registry");
    let part_path = path.with_file_name(format!(".{file_name}.{}.part", std::process::id()));

    let staged = (|| -> Result<()> {
        let mut file = fs::File::create(&part_path)
            .with_context(|| format!("failed to create {}", part_path.display()))?;
        file.write_all(bytes)
            .with_context(|| format!("failed to write {}", part_path.display()))?;
        file.sync_all()
            .with_context(|| format!("failed to sync {}", part_path.display()))?;
        Ok(())
    })();
    if let Err(err) = staged {
        let _ = fs::remove_file(&part_path);
        return Err(err);
    }

    if let Err(err) = fs::rename(&part_path, path) {
        let _ = fs::remove_file(&part_path);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}
