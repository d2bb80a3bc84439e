use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::fs;
use std::io;
use std::path::Path;

use crate::fs_utils::write_atomically;

/// Blank lines and `#` comments are carried through without being examined.
pub fn is_entry_line(line: &str) -> bool {
    let trimmed = line.trim();
    !trimmed.is_empty() && !trimmed.starts_with('#')
}

/// Reads a registry file as raw lines. A missing file is an empty registry.
pub fn read_registry_lines(path: &Path) -> Result<Vec<String>> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(err) => {
            return Err(err)
                .with_context(|| format!("failed to read registry: {}", path.display()));
        }
    };
    Ok(raw.lines().map(str::to_string).collect())
}

/// Deduplicates the lines as a set and sorts them lexicographically.
pub fn normalize_registry_lines(lines: Vec<String>) -> Vec<String> {
    lines
        .into_iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Normalizes `lines` and replaces the registry file with them.
pub fn persist_registry(path: &Path, lines: Vec<String>) -> Result<Vec<String>> {
    let normalized = normalize_registry_lines(lines);
    write_registry_lines(path, &normalized)?;
    Ok(normalized)
}

/// Replaces the registry file with `lines` in their current order.
pub fn write_registry_lines(path: &Path, lines: &[String]) -> Result<()> {
    let mut payload = lines.join("\n");
    if !payload.is_empty() {
        payload.push('\n');
    }
    write_atomically(path, payload.as_bytes())
        .with_context(|| format!("failed to persist registry: {}", path.display()))
}
