use std::collections::BTreeMap;
use std::path::{Component, Path};

use anyhow::{anyhow, Context};
use serde::{Deserialize, Serialize};

use crate::version::VersionRange;

pub const DESCRIPTOR_EXTENSION: &str = "patch";

/// Metadata of one patch inside a patch package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PatchDescriptor {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Patch ids that must be applied before this one. Ordering is the
    /// caller's concern; the engine only carries the list.
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub bundles: Vec<String>,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub version_ranges: BTreeMap<String, String>,
    pub migrator_bundle: Option<String>,
}

impl PatchDescriptor {
    pub fn from_toml_str(input: &str) -> anyhow::Result<Self> {
        let descriptor: Self =
            toml::from_str(input).context("failed to parse patch descriptor")?;
        validate_patch_id(&descriptor.id)?;

        for file in &descriptor.files {
            validate_relative_file(file).with_context(|| {
                format!("invalid file entry in patch '{}'", descriptor.id)
            })?;
        }
        for bundle in descriptor.version_ranges.keys() {
            let Some(range) = descriptor.version_range(bundle) else {
                continue;
            };
            VersionRange::parse(range).with_context(|| {
                format!(
                    "invalid version range for bundle '{bundle}' in patch '{}'",
                    descriptor.id
                )
            })?;
        }
        Ok(descriptor)
    }

    /// Explicit range for `bundle`, if the descriptor names a non-blank one.
    pub fn version_range(&self, bundle: &str) -> Option<&str> {
        self.version_ranges
            .get(bundle)
            .map(|range| range.trim())
            .filter(|range| !range.is_empty())
    }
}

fn validate_patch_id(id: &str) -> anyhow::Result<()> {
    let trimmed = id.trim();
    if trimmed.is_empty() {
        return Err(anyhow!("patch id must not be empty"));
    }
    if trimmed != id {
        return Err(anyhow!("patch id must not carry surrounding whitespace: '{id}'"));
    }
    if id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(anyhow!("patch id must be a single path component: {id}"));
    }
    Ok(())
}

fn validate_relative_file(path: &str) -> anyhow::Result<()> {
    let relative = Path::new(path);
    if path.trim().is_empty() {
        return Err(anyhow!("file path must not be empty"));
    }
    if relative.is_absolute() || path.starts_with('/') {
        return Err(anyhow!("file path must be relative: {path}"));
    }
    if relative
        .components()
        .any(|component| matches!(component, Component::ParentDir | Component::Prefix(_)))
    {
        return Err(anyhow!("file path must not include '..': {path}"));
    }
    Ok(())
}
