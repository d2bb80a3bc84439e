use anyhow::{Context, Result};
use patchkit_core::{PatchDescriptor, DESCRIPTOR_EXTENSION};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

pub const REPOSITORY_PREFIX: &str = "repository";

/// Read access to the contents of a patch package.
///
/// Entry names are `/`-separated and relative to the package root.
pub trait PatchSource {
    fn describe(&self) -> String;

    /// Opens an entry, or `None` when the package has no such file.
    fn open(&self, entry: &str) -> Result<Option<Box<dyn Read + '_>>>;

    /// Names of the top-level descriptor entries (`*.patch`).
    fn descriptor_entries(&self) -> Result<Vec<String>>;
}

/// An unpacked patch package or a patch storage location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryPatchSource {
    root: PathBuf,
}

impl DirectoryPatchSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PatchSource for DirectoryPatchSource {
    fn describe(&self) -> String {
        self.root.display().to_string()
    }

    fn open(&self, entry: &str) -> Result<Option<Box<dyn Read + '_>>> {
        let path = self.root.join(entry);
        if !path.is_file() {
            return Ok(None);
        }
        let file = fs::File::open(&path)
            .with_context(|| format!("failed to open patch entry: {}", path.display()))?;
        Ok(Some(Box::new(file)))
    }

    fn descriptor_entries(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in fs::read_dir(&self.root)
            .with_context(|| format!("failed to read patch package: {}", self.root.display()))?
        {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }

            let path = entry.path();
            if path.extension().and_then(|v| v.to_str()) != Some(DESCRIPTOR_EXTENSION) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|v| v.to_str()) {
                names.push(name.to_string());
            }
        }

        names.sort();
        Ok(names)
    }
}

pub fn repository_entry(repository_path: &str) -> String {
    format!("{REPOSITORY_PREFIX}/{repository_path}")
}

/// Loads every descriptor of a patch package, in entry-name order.
pub fn load_package_descriptors(source: &dyn PatchSource) -> Result<Vec<PatchDescriptor>> {
    let mut descriptors = Vec::new();
    for name in source.descriptor_entries()? {
        let Some(mut reader) = source.open(&name)? else {
            continue;
        };
        let mut raw = String::new();
        reader
            .read_to_string(&mut raw)
            .with_context(|| format!("failed to read patch descriptor: {name}"))?;
        let descriptor = PatchDescriptor::from_toml_str(&raw).with_context(|| {
            format!(
                "failed to load patch descriptor {name} from {}",
                source.describe()
            )
        })?;
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}
