use anyhow::{Context, Result};
use patchkit_core::ArtifactCoordinate;
use std::fs;
use std::path::{Path, PathBuf};

pub const INSTALL_ROOT_ENV: &str = "PATCHKIT_HOME";

/// Paths inside an installed distribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallLayout {
    root: PathBuf,
}

impl InstallLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn etc_dir(&self) -> PathBuf {
        self.root.join("etc")
    }

    pub fn overrides_path(&self) -> PathBuf {
        self.etc_dir().join("overrides.properties")
    }

    pub fn startup_path(&self) -> PathBuf {
        self.etc_dir().join("startup.properties")
    }

    pub fn system_dir(&self) -> PathBuf {
        self.root.join("system")
    }

    pub fn artifact_path(&self, coordinate: &ArtifactCoordinate) -> PathBuf {
        self.system_dir().join(coordinate.repository_path())
    }

    pub fn deploy_dir(&self) -> PathBuf {
        self.root.join("deploy")
    }

    pub fn deploy_path(&self, artifact_id: &str) -> PathBuf {
        self.deploy_dir().join(format!("{artifact_id}.jar"))
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join("data").join("patch").join("backups")
    }

    pub fn patch_backup_dir(&self, patch_id: &str) -> PathBuf {
        self.backups_dir().join(patch_id)
    }

    /// Left beside the patch's backup directory once its files are rolled back.
    pub fn rollback_marker_path(&self, patch_id: &str) -> PathBuf {
        self.backups_dir().join(format!("{patch_id}.rolled-back"))
    }

    pub fn backup_path(&self, patch_id: &str, rel_path: &str) -> PathBuf {
        self.patch_backup_dir(patch_id).join(rel_path)
    }

    pub fn install_path(&self, rel_path: &str) -> PathBuf {
        self.root.join(rel_path)
    }

    pub fn ensure_base_dirs(&self) -> Result<()> {
        for dir in [
            self.etc_dir(),
            self.system_dir(),
            self.deploy_dir(),
            self.backups_dir(),
        ] {
            fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        Ok(())
    }
}

/// `$PATCHKIT_HOME` when set, otherwise the current directory.
pub fn default_install_root() -> Result<PathBuf> {
    if let Some(root) = std::env::var_os(INSTALL_ROOT_ENV).filter(|value| !value.is_empty()) {
        return Ok(PathBuf::from(root));
    }

    std::env::current_dir().context("current directory is unavailable; pass --root explicitly")
}
