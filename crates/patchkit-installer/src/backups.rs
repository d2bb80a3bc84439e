use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::fs_utils::{ensure_parent_dir, remove_file_if_exists};
use crate::{InstallLayout, PatchLogger, RestoreOutcome};

/// Per-patch snapshots of plain files under `data/patch/backups/<patch id>/`.
pub struct BackupStore<'a> {
    layout: &'a InstallLayout,
    logger: &'a dyn PatchLogger,
}

impl<'a> BackupStore<'a> {
    pub fn new(layout: &'a InstallLayout, logger: &'a dyn PatchLogger) -> Self {
        Self { layout, logger }
    }

    pub(crate) fn has_backup(&self, patch_id: &str, rel_path: &str) -> bool {
        self.layout.backup_path(patch_id, rel_path).is_file()
    }

    /// Snapshots the installed file before it is overwritten.
    ///
    /// Returns `None` when there is nothing to snapshot: the file does not
    /// exist, or this patch already holds a record for it.
    pub fn backup(&self, patch_id: &str, rel_path: &str) -> Result<Option<PathBuf>> {
        let source = self.layout.install_path(rel_path);
        if !source.is_file() {
            return Ok(None);
        }

        let backup = self.layout.backup_path(patch_id, rel_path);
        if backup.is_file() {
            self.logger.debug(&format!(
                "Keeping existing backup of {rel_path} for patch {patch_id}"
            ));
            return Ok(None);
        }

        ensure_parent_dir(&backup)?;
        fs::copy(&source, &backup).with_context(|| {
            format!(
                "failed to back up {} to {}",
                source.display(),
                backup.display()
            )
        })?;
        Ok(Some(backup))
    }

    /// Puts back the pre-patch content of `rel_path`, or deletes the file when
    /// the patch added it.
    ///
    /// Afterwards the patch's backup directory is removed only if it is empty.
    /// Nested directories are never removed recursively.
    pub fn restore(&self, patch_id: &str, rel_path: &str) -> Result<RestoreOutcome> {
        let backup = self.layout.backup_path(patch_id, rel_path);
        let installed = self.layout.install_path(rel_path);

        let outcome = (|| -> Result<RestoreOutcome> {
            if self.has_backup(patch_id, rel_path) {
                self.logger.debug(&format!("Restoring previous version of file: {rel_path}"));
                ensure_parent_dir(&installed)?;
                fs::copy(&backup, &installed).with_context(|| {
                    format!(
                        "failed to restore {} from {}",
                        installed.display(),
                        backup.display()
                    )
                })?;
                fs::remove_file(&backup).with_context(|| {
                    format!("failed to consume backup {}", backup.display())
                })?;
                return Ok(RestoreOutcome::Restored);
            }

            self.logger.debug(&format!("Removing file: {rel_path}"));
            let removed = remove_file_if_exists(&installed)
                .with_context(|| format!("failed to remove {}", installed.display()))?;
            Ok(if removed {
                RestoreOutcome::Removed
            } else {
                RestoreOutcome::Absent
            })
        })();

        let _ = fs::remove_dir(self.layout.patch_backup_dir(patch_id));
        outcome
    }

    pub fn is_rolled_back(&self, patch_id: &str) -> bool {
        self.layout.rollback_marker_path(patch_id).is_file()
    }

    pub fn mark_rolled_back(&self, patch_id: &str) -> Result<()> {
        let marker = self.layout.rollback_marker_path(patch_id);
        ensure_parent_dir(&marker)?;
        fs::write(&marker, patch_id)
            .with_context(|| format!("failed to write {}", marker.display()))
    }

    /// Re-arms rollback for a patch that is being applied again.
    pub fn clear_rolled_back(&self, patch_id: &str) -> Result<()> {
        let marker = self.layout.rollback_marker_path(patch_id);
        remove_file_if_exists(&marker)
            .with_context(|| format!("failed to remove {}", marker.display()))?;
        Ok(())
    }
}
