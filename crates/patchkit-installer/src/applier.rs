use anyhow::{Context, Result};
use patchkit_core::{ArtifactCoordinate, CoordinateError, PatchDescriptor, VersionRange};
use std::fs;
use std::io::Read;
use std::path::PathBuf;

use crate::backups::BackupStore;
use crate::extractor::ArtifactExtractor;
use crate::fs_utils::{ensure_parent_dir, write_stream};
use crate::overrides::{merge_override, override_line};
use crate::registry::{persist_registry, read_registry_lines, write_registry_lines};
use crate::source::load_package_descriptors;
use crate::startup::merge_startup_pin;
use crate::{
    ApplyReport, ApplyStage, FileChange, FileChangeKind, InstallLayout, PatchError, PatchLogger,
    PatchSource, RollbackReport, TracingLogger,
};

/// Applies patches to, and rolls them back from, one installed distribution.
///
/// Registry files and the backup directory are not locked: only one apply or
/// rollback may run against an install root at a time, and external writers
/// racing with an apply lose their changes.
pub struct PatchApplier<L: PatchLogger = TracingLogger> {
    layout: InstallLayout,
    logger: L,
}

impl PatchApplier<TracingLogger> {
    pub fn new(layout: InstallLayout) -> Self {
        Self::with_logger(layout, TracingLogger)
    }
}

struct BundlePlan {
    to_extract: Vec<ArtifactCoordinate>,
    to_delete: Vec<ArtifactCoordinate>,
}

impl<L: PatchLogger> PatchApplier<L> {
    pub fn with_logger(layout: InstallLayout, logger: L) -> Self {
        Self { layout, logger }
    }

    pub fn layout(&self) -> &InstallLayout {
        &self.layout
    }

    pub fn logger(&self) -> &L {
        &self.logger
    }

    /// Applies every descriptor found in the package, using the package both
    /// as the artifact archive and as the file source.
    pub fn apply_package(&self, source: &dyn PatchSource) -> Result<Vec<ApplyReport>> {
        let descriptors = load_package_descriptors(source)?;
        if descriptors.is_empty() {
            self.logger.warn("No patch to apply");
            return Ok(Vec::new());
        }

        let mut reports = Vec::with_capacity(descriptors.len());
        for descriptor in &descriptors {
            reports.push(self.apply_patch(descriptor, Some(source), None)?);
        }
        Ok(reports)
    }

    pub fn rollback_package(&self, source: &dyn PatchSource) -> Result<Vec<RollbackReport>> {
        let descriptors = load_package_descriptors(source)?;
        if descriptors.is_empty() {
            self.logger.warn("No patch to roll back");
            return Ok(Vec::new());
        }

        descriptors
            .iter()
            .map(|descriptor| self.rollback_patch(descriptor))
            .collect()
    }

    /// Applies one patch.
    ///
    /// `archive` supplies artifact payloads and plain files. Without it,
    /// artifact reconciliation is skipped and plain files are read from
    /// `storage`. Application is not transactional: on error, whatever was
    /// already written stays in place and the error names the last completed
    /// stage.
    pub fn apply_patch(
        &self,
        patch: &PatchDescriptor,
        archive: Option<&dyn PatchSource>,
        storage: Option<&dyn PatchSource>,
    ) -> Result<ApplyReport> {
        let mut report = ApplyReport::new(&patch.id);
        if let Err(err) = self.run_apply(patch, archive, storage, &mut report) {
            self.logger.error(&format!(
                "Applying patch {} stopped after stage {}: {err:#}",
                patch.id, report.stage
            ));
            return Err(err.context(format!(
                "patch '{}' stopped after stage '{}'",
                patch.id, report.stage
            )));
        }
        Ok(report)
    }

    fn run_apply(
        &self,
        patch: &PatchDescriptor,
        archive: Option<&dyn PatchSource>,
        storage: Option<&dyn PatchSource>,
        report: &mut ApplyReport,
    ) -> Result<()> {
        self.logger.debug(&format!(
            "Applying patch: {} / {}",
            patch.id, patch.description
        ));

        let overrides_path = self.layout.overrides_path();
        let startup_path = self.layout.startup_path();
        let mut overrides = read_registry_lines(&overrides_path)?;
        let mut startup = read_registry_lines(&startup_path)?;

        let plan = self.plan_bundles(patch, &mut overrides, &mut startup)?;
        report.stage = ApplyStage::OverridesComputed;

        match archive {
            Some(archive) => {
                let extractor = ArtifactExtractor::new(&self.layout, &self.logger);
                report.extraction = extractor.extract(archive, &plan.to_extract)?;
                report.deletion = extractor.delete(&plan.to_delete)?;
            }
            None => self.logger.debug(&format!(
                "No patch archive for {}; artifacts are left as they are",
                patch.id
            )),
        }
        report.stage = ApplyStage::ArtifactsReconciled;

        persist_registry(&overrides_path, overrides)?;
        write_registry_lines(&startup_path, &startup)?;
        report.stage = ApplyStage::RegistriesPersisted;

        let files_source = archive.or(storage).ok_or_else(|| {
            PatchError::MissingBackupLocation {
                patch_id: patch.id.clone(),
            }
        })?;
        BackupStore::new(&self.layout, &self.logger).clear_rolled_back(&patch.id)?;
        for file in &patch.files {
            let Some(mut content) = files_source.open(file)? else {
                self.logger.error(
                    &PatchError::MissingFile {
                        path: file.clone(),
                        source_name: files_source.describe(),
                    }
                    .to_string(),
                );
                report.skipped_files.push(file.clone());
                continue;
            };
            let change = self.patch_file(patch, file, &mut content)?;
            report.patched_files.push(change);
        }
        report.stage = ApplyStage::FilesPatched;

        if let Some(migrator) = &patch.migrator_bundle {
            report.staged_migrator = self.stage_migrator(migrator)?;
        }
        report.stage = ApplyStage::MigratorStaged;

        self.logger.info(&format!("Applied patch {}", patch.id));
        report.stage = ApplyStage::Applied;
        Ok(())
    }

    fn plan_bundles(
        &self,
        patch: &PatchDescriptor,
        overrides: &mut Vec<String>,
        startup: &mut [String],
    ) -> Result<BundlePlan> {
        let mut plan = BundlePlan {
            to_extract: Vec::new(),
            to_delete: Vec::new(),
        };

        for bundle in &patch.bundles {
            let candidate = match ArtifactCoordinate::parse_uri(bundle) {
                Ok(candidate) => candidate,
                Err(CoordinateError::NotArtifactUri { .. }) => continue,
                Err(err) => {
                    self.logger.warn(
                        &PatchError::Parse {
                            line: bundle.clone(),
                            reason: err.to_string(),
                        }
                        .to_string(),
                    );
                    continue;
                }
            };

            let explicit_range = patch.version_range(bundle);
            let range = match explicit_range {
                Some(spec) => VersionRange::parse(spec)
                    .with_context(|| format!("invalid version range for bundle {bundle}"))?,
                None => VersionRange::default_for(&candidate.parsed_version()),
            };
            let line = override_line(bundle, explicit_range);

            let overridden = merge_override(overrides, &candidate, &range, &line, &self.logger);
            for superseded in overridden.superseded {
                plan.to_extract.retain(|pending| pending != &superseded);
                if !plan.to_delete.contains(&superseded) {
                    plan.to_delete.push(superseded);
                }
            }

            let pinned = merge_startup_pin(startup, &candidate, &range, &self.logger);

            let matched = overridden.matched || pinned.matched;
            let replaced = overridden.replaced || pinned.replaced;
            if (!matched || replaced) && !plan.to_extract.contains(&candidate) {
                plan.to_extract.push(candidate);
            }
        }

        Ok(plan)
    }

    /// Replaces one installed file with `content`, snapshotting the previous
    /// version first.
    pub fn patch_file(
        &self,
        patch: &PatchDescriptor,
        rel_path: &str,
        content: &mut dyn Read,
    ) -> Result<FileChange> {
        let target = self.layout.install_path(rel_path);
        let kind = if target.exists() {
            BackupStore::new(&self.layout, &self.logger).backup(&patch.id, rel_path)?;
            fs::remove_file(&target)
                .with_context(|| format!("failed to remove {}", target.display()))?;
            self.logger.debug(&format!("Updating file: {rel_path}"));
            FileChangeKind::Updated
        } else {
            self.logger.debug(&format!("Adding file: {rel_path}"));
            FileChangeKind::Added
        };

        write_stream(content, &target)?;
        Ok(FileChange {
            path: rel_path.to_string(),
            kind,
        })
    }

    fn stage_migrator(&self, migrator: &str) -> Result<Option<PathBuf>> {
        let artifact = match ArtifactCoordinate::parse_uri(migrator) {
            Ok(artifact) => artifact,
            Err(CoordinateError::NotArtifactUri { .. }) => return Ok(None),
            Err(err) => {
                self.logger.warn(
                    &PatchError::Parse {
                        line: migrator.to_string(),
                        reason: err.to_string(),
                    }
                    .to_string(),
                );
                return Ok(None);
            }
        };

        let source = self.layout.artifact_path(&artifact);
        let target = self.layout.deploy_path(artifact.artifact_id());
        ensure_parent_dir(&target)?;
        fs::copy(&source, &target).with_context(|| {
            format!(
                "failed to stage migrator {} from {}",
                artifact,
                source.display()
            )
        })?;
        self.logger.debug(&format!("Staged migrator {artifact} at {}", target.display()));
        Ok(Some(target))
    }

    /// Restores every file listed by the patch. Registry entries and
    /// artifacts changed by the apply are not reverted.
    ///
    /// Restoring consumes the backups, so a patch is rolled back at most once
    /// per apply: later calls leave the install untouched until the patch is
    /// applied again.
    pub fn rollback_patch(&self, patch: &PatchDescriptor) -> Result<RollbackReport> {
        let store = BackupStore::new(&self.layout, &self.logger);
        if store.is_rolled_back(&patch.id) {
            self.logger.warn(&format!("Patch {} is already rolled back", patch.id));
            return Ok(RollbackReport {
                patch_id: patch.id.clone(),
                already_rolled_back: true,
                files: Vec::new(),
            });
        }

        self.logger.debug(&format!(
            "Rolling back patch {} / {}",
            patch.id, patch.description
        ));
        let mut files = Vec::with_capacity(patch.files.len());
        for file in &patch.files {
            let outcome = store
                .restore(&patch.id, file)
                .with_context(|| format!("failed to roll back {file} of patch {}", patch.id))?;
            files.push((file.clone(), outcome));
        }
        store.mark_rolled_back(&patch.id)?;

        Ok(RollbackReport {
            patch_id: patch.id.clone(),
            already_rolled_back: false,
            files,
        })
    }
}
