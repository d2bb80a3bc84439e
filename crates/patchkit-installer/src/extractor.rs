use anyhow::{Context, Result};
use patchkit_core::ArtifactCoordinate;
use std::fs;

use crate::fs_utils::write_stream;
use crate::source::repository_entry;
use crate::{DeletionReport, ExtractionReport, InstallLayout, PatchError, PatchLogger, PatchSource};

/// Moves artifact payloads between a patch package and `system/`.
pub struct ArtifactExtractor<'a> {
    layout: &'a InstallLayout,
    logger: &'a dyn PatchLogger,
}

impl<'a> ArtifactExtractor<'a> {
    pub fn new(layout: &'a InstallLayout, logger: &'a dyn PatchLogger) -> Self {
        Self { layout, logger }
    }

    /// Copies each artifact from `repository/<path>` in the package. Artifacts
    /// already present in `system/` are left untouched; missing payloads are
    /// logged and skipped.
    pub fn extract(
        &self,
        source: &dyn PatchSource,
        artifacts: &[ArtifactCoordinate],
    ) -> Result<ExtractionReport> {
        let mut report = ExtractionReport::default();
        for artifact in artifacts {
            self.logger.debug(&format!("Extracting artifact: {artifact}"));
            let entry = repository_entry(&artifact.repository_path());
            let Some(mut payload) = source.open(&entry)? else {
                self.logger.error(
                    &PatchError::MissingArtifact {
                        coordinate: artifact.to_string(),
                        source_name: source.describe(),
                        entry,
                    }
                    .to_string(),
                );
                report.missing.push(artifact.clone());
                continue;
            };

            let target = self.layout.artifact_path(artifact);
            if target.is_file() {
                report.already_present.push(artifact.clone());
                continue;
            }

            write_stream(&mut payload, &target)
                .with_context(|| format!("failed to extract artifact {artifact}"))?;
            report.extracted.push(artifact.clone());
        }
        Ok(report)
    }

    pub fn delete(&self, artifacts: &[ArtifactCoordinate]) -> Result<DeletionReport> {
        let mut report = DeletionReport::default();
        for artifact in artifacts {
            let target = self.layout.artifact_path(artifact);
            if !target.exists() {
                self.logger.warn(&format!("Could not find: {}", target.display()));
                report.not_found.push(artifact.clone());
                continue;
            }

            self.logger.debug(&format!("Removing old artifact {artifact}"));
            fs::remove_file(&target)
                .with_context(|| format!("failed to remove artifact {}", target.display()))?;
            report.deleted.push(artifact.clone());
        }
        Ok(report)
    }
}
