use patchkit_core::ArtifactCoordinate;
use std::fmt;
use std::path::PathBuf;

/// Progress of a single patch application. Stages only move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ApplyStage {
    Loaded,
    OverridesComputed,
    ArtifactsReconciled,
    RegistriesPersisted,
    FilesPatched,
    MigratorStaged,
    Applied,
}

impl ApplyStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Loaded => "loaded",
            Self::OverridesComputed => "overrides-computed",
            Self::ArtifactsReconciled => "artifacts-reconciled",
            Self::RegistriesPersisted => "registries-persisted",
            Self::FilesPatched => "files-patched",
            Self::MigratorStaged => "migrator-staged",
            Self::Applied => "applied",
        }
    }
}

impl fmt::Display for ApplyStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of merging one candidate into a registry line list.
///
/// For override merges `superseded` lists the replaced coordinates, whose
/// artifacts become deletion candidates. For startup pins it lists the
/// rewritten pins for reporting only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOutcome {
    pub matched: bool,
    pub replaced: bool,
    pub superseded: Vec<ArtifactCoordinate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionReport {
    pub extracted: Vec<ArtifactCoordinate>,
    pub already_present: Vec<ArtifactCoordinate>,
    pub missing: Vec<ArtifactCoordinate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeletionReport {
    pub deleted: Vec<ArtifactCoordinate>,
    pub not_found: Vec<ArtifactCoordinate>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    Added,
    Updated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: String,
    pub kind: FileChangeKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyReport {
    pub patch_id: String,
    pub stage: ApplyStage,
    pub extraction: ExtractionReport,
    pub deletion: DeletionReport,
    pub patched_files: Vec<FileChange>,
    pub skipped_files: Vec<String>,
    pub staged_migrator: Option<PathBuf>,
}

impl ApplyReport {
    pub(crate) fn new(patch_id: &str) -> Self {
        Self {
            patch_id: patch_id.to_string(),
            stage: ApplyStage::Loaded,
            extraction: ExtractionReport::default(),
            deletion: DeletionReport::default(),
            patched_files: Vec::new(),
            skipped_files: Vec::new(),
            staged_migrator: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// The backup record was copied back and consumed.
    Restored,
    /// No backup existed; the file added by the patch was deleted.
    Removed,
    /// Neither a backup nor an installed file existed.
    Absent,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollbackReport {
    pub patch_id: String,
    /// Set when an earlier rollback already consumed this patch's backups.
    pub already_rolled_back: bool,
    pub files: Vec<(String, RestoreOutcome)>,
}
