mod applier;
mod backups;
mod error;
mod extractor;
mod fs_utils;
mod helper;
mod layout;
mod logger;
mod overrides;
mod registry;
mod source;
mod startup;
mod types;

pub use applier::PatchApplier;
pub use backups::BackupStore;
pub use error::PatchError;
pub use extractor::ArtifactExtractor;
pub use helper::run_helper;
pub use layout::{default_install_root, InstallLayout, INSTALL_ROOT_ENV};
pub use logger::{LogLevel, PatchLogger, TracingLogger};
pub use overrides::{merge_override, override_line, parse_override_line, OVERRIDE_RANGE_MARKER};
pub use registry::{
    is_entry_line, normalize_registry_lines, persist_registry, read_registry_lines,
    write_registry_lines,
};
pub use source::{
    load_package_descriptors, repository_entry, DirectoryPatchSource, PatchSource,
    REPOSITORY_PREFIX,
};
pub use startup::{merge_startup_pin, parse_startup_pin, StartupPin};
pub use types::{
    ApplyReport, ApplyStage, DeletionReport, ExtractionReport, FileChange, FileChangeKind,
    MergeOutcome, RestoreOutcome, RollbackReport,
};

#[cfg(test)]
mod tests;
