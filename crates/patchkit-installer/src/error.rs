/// Failure kinds raised while applying or rolling back a patch.
///
/// Everything except [`PatchError::MissingBackupLocation`] is reported through
/// the [`crate::PatchLogger`] and processing continues with the next item.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PatchError {
    #[error("unable to convert to artifact: {line} ({reason})")]
    Parse { line: String, reason: String },

    #[error("not a repository artifact path: {path}")]
    UnrecognizedPath { path: String },

    #[error("could not find artifact {coordinate} in patch source {source_name} at {entry}")]
    MissingArtifact {
        coordinate: String,
        source_name: String,
        entry: String,
    },

    #[error("could not find file {path} in patch source {source_name}")]
    MissingFile { path: String, source_name: String },

    #[error(
        "unable to update files of patch '{patch_id}': no access to a patch archive or storage location"
    )]
    MissingBackupLocation { patch_id: String },
}
