use patchkit_core::{ArtifactCoordinate, VersionRange};

use crate::registry::is_entry_line;
use crate::{MergeOutcome, PatchError, PatchLogger};

/// One `path=startLevel` entry of the startup registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupPin {
    pub path: String,
    /// Everything from the first `=` on, kept verbatim on rewrite.
    pub start_level_suffix: String,
    pub coordinate: ArtifactCoordinate,
}

pub fn parse_startup_pin(line: &str) -> Result<StartupPin, PatchError> {
    let trimmed = line.trim();
    let Some(separator) = trimmed.find('=') else {
        return Err(PatchError::Parse {
            line: trimmed.to_string(),
            reason: "missing '=' before the start level".to_string(),
        });
    };

    let path = trimmed[..separator].trim();
    let coordinate = ArtifactCoordinate::from_repository_path(path).ok_or_else(|| {
        PatchError::UnrecognizedPath {
            path: path.to_string(),
        }
    })?;

    Ok(StartupPin {
        path: path.to_string(),
        start_level_suffix: trimmed[separator..].to_string(),
        coordinate,
    })
}

/// Rewrites startup pins of the same artifact that fall inside `range` and
/// are older than `candidate`. Unmatched candidates are never appended.
pub fn merge_startup_pin(
    lines: &mut [String],
    candidate: &ArtifactCoordinate,
    range: &VersionRange,
    logger: &dyn PatchLogger,
) -> MergeOutcome {
    let candidate_version = candidate.parsed_version();
    let mut outcome = MergeOutcome::default();

    for line in lines.iter_mut() {
        if !is_entry_line(line) {
            continue;
        }

        let pin = match parse_startup_pin(line) {
            Ok(pin) => pin,
            Err(PatchError::UnrecognizedPath { .. }) => continue,
            Err(err) => {
                logger.warn(&err.to_string());
                continue;
            }
        };
        let pinned_version = pin.coordinate.parsed_version();
        if !pin.coordinate.same_artifact(candidate) || !range.contains(&pinned_version) {
            continue;
        }

        outcome.matched = true;
        if pinned_version < candidate_version {
            *line = format!("{}{}", candidate.repository_path(), pin.start_level_suffix);
            logger.debug(&format!("Overwriting startup pin with: {candidate}"));
            outcome.replaced = true;
            outcome.superseded.push(pin.coordinate);
        }
    }

    outcome
}
