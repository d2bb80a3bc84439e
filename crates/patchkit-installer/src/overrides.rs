use patchkit_core::{ArtifactCoordinate, VersionRange};

use crate::registry::is_entry_line;
use crate::{MergeOutcome, PatchError, PatchLogger};

pub const OVERRIDE_RANGE_MARKER: &str = ";range=";

/// Literal registry line for a bundle: the bundle itself, plus
/// `;range=<spec>` when the patch names the range explicitly.
pub fn override_line(bundle: &str, explicit_range: Option<&str>) -> String {
    match explicit_range {
        Some(range) => format!("{}{OVERRIDE_RANGE_MARKER}{range}", bundle.trim()),
        None => bundle.trim().to_string(),
    }
}

/// Parses an override entry, ignoring any `;`-separated attributes such as
/// the `;range=` suffix.
pub fn parse_override_line(line: &str) -> Result<ArtifactCoordinate, PatchError> {
    let location = line.split(';').next().unwrap_or(line);
    ArtifactCoordinate::parse_uri(location).map_err(|err| PatchError::Parse {
        line: line.trim().to_string(),
        reason: err.to_string(),
    })
}

/// Merges `candidate` into the override lines.
///
/// Every entry naming the same artifact inside `range` counts as a match.
/// Matches older than the candidate are replaced by `candidate_line` and
/// reported as superseded. Without any match the line is appended.
pub fn merge_override(
    lines: &mut Vec<String>,
    candidate: &ArtifactCoordinate,
    range: &VersionRange,
    candidate_line: &str,
    logger: &dyn PatchLogger,
) -> MergeOutcome {
    let candidate_version = candidate.parsed_version();
    let mut outcome = MergeOutcome::default();

    for line in lines.iter_mut() {
        if !is_entry_line(line) {
            continue;
        }

        let existing = match parse_override_line(line) {
            Ok(existing) => existing,
            Err(err) => {
                logger.warn(&err.to_string());
                continue;
            }
        };
        let existing_version = existing.parsed_version();
        if !existing.same_artifact(candidate) || !range.contains(&existing_version) {
            continue;
        }

        outcome.matched = true;
        if existing_version < candidate_version {
            *line = candidate_line.to_string();
            if !outcome.replaced {
                logger.debug(&format!("Replacing with artifact: {candidate_line}"));
                outcome.replaced = true;
            }
            outcome.superseded.push(existing);
        }
    }

    if !outcome.matched {
        lines.push(candidate_line.to_string());
        logger.debug(&format!("Adding artifact: {candidate_line}"));
    }

    outcome
}
