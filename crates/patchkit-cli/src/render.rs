use patchkit_core::PatchDescriptor;
use patchkit_installer::{ApplyReport, FileChangeKind, RestoreOutcome, RollbackReport};

pub(crate) fn format_descriptor_lines(descriptors: &[PatchDescriptor]) -> Vec<String> {
    let mut lines = Vec::new();
    for descriptor in descriptors {
        lines.push(format!("Patch: {}", descriptor.id));
        if !descriptor.description.is_empty() {
            lines.push(format!("  description: {}", descriptor.description));
        }
        if !descriptor.requirements.is_empty() {
            lines.push(format!(
                "  requires: {}",
                descriptor.requirements.join(", ")
            ));
        }
        for bundle in &descriptor.bundles {
            match descriptor.version_range(bundle) {
                Some(range) => lines.push(format!("  bundle: {bundle} (range {range})")),
                None => lines.push(format!("  bundle: {bundle}")),
            }
        }
        for file in &descriptor.files {
            lines.push(format!("  file: {file}"));
        }
        if let Some(migrator) = &descriptor.migrator_bundle {
            lines.push(format!("  migrator: {migrator}"));
        }
    }
    lines
}

pub(crate) fn format_apply_report_lines(report: &ApplyReport) -> Vec<String> {
    let extraction = &report.extraction;
    let mut lines = vec![
        format!("Applied patch {}", report.patch_id),
        format!(
            "  artifacts: {} extracted, {} already present, {} missing, {} removed",
            extraction.extracted.len(),
            extraction.already_present.len(),
            extraction.missing.len(),
            report.deletion.deleted.len()
        ),
    ];

    for change in &report.patched_files {
        let verb = match change.kind {
            FileChangeKind::Added => "added",
            FileChangeKind::Updated => "updated",
        };
        lines.push(format!("  {verb} {}", change.path));
    }
    for skipped in &report.skipped_files {
        lines.push(format!("  skipped {skipped} (not in patch)"));
    }
    if let Some(migrator) = &report.staged_migrator {
        lines.push(format!("  staged migrator {}", migrator.display()));
    }
    lines
}

pub(crate) fn format_rollback_lines(report: &RollbackReport) -> Vec<String> {
    if report.already_rolled_back {
        return vec![format!("Patch {} is already rolled back", report.patch_id)];
    }

    let mut lines = vec![format!("Rolled back patch {}", report.patch_id)];
    for (path, outcome) in &report.files {
        let verb = match outcome {
            RestoreOutcome::Restored => "restored",
            RestoreOutcome::Removed => "removed",
            RestoreOutcome::Absent => "unchanged",
        };
        lines.push(format!("  {verb} {path}"));
    }
    lines
}
