use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use patchkit_installer::{
    default_install_root, load_package_descriptors, ApplyReport, DirectoryPatchSource,
    InstallLayout, PatchApplier, PatchLogger, PatchSource,
};
use tracing::debug;

use crate::completion::write_completions_script;
use crate::render::{format_apply_report_lines, format_descriptor_lines, format_rollback_lines};
use crate::{Cli, Commands};

pub(crate) fn run_cli(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Apply {
            package,
            files_from,
        } => {
            let layout = resolve_layout(cli.root.as_deref())?;
            layout.ensure_base_dirs()?;
            debug!(
                root = %layout.root().display(),
                package = %package.display(),
                "applying patch package"
            );

            let applier = PatchApplier::new(layout);
            let package = DirectoryPatchSource::new(package);
            let reports = match files_from {
                Some(storage) => {
                    apply_from_storage(&applier, &package, &DirectoryPatchSource::new(storage))?
                }
                None => applier.apply_package(&package)?,
            };
            for report in &reports {
                for line in format_apply_report_lines(report) {
                    println!("{line}");
                }
            }
        }
        Commands::Rollback { package } => {
            let layout = resolve_layout(cli.root.as_deref())?;
            debug!(
                root = %layout.root().display(),
                package = %package.display(),
                "rolling back patch package"
            );

            let applier = PatchApplier::new(layout);
            let reports = applier.rollback_package(&DirectoryPatchSource::new(package))?;
            for report in &reports {
                for line in format_rollback_lines(report) {
                    println!("{line}");
                }
            }
        }
        Commands::Show { package } => {
            let source = DirectoryPatchSource::new(&package);
            let descriptors = load_package_descriptors(&source)?;
            if descriptors.is_empty() {
                println!("No patch found in {}", package.display());
            } else {
                for line in format_descriptor_lines(&descriptors) {
                    println!("{line}");
                }
            }
        }
        Commands::Completions { shell } => {
            let mut stdout = std::io::stdout().lock();
            write_completions_script(shell, &mut stdout)?;
            stdout.flush().context("failed flushing completion script")?;
        }
    }

    Ok(())
}

pub(crate) fn resolve_layout(root: Option<&Path>) -> Result<InstallLayout> {
    let root = match root {
        Some(root) => root.to_path_buf(),
        None => default_install_root()?,
    };
    Ok(InstallLayout::new(root))
}

/// Applies the package's descriptors without an archive: artifacts stay as
/// they are and plain files come from `storage`.
pub(crate) fn apply_from_storage(
    applier: &PatchApplier,
    package: &dyn PatchSource,
    storage: &dyn PatchSource,
) -> Result<Vec<ApplyReport>> {
    let descriptors = load_package_descriptors(package)?;
    if descriptors.is_empty() {
        applier.logger().warn("No patch to apply");
        return Ok(Vec::new());
    }

    descriptors
        .iter()
        .map(|descriptor| applier.apply_patch(descriptor, None, Some(storage)))
        .collect()
}
