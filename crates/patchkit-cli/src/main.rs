use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

mod completion;
mod dispatch;
mod render;

use dispatch::run_cli;

#[derive(Parser, Debug)]
#[command(name = "patchkit")]
#[command(about = "Offline patch tool for artifact-based distributions", long_about = None)]
struct Cli {
    /// Install root of the distribution to patch. Defaults to $PATCHKIT_HOME,
    /// then the current directory.
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply every patch descriptor found in a patch package directory.
    Apply {
        package: PathBuf,
        /// Leave artifacts alone and read plain files from this directory.
        #[arg(long)]
        files_from: Option<PathBuf>,
    },
    /// Restore the files changed by the patches in a package.
    Rollback { package: PathBuf },
    /// Print the descriptors of a patch package without applying them.
    Show { package: PathBuf },
    /// Print a shell completion script.
    Completions { shell: CliCompletionShell },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum CliCompletionShell {
    Bash,
    Zsh,
    Fish,
    Powershell,
}

impl From<CliCompletionShell> for Shell {
    fn from(shell: CliCompletionShell) -> Self {
        match shell {
            CliCompletionShell::Bash => Shell::Bash,
            CliCompletionShell::Zsh => Shell::Zsh,
            CliCompletionShell::Fish => Shell::Fish,
            CliCompletionShell::Powershell => Shell::PowerShell,
        }
    }
}

fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(fallback)),
        )
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    run_cli(cli)
}
