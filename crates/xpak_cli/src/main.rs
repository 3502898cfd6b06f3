//! XPak CLI: the command-line interface for the XPak content builder.
//!
//! Provides `xpak build`, `xpak rebuild`, `xpak clean` and `xpak reset-cache`
//! for a project descriptor, `xpak inspect` for looking inside a packed
//! container, and `xpak init` for project scaffolding.

#![warn(missing_docs)]

mod build;
mod init;
mod inspect;

use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

/// XPak: incremental content packing for game projects.
#[derive(Parser, Debug)]
#[command(name = "xpak", version, about = "XPak content builder")]
pub struct Cli {
    /// Suppress all output except warnings and errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for reports.
    #[arg(long, global = true, value_enum, default_value_t = ReportFormat::Text)]
    pub format: ReportFormat,

    /// Worker threads; overrides `build.jobs` in `xpak.toml`.
    #[arg(short, long, global = true)]
    pub jobs: Option<NonZeroUsize>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build new and changed items.
    Build(ProjectArgs),
    /// Remove all outputs, then build every item.
    Rebuild(ProjectArgs),
    /// Remove all outputs. Checksums are kept.
    Clean(ProjectArgs),
    /// Forget every checksum so the next build processes everything.
    ResetCache(ProjectArgs),
    /// Validate a packed container and print what it holds.
    Inspect(InspectArgs),
    /// Create a new project.
    Init {
        /// Project name; a directory of that name is created.
        name: String,
    },
}

/// Arguments shared by the project commands.
#[derive(Parser, Debug)]
pub struct ProjectArgs {
    /// Path to the `.xproj` project descriptor.
    #[arg(short, long)]
    pub project: PathBuf,
}

/// Arguments for the `xpak inspect` subcommand.
#[derive(Parser, Debug)]
pub struct InspectArgs {
    /// The `.xpkf` container to inspect.
    pub file: PathBuf,

    /// Write the unpacked payload (or every table item) into this directory.
    #[arg(long)]
    pub extract: Option<PathBuf>,
}

/// Report output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Report output format.
    pub format: ReportFormat,
    /// Worker thread override.
    pub jobs: Option<usize>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);

    let global = GlobalArgs {
        quiet: cli.quiet,
        format: cli.format,
        jobs: cli.jobs.map(NonZeroUsize::get),
    };

    let result = match cli.command {
        Command::Build(ref args) => build::run(build::Action::Build, args, &global),
        Command::Rebuild(ref args) => build::run(build::Action::Rebuild, args, &global),
        Command::Clean(ref args) => build::run(build::Action::Clean, args, &global),
        Command::ResetCache(ref args) => build::run(build::Action::ResetCache, args, &global),
        Command::Inspect(ref args) => inspect::run(args, &global),
        Command::Init { ref name } => init::run(name, &global),
    };

    match result {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(quiet: bool, verbose: bool) {
    let default = default_level(quiet, verbose);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();
}

fn default_level(quiet: bool, verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    }
}
