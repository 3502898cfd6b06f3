//! `xpak build`, `rebuild`, `clean` and `reset-cache`.
//!
//! Every command loads the project descriptor given with `--project`, applies
//! `xpak.toml` and the `--jobs` override, then runs one project operation.

use xpak_build::{BuildReport, Project};

use crate::{GlobalArgs, ProjectArgs, ReportFormat};

/// The project operation to run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Action {
    /// Incremental build.
    Build,
    /// Clean, then build.
    Rebuild,
    /// Remove outputs.
    Clean,
    /// Forget checksums.
    ResetCache,
}

/// Runs a project command.
///
/// Returns exit code 0 on success and 1 when any item failed to pack.
/// Fatal errors are returned and reported by `main`.
pub fn run(
    action: Action,
    args: &ProjectArgs,
    global: &GlobalArgs,
) -> Result<i32, Box<dyn std::error::Error>> {
    let project = Project::load_with_jobs(&args.project, global.jobs)?;
    let name = project.descriptor().name.clone();

    let report = match action {
        Action::Build => project.build()?,
        Action::Rebuild => project.rebuild()?,
        Action::Clean => {
            project.clean()?;
            if !global.quiet {
                eprintln!("     Cleaned {name}");
            }
            return Ok(0);
        }
        Action::ResetCache => {
            project.reset_cache()?;
            if !global.quiet {
                eprintln!("       Reset build cache of {name}");
            }
            return Ok(0);
        }
    };

    match global.format {
        ReportFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        ReportFormat::Text => {
            if !global.quiet || !report.is_success() {
                print!("{}", render_text(&report));
            }
        }
    }
    Ok(if report.is_success() { 0 } else { 1 })
}

/// Human-readable summary: one line per manifest, then each failure.
fn render_text(report: &BuildReport) -> String {
    let mut out = String::new();
    for m in &report.manifests {
        out.push_str(&format!(
            "{:>10} {} built, {} up to date",
            m.kind.to_string(),
            m.built.len(),
            m.skipped
        ));
        if !m.empty.is_empty() {
            out.push_str(&format!(", {} empty", m.empty.len()));
        }
        if !m.failures.is_empty() {
            out.push_str(&format!(", {} failed", m.failures.len()));
        }
        out.push('\n');
        for f in &m.failures {
            out.push_str(&format!("    failed {}: {}\n", f.name, f.message));
        }
    }
    out.push_str(&format!(
        "  Finished {}: {} built, {} up to date, {} failed\n",
        report.project,
        report.built_count(),
        report.skipped_count(),
        report.failure_count()
    ));
    out
}
