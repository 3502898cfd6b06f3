//! `xpak init`: project scaffolding command.
//!
//! Creates a project directory holding a `.xproj` descriptor, an `xpak.toml`
//! with the default build settings, and a `Content/` folder with one empty
//! descriptor and one source folder per manifest.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use xpak_config::{ManifestKind, PROJECT_EXTENSION, SETTINGS_FILE};

use crate::GlobalArgs;

/// Runs the `xpak init` command in the current working directory.
///
/// Returns exit code 0 on success.
pub fn run(name: &str, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
        return Err(format!("'{name}' is not a valid project name").into());
    }
    let parent = std::env::current_dir()?;
    if parent.join(name).exists() {
        return Err(format!("directory '{name}' already exists").into());
    }

    if !global.quiet {
        eprintln!("  Creating new XPak project `{name}`");
    }
    let created = scaffold(&parent, name)?;
    if !global.quiet {
        for path in &created {
            eprintln!("     Created {}", path.display());
        }
    }
    Ok(0)
}

/// Writes the project skeleton into `parent/name` and returns the files created.
pub(crate) fn scaffold(parent: &Path, name: &str) -> io::Result<Vec<PathBuf>> {
    let root = parent.join(name);
    let content = root.join("Content");
    let mut created = Vec::new();

    for kind in ManifestKind::ALL {
        fs::create_dir_all(content.join(kind.folder()))?;
    }

    let descriptor = root.join(format!("{name}.{PROJECT_EXTENSION}"));
    fs::write(&descriptor, project_descriptor(name))?;
    created.push(descriptor);

    let settings = root.join(SETTINGS_FILE);
    fs::write(&settings, SETTINGS_TEMPLATE)?;
    created.push(settings);

    for kind in ManifestKind::ALL {
        let path = content.join(kind.descriptor_file());
        fs::write(&path, manifest_descriptor(kind))?;
        created.push(path);
    }
    Ok(created)
}

fn project_descriptor(name: &str) -> String {
    format!(
        r#"<Project name="{name}" version="0.1.0" author="">
  <ContentDirectory>Content</ContentDirectory>
  <BuildDirectory>Build</BuildDirectory>
</Project>
"#
    )
}

fn manifest_descriptor(kind: ManifestKind) -> String {
    let root = kind.folder();
    let example = match kind {
        ManifestKind::Assets => {
            "<Asset name=\"ball\"><Type>Texture</Type><Source>ball.png</Source></Asset>"
        }
        ManifestKind::Scenes => "<Scene name=\"main\"><Source>Main.xscene</Source></Scene>",
        ManifestKind::Scripts => "<Script name=\"player\"><Source>Player.lua</Source></Script>",
    };
    format!("<{root} compress=\"true\">\n  <!-- {example} -->\n</{root}>\n")
}

const SETTINGS_TEMPLATE: &str = r#"[build]
# Worker threads; defaults to one per core.
# jobs = 4
codec = "zlib"
level = 6
table_layout = "prefixed"
"#;
