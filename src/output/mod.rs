//! Writers for the collected license set.
//!
//! - [`swift`] renders a Swift source file embedding every license text.
//! - JSON output is a pretty-printed array of [`License`] records.
//! - [`terminal`] prints a colored summary table; it never writes files.

pub mod swift;
pub mod terminal;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{Error, Result};
use crate::models::License;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Swift,
    Json,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Swift => "swift",
            OutputFormat::Json => "json",
        }
    }
}

/// Path the artifact for `name` lands at inside `directory`.
pub fn output_path(directory: &Path, name: &str, format: OutputFormat) -> PathBuf {
    directory.join(format!("{}.{}", name, format.extension()))
}

pub fn render(licenses: &[License], name: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Swift => Ok(swift::render(name, licenses)),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(licenses)?;
            json.push('\n');
            Ok(json)
        }
    }
}

/// Render `licenses` and write them to `{directory}/{name}.{ext}`, creating
/// the directory when needed.
pub fn write(
    licenses: &[License],
    directory: &Path,
    name: &str,
    format: OutputFormat,
) -> Result<PathBuf> {
    let contents = render(licenses, name, format)?;
    let path = output_path(directory, name, format);

    std::fs::create_dir_all(directory)
        .map_err(|e| Error::io(format!("creating {}", directory.display()), e))?;
    std::fs::write(&path, contents)
        .map_err(|e| Error::io(format!("writing {}", path.display()), e))?;

    info!("Wrote {} licenses to {}", licenses.len(), path.display());
    Ok(path)
}
