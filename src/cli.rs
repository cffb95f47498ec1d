use std::path::PathBuf;

use clap::Parser;

use crate::orchestrator::Inputs;
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(
    name = "license-collect",
    about = "Collect the license texts of a package's dependencies into one source file",
    version
)]
pub struct Cli {
    /// Directories where Package.swift is located
    #[arg(value_name = "PACKAGE_DIR")]
    pub package_dirs: Vec<PathBuf>,

    /// Repository whose own license is collected, as https://host/owner/repo[@ref] (repeatable)
    #[arg(long = "repo", value_name = "URL")]
    pub repos: Vec<String>,

    /// Repository that is cloned and resolved to collect its dependencies' licenses too (repeatable)
    #[arg(long = "package-repo", value_name = "URL")]
    pub package_repos: Vec<String>,

    /// Output directory
    #[arg(short, long, value_name = "DIR")]
    pub output_directory: PathBuf,

    /// Name of the generated file and of the type it declares (a Swift identifier)
    #[arg(short, long, default_value = "Licenses")]
    pub name: String,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Swift, value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Reuse clones of --package-repo repositories across runs [default: from config]
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Config file [default: ./.license-collect/config.toml, fallback ~/.config/license-collect/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Write the licenses that were collected even when some inputs failed
    #[arg(long)]
    pub allow_partial: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print summary line
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    pub fn inputs(&self) -> Inputs {
        Inputs {
            package_dirs: self.package_dirs.clone(),
            direct_refs: self.repos.clone(),
            recursive_refs: self.package_repos.clone(),
        }
    }
}
