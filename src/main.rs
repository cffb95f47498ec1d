//! `license-collect` command-line entry point.
//!
//! Exits `0` when every input group resolved, `1` otherwise. With
//! `--allow-partial` the licenses of the groups that did resolve are still
//! written before exiting `1`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use license_collect::cli::Cli;
use license_collect::config::load_config;
use license_collect::manifest::ManifestReader;
use license_collect::output;
use license_collect::package_manager::CommandPackageManager;
use license_collect::validate::{prepare_packages, validate};
use license_collect::{Error, ResolutionOrchestrator};

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {}", "Error:".red().bold(), e);
            if let Some(hint) = e.downcast_ref::<Error>().and_then(Error::hint) {
                eprintln!("{} {}", "Hint:".yellow(), hint);
            }
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 0 = warn, 1 = info, 2+ = debug; RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| match cli.verbose {
        0 => EnvFilter::new("license_collect=warn"),
        1 => EnvFilter::new("license_collect=info"),
        _ => EnvFilter::new("license_collect=debug"),
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let cwd = std::env::current_dir()?;
    let config = load_config(&cwd, cli.config.as_deref())?;

    let inputs = cli.inputs();
    validate(&inputs, &cli.output_directory, &cli.name, cli.format)?;

    // Packages without a lockfile are resolved in place first
    let reader = ManifestReader::new(config.tools.lockfile.clone(), config.raw_hosts());
    let package_manager = CommandPackageManager::new(config.tools.package_manager.clone());
    prepare_packages(&inputs.package_dirs, &reader, &package_manager).await?;

    let cache_root = cli.cache_dir.clone().or_else(|| config.cache.dir.clone());
    if let Some(root) = &cache_root {
        debug!("Using clone cache at {}", root.display());
    }

    let orchestrator = ResolutionOrchestrator::from_config(&config)?.with_cache_root(cache_root);
    if !inputs.recursive_refs.is_empty() {
        orchestrator.resolver().ensure_available().await?;
    }

    let pb = if !cli.quiet {
        let pb = ProgressBar::new(0);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}",
                )?
                .progress_chars("#>-"),
        );
        pb
    } else {
        ProgressBar::hidden()
    };
    let fetcher = orchestrator.fetcher().clone().with_progress(pb.clone());
    let orchestrator = orchestrator.with_fetcher(fetcher);

    let resolution = orchestrator.run(&inputs).await;
    pb.finish_and_clear();

    let written = if resolution.failures.is_empty() || cli.allow_partial {
        Some(output::write(
            &resolution.licenses,
            &cli.output_directory,
            &cli.name,
            cli.format,
        )?)
    } else {
        None
    };

    output::terminal::render(
        &resolution.licenses,
        &resolution.failures,
        written.as_deref(),
        cli.quiet,
    );

    if resolution.failures.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        for failure in &resolution.failures {
            eprintln!("{} {} failed: {}", "Error:".red().bold(), failure.group, failure.error);
            if let Some(hint) = failure.error.hint() {
                eprintln!("{} {}", "Hint:".yellow(), hint);
            }
        }
        Ok(ExitCode::FAILURE)
    }
}
