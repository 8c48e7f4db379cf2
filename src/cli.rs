//! Command-line front-end for plex-linker.
//!
//! This module handles:
//! - Resolving source and destination from arguments or configuration
//! - Validating both directories before anything is touched
//! - Running the link pass followed by the broken-link pass
//! - Printing run summaries

use crate::config::Config;
use crate::linker::Linker;
use crate::output::OutputFormatter;
use std::path::{Path, PathBuf};

/// Options for a single run, as given on the command line.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Directory containing the media. Falls back to `settings.source_directory`.
    pub source: Option<PathBuf>,
    /// Directory the links are made in. Falls back to `settings.target_directory`.
    pub destination: Option<PathBuf>,
    /// Report changes without making them.
    pub dry_run: bool,
    /// Remove directories emptied by broken-link removal. Also enabled by
    /// `settings.prune_empty_dirs`.
    pub prune_empty_dirs: bool,
    /// Explicit configuration file.
    pub config_path: Option<PathBuf>,
}

/// Runs the CLI with configuration discovered from the usual locations.
///
/// # Examples
///
/// ```no_run
/// use plex_linker::cli::{run_cli, RunOptions};
///
/// let options = RunOptions {
///     source: Some("/srv/downloads/tv".into()),
///     destination: Some("/srv/plex/tv".into()),
///     ..Default::default()
/// };
/// if let Err(e) = run_cli(&options) {
///     eprintln!("Error: {}", e);
/// }
/// ```
pub fn run_cli(options: &RunOptions) -> Result<(), String> {
    let config = Config::load(options.config_path.as_deref())
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    run_cli_with_config(options, &config)
}

/// Runs the CLI against an already loaded configuration.
///
/// Command-line values win over configuration values.
pub fn run_cli_with_config(options: &RunOptions, config: &Config) -> Result<(), String> {
    let source = options
        .source
        .clone()
        .or_else(|| config.settings.source_directory.clone())
        .ok_or("No source directory given")?;
    let destination = options
        .destination
        .clone()
        .or_else(|| config.settings.target_directory.clone())
        .ok_or("No destination directory given")?;

    let source = resolve_existing("Source", &source)?;
    let destination = resolve_existing("Destination", &destination)?;

    let filters = config
        .compile_filters()
        .map_err(|e| format!("Error compiling filters: {}", e))?;

    let linker = Linker::new(source, destination)
        .with_filters(filters)
        .dry_run(options.dry_run)
        .prune_empty_dirs(options.prune_empty_dirs || config.settings.prune_empty_dirs);

    log::debug!(
        "Linking {} into {}",
        linker.source_dir().display(),
        linker.target_dir().display()
    );

    let link_report = linker.make_links().map_err(|e| format!("Error: {}", e))?;
    let prune_report = linker
        .delete_broken_links()
        .map_err(|e| format!("Error: {}", e))?;

    OutputFormatter::link_summary(&link_report, options.dry_run);
    OutputFormatter::prune_summary(&prune_report, options.dry_run);

    Ok(())
}

/// Checks that `path` exists and returns it in absolute form, so the links
/// made from it stay valid wherever they are resolved from.
fn resolve_existing(label: &str, path: &Path) -> Result<PathBuf, String> {
    if !path.exists() {
        return Err(format!("{} path [{}] not found.", label, path.display()));
    }
    path.canonicalize()
        .map_err(|e| format!("{} path [{}] cannot be resolved: {}", label, path.display(), e))
}
