use clap::Parser;
use log::LevelFilter;
use plex_linker::cli::{RunOptions, run_cli};
use plex_linker::output::OutputFormatter;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Generate symlinks in a Plex compatible directory structure for TV shows.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Directory containing your TV
    source: Option<PathBuf>,
    /// The directory for symlinks to be made in
    destination: Option<PathBuf>,
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
    /// Show what would be linked and removed without changing anything
    #[arg(long)]
    dry_run: bool,
    /// Remove directories left empty after deleting broken links
    #[arg(long)]
    prune_empty_dirs: bool,
    /// Configuration file (defaults to .plexlinkerrc.toml, then ~/.config/plex-linker/config.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn init_logger(verbose: bool) {
    let level = if verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_module("plex_linker", level)
        .format(|buf, record| writeln!(buf, "{}", record.args()))
        .target(env_logger::Target::Stdout)
        .init();
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logger(args.verbose);

    let options = RunOptions {
        source: args.source,
        destination: args.destination,
        dry_run: args.dry_run,
        prune_empty_dirs: args.prune_empty_dirs,
        config_path: args.config,
    };

    match run_cli(&options) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            OutputFormatter::error(&e);
            ExitCode::FAILURE
        }
    }
}
