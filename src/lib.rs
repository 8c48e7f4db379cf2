//! plex-linker - mirror a media directory as a Plex library of symbolic links
//!
//! This library classifies media file names by scene naming convention
//! (weekly episodes, miniseries parts, daily and single releases), links each
//! file into the show/season layout Plex expects, and removes links whose
//! source file has gone away.

pub mod classifier;
pub mod cli;
pub mod config;
pub mod format;
pub mod linker;
pub mod output;

pub use classifier::{Classification, ClassifiedFile, classify, classify_os_str};
pub use config::{CompiledFilters, Config, ConfigError};
pub use format::{Format, Metadata};
pub use linker::{LinkError, LinkOutcome, LinkReport, Linker, PruneReport};

pub use cli::{RunOptions, run_cli};
