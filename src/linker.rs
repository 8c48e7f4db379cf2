//! Building and pruning the Plex directory of symbolic links.
//!
//! [`Linker::make_links`] mirrors every source file into the target tree
//! under the name and directory its [`Classification`](crate::classifier::Classification)
//! dictates. [`Linker::delete_broken_links`] removes links whose source has
//! disappeared. Both are safe to re-run: a link that is already in place is
//! reported as [`LinkOutcome::AlreadyPresent`], not as an error.

use crate::classifier::ClassifiedFile;
use crate::config::CompiledFilters;
use crate::format::Format;
use log::{debug, info};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Errors that abort a linking or pruning run.
#[derive(Debug)]
pub enum LinkError {
    /// Walking a directory tree failed.
    TraversalFailed { source: walkdir::Error },
    /// Failed to create a directory in the target tree.
    DirectoryCreationFailed { path: PathBuf, source: io::Error },
    /// Failed to create a link for reasons other than it already existing.
    LinkCreationFailed {
        link: PathBuf,
        target: PathBuf,
        source: io::Error,
    },
    /// Failed to resolve a link for reasons other than a missing target.
    StatFailed { path: PathBuf, source: io::Error },
    /// Failed to remove a broken link.
    RemovalFailed { path: PathBuf, source: io::Error },
    /// Failed to remove a directory emptied by pruning.
    DirectoryRemovalFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for LinkError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TraversalFailed { source } => write!(f, "Failed to walk directory: {}", source),
            Self::DirectoryCreationFailed { path, source } => {
                write!(
                    f,
                    "Failed to create directory {}: {}",
                    path.display(),
                    source
                )
            }
            Self::LinkCreationFailed {
                link,
                target,
                source,
            } => {
                write!(
                    f,
                    "Failed to link {} -> {}: {}",
                    link.display(),
                    target.display(),
                    source
                )
            }
            Self::StatFailed { path, source } => {
                write!(f, "Failed to resolve {}: {}", path.display(), source)
            }
            Self::RemovalFailed { path, source } => {
                write!(f, "Failed to remove link {}: {}", path.display(), source)
            }
            Self::DirectoryRemovalFailed { path, source } => {
                write!(
                    f,
                    "Failed to remove directory {}: {}",
                    path.display(),
                    source
                )
            }
        }
    }
}

impl std::error::Error for LinkError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::TraversalFailed { source } => Some(source),
            Self::DirectoryCreationFailed { source, .. }
            | Self::LinkCreationFailed { source, .. }
            | Self::StatFailed { source, .. }
            | Self::RemovalFailed { source, .. }
            | Self::DirectoryRemovalFailed { source, .. } => Some(source),
        }
    }
}

/// Result type for linking operations.
pub type LinkResult<T> = Result<T, LinkError>;

/// What happened to a single source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// A new link was created.
    Created,
    /// Something already exists at the link path; left untouched.
    AlreadyPresent,
    /// Dry run: the link would have been created.
    Planned,
}

/// A link made (or planned) during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkRecord {
    /// Where the link lives in the target tree.
    pub link_path: PathBuf,
    /// The source file it points to.
    pub source_path: PathBuf,
    pub format: Format,
}

/// Summary of a [`Linker::make_links`] run.
#[derive(Debug, Default)]
pub struct LinkReport {
    /// Links created in this run.
    pub created: Vec<LinkRecord>,
    /// Links that would be created (dry run only).
    pub planned: Vec<LinkRecord>,
    /// Files whose link was already in place.
    pub already_present: usize,
    /// Files skipped by the configured filters.
    pub filtered: usize,
    /// Number of classified files per format.
    pub per_format: BTreeMap<Format, usize>,
}

impl LinkReport {
    /// Total number of source files that were classified.
    pub fn total_classified(&self) -> usize {
        self.per_format.values().sum()
    }
}

/// Summary of a [`Linker::delete_broken_links`] run.
#[derive(Debug, Default)]
pub struct PruneReport {
    /// Broken links removed (or, in a dry run, that would be removed).
    pub removed: Vec<PathBuf>,
    /// Links whose target still exists.
    pub intact: usize,
    /// Entries that are not symbolic links and were left alone.
    pub ignored_files: Vec<PathBuf>,
    /// Directories removed because pruning emptied them.
    pub pruned_dirs: Vec<PathBuf>,
}

/// Mirrors a source tree into a Plex-style tree of symbolic links.
#[derive(Debug, Clone)]
pub struct Linker {
    source_dir: PathBuf,
    target_dir: PathBuf,
    filters: CompiledFilters,
    dry_run: bool,
    prune_empty_dirs: bool,
}

impl Linker {
    /// Creates a linker that looks for files in `source_dir` and makes links
    /// in `target_dir`.
    ///
    /// Links point at paths built from `source_dir`, so pass an absolute
    /// path unless relative links are wanted.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use plex_linker::linker::Linker;
    ///
    /// let linker = Linker::new("/srv/downloads/tv", "/srv/plex/tv");
    /// let report = linker.make_links().expect("linking failed");
    /// println!("Created {} links", report.created.len());
    /// linker.delete_broken_links().expect("pruning failed");
    /// ```
    pub fn new(source_dir: impl Into<PathBuf>, target_dir: impl Into<PathBuf>) -> Self {
        Self {
            source_dir: source_dir.into(),
            target_dir: target_dir.into(),
            filters: CompiledFilters::default(),
            dry_run: false,
            prune_empty_dirs: false,
        }
    }

    /// Only link files accepted by `filters`.
    pub fn with_filters(mut self, filters: CompiledFilters) -> Self {
        self.filters = filters;
        self
    }

    /// Report what would change without touching the filesystem.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Remove directories emptied by [`Linker::delete_broken_links`].
    pub fn prune_empty_dirs(mut self, prune: bool) -> Self {
        self.prune_empty_dirs = prune;
        self
    }

    pub fn source_dir(&self) -> &Path {
        &self.source_dir
    }

    pub fn target_dir(&self) -> &Path {
        &self.target_dir
    }

    /// Links every regular file under the source directory into the target
    /// directory.
    ///
    /// Symbolic links in the source tree are neither followed nor linked.
    ///
    /// # Errors
    ///
    /// Any filesystem failure other than an existing link aborts the run.
    /// Links created before the failure are left in place.
    pub fn make_links(&self) -> LinkResult<LinkReport> {
        let mut report = LinkReport::default();
        // Dry runs create nothing, so a second file planned for the same link
        // path has to be caught here.
        let mut planned_paths = HashSet::new();

        for entry in WalkDir::new(&self.source_dir) {
            let entry = entry.map_err(|source| LinkError::TraversalFailed { source })?;
            if !entry.file_type().is_file() {
                continue;
            }

            let relative = entry
                .path()
                .strip_prefix(&self.source_dir)
                .unwrap_or(entry.path());
            if !self.filters.should_include(relative) {
                debug!("Skipping filtered file {}", entry.path().display());
                report.filtered += 1;
                continue;
            }

            let file = ClassifiedFile::new(entry.path());
            let format = file.classification.format;
            *report.per_format.entry(format).or_insert(0) += 1;

            let record = LinkRecord {
                link_path: file.link_path(&self.target_dir),
                source_path: file.source_path.clone(),
                format,
            };
            match self.link(&file)? {
                LinkOutcome::Created => report.created.push(record),
                LinkOutcome::Planned if planned_paths.insert(record.link_path.clone()) => {
                    report.planned.push(record)
                }
                LinkOutcome::Planned => {
                    debug!(
                        "Symlink already planned at {}",
                        record.link_path.display()
                    );
                    report.already_present += 1
                }
                LinkOutcome::AlreadyPresent => report.already_present += 1,
            }
        }

        Ok(report)
    }

    /// Creates the link for a single classified file.
    pub fn link(&self, file: &ClassifiedFile) -> LinkResult<LinkOutcome> {
        let target_dir = file.target_dir(&self.target_dir);
        let link_path = file.link_path(&self.target_dir);

        if self.dry_run {
            if fs::symlink_metadata(&link_path).is_ok() {
                return Ok(LinkOutcome::AlreadyPresent);
            }
            info!(
                "Would make symlink {} -> {}",
                link_path.display(),
                file.source_path.display()
            );
            return Ok(LinkOutcome::Planned);
        }

        fs::create_dir_all(&target_dir).map_err(|source| LinkError::DirectoryCreationFailed {
            path: target_dir.clone(),
            source,
        })?;

        match create_symlink(&file.source_path, &link_path) {
            Ok(()) => {
                info!(
                    "Made symlink {} -> {}",
                    link_path.display(),
                    file.source_path.display()
                );
                Ok(LinkOutcome::Created)
            }
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                debug!("Symlink already exists at {}", link_path.display());
                Ok(LinkOutcome::AlreadyPresent)
            }
            Err(source) => Err(LinkError::LinkCreationFailed {
                link: link_path,
                target: file.source_path.clone(),
                source,
            }),
        }
    }

    /// Removes every symbolic link under the target directory whose target
    /// no longer exists.
    ///
    /// Regular files are never removed. Broken links are collected during the
    /// walk and deleted afterwards.
    ///
    /// # Errors
    ///
    /// Any failure to resolve a link, other than its target being missing,
    /// aborts the run before anything is removed.
    pub fn delete_broken_links(&self) -> LinkResult<PruneReport> {
        let mut report = PruneReport::default();
        let mut broken = Vec::new();

        for entry in WalkDir::new(&self.target_dir) {
            let entry = entry.map_err(|source| LinkError::TraversalFailed { source })?;
            let file_type = entry.file_type();
            if file_type.is_dir() {
                continue;
            }
            if !file_type.is_symlink() {
                debug!("Ignoring non-link entry {}", entry.path().display());
                report.ignored_files.push(entry.path().to_path_buf());
                continue;
            }

            match fs::metadata(entry.path()) {
                Ok(_) => report.intact += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    broken.push(entry.path().to_path_buf());
                }
                Err(source) => {
                    return Err(LinkError::StatFailed {
                        path: entry.path().to_path_buf(),
                        source,
                    });
                }
            }
        }

        for path in broken {
            if self.dry_run {
                info!("Would remove broken symlink {}", path.display());
            } else {
                fs::remove_file(&path).map_err(|source| LinkError::RemovalFailed {
                    path: path.clone(),
                    source,
                })?;
                info!("Removed broken symlink {}", path.display());

                if self.prune_empty_dirs {
                    self.remove_empty_parents(&path, &mut report.pruned_dirs)?;
                }
            }
            report.removed.push(path);
        }

        Ok(report)
    }

    /// Removes the directories above `path` while they are empty, stopping at
    /// the target root.
    fn remove_empty_parents(&self, path: &Path, pruned: &mut Vec<PathBuf>) -> LinkResult<()> {
        let mut dir = path.parent();

        while let Some(current) = dir {
            if current == self.target_dir || !current.starts_with(&self.target_dir) {
                break;
            }

            match fs::remove_dir(current) {
                Ok(()) => {
                    info!("Removed empty directory {}", current.display());
                    pruned.push(current.to_path_buf());
                }
                // An earlier removal already took this directory out.
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) if e.kind() == io::ErrorKind::DirectoryNotEmpty => break,
                Err(source) => {
                    return Err(LinkError::DirectoryRemovalFailed {
                        path: current.to_path_buf(),
                        source,
                    });
                }
            }
            dir = current.parent();
        }

        Ok(())
    }
}

#[cfg(unix)]
fn create_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn create_symlink(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    struct Dirs {
        _temp_dir: TempDir,
        source: PathBuf,
        target: PathBuf,
    }

    fn setup(files: &[&str]) -> Dirs {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let source = temp_dir.path().join("source");
        let target = temp_dir.path().join("target");
        fs::create_dir_all(&target).unwrap();
        for file in files {
            let path = source.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, "video").unwrap();
        }
        Dirs {
            _temp_dir: temp_dir,
            source,
            target,
        }
    }

    #[test]
    fn test_make_links_creates_symlink() {
        let dirs = setup(&["Show.Name.S02E05.Description.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);

        let report = linker.make_links().expect("Failed to make links");

        let link = dirs
            .target
            .join("Show Name")
            .join("Season 02")
            .join("Show Name - s02e05 - Show.Name.S02E05.Description.mkv");
        assert!(link.symlink_metadata().unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_link(&link).unwrap(),
            dirs.source.join("Show.Name.S02E05.Description.mkv")
        );
        assert_eq!(report.created.len(), 1);
        assert_eq!(report.created[0].format, Format::Weekly);
        assert_eq!(report.per_format.get(&Format::Weekly), Some(&1));
    }

    #[test]
    fn test_make_links_recurses_into_subdirectories() {
        let dirs = setup(&["a/b/Daily.Show.2020.03.15.mkv", "c/randomfile.txt"]);
        let linker = Linker::new(&dirs.source, &dirs.target);

        let report = linker.make_links().unwrap();

        assert_eq!(report.total_classified(), 2);
        assert!(
            dirs.target
                .join("Daily Show/2020/Daily Show - 2020 03 15 - Daily.Show.2020.03.15.mkv")
                .exists()
        );
        assert!(dirs.target.join("Uncategorized/randomfile.txt").exists());
    }

    #[test]
    fn test_make_links_is_idempotent() {
        let dirs = setup(&["Show.S01E01.mkv", "Show.S01E02.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);

        let first = linker.make_links().unwrap();
        let second = linker.make_links().unwrap();

        assert_eq!(first.created.len(), 2);
        assert!(second.created.is_empty());
        assert_eq!(second.already_present, 2);
    }

    #[test]
    fn test_link_reports_already_present() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);
        let file = ClassifiedFile::new(&dirs.source.join("Show.S01E01.mkv"));

        assert_eq!(linker.link(&file).unwrap(), LinkOutcome::Created);
        assert_eq!(linker.link(&file).unwrap(), LinkOutcome::AlreadyPresent);
    }

    #[test]
    fn test_make_links_applies_filters() {
        let dirs = setup(&["Show.S01E01.mkv", "Show.S01E01.nfo"]);
        let rules = crate::config::FilterRules {
            exclude: crate::config::ExcludeRules {
                extensions: vec!["nfo".to_string()],
                ..Default::default()
            },
            ..Default::default()
        };
        let linker = Linker::new(&dirs.source, &dirs.target)
            .with_filters(CompiledFilters::new(&rules).unwrap());

        let report = linker.make_links().unwrap();

        assert_eq!(report.created.len(), 1);
        assert_eq!(report.filtered, 1);
        assert!(!dirs.target.join("Show/Season 01/Show - s01e01 - Show.S01E01.nfo").exists());
    }

    #[test]
    fn test_make_links_dry_run_touches_nothing() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target).dry_run(true);

        let report = linker.make_links().unwrap();

        assert_eq!(report.planned.len(), 1);
        assert!(report.created.is_empty());
        assert_eq!(fs::read_dir(&dirs.target).unwrap().count(), 0);
    }

    #[test]
    fn test_make_links_skips_source_symlinks() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        create_symlink(
            &dirs.source.join("Show.S01E01.mkv"),
            &dirs.source.join("Alias.S01E02.mkv"),
        )
        .unwrap();
        let linker = Linker::new(&dirs.source, &dirs.target);

        let report = linker.make_links().unwrap();

        assert_eq!(report.created.len(), 1);
        assert!(!dirs.target.join("Alias").exists());
    }

    #[test]
    fn test_make_links_missing_source_fails() {
        let dirs = setup(&[]);
        let linker = Linker::new(dirs.source.join("missing"), &dirs.target);

        let result = linker.make_links();
        assert!(matches!(result, Err(LinkError::TraversalFailed { .. })));
    }

    #[test]
    fn test_delete_broken_links_removes_only_broken() {
        let dirs = setup(&["Show.S01E01.mkv", "Show.S01E02.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);
        linker.make_links().unwrap();

        fs::remove_file(dirs.source.join("Show.S01E01.mkv")).unwrap();
        let report = linker.delete_broken_links().unwrap();

        let season = dirs.target.join("Show").join("Season 01");
        assert_eq!(
            report.removed,
            vec![season.join("Show - s01e01 - Show.S01E01.mkv")]
        );
        assert_eq!(report.intact, 1);
        assert!(
            season
                .join("Show - s01e02 - Show.S01E02.mkv")
                .symlink_metadata()
                .is_ok()
        );
        assert!(
            season
                .join("Show - s01e01 - Show.S01E01.mkv")
                .symlink_metadata()
                .is_err()
        );
    }

    #[test]
    fn test_delete_broken_links_leaves_regular_files() {
        let dirs = setup(&[]);
        fs::write(dirs.target.join("notes.txt"), "keep me").unwrap();
        let linker = Linker::new(&dirs.source, &dirs.target);

        let report = linker.delete_broken_links().unwrap();

        assert!(report.removed.is_empty());
        assert_eq!(report.ignored_files, vec![dirs.target.join("notes.txt")]);
        assert!(dirs.target.join("notes.txt").exists());
    }

    #[test]
    fn test_delete_broken_links_dry_run_keeps_links() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        Linker::new(&dirs.source, &dirs.target).make_links().unwrap();
        fs::remove_file(dirs.source.join("Show.S01E01.mkv")).unwrap();

        let report = Linker::new(&dirs.source, &dirs.target)
            .dry_run(true)
            .delete_broken_links()
            .unwrap();

        let link = dirs.target.join("Show/Season 01/Show - s01e01 - Show.S01E01.mkv");
        assert_eq!(report.removed, vec![link.clone()]);
        assert!(link.symlink_metadata().is_ok());
    }

    #[test]
    fn test_delete_broken_links_prunes_empty_dirs() {
        let dirs = setup(&["Show.S01E01.mkv", "Other.S01E01.mkv", "Other.S02E01.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target).prune_empty_dirs(true);
        linker.make_links().unwrap();

        fs::remove_file(dirs.source.join("Show.S01E01.mkv")).unwrap();
        fs::remove_file(dirs.source.join("Other.S01E01.mkv")).unwrap();
        let report = linker.delete_broken_links().unwrap();

        assert_eq!(report.removed.len(), 2);
        assert!(!dirs.target.join("Show").exists());
        assert!(!dirs.target.join("Other/Season 01").exists());
        assert!(dirs.target.join("Other/Season 02").exists());
        assert!(dirs.target.exists());
        assert!(report.pruned_dirs.contains(&dirs.target.join("Show")));
    }

    #[test]
    fn test_delete_broken_links_keeps_empty_dirs_by_default() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);
        linker.make_links().unwrap();

        fs::remove_file(dirs.source.join("Show.S01E01.mkv")).unwrap();
        linker.delete_broken_links().unwrap();

        assert!(dirs.target.join("Show/Season 01").is_dir());
    }

    #[test]
    fn test_make_links_keeps_non_utf8_names_apart() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dirs = setup(&[]);
        fs::create_dir_all(&dirs.source).unwrap();
        for name in [b"bad\xff.bin".as_slice(), b"bad\xfe.bin".as_slice()] {
            fs::write(dirs.source.join(OsStr::from_bytes(name)), "video").unwrap();
        }
        let linker = Linker::new(&dirs.source, &dirs.target);

        let report = linker.make_links().unwrap();

        assert_eq!(report.created.len(), 2);
        assert_eq!(report.already_present, 0);
        let uncategorized = dirs.target.join("Uncategorized");
        for name in [b"bad\xff.bin".as_slice(), b"bad\xfe.bin".as_slice()] {
            let link = uncategorized.join(OsStr::from_bytes(name));
            assert_eq!(
                fs::read_link(&link).unwrap(),
                dirs.source.join(OsStr::from_bytes(name))
            );
        }
    }

    #[test]
    fn test_dry_run_counts_colliding_links_once() {
        let dirs = setup(&["a/Show.S01E01.mkv", "b/Show.S01E01.mkv"]);

        let planned = Linker::new(&dirs.source, &dirs.target)
            .dry_run(true)
            .make_links()
            .unwrap();
        let real = Linker::new(&dirs.source, &dirs.target).make_links().unwrap();

        assert_eq!(planned.planned.len(), 1);
        assert_eq!(planned.already_present, 1);
        assert_eq!(real.created.len(), 1);
        assert_eq!(real.already_present, 1);
    }

    #[test]
    fn test_make_links_fails_on_unexpected_link_error() {
        // The show directory fits, but prefix plus original exceeds the
        // file name limit, so symlink creation fails with something other
        // than AlreadyExists.
        let long_name = format!("{}.S01E01.mkv", "A".repeat(230));
        let dirs = setup(&[long_name.as_str()]);
        let linker = Linker::new(&dirs.source, &dirs.target);

        let result = linker.make_links();

        match result {
            Err(LinkError::LinkCreationFailed { target, .. }) => {
                assert_eq!(target, dirs.source.join(&long_name));
            }
            other => panic!("expected LinkCreationFailed, got {:?}", other),
        }
        let season = dirs.target.join("A".repeat(230)).join("Season 01");
        assert_eq!(fs::read_dir(&season).unwrap().count(), 0);
    }

    #[test]
    fn test_delete_broken_links_fails_on_link_loop() {
        let dirs = setup(&["Show.S01E01.mkv"]);
        let linker = Linker::new(&dirs.source, &dirs.target);
        linker.make_links().unwrap();
        fs::remove_file(dirs.source.join("Show.S01E01.mkv")).unwrap();

        let loops = dirs.target.join("loops");
        fs::create_dir(&loops).unwrap();
        create_symlink(&loops.join("b"), &loops.join("a")).unwrap();
        create_symlink(&loops.join("a"), &loops.join("b")).unwrap();

        let result = linker.delete_broken_links();

        assert!(
            matches!(result, Err(LinkError::StatFailed { .. })),
            "expected StatFailed, got {:?}",
            result
        );
        let broken = dirs.target.join("Show/Season 01/Show - s01e01 - Show.S01E01.mkv");
        assert!(broken.symlink_metadata().is_ok());
        assert!(loops.join("a").symlink_metadata().is_ok());
        assert!(loops.join("b").symlink_metadata().is_ok());
    }
}
