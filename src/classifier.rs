//! Classification of source files into their Plex location.
//!
//! [`classify`] works on a bare file name and never fails: names that follow
//! no known convention land in the uncategorized directory unchanged.

use crate::format::{Format, Metadata};
use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

/// Where a file with a given name belongs in the Plex library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    /// The naming convention that matched.
    pub format: Format,
    /// Fields extracted from the name.
    pub metadata: Metadata,
    /// Directory relative to the library root, e.g. `Show Name/Season 02`.
    pub target_subdirectory: PathBuf,
    /// Name of the link inside `target_subdirectory`. Ends with the original
    /// name, byte for byte.
    pub target_file_name: OsString,
}

/// Classifies a base file name.
///
/// # Examples
///
/// ```
/// use plex_linker::classifier::classify;
/// use plex_linker::format::Format;
///
/// let classification = classify("randomfile.txt");
/// assert_eq!(classification.format, Format::Fallback);
/// assert_eq!(classification.target_file_name, "randomfile.txt");
/// ```
pub fn classify(file_name: &str) -> Classification {
    classify_os_str(OsStr::new(file_name))
}

/// Classifies a base file name that may not be valid UTF-8.
///
/// Patterns are matched against the lossy rendering of the name; the link
/// name still carries the original bytes, so distinct source names never
/// share a link.
pub fn classify_os_str(file_name: &OsStr) -> Classification {
    let metadata = Format::detect(&file_name.to_string_lossy());
    Classification {
        format: metadata.format(),
        target_subdirectory: metadata.target_subdirectory(),
        target_file_name: metadata.link_name(file_name),
        metadata,
    }
}

/// A source file paired with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedFile {
    /// Full path of the source file. Links point here.
    pub source_path: PathBuf,
    /// Base name of the source file.
    pub file_name: OsString,
    pub classification: Classification,
}

impl ClassifiedFile {
    /// Classifies the file at `source_path` by its base name.
    pub fn new(source_path: &Path) -> Self {
        let file_name = source_path
            .file_name()
            .map(OsStr::to_os_string)
            .unwrap_or_default();
        let classification = classify_os_str(&file_name);

        Self {
            source_path: source_path.to_path_buf(),
            file_name,
            classification,
        }
    }

    /// Directory under `target_root` that holds the link.
    pub fn target_dir(&self, target_root: &Path) -> PathBuf {
        target_root.join(&self.classification.target_subdirectory)
    }

    /// Full path of the link under `target_root`.
    pub fn link_path(&self, target_root: &Path) -> PathBuf {
        self.target_dir(target_root)
            .join(&self.classification.target_file_name)
    }
}
