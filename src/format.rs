//! Scene naming conventions recognized in media file names.
//!
//! Each [`Format`] owns a case-insensitive pattern over a base file name and
//! knows how to turn the captured fields into a Plex-style file name and
//! directory. Formats are tried in [`Format::PRIORITY`] order and the first
//! match wins; [`Format::Fallback`] matches everything.
//!
//! # Examples
//!
//! ```
//! use plex_linker::format::Format;
//!
//! let metadata = Format::detect("Show.Name.S02E05.Description.mkv");
//! assert_eq!(metadata.format(), Format::Weekly);
//! assert_eq!(
//!     metadata.target_subdirectory(),
//!     std::path::PathBuf::from("Show Name").join("Season 02")
//! );
//! ```

use regex::Regex;
use std::ffi::{OsStr, OsString};
use std::fmt;
use std::path::PathBuf;
use std::sync::LazyLock;

/// Directory used for files that follow no known naming convention.
pub const UNCATEGORIZED_DIR: &str = "Uncategorized";

static WEEKLY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<name>.+)\.S(?P<season>\d+)E(?P<episode>[^.]+)\..+$")
        .expect("Invalid weekly pattern")
});

static MINI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<name>.+)\.Part\.(?P<part>[^.]+)\..+$").expect("Invalid mini pattern")
});

static DAILY_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<name>.+)\.(?P<year>\d{4})\.(?P<month>\d{2})\.(?P<day>\d{2})\..+$")
        .expect("Invalid daily pattern")
});

static SINGLE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?P<name>.+)\.(?P<year>\d{4})\..+$").expect("Invalid single pattern")
});

/// A naming convention for TV releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Format {
    /// `Name.S01E02.rest`
    Weekly,
    /// `Name.Part.3.rest`
    Mini,
    /// `Name.2020.03.15.rest`
    Daily,
    /// `Name.2020.rest`
    Single,
    /// Anything else.
    Fallback,
}

impl Format {
    /// All formats in the order they are tried.
    ///
    /// Daily must stay ahead of Single: Single also matches every dated
    /// release and would drop its month and day.
    pub const PRIORITY: [Format; 5] = [
        Format::Weekly,
        Format::Mini,
        Format::Daily,
        Format::Single,
        Format::Fallback,
    ];

    /// Short label used in logs and summaries.
    pub fn label(&self) -> &'static str {
        match self {
            Format::Weekly => "weekly",
            Format::Mini => "mini",
            Format::Daily => "daily",
            Format::Single => "single",
            Format::Fallback => "uncategorized",
        }
    }

    /// Names of the fields captured by this format, in capture order.
    pub fn field_names(&self) -> &'static [&'static str] {
        match self {
            Format::Weekly => &["name", "season", "episode"],
            Format::Mini => &["name", "part"],
            Format::Daily => &["name", "year", "month", "day"],
            Format::Single => &["name", "year"],
            Format::Fallback => &[],
        }
    }

    fn pattern(&self) -> Option<&'static Regex> {
        match self {
            Format::Weekly => Some(&*WEEKLY_PATTERN),
            Format::Mini => Some(&*MINI_PATTERN),
            Format::Daily => Some(&*DAILY_PATTERN),
            Format::Single => Some(&*SINGLE_PATTERN),
            Format::Fallback => None,
        }
    }

    /// Tries this format alone against `file_name`.
    ///
    /// Returns `None` if the pattern does not match. Fallback always matches.
    pub fn extract(&self, file_name: &str) -> Option<Metadata> {
        let Some(pattern) = self.pattern() else {
            return Some(Metadata::Uncategorized);
        };
        let caps = pattern.captures(file_name)?;
        let field = |name: &str| caps.name(name).map(|m| m.as_str().to_string());

        let metadata = match self {
            Format::Weekly => Metadata::Weekly {
                name: field("name")?,
                season: field("season")?,
                episode: field("episode")?,
            },
            Format::Mini => Metadata::Mini {
                name: field("name")?,
                part: field("part")?,
            },
            Format::Daily => Metadata::Daily {
                name: field("name")?,
                year: field("year")?,
                month: field("month")?,
                day: field("day")?,
            },
            Format::Single => Metadata::Single {
                name: field("name")?,
                year: field("year")?,
            },
            Format::Fallback => Metadata::Uncategorized,
        };
        Some(metadata)
    }

    /// Returns the metadata of the first format in [`Format::PRIORITY`] that
    /// matches `file_name`.
    pub fn detect(file_name: &str) -> Metadata {
        Self::PRIORITY
            .iter()
            .find_map(|format| format.extract(file_name))
            .unwrap_or(Metadata::Uncategorized)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Fields captured from a file name, one variant per [`Format`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Metadata {
    Weekly {
        name: String,
        season: String,
        episode: String,
    },
    Mini {
        name: String,
        part: String,
    },
    Daily {
        name: String,
        year: String,
        month: String,
        day: String,
    },
    Single {
        name: String,
        year: String,
    },
    Uncategorized,
}

impl Metadata {
    /// The format that produced this metadata.
    pub fn format(&self) -> Format {
        match self {
            Metadata::Weekly { .. } => Format::Weekly,
            Metadata::Mini { .. } => Format::Mini,
            Metadata::Daily { .. } => Format::Daily,
            Metadata::Single { .. } => Format::Single,
            Metadata::Uncategorized => Format::Fallback,
        }
    }

    /// Captured fields as `(name, value)` pairs in [`Format::field_names`]
    /// order, or `None` for uncategorized files.
    pub fn fields(&self) -> Option<Vec<(&'static str, &str)>> {
        let values: Vec<&str> = match self {
            Metadata::Weekly {
                name,
                season,
                episode,
            } => vec![name.as_str(), season.as_str(), episode.as_str()],
            Metadata::Mini { name, part } => vec![name.as_str(), part.as_str()],
            Metadata::Daily {
                name,
                year,
                month,
                day,
            } => vec![name.as_str(), year.as_str(), month.as_str(), day.as_str()],
            Metadata::Single { name, year } => vec![name.as_str(), year.as_str()],
            Metadata::Uncategorized => return None,
        };
        Some(
            self.format()
                .field_names()
                .iter()
                .copied()
                .zip(values)
                .collect(),
        )
    }

    /// The raw show name, if any.
    pub fn name(&self) -> Option<&str> {
        match self {
            Metadata::Weekly { name, .. }
            | Metadata::Mini { name, .. }
            | Metadata::Daily { name, .. }
            | Metadata::Single { name, .. } => Some(name),
            Metadata::Uncategorized => None,
        }
    }

    /// Text placed in front of the original file name, e.g.
    /// `"Show Name - s02e05 - "`. Uncategorized files get no prefix.
    pub fn name_prefix(&self) -> Option<String> {
        let prefix = match self {
            Metadata::Weekly {
                name,
                season,
                episode,
            } => format!("{} - s{}e{} - ", normalize_name(name), season, episode),
            Metadata::Mini { name, part } => format!("{} - s01e{} - ", normalize_name(name), part),
            Metadata::Daily {
                name,
                year,
                month,
                day,
            } => format!("{} - {} {} {} - ", normalize_name(name), year, month, day),
            Metadata::Single { name, year } => format!("{} - {} - ", normalize_name(name), year),
            Metadata::Uncategorized => return None,
        };
        Some(prefix)
    }

    /// File name Plex expects for the file originally called `original`.
    ///
    /// The original name is always kept as a suffix.
    pub fn display_name(&self, original: &str) -> String {
        match self.name_prefix() {
            Some(prefix) => prefix + original,
            None => original.to_string(),
        }
    }

    /// Like [`Metadata::display_name`], but keeps `original` byte for byte
    /// even when it is not valid UTF-8.
    pub fn link_name(&self, original: &OsStr) -> OsString {
        let mut link_name = OsString::from(self.name_prefix().unwrap_or_default());
        link_name.push(original);
        link_name
    }

    /// Directory, relative to the library root, Plex expects the file in.
    pub fn target_subdirectory(&self) -> PathBuf {
        match self {
            Metadata::Weekly { name, season, .. } => {
                PathBuf::from(normalize_name(name)).join(format!("Season {}", season))
            }
            Metadata::Mini { name, .. } => PathBuf::from(normalize_name(name)).join("Season 01"),
            Metadata::Daily { name, year, .. } | Metadata::Single { name, year } => {
                PathBuf::from(normalize_name(name)).join(year)
            }
            Metadata::Uncategorized => PathBuf::from(UNCATEGORIZED_DIR),
        }
    }

    /// Lower-cased show name, for grouping files of the same show.
    pub fn sort_key(&self) -> String {
        match self.name() {
            Some(name) => name.to_lowercase(),
            None => UNCATEGORIZED_DIR.to_lowercase(),
        }
    }
}

/// Replaces every `.`, `-` and `_` in `name` with a space.
pub fn normalize_name(name: &str) -> String {
    name.replace(['.', '-', '_'], " ")
}
