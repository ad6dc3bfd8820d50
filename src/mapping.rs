//! Durable word → illustration association.
//!
//! Sanitized filenames are lossy and directory listings have no meaningful
//! order, so the overlay stage never guesses which PNG belongs to which word.
//! The illustration stage records one entry per successfully generated image
//! in `mapping.json`, next to the images:
//!
//! ```json
//! {
//!   "aurinko": "word_aurinko_weather.png",
//!   "sää": "word_saa_weather.png",
//!   "saa": "word_saa_weather_2.png"
//! }
//! ```
//!
//! Paths are relative to the directory holding the mapping file; absolute
//! paths and `..` components are refused on load. Older runs
//! wrote a list of `{"index", "word", "filename"}` records instead; that form
//! is still accepted on load and rewritten as an object on the next save.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Name of the mapping file within the illustrations directory.
pub const MAPPING_FILENAME: &str = "mapping.json";

#[derive(Error, Debug)]
pub enum MappingError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("no illustration recorded for '{0}'")]
    MissingEntry(String),
    #[error("illustration for '{word}' is recorded but missing on disk: {}", path.display())]
    MissingFile { word: String, path: PathBuf },
    #[error("illustration path for '{word}' leaves the mapping directory: {path}")]
    UnsafePath { word: String, path: String },
}

impl MappingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MappingError::Io(_) | MappingError::Json(_) | MappingError::UnsafePath { .. } => {
                ErrorKind::FileIoFailure
            }
            MappingError::MissingEntry(_) | MappingError::MissingFile { .. } => {
                ErrorKind::MissingMappingEntry
            }
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MappingFile {
    Object(BTreeMap<String, String>),
    Legacy(Vec<LegacyRecord>),
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    word: String,
    filename: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Mapping {
    entries: BTreeMap<String, String>,
}

impl Mapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `word → relative_path`, returning the previous path if any.
    pub fn insert(&mut self, word: impl Into<String>, relative_path: impl Into<String>) -> Option<String> {
        self.entries.insert(word.into(), relative_path.into())
    }

    pub fn get(&self, word: &str) -> Option<&str> {
        self.entries.get(word).map(String::as_str)
    }

    /// True if some word already owns `relative_path`.
    pub fn contains_path(&self, relative_path: &str) -> bool {
        self.entries.values().any(|p| p == relative_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Resolve a word to an existing image file under `base_dir`.
    ///
    /// A recorded entry whose file has disappeared is reported as
    /// [`MappingError::MissingFile`] so callers can skip it like a missing key.
    pub fn resolve(&self, word: &str, base_dir: &Path) -> Result<PathBuf, MappingError> {
        let relative = self
            .get(word)
            .ok_or_else(|| MappingError::MissingEntry(word.to_string()))?;
        let path = base_dir.join(relative);
        if path.is_file() {
            Ok(path)
        } else {
            Err(MappingError::MissingFile {
                word: word.to_string(),
                path,
            })
        }
    }

    /// Load a mapping file, accepting both the object and the legacy list form.
    pub fn load(path: &Path) -> Result<Self, MappingError> {
        let content = std::fs::read_to_string(path)?;
        let entries = match serde_json::from_str::<MappingFile>(&content)? {
            MappingFile::Object(entries) => entries,
            MappingFile::Legacy(records) => records
                .into_iter()
                .map(|r| (r.word, r.filename))
                .collect(),
        };
        if let Some((word, path)) = entries.iter().find(|(_, p)| !is_contained(p)) {
            return Err(MappingError::UnsafePath {
                word: word.clone(),
                path: path.clone(),
            });
        }
        Ok(Self { entries })
    }

    /// Like [`Mapping::load`], but a missing file yields an empty mapping.
    pub fn load_or_default(path: &Path) -> Result<Self, MappingError> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::new())
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), MappingError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// A non-empty relative path that stays below its base directory.
fn is_contained(relative: &str) -> bool {
    let path = Path::new(relative);
    path.components().next().is_some()
        && path
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
