//! Word list model shared by every pipeline stage.
//!
//! A [`WordList`] is serialized to the words JSON file by the first stage and
//! read back by every later one, so the on-disk shape is a bare JSON array of
//! objects with exactly the four [`WordEntry`] fields.

use crate::error::ErrorKind;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

/// A collaborator response that does not match the word-entry schema.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    #[error("expected a JSON object, found {0}")]
    NotAnObject(&'static str),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a string")]
    NotAString(&'static str),
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),
}

impl ShapeError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::InvalidResponseShape
    }
}

#[derive(Error, Debug)]
pub enum WordListError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WordListError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FileIoFailure
    }
}

/// One vocabulary card: a word, its translation, and an example sentence in
/// both languages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub translation: String,
    pub example: String,
    pub example_translation: String,
}

impl WordEntry {
    pub fn new(
        word: impl Into<String>,
        translation: impl Into<String>,
        example: impl Into<String>,
        example_translation: impl Into<String>,
    ) -> Self {
        Self {
            word: word.into(),
            translation: translation.into(),
            example: example.into(),
            example_translation: example_translation.into(),
        }
    }

    /// Entry for a bare token when the collaborator gave nothing richer.
    pub fn placeholder(token: &str) -> Self {
        Self::new(
            token,
            token,
            format!("Tämä on {token}."),
            format!("This is {token}."),
        )
    }

    /// All four fields are non-empty after trimming.
    pub fn is_complete(&self) -> bool {
        [
            &self.word,
            &self.translation,
            &self.example,
            &self.example_translation,
        ]
        .iter()
        .all(|s| !s.trim().is_empty())
    }

    /// Validate an untyped JSON value against the four-field schema.
    ///
    /// Every field must be present, a string, and non-empty after trimming.
    /// Values are trimmed.
    pub fn from_value(value: &Value) -> Result<Self, ShapeError> {
        let object = value
            .as_object()
            .ok_or_else(|| ShapeError::NotAnObject(json_type_name(value)))?;
        let field = |name: &'static str| -> Result<String, ShapeError> {
            let raw = object.get(name).ok_or(ShapeError::MissingField(name))?;
            let text = raw.as_str().ok_or(ShapeError::NotAString(name))?.trim();
            if text.is_empty() {
                return Err(ShapeError::EmptyField(name));
            }
            Ok(text.to_string())
        };
        Ok(Self {
            word: field("word")?,
            translation: field("translation")?,
            example: field("example")?,
            example_translation: field("example_translation")?,
        })
    }
}

pub(crate) fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Ordered word list; insertion order is generation order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordList(Vec<WordEntry>);

impl WordList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[WordEntry] {
        &self.0
    }

    pub fn iter(&self) -> std::slice::Iter<'_, WordEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn push(&mut self, entry: WordEntry) {
        self.0.push(entry);
    }

    pub fn truncate(&mut self, count: usize) {
        self.0.truncate(count);
    }

    /// Remove entries whose word repeats an earlier one, ignoring case.
    ///
    /// Keeps the first occurrence and returns the removed words in order.
    pub fn dedup_words(&mut self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut removed = Vec::new();
        self.0.retain(|entry| {
            if seen.insert(entry.word.to_lowercase()) {
                true
            } else {
                removed.push(entry.word.clone());
                false
            }
        });
        removed
    }

    pub fn into_inner(self) -> Vec<WordEntry> {
        self.0
    }

    /// Read a words JSON file.
    pub fn load(path: &Path) -> Result<Self, WordListError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the list as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), WordListError> {
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

impl From<Vec<WordEntry>> for WordList {
    fn from(entries: Vec<WordEntry>) -> Self {
        Self(entries)
    }
}

impl FromIterator<WordEntry> for WordList {
    fn from_iter<I: IntoIterator<Item = WordEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a WordList {
    type Item = &'a WordEntry;
    type IntoIter = std::slice::Iter<'a, WordEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
