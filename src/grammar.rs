//! Grammar verification.
//!
//! Each entry is sent to the text collaborator with [`grammar_prompt`]. The
//! reply is either `CORRECT` or a JSON correction object; see
//! [`parse_verdict`]. Anything the collaborator gets wrong leaves the entry
//! untouched, so verification never loses words. Duplicates are dropped
//! afterwards.

use crate::error::ErrorKind;
use crate::genai::prompts::grammar_prompt;
use crate::genai::{TextGenerator, TextRequest};
use crate::types::{WordEntry, WordList, WordListError};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Low temperature keeps corrections conservative.
const VERIFY_TEMPERATURE: f32 = 0.1;

#[derive(Error, Debug)]
pub enum GrammarError {
    #[error(transparent)]
    WordList(#[from] WordListError),
    #[error("failed to write report: {0}")]
    Report(#[from] std::io::Error),
    #[error("failed to serialize report: {0}")]
    ReportJson(#[from] serde_json::Error),
}

impl GrammarError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FileIoFailure
    }
}

/// One corrected entry, as written to the issue report.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GrammarIssue {
    pub original: WordEntry,
    pub corrected: WordEntry,
    pub issues: String,
}

/// The collaborator's answer for one entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Correct,
    Corrected { entry: WordEntry, issues: String },
    Unparseable,
}

/// Interpret a verification reply for `original`.
///
/// A `{` … `}` correction is read first and takes precedence over a stray
/// `CORRECT` in the same reply. Correction fields that are missing,
/// non-string or blank keep the original value. Without a correction the
/// reply must open with the word `CORRECT`; `INCORRECT`, `not correct` and
/// anything else are unparseable.
pub fn parse_verdict(reply: &str, original: &WordEntry) -> Verdict {
    if let (Some(start), Some(end)) = (reply.find('{'), reply.rfind('}'))
        && end > start
        && let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&reply[start..=end])
    {
        let field = |name: &str, fallback: &str| -> String {
            map.get(name)
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| fallback.to_string())
        };
        let entry = WordEntry::new(
            field("word", &original.word),
            field("translation", &original.translation),
            field("example", &original.example),
            field("example_translation", &original.example_translation),
        );
        let issues = field("issues", "");
        if entry == *original {
            return Verdict::Correct;
        }
        return Verdict::Corrected { entry, issues };
    }
    if opens_with_correct(reply) {
        return Verdict::Correct;
    }
    Verdict::Unparseable
}

fn opens_with_correct(reply: &str) -> bool {
    reply
        .split(|c: char| !c.is_alphanumeric())
        .find(|token| !token.is_empty())
        .is_some_and(|token| token.eq_ignore_ascii_case("correct"))
}

/// Result of verifying a list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Verification {
    pub words: WordList,
    pub issues: Vec<GrammarIssue>,
    /// Entries passed through because the reply was unusable or the call failed.
    pub unverified: usize,
    /// Duplicate words removed after correction.
    pub duplicates: Vec<String>,
    /// `false` when no collaborator was available at all.
    pub checked: bool,
}

/// Verify every entry, then drop duplicates.
///
/// With no generator the list passes through unchanged.
pub fn verify_words(
    generator: Option<&dyn TextGenerator>,
    model: &str,
    words: WordList,
) -> Verification {
    let Some(generator) = generator else {
        info!("no collaborator configured; skipping grammar verification");
        let mut words = words;
        let duplicates = words.dedup_words();
        return Verification {
            words,
            duplicates,
            ..Verification::default()
        };
    };

    let mut verified = WordList::new();
    let mut issues = Vec::new();
    let mut unverified = 0;

    for entry in words.into_inner() {
        let prompt = grammar_prompt(
            &entry.word,
            &entry.translation,
            &entry.example,
            &entry.example_translation,
        );
        let request = TextRequest::new(model, &prompt).with_temperature(VERIFY_TEMPERATURE);
        let reply = match generator.generate_text(&request) {
            Ok(reply) => reply,
            Err(e) => {
                warn!("could not verify '{}': {}", entry.word, e);
                unverified += 1;
                verified.push(entry);
                continue;
            }
        };
        match parse_verdict(&reply, &entry) {
            Verdict::Correct => verified.push(entry),
            Verdict::Corrected {
                entry: corrected,
                issues: what,
            } => {
                info!("corrected '{}' -> '{}': {}", entry.word, corrected.word, what);
                issues.push(GrammarIssue {
                    original: entry,
                    corrected: corrected.clone(),
                    issues: what,
                });
                verified.push(corrected);
            }
            Verdict::Unparseable => {
                warn!("unparseable verification reply for '{}'", entry.word);
                unverified += 1;
                verified.push(entry);
            }
        }
    }

    let duplicates = verified.dedup_words();
    for word in &duplicates {
        warn!("removed duplicate word '{}'", word);
    }
    Verification {
        words: verified,
        issues,
        unverified,
        duplicates,
        checked: true,
    }
}

/// Outcome of the grammar stage.
#[derive(Debug, Clone, PartialEq)]
pub struct GrammarReport {
    pub path: PathBuf,
    pub total: usize,
    pub corrected: usize,
    pub unverified: usize,
    pub duplicates: Vec<String>,
    pub checked: bool,
    pub report_path: Option<PathBuf>,
}

/// Verify the words file at `input`, writing the result to `output`
/// (usually the same path) and the issues to `report` when given.
pub fn verify_file(
    generator: Option<&dyn TextGenerator>,
    model: &str,
    input: &Path,
    output: &Path,
    report: Option<&Path>,
) -> Result<GrammarReport, GrammarError> {
    let words = WordList::load(input)?;
    let verification = verify_words(generator, model, words);
    verification.words.save(output)?;

    if let Some(report) = report {
        if let Some(parent) = report.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(report, serde_json::to_string_pretty(&verification.issues)?)?;
    }

    Ok(GrammarReport {
        path: output.to_path_buf(),
        total: verification.words.len(),
        corrected: verification.issues.len(),
        unverified: verification.unverified,
        duplicates: verification.duplicates,
        checked: verification.checked,
        report_path: report.map(Path::to_path_buf),
    })
}
