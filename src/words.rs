//! Word-list generation.
//!
//! The first pipeline stage asks a [`WordSource`] for `count` entries on a
//! topic and writes them to `words_<topic>.json`. Two sources satisfy the
//! same contract:
//!
//! - [`LiveWordSource`]: prompts the text collaborator and parses whatever
//!   comes back with [`parse_words_from_text`].
//! - [`FallbackVocabulary`]: a fixed topic → word list table, used when no
//!   API key is configured, the collaborator is down, or its reply yields no
//!   usable entries.
//!
//! Collaborators are not reliable about format, so parsing tries, in order:
//! a fenced ```` ```json ```` block, the whole reply as JSON, the outermost
//! `[` … `]` slice, and finally a line/comma token scan that turns each
//! distinct token into a placeholder entry.

use crate::error::ErrorKind;
use crate::genai::prompts::word_list_prompt;
use crate::genai::{GenAiError, TextGenerator, TextRequest};
use crate::types::{WordEntry, WordList, WordListError, json_type_name};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum WordsError {
    #[error("collaborator failed: {0}")]
    Collaborator(#[from] GenAiError),
    #[error("collaborator reply contained no usable entries")]
    NoEntries,
    #[error("no offline vocabulary for topic '{0}'")]
    UnknownTopic(String),
    #[error(transparent)]
    WordList(#[from] WordListError),
}

impl WordsError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WordsError::Collaborator(e) => e.kind(),
            WordsError::NoEntries => ErrorKind::InvalidResponseShape,
            WordsError::UnknownTopic(_) => ErrorKind::CollaboratorUnavailable,
            WordsError::WordList(e) => e.kind(),
        }
    }
}

/// Anything that can produce a word list for a topic.
pub trait WordSource {
    /// Short label for logs and reports.
    fn name(&self) -> &str;

    /// At most `count` entries for `topic`.
    fn words(&self, topic: &str, count: usize) -> Result<WordList, WordsError>;
}

/// Where a generated list came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WordOrigin {
    Collaborator,
    Fallback,
}

/// Prompts the text collaborator.
pub struct LiveWordSource<'a> {
    generator: &'a dyn TextGenerator,
    model: &'a str,
}

impl<'a> LiveWordSource<'a> {
    pub fn new(generator: &'a dyn TextGenerator, model: &'a str) -> Self {
        Self { generator, model }
    }
}

impl WordSource for LiveWordSource<'_> {
    fn name(&self) -> &str {
        self.model
    }

    fn words(&self, topic: &str, count: usize) -> Result<WordList, WordsError> {
        let prompt = word_list_prompt(topic, count);
        let reply = self
            .generator
            .generate_text(&TextRequest::new(self.model, &prompt))?;
        let words = parse_words_from_text(&reply, count);
        if words.is_empty() {
            return Err(WordsError::NoEntries);
        }
        Ok(words)
    }
}

type Row = (&'static str, &'static str, &'static str, &'static str);

const FURNITURE: &[Row] = &[
    ("tuoli", "chair", "Istun tuolilla keittiössä.", "I am sitting on a chair in the kitchen."),
    ("pöytä", "table", "Pöydällä on kukkamaljakko.", "There is a flower vase on the table."),
    ("sohva", "sofa", "Sohva on olohuoneessa.", "The sofa is in the living room."),
    ("sänky", "bed", "Menen sänkyyn kymmeneltä.", "I go to bed at ten."),
    ("kaappi", "cupboard", "Lautaset ovat kaapissa.", "The plates are in the cupboard."),
    ("hylly", "shelf", "Kirjat ovat hyllyllä.", "The books are on the shelf."),
    ("matto", "rug", "Lattialla on punainen matto.", "There is a red rug on the floor."),
    ("lamppu", "lamp", "Sytytän lampun illalla.", "I turn on the lamp in the evening."),
];

const WEATHER: &[Row] = &[
    ("aurinko", "sun", "Aurinko paistaa tänään.", "The sun shines today."),
    ("sade", "rain", "Sade kastelee pihan.", "The rain waters the yard."),
    ("lumi", "snow", "Lumi sulaa keväällä.", "Snow melts in spring."),
    ("tuuli", "wind", "Tuuli puhaltaa mereltä.", "The wind blows from the sea."),
    ("pilvi", "cloud", "Taivaalla on iso pilvi.", "There is a big cloud in the sky."),
    ("sumu", "fog", "Aamulla järvellä oli sumua.", "There was fog on the lake in the morning."),
    ("ukkonen", "thunder", "Ukkonen jyrisee kaukana.", "Thunder rumbles in the distance."),
    ("pakkanen", "frost", "Tänään on kova pakkanen.", "It is freezing cold today."),
];

const FOOD: &[Row] = &[
    ("leipä", "bread", "Ostan leipää kaupasta.", "I buy bread from the shop."),
    ("juusto", "cheese", "Laitan juustoa leivän päälle.", "I put cheese on the bread."),
    ("maito", "milk", "Lapsi juo lasin maitoa.", "The child drinks a glass of milk."),
    ("omena", "apple", "Syön omenan välipalaksi.", "I eat an apple as a snack."),
    ("kala", "fish", "Isä paistaa kalaa pannulla.", "Dad fries fish in a pan."),
    ("peruna", "potato", "Keitän perunat suolavedessä.", "I boil the potatoes in salted water."),
    ("puuro", "porridge", "Syön puuroa aamulla.", "I eat porridge in the morning."),
    ("kahvi", "coffee", "Juon kahvia ilman sokeria.", "I drink coffee without sugar."),
];

static FALLBACK_VOCABULARY: LazyLock<HashMap<&'static str, WordList>> = LazyLock::new(|| {
    [("furniture", FURNITURE), ("weather", WEATHER), ("food", FOOD)]
        .into_iter()
        .map(|(topic, rows)| {
            let list = rows
                .iter()
                .map(|&(w, t, e, et)| WordEntry::new(w, t, e, et))
                .collect();
            (topic, list)
        })
        .collect()
});

/// Built-in vocabulary for a few common topics.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackVocabulary;

impl FallbackVocabulary {
    pub fn topics() -> Vec<&'static str> {
        let mut topics: Vec<&str> = FALLBACK_VOCABULARY.keys().copied().collect();
        topics.sort_unstable();
        topics
    }
}

impl WordSource for FallbackVocabulary {
    fn name(&self) -> &str {
        "offline vocabulary"
    }

    fn words(&self, topic: &str, count: usize) -> Result<WordList, WordsError> {
        let key = topic.trim().to_lowercase();
        let mut list = FALLBACK_VOCABULARY
            .get(key.as_str())
            .cloned()
            .ok_or_else(|| WordsError::UnknownTopic(topic.to_string()))?;
        list.truncate(count);
        Ok(list)
    }
}

/// Ask `primary`, falling back to `fallback` when it is absent, fails, or
/// returns nothing usable.
pub fn generate_words(
    primary: Option<&dyn WordSource>,
    fallback: &dyn WordSource,
    topic: &str,
    count: usize,
) -> Result<(WordList, WordOrigin), WordsError> {
    match primary {
        Some(source) => match source.words(topic, count) {
            Ok(mut words) if !words.is_empty() => {
                words.truncate(count);
                info!("{} produced {} words for '{}'", source.name(), words.len(), topic);
                return Ok((words, WordOrigin::Collaborator));
            }
            Ok(_) => warn!("{} returned no words; using {}", source.name(), fallback.name()),
            Err(e) => warn!("{} failed ({}); using {}", source.name(), e, fallback.name()),
        },
        None => info!("no collaborator configured; using {}", fallback.name()),
    }

    let words = fallback.words(topic, count)?;
    if words.is_empty() {
        return Err(WordsError::UnknownTopic(topic.to_string()));
    }
    Ok((words, WordOrigin::Fallback))
}

/// Outcome of the words stage.
#[derive(Debug, Clone, PartialEq)]
pub struct WordsReport {
    pub topic: String,
    pub path: PathBuf,
    pub count: usize,
    pub origin: WordOrigin,
}

/// Generate a list and write it to `output`.
pub fn write_words(
    primary: Option<&dyn WordSource>,
    fallback: &dyn WordSource,
    topic: &str,
    count: usize,
    output: &Path,
) -> Result<WordsReport, WordsError> {
    let (words, origin) = generate_words(primary, fallback, topic, count)?;
    words.save(output)?;
    Ok(WordsReport {
        topic: topic.to_string(),
        path: output.to_path_buf(),
        count: words.len(),
        origin,
    })
}

// =============================================================================
// Response parsing
// =============================================================================

/// Extract up to `count` entries from a free-form collaborator reply.
pub fn parse_words_from_text(text: &str, count: usize) -> WordList {
    let json_candidates = [
        fenced_block(text),
        Some(text.trim()),
        bracket_slice(text),
    ];
    for candidate in json_candidates.into_iter().flatten() {
        if let Ok(Value::Array(items)) = serde_json::from_str::<Value>(candidate) {
            let mut words = entries_from_array(&items);
            if !words.is_empty() {
                words.truncate(count);
                return words;
            }
        }
    }
    token_scan(text, count)
}

/// Contents of the first ```` ``` ```` fence, minus an optional `json` tag.
fn fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")? + 3;
    let rest = &text[start..];
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn bracket_slice(text: &str) -> Option<&str> {
    let start = text.find('[')?;
    let end = text.rfind(']')?;
    (end > start).then(|| &text[start..=end])
}

fn entries_from_array(items: &[Value]) -> WordList {
    let mut words = WordList::new();
    for item in items {
        match item {
            Value::Object(map) => {
                let mut map = map.clone();
                if !map.contains_key("example_translation")
                    && let Some(example) = map.get("example").cloned()
                {
                    map.insert("example_translation".to_string(), example);
                }
                match WordEntry::from_value(&Value::Object(map)) {
                    Ok(entry) => words.push(entry),
                    Err(e) => warn!("dropping malformed entry: {}", e),
                }
            }
            Value::String(s) if !s.trim().is_empty() => {
                words.push(WordEntry::placeholder(s.trim()));
            }
            other => warn!("dropping entry: expected an object, found {}", json_type_name(other)),
        }
    }
    words
}

/// Last resort: every distinct line or comma-separated token is a word.
fn token_scan(text: &str, count: usize) -> WordList {
    let mut seen = HashSet::new();
    let mut words = WordList::new();
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with(['`', '[', '{']) {
            continue;
        }
        let line = strip_list_marker(line);
        for part in line.split(',') {
            let token = part.trim().trim_matches(['"', '\'']).trim();
            if token.chars().count() < 2 || token.starts_with(['{', '[']) {
                continue;
            }
            if seen.insert(token.to_string()) {
                words.push(WordEntry::placeholder(token));
                if words.len() >= count {
                    return words;
                }
            }
        }
    }
    words
}

/// Drop a leading `1.`, `-` or `*` list marker.
fn strip_list_marker(line: &str) -> &str {
    if line.starts_with(|c: char| c.is_ascii_digit())
        && let Some((_, rest)) = line.split_once('.')
    {
        return rest.trim();
    }
    line.strip_prefix(['-', '*']).map(str::trim).unwrap_or(line)
}
