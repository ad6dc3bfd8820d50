//! Centralized filename conventions for every generated artifact.
//!
//! Words become filenames in two places: the illustration stage names each
//! PNG after its word, and the pipeline names the words/caption files after
//! the topic. Both go through [`sanitize_filename`] so the rules are the same
//! everywhere:
//!
//! - `"Aurinko"` → `aurinko`
//! - `"pöytä"` → `poyta`
//! - `"ice cream"` → `ice_cream`
//! - `"!!!"` → `word` (nothing usable left)
//!
//! Sanitizing is lossy, so two different words can collide (`"sää"` and
//! `"saa"`). The mapping file is the source of truth for which file belongs
//! to which word; [`unique_filename`] only guarantees that a new illustration
//! never overwrites another word's file.

use unidecode::unidecode;

/// Fallback stem when sanitizing leaves nothing.
const EMPTY_STEM: &str = "word";

/// Transliterate to ASCII, lowercase, turn whitespace runs into `_`, and
/// drop everything except `[a-z0-9_-]`.
pub fn sanitize_filename(s: &str) -> String {
    let ascii = unidecode(s.trim());
    let mut out = String::with_capacity(ascii.len());
    let mut pending_space = false;
    for c in ascii.chars().map(|c| c.to_ascii_lowercase()) {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            if pending_space && !out.is_empty() {
                out.push('_');
            }
            pending_space = false;
            out.push(c);
        }
    }
    if out.is_empty() {
        EMPTY_STEM.to_string()
    } else {
        out
    }
}

/// `word_<word>[_<topic>].png`, the illustration filename for a word.
pub fn illustration_filename(word: &str, topic: Option<&str>) -> String {
    match topic {
        Some(t) if !t.trim().is_empty() => {
            format!("word_{}_{}.png", sanitize_filename(word), sanitize_filename(t))
        }
        _ => format!("word_{}.png", sanitize_filename(word)),
    }
}

/// `words_<topic>.json`
pub fn words_filename(topic: &str) -> String {
    format!("words_{}.json", sanitize_filename(topic))
}

/// `caption_<topic>.txt`
pub fn caption_filename(topic: &str) -> String {
    format!("caption_{}.txt", sanitize_filename(topic))
}

/// Return `name`, or `name` with `_2`, `_3`, … inserted before the extension,
/// whichever `taken` first rejects.
pub fn unique_filename(name: &str, taken: impl Fn(&str) -> bool) -> String {
    if !taken(name) {
        return name.to_string();
    }
    let (stem, ext) = match name.rfind('.') {
        Some(pos) if pos > 0 => (&name[..pos], &name[pos..]),
        _ => (name, ""),
    };
    (2u32..)
        .map(|n| format!("{stem}_{n}{ext}"))
        .find(|candidate| !taken(candidate))
        .unwrap_or_else(|| name.to_string())
}
