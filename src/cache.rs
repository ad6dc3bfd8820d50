//! Rendered-card cache for incremental overlay runs.
//!
//! A card depends on two things: the illustration it is drawn over and the
//! text and layout settings drawn onto it. Both are hashed, and the pair
//! is the card's [`CardKey`]. When a previous run already wrote a card with
//! the same key, the overlay stage reuses that file instead of drawing.
//!
//! - **illustration**: SHA-256 of the illustration PNG.
//! - **params**: SHA-256 of the four entry strings, every layout and canvas
//!   setting, and the font identity.
//!
//! Keys are independent of output paths. If the same card was written under
//! another filename (a topic rename, a re-sanitized word) it is copied
//! rather than redrawn. A key whose file has been deleted is a miss.
//!
//! The manifest lives at `<output_dir>/.cache-manifest.json`. A missing,
//! corrupt or outdated manifest loads as empty; `--no-cache` starts empty
//! on purpose and overwrites whatever is there.

use crate::config::{CanvasConfig, LayoutConfig};
use crate::types::WordEntry;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

const MANIFEST_FILENAME: &str = ".cache-manifest.json";

/// Bumped whenever the key computation changes; older manifests load empty.
const MANIFEST_VERSION: u32 = 1;

/// Hash pair identifying the content of one card.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq, Hash)]
pub struct CardKey {
    pub illustration: String,
    pub params: String,
}

impl CardKey {
    pub fn new(illustration: impl Into<String>, params: impl Into<String>) -> Self {
        Self {
            illustration: illustration.into(),
            params: params.into(),
        }
    }
}

/// Card path (relative to the output directory) → the key it was drawn with.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CacheManifest {
    pub version: u32,
    pub cards: HashMap<String, CardKey>,
    /// Reverse of `cards`, rebuilt on load.
    #[serde(skip)]
    by_key: HashMap<CardKey, String>,
}

impl CacheManifest {
    pub fn empty() -> Self {
        Self {
            version: MANIFEST_VERSION,
            cards: HashMap::new(),
            by_key: HashMap::new(),
        }
    }

    /// Read the manifest in `output_dir`, or an empty one if there is none
    /// usable.
    pub fn load(output_dir: &Path) -> Self {
        let parsed = std::fs::read_to_string(manifest_path(output_dir))
            .ok()
            .and_then(|json| serde_json::from_str::<Self>(&json).ok())
            .filter(|m| m.version == MANIFEST_VERSION);
        match parsed {
            Some(mut manifest) => {
                manifest.by_key = manifest
                    .cards
                    .iter()
                    .map(|(path, key)| (key.clone(), path.clone()))
                    .collect();
                manifest
            }
            None => Self::empty(),
        }
    }

    pub fn save(&self, output_dir: &Path) -> io::Result<()> {
        std::fs::create_dir_all(output_dir)?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(manifest_path(output_dir), json)
    }

    /// Path of a card already drawn with `key`, if that file still exists.
    pub fn lookup(&self, key: &CardKey, output_dir: &Path) -> Option<&str> {
        self.by_key
            .get(key)
            .filter(|path| output_dir.join(path).exists())
            .map(String::as_str)
    }

    /// Note that `path` was drawn with `key`. An older path holding the same
    /// key is forgotten.
    pub fn record(&mut self, path: String, key: CardKey) {
        if let Some(previous) = self.by_key.get(&key)
            && *previous != path
        {
            self.cards.remove(previous);
        }
        self.by_key.insert(key.clone(), path.clone());
        self.cards.insert(path, key);
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}

/// Hex SHA-256 of a file.
pub fn hash_file(path: &Path) -> io::Result<String> {
    Ok(format!("{:x}", Sha256::digest(std::fs::read(path)?)))
}

/// Everything besides the illustration that changes how a card is drawn.
#[derive(Debug, Clone, Copy)]
pub struct CardParams<'a> {
    pub entry: &'a WordEntry,
    pub layout: &'a LayoutConfig,
    pub canvas: &'a CanvasConfig,
    pub font_identity: &'a str,
}

/// SHA-256 hash of the render parameters for one card.
///
/// Strings are length-prefixed so that moving text between fields always
/// changes the hash.
pub fn hash_card_params(params: &CardParams<'_>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"card\0");
    let entry = params.entry;
    for text in [
        entry.word.as_str(),
        entry.translation.as_str(),
        entry.example.as_str(),
        entry.example_translation.as_str(),
        params.font_identity,
    ] {
        hasher.update((text.len() as u64).to_le_bytes());
        hasher.update(text.as_bytes());
    }
    let layout = params.layout;
    hasher.update(layout.font_size.to_le_bytes());
    hasher.update(layout.padding.to_le_bytes());
    hasher.update(layout.min_font_size.to_le_bytes());
    hasher.update(layout.font_step.to_le_bytes());
    hasher.update(layout.line_spacing.to_le_bytes());
    let canvas = params.canvas;
    hasher.update(canvas.width.to_le_bytes());
    hasher.update(canvas.height.to_le_bytes());
    hasher.update(canvas.margin.to_le_bytes());
    format!("{:x}", hasher.finalize())
}

/// How each card of an overlay run was produced.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u32,
    pub copies: u32,
    pub misses: u32,
}

impl CacheStats {
    pub fn hit(&mut self) {
        self.hits += 1;
    }

    pub fn copy(&mut self) {
        self.copies += 1;
    }

    pub fn miss(&mut self) {
        self.misses += 1;
    }

    pub fn total(&self) -> u32 {
        self.hits + self.copies + self.misses
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.hits == 0 && self.copies == 0 {
            return write!(f, "{} rendered", self.misses);
        }
        write!(f, "{} cached, ", self.hits)?;
        if self.copies > 0 {
            write!(f, "{} copied, ", self.copies)?;
        }
        write!(f, "{} rendered ({} total)", self.misses, self.total())
    }
}

pub fn manifest_path(output_dir: &Path) -> PathBuf {
    output_dir.join(MANIFEST_FILENAME)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn lumi() -> WordEntry {
        WordEntry::new("lumi", "snow", "Lumi sataa.", "Snow falls.")
    }

    fn params_hash(entry: &WordEntry, layout: &LayoutConfig, font: &str) -> String {
        hash_card_params(&CardParams {
            entry,
            layout,
            canvas: &CanvasConfig::default(),
            font_identity: font,
        })
    }

    // ---- manifest ----

    #[test]
    fn lookup_finds_recorded_card_on_disk() {
        let tmp = TempDir::new().unwrap();
        let mut m = CacheManifest::empty();
        m.record("word_lumi.png".into(), CardKey::new("ill", "prm"));
        fs::write(tmp.path().join("word_lumi.png"), "png").unwrap();

        assert_eq!(
            m.lookup(&CardKey::new("ill", "prm"), tmp.path()),
            Some("word_lumi.png")
        );
        assert_eq!(m.lookup(&CardKey::new("other", "prm"), tmp.path()), None);
        assert_eq!(m.lookup(&CardKey::new("ill", "other"), tmp.path()), None);
    }

    #[test]
    fn lookup_misses_when_card_was_deleted() {
        let mut m = CacheManifest::empty();
        m.record("gone.png".into(), CardKey::new("i", "p"));
        let tmp = TempDir::new().unwrap();
        assert_eq!(m.lookup(&CardKey::new("i", "p"), tmp.path()), None);
    }

    #[test]
    fn record_under_new_path_forgets_old_one() {
        let mut m = CacheManifest::empty();
        m.record("word_saa.png".into(), CardKey::new("i", "p"));
        m.record("word_saa_weather.png".into(), CardKey::new("i", "p"));

        assert_eq!(m.len(), 1);
        assert!(m.cards.contains_key("word_saa_weather.png"));
    }

    #[test]
    fn reload_restores_lookups() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("cards");
        let mut m = CacheManifest::empty();
        m.record("a.png".into(), CardKey::new("i1", "p1"));
        m.record("b.png".into(), CardKey::new("i2", "p2"));
        m.save(&out).unwrap();
        fs::write(out.join("a.png"), "png").unwrap();

        let loaded = CacheManifest::load(&out);
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.lookup(&CardKey::new("i1", "p1"), &out), Some("a.png"));
        assert_eq!(loaded.lookup(&CardKey::new("i2", "p2"), &out), None);
    }

    #[test]
    fn unusable_manifest_loads_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());

        fs::write(manifest_path(tmp.path()), "{ nope").unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());

        fs::write(
            manifest_path(tmp.path()),
            r#"{"version": 0, "cards": {"a.png": {"illustration": "i", "params": "p"}}}"#,
        )
        .unwrap();
        assert!(CacheManifest::load(tmp.path()).is_empty());
    }

    // ---- hashing ----

    #[test]
    fn hash_file_is_content_based() {
        let tmp = TempDir::new().unwrap();
        let a = tmp.path().join("a.png");
        let b = tmp.path().join("b.png");
        fs::write(&a, "same").unwrap();
        fs::write(&b, "same").unwrap();
        assert_eq!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
        fs::write(&b, "different").unwrap();
        assert_ne!(hash_file(&a).unwrap(), hash_file(&b).unwrap());
    }

    #[test]
    fn card_hash_is_deterministic() {
        let layout = LayoutConfig::default();
        assert_eq!(
            params_hash(&lumi(), &layout, "font"),
            params_hash(&lumi(), &layout, "font")
        );
    }

    #[test]
    fn card_hash_changes_with_text_layout_and_font() {
        let layout = LayoutConfig::default();
        let base = params_hash(&lumi(), &layout, "font");

        let mut edited = lumi();
        edited.example = "Lumi sataa taas.".into();
        assert_ne!(base, params_hash(&edited, &layout, "font"));

        let bigger = LayoutConfig {
            font_size: 56,
            ..LayoutConfig::default()
        };
        assert_ne!(base, params_hash(&lumi(), &bigger, "font"));

        assert_ne!(base, params_hash(&lumi(), &layout, "other-font"));
    }

    #[test]
    fn card_hash_distinguishes_field_boundaries() {
        let layout = LayoutConfig::default();
        let a = WordEntry::new("ab", "c", "x", "y");
        let b = WordEntry::new("a", "bc", "x", "y");
        assert_ne!(
            params_hash(&a, &layout, "f"),
            params_hash(&b, &layout, "f")
        );
    }

    #[test]
    fn cache_stats_display() {
        let mut stats = CacheStats::default();
        stats.miss();
        assert_eq!(stats.to_string(), "1 rendered");
        stats.hit();
        stats.hit();
        assert_eq!(stats.to_string(), "2 cached, 1 rendered (3 total)");
        stats.copy();
        assert_eq!(stats.to_string(), "2 cached, 1 copied, 1 rendered (4 total)");
    }
}
