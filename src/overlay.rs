//! Text overlay: turn illustrations into finished cards.
//!
//! For each entry in the words file:
//!
//! 1. Resolve the illustration through the [`Mapping`]. A missing key or a
//!    dangling file skips the entry with a warning.
//! 2. Hash the illustration and the render parameters and consult the
//!    [`CacheManifest`]. A hit under the same path is left alone, a hit under
//!    another path is copied.
//! 3. Otherwise compute a [`CardLayout`](crate::layout::CardLayout) and have the backend draw it.
//!    A card whose text cannot fit is skipped.
//!
//! The output file keeps the illustration's filename, under the output
//! directory.

use crate::cache::{self, CacheManifest, CacheStats, CardKey, CardParams};
use crate::config::{CanvasConfig, Config, LayoutConfig};
use crate::error::ErrorKind;
use crate::imaging::{BackendError, ImageBackend, RenderParams, illustration_slot};
use crate::layout::{CardText, LayoutSpec, TextMeasurer, layout_card};
use crate::mapping::{MAPPING_FILENAME, Mapping, MappingError};
use crate::types::{WordEntry, WordList, WordListError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("cannot read mapping: {0}")]
    Mapping(#[from] MappingError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to render card: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    WordList(#[from] WordListError),
}

impl OverlayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            OverlayError::Mapping(e) => e.kind(),
            OverlayError::Io(_) => ErrorKind::FileIoFailure,
            OverlayError::Backend(e) => e.kind(),
            OverlayError::WordList(e) => e.kind(),
        }
    }
}

/// Settings for one overlay run.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    pub layout: LayoutConfig,
    pub canvas: CanvasConfig,
    /// Ignore and rebuild the cache manifest.
    pub no_cache: bool,
}

impl OverlayConfig {
    pub fn from_config(config: &Config, no_cache: bool) -> Self {
        Self {
            layout: config.layout.clone(),
            canvas: config.canvas.clone(),
            no_cache,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CardOutcome {
    Rendered { word: String, path: PathBuf, scale: f32 },
    Cached { word: String, path: PathBuf },
    Copied { word: String, path: PathBuf },
    Skipped { word: String, kind: ErrorKind, reason: String },
}

impl CardOutcome {
    pub fn word(&self) -> &str {
        match self {
            CardOutcome::Rendered { word, .. }
            | CardOutcome::Cached { word, .. }
            | CardOutcome::Copied { word, .. }
            | CardOutcome::Skipped { word, .. } => word,
        }
    }

    /// Path of the finished card, if there is one.
    pub fn path(&self) -> Option<&Path> {
        match self {
            CardOutcome::Rendered { path, .. }
            | CardOutcome::Cached { path, .. }
            | CardOutcome::Copied { path, .. } => Some(path),
            CardOutcome::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayReport {
    pub outcomes: Vec<CardOutcome>,
    pub cache: CacheStats,
    pub output_dir: PathBuf,
}

impl OverlayReport {
    /// Cards present in the output directory after the run.
    pub fn completed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.path().is_some()).count()
    }

    pub fn skipped(&self) -> usize {
        self.outcomes.len() - self.completed()
    }
}

/// The collaborators an overlay run draws with.
#[derive(Clone, Copy)]
pub struct Renderer<'a> {
    pub backend: &'a dyn ImageBackend,
    pub measurer: &'a dyn TextMeasurer,
    /// Identifies the fonts for cache keys; changes when the font files do.
    pub font_identity: &'a str,
}

/// Overlay every entry of `words`, reading illustrations and `mapping.json`
/// from `illustrations_dir` and writing cards into `output_dir`.
pub fn overlay_cards(
    renderer: Renderer<'_>,
    words: &WordList,
    illustrations_dir: &Path,
    output_dir: &Path,
    config: &OverlayConfig,
) -> Result<OverlayReport, OverlayError> {
    let mapping = Mapping::load(&illustrations_dir.join(MAPPING_FILENAME))?;
    let mut manifest = if config.no_cache {
        CacheManifest::empty()
    } else {
        CacheManifest::load(output_dir)
    };
    let slot = illustration_slot(config.canvas.width, config.canvas.height, config.canvas.margin);
    let spec = LayoutSpec::new(&config.layout, &config.canvas, slot);
    let mut report = OverlayReport {
        output_dir: output_dir.to_path_buf(),
        ..OverlayReport::default()
    };

    for entry in words {
        let outcome = match overlay_one(
            renderer,
            entry,
            &mapping,
            illustrations_dir,
            output_dir,
            config,
            &spec,
            &mut manifest,
        ) {
            Ok(outcome) => outcome,
            Err(e) if e.kind().is_recoverable() => {
                warn!("skipping '{}': {}", entry.word, e);
                CardOutcome::Skipped {
                    word: entry.word.clone(),
                    kind: e.kind(),
                    reason: e.to_string(),
                }
            }
            Err(e) => {
                manifest.save(output_dir)?;
                return Err(e.into_overlay_error());
            }
        };
        match &outcome {
            CardOutcome::Rendered { .. } => report.cache.miss(),
            CardOutcome::Cached { .. } => report.cache.hit(),
            CardOutcome::Copied { .. } => report.cache.copy(),
            CardOutcome::Skipped { .. } => {}
        }
        report.outcomes.push(outcome);
    }

    manifest.save(output_dir)?;
    info!("overlay: {}", report.cache);
    Ok(report)
}

/// Load the words file at `words_path` and overlay it.
pub fn overlay_file(
    renderer: Renderer<'_>,
    words_path: &Path,
    illustrations_dir: &Path,
    output_dir: &Path,
    config: &OverlayConfig,
) -> Result<OverlayReport, OverlayError> {
    let words = WordList::load(words_path)?;
    overlay_cards(renderer, &words, illustrations_dir, output_dir, config)
}

/// Per-entry failure; recoverable ones become [`CardOutcome::Skipped`].
#[derive(Error, Debug)]
enum CardError {
    #[error("entry has blank fields")]
    Incomplete,
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    Layout(#[from] crate::layout::LayoutError),
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CardError {
    fn kind(&self) -> ErrorKind {
        match self {
            CardError::Incomplete => ErrorKind::InvalidResponseShape,
            CardError::Mapping(e) => e.kind(),
            CardError::Layout(e) => e.kind(),
            CardError::Backend(e) => e.kind(),
            CardError::Io(_) => ErrorKind::FileIoFailure,
        }
    }

    /// Only called for non-recoverable kinds.
    fn into_overlay_error(self) -> OverlayError {
        match self {
            CardError::Mapping(e) => OverlayError::Mapping(e),
            CardError::Backend(e) => OverlayError::Backend(e),
            CardError::Io(e) => OverlayError::Io(e),
            other => OverlayError::Io(std::io::Error::other(other.to_string())),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn overlay_one(
    renderer: Renderer<'_>,
    entry: &WordEntry,
    mapping: &Mapping,
    illustrations_dir: &Path,
    output_dir: &Path,
    config: &OverlayConfig,
    spec: &LayoutSpec,
    manifest: &mut CacheManifest,
) -> Result<CardOutcome, CardError> {
    if !entry.is_complete() {
        return Err(CardError::Incomplete);
    }
    let source = mapping.resolve(&entry.word, illustrations_dir)?;
    let relative = mapping
        .get(&entry.word)
        .ok_or_else(|| MappingError::MissingEntry(entry.word.clone()))?
        .to_string();
    let output = output_dir.join(&relative);

    let key = CardKey::new(
        cache::hash_file(&source)?,
        cache::hash_card_params(&CardParams {
            entry,
            layout: &config.layout,
            canvas: &config.canvas,
            font_identity: renderer.font_identity,
        }),
    );

    if let Some(stored) = manifest.lookup(&key, output_dir).map(str::to_string) {
        let word = entry.word.clone();
        if stored == relative {
            debug!("cache hit for '{}'", word);
            return Ok(CardOutcome::Cached { word, path: output });
        }
        debug!("cache hit for '{}' under {}, copying", word, stored);
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(output_dir.join(&stored), &output)?;
        manifest.record(relative, key);
        return Ok(CardOutcome::Copied { word, path: output });
    }

    let layout = layout_card(renderer.measurer, spec, &CardText::from(entry))?;
    renderer.backend.render(&RenderParams {
        source,
        output: output.clone(),
        canvas_width: config.canvas.width,
        canvas_height: config.canvas.height,
        slot: spec.illustration,
        layout: &layout,
    })?;
    manifest.record(relative, key);
    debug!("rendered '{}' at scale {:.2}", entry.word, layout.scale);
    Ok(CardOutcome::Rendered {
        word: entry.word.clone(),
        path: output,
        scale: layout.scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::layout::FixedAdvance;
    use crate::test_helpers::*;
    use tempfile::TempDir;

    struct Dirs {
        _tmp: TempDir,
        illustrations: PathBuf,
        output: PathBuf,
    }

    /// Illustrations (empty files) plus a mapping for every weather word
    /// except those in `unmapped`.
    fn setup(unmapped: &[&str]) -> Dirs {
        let tmp = TempDir::new().unwrap();
        let illustrations = tmp.path().join("illustrations");
        let output = tmp.path().join("cards");
        std::fs::create_dir_all(&illustrations).unwrap();
        let mut mapping = Mapping::new();
        for entry in &weather_words() {
            if unmapped.contains(&entry.word.as_str()) {
                continue;
            }
            let name = format!("word_{}.png", entry.word);
            std::fs::write(illustrations.join(&name), entry.word.as_bytes()).unwrap();
            mapping.insert(entry.word.clone(), name);
        }
        mapping.save(&illustrations.join(MAPPING_FILENAME)).unwrap();
        Dirs {
            _tmp: tmp,
            illustrations,
            output,
        }
    }

    fn config(no_cache: bool) -> OverlayConfig {
        OverlayConfig {
            layout: LayoutConfig::default(),
            canvas: CanvasConfig::default(),
            no_cache,
        }
    }

    fn run(backend: &MockBackend, words: &WordList, dirs: &Dirs, no_cache: bool) -> OverlayReport {
        let measurer = FixedAdvance::default();
        let renderer = Renderer {
            backend,
            measurer: &measurer,
            font_identity: "test-font",
        };
        overlay_cards(renderer, words, &dirs.illustrations, &dirs.output, &config(no_cache)).unwrap()
    }

    #[test]
    fn renders_one_card_per_complete_entry() {
        let dirs = setup(&[]);
        let backend = MockBackend::new();
        let report = run(&backend, &weather_words(), &dirs, false);

        assert_eq!(report.completed(), 3);
        assert_eq!(report.cache, CacheStats { hits: 0, copies: 0, misses: 3 });
        let outputs = backend.rendered_outputs();
        assert_eq!(outputs.len(), 3);
        assert!(outputs[0].ends_with("cards/word_aurinko.png"));
        assert!(matches!(
            &backend.get_operations()[0],
            RecordedOp::Render { source, lines, .. } if source.ends_with("word_aurinko.png") && *lines >= 4
        ));
    }

    #[test]
    fn missing_mapping_entry_is_skipped_and_stage_succeeds() {
        let dirs = setup(&["sade"]);
        let backend = MockBackend::new();
        let report = run(&backend, &weather_words(), &dirs, false);

        assert_eq!(report.completed(), 2);
        assert!(matches!(
            &report.outcomes[1],
            CardOutcome::Skipped { word, kind: ErrorKind::MissingMappingEntry, .. } if word == "sade"
        ));
    }

    #[test]
    fn dangling_mapping_file_is_skipped() {
        let dirs = setup(&[]);
        std::fs::remove_file(dirs.illustrations.join("word_lumi.png")).unwrap();
        let report = run(&MockBackend::new(), &weather_words(), &dirs, false);
        assert_eq!(report.skipped(), 1);
        assert_eq!(report.outcomes[2].word(), "lumi");
    }

    #[test]
    fn unfittable_and_blank_entries_are_skipped() {
        let dirs = setup(&[]);
        let mut words = weather_words().into_inner();
        words[0].example = "sana ".repeat(1200);
        words[1].translation = "  ".to_string();
        let report = run(&MockBackend::new(), &WordList::from(words), &dirs, false);

        let kinds: Vec<Option<ErrorKind>> = report
            .outcomes
            .iter()
            .map(|o| match o {
                CardOutcome::Skipped { kind, .. } => Some(*kind),
                _ => None,
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                Some(ErrorKind::LayoutFailure),
                Some(ErrorKind::InvalidResponseShape),
                None
            ]
        );
    }

    #[test]
    fn second_run_hits_the_cache() {
        let dirs = setup(&[]);
        run(&MockBackend::new(), &weather_words(), &dirs, false);

        let backend = MockBackend::new();
        let report = run(&backend, &weather_words(), &dirs, false);
        assert_eq!(report.cache, CacheStats { hits: 3, copies: 0, misses: 0 });
        assert!(backend.rendered_outputs().is_empty());
    }

    #[test]
    fn changed_entry_is_redrawn() {
        let dirs = setup(&[]);
        run(&MockBackend::new(), &weather_words(), &dirs, false);

        let mut words = weather_words().into_inner();
        words[2].example = "Lumi narskuu kengissä.".to_string();
        let backend = MockBackend::new();
        let report = run(&backend, &WordList::from(words), &dirs, false);
        assert_eq!(report.cache, CacheStats { hits: 2, copies: 0, misses: 1 });
        assert_eq!(backend.rendered_outputs().len(), 1);
    }

    #[test]
    fn renamed_illustration_copies_cached_card() {
        let dirs = setup(&[]);
        run(&MockBackend::new(), &weather_words(), &dirs, false);

        // Same image content under a new name.
        std::fs::rename(
            dirs.illustrations.join("word_sade.png"),
            dirs.illustrations.join("word_sade_weather.png"),
        )
        .unwrap();
        let mut mapping = Mapping::load(&dirs.illustrations.join(MAPPING_FILENAME)).unwrap();
        mapping.insert("sade", "word_sade_weather.png");
        mapping.save(&dirs.illustrations.join(MAPPING_FILENAME)).unwrap();

        let report = run(&MockBackend::new(), &weather_words(), &dirs, false);
        assert_eq!(report.cache.copies, 1);
        assert!(dirs.output.join("word_sade_weather.png").exists());
    }

    #[test]
    fn no_cache_redraws_everything() {
        let dirs = setup(&[]);
        run(&MockBackend::new(), &weather_words(), &dirs, false);

        let backend = MockBackend::new();
        let report = run(&backend, &weather_words(), &dirs, true);
        assert_eq!(report.cache.misses, 3);
        assert_eq!(backend.rendered_outputs().len(), 3);
    }

    #[test]
    fn missing_mapping_file_aborts() {
        let tmp = TempDir::new().unwrap();
        let measurer = FixedAdvance::default();
        let backend = MockBackend::new();
        let renderer = Renderer {
            backend: &backend,
            measurer: &measurer,
            font_identity: "f",
        };
        let err = overlay_cards(renderer, &weather_words(), tmp.path(), &tmp.path().join("out"), &config(false))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileIoFailure);
    }

    #[test]
    fn mapping_pointing_outside_aborts_before_rendering() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join("mapping.json"),
            r#"{"aurinko": "../escaped.png"}"#,
        )
        .unwrap();
        let measurer = FixedAdvance::default();
        let backend = MockBackend::new();
        let renderer = Renderer {
            backend: &backend,
            measurer: &measurer,
            font_identity: "f",
        };
        let err = overlay_cards(renderer, &weather_words(), tmp.path(), &tmp.path().join("out"), &config(false))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileIoFailure);
        assert!(backend.get_operations().is_empty());
    }
}
