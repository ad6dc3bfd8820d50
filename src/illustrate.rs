//! Illustration generation.
//!
//! For every entry the image collaborator is asked for a square picture of
//! the word; the backend fits it into the illustration slot of a blank card
//! and saves it as `word_<word>[_<topic>].png`. Each success is recorded in
//! the [`Mapping`] so the overlay stage can find the file by word.
//!
//! ## Failure handling
//!
//! | Failure | Effect |
//! |---|---|
//! | Blocked prompt, no image part, undecodable bytes | entry skipped, warning |
//! | Missing key, transport error, auth rejection, 429/5xx after retries | stage aborts |
//! | Cannot write the PNG or the mapping | stage aborts |
//!
//! The mapping is saved before an abort so the images already generated are
//! not orphaned.

use crate::config::Config;
use crate::error::ErrorKind;
use crate::genai::prompts::illustration_prompt;
use crate::genai::{GenAiError, ImageGenerator, ImageRequest};
use crate::imaging::{BackendError, ComposeParams, ImageBackend, illustration_slot};
use crate::mapping::{MAPPING_FILENAME, Mapping, MappingError};
use crate::naming::{illustration_filename, unique_filename};
use crate::types::{WordList, WordListError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Generated illustrations are square; the slot is square too.
pub const ASPECT_RATIO: &str = "1:1";

#[derive(Error, Debug)]
pub enum IllustrateError {
    #[error("image collaborator unavailable at '{word}': {source}")]
    Collaborator { word: String, source: GenAiError },
    #[error("failed to write illustration: {0}")]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Mapping(#[from] MappingError),
    #[error(transparent)]
    WordList(#[from] WordListError),
}

impl IllustrateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            IllustrateError::Collaborator { source, .. } => source.kind(),
            IllustrateError::Backend(e) => e.kind(),
            IllustrateError::Mapping(e) => e.kind(),
            IllustrateError::WordList(e) => e.kind(),
        }
    }
}

/// Settings for one illustration run.
#[derive(Debug, Clone, PartialEq)]
pub struct IllustrateConfig {
    pub model: String,
    pub topic: Option<String>,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub margin: u32,
    /// Regenerate even when the mapping already points to an existing file.
    pub force: bool,
}

impl IllustrateConfig {
    pub fn from_config(config: &Config, topic: Option<&str>, force: bool) -> Self {
        Self {
            model: config.generation.image_model.clone(),
            topic: topic.map(str::to_string),
            canvas_width: config.canvas.width,
            canvas_height: config.canvas.height,
            margin: config.canvas.margin,
            force,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IllustrationOutcome {
    Generated { word: String, path: PathBuf },
    Reused { word: String, path: PathBuf },
    Skipped { word: String, kind: ErrorKind, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IllustrateReport {
    pub outcomes: Vec<IllustrationOutcome>,
    pub mapping_path: PathBuf,
}

impl IllustrateReport {
    pub fn generated(&self) -> usize {
        self.count(|o| matches!(o, IllustrationOutcome::Generated { .. }))
    }

    pub fn reused(&self) -> usize {
        self.count(|o| matches!(o, IllustrationOutcome::Reused { .. }))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, IllustrationOutcome::Skipped { .. }))
    }

    fn count(&self, pred: impl Fn(&IllustrationOutcome) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(o)).count()
    }
}

/// Illustrate every word in `words`, writing cards and `mapping.json` into `dir`.
pub fn illustrate_words(
    generator: &dyn ImageGenerator,
    backend: &dyn ImageBackend,
    words: &WordList,
    dir: &Path,
    config: &IllustrateConfig,
) -> Result<IllustrateReport, IllustrateError> {
    let mapping_path = dir.join(MAPPING_FILENAME);
    let mut mapping = Mapping::load_or_default(&mapping_path)?;
    let slot = illustration_slot(config.canvas_width, config.canvas_height, config.margin);
    let mut report = IllustrateReport {
        mapping_path: mapping_path.clone(),
        ..IllustrateReport::default()
    };

    for entry in words {
        let word = entry.word.as_str();
        if !config.force
            && let Ok(path) = mapping.resolve(word, dir)
        {
            debug!("reusing {} for '{}'", path.display(), word);
            report.outcomes.push(IllustrationOutcome::Reused {
                word: word.to_string(),
                path,
            });
            continue;
        }

        // A forced regeneration overwrites the word's own file.
        let filename = match mapping.get(word) {
            Some(existing) => existing.to_string(),
            None => unique_filename(
                &illustration_filename(word, config.topic.as_deref()),
                |name| mapping.contains_path(name),
            ),
        };
        let output = dir.join(&filename);

        let prompt = illustration_prompt(word, config.topic.as_deref());
        let request = ImageRequest {
            model: &config.model,
            prompt: &prompt,
            aspect_ratio: ASPECT_RATIO,
        };
        let image = match generator.generate_image(&request) {
            Ok(bytes) => bytes,
            Err(e) if e.is_unavailable() => {
                mapping.save(&mapping_path)?;
                return Err(IllustrateError::Collaborator {
                    word: word.to_string(),
                    source: e,
                });
            }
            Err(e) => {
                warn!("skipping '{}': {}", word, e);
                report.outcomes.push(IllustrationOutcome::Skipped {
                    word: word.to_string(),
                    kind: e.kind(),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let params = ComposeParams {
            image,
            output: output.clone(),
            canvas_width: config.canvas_width,
            canvas_height: config.canvas_height,
            slot,
        };
        if let Err(e) = backend.compose(&params) {
            if !e.kind().is_recoverable() {
                mapping.save(&mapping_path)?;
                return Err(e.into());
            }
            warn!("skipping '{}': {}", word, e);
            report.outcomes.push(IllustrationOutcome::Skipped {
                word: word.to_string(),
                kind: e.kind(),
                reason: e.to_string(),
            });
            continue;
        }

        info!("illustrated '{}' -> {}", word, filename);
        mapping.insert(word, filename);
        report.outcomes.push(IllustrationOutcome::Generated {
            word: word.to_string(),
            path: output,
        });
    }

    mapping.save(&mapping_path)?;
    Ok(report)
}

/// Load the words file at `words_path` and illustrate it.
pub fn illustrate_file(
    generator: &dyn ImageGenerator,
    backend: &dyn ImageBackend,
    words_path: &Path,
    dir: &Path,
    config: &IllustrateConfig,
) -> Result<IllustrateReport, IllustrateError> {
    let words = WordList::load(words_path)?;
    illustrate_words(generator, backend, &words, dir, config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::backend::tests::{MockBackend, RecordedOp};
    use crate::layout::Rect;
    use crate::test_helpers::*;
    use crate::types::WordEntry;
    use tempfile::TempDir;

    fn config(topic: Option<&str>) -> IllustrateConfig {
        IllustrateConfig {
            model: "gemini-2.5-flash-image".to_string(),
            topic: topic.map(str::to_string),
            canvas_width: 720,
            canvas_height: 1440,
            margin: 40,
            force: false,
        }
    }

    #[test]
    fn generates_one_card_and_mapping_entry_per_word() {
        let tmp = TempDir::new().unwrap();
        let images = FakeImageGenerator::new();
        let backend = MockBackend::new();

        let report =
            illustrate_words(&images, &backend, &weather_words(), tmp.path(), &config(Some("weather")))
                .unwrap();

        assert_eq!(report.generated(), 3);
        let mapping = Mapping::load(&tmp.path().join(MAPPING_FILENAME)).unwrap();
        assert_eq!(mapping.get("aurinko"), Some("word_aurinko_weather.png"));
        assert_eq!(mapping.len(), 3);

        let ops = backend.get_operations();
        assert_eq!(
            ops[0],
            RecordedOp::Compose {
                output: tmp.path().join("word_aurinko_weather.png").to_string_lossy().to_string(),
                canvas: (720, 1440),
                slot: Rect { x: 40, y: 400, width: 640, height: 640 },
            }
        );
    }

    #[test]
    fn requests_square_images_with_topic_context() {
        let tmp = TempDir::new().unwrap();
        let images = FakeImageGenerator::new();
        illustrate_words(&images, &MockBackend::new(), &weather_words(), tmp.path(), &config(Some("weather")))
            .unwrap();

        let requests = images.requests();
        assert_eq!(requests.len(), 3);
        assert!(requests.iter().all(|(_, ratio)| ratio == "1:1"));
        assert!(requests[1].0.contains("'sade' in the 'weather' category"));
    }

    #[test]
    fn colliding_sanitized_names_get_suffixes() {
        let tmp = TempDir::new().unwrap();
        let words = WordList::from(vec![
            WordEntry::placeholder("sää"),
            WordEntry::placeholder("saa"),
        ]);
        illustrate_words(&FakeImageGenerator::new(), &MockBackend::new(), &words, tmp.path(), &config(None))
            .unwrap();

        let mapping = Mapping::load(&tmp.path().join(MAPPING_FILENAME)).unwrap();
        assert_eq!(mapping.get("sää"), Some("word_saa.png"));
        assert_eq!(mapping.get("saa"), Some("word_saa_2.png"));
    }

    #[test]
    fn blocked_and_undecodable_entries_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let images = FakeImageGenerator::with_results(vec![
            Err(GenAiError::Blocked("SAFETY".to_string())),
            Ok(b"garbage".to_vec()),
        ]);
        let backend = MockBackend::failing_decode(b"garbage");

        let report =
            illustrate_words(&images, &backend, &weather_words(), tmp.path(), &config(None)).unwrap();

        assert_eq!(report.generated(), 1);
        assert_eq!(report.skipped(), 2);
        assert!(matches!(
            &report.outcomes[1],
            IllustrationOutcome::Skipped { word, kind: ErrorKind::InvalidResponseShape, .. } if word == "sade"
        ));
        let mapping = Mapping::load(&tmp.path().join(MAPPING_FILENAME)).unwrap();
        assert_eq!(mapping.iter().map(|(w, _)| w).collect::<Vec<_>>(), vec!["lumi"]);
    }

    #[test]
    fn unavailable_collaborator_aborts_but_keeps_progress() {
        let tmp = TempDir::new().unwrap();
        let images = FakeImageGenerator::with_results(vec![Ok(png_bytes(8, 8)), Err(unavailable())]);

        let err = illustrate_words(&images, &MockBackend::new(), &weather_words(), tmp.path(), &config(None))
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::CollaboratorUnavailable);
        assert!(matches!(&err, IllustrateError::Collaborator { word, .. } if word == "sade"));
        let mapping = Mapping::load(&tmp.path().join(MAPPING_FILENAME)).unwrap();
        assert_eq!(mapping.len(), 1);
        assert_eq!(images.requests().len(), 2);
    }

    #[test]
    fn existing_illustrations_are_reused_unless_forced() {
        let tmp = TempDir::new().unwrap();
        let words = weather_words();
        illustrate_words(&FakeImageGenerator::new(), &MockBackend::new(), &words, tmp.path(), &config(None))
            .unwrap();

        let images = FakeImageGenerator::new();
        let report = illustrate_words(&images, &MockBackend::new(), &words, tmp.path(), &config(None)).unwrap();
        assert_eq!(report.reused(), 3);
        assert!(images.requests().is_empty());

        let forced = IllustrateConfig { force: true, ..config(None) };
        let report = illustrate_words(&images, &MockBackend::new(), &words, tmp.path(), &forced).unwrap();
        assert_eq!(report.generated(), 3);
        let mapping = Mapping::load(&tmp.path().join(MAPPING_FILENAME)).unwrap();
        assert_eq!(mapping.get("lumi"), Some("word_lumi.png"));
    }

    #[test]
    fn dangling_mapping_entry_is_regenerated() {
        let tmp = TempDir::new().unwrap();
        let mut mapping = Mapping::new();
        mapping.insert("aurinko", "word_aurinko.png");
        mapping.save(&tmp.path().join(MAPPING_FILENAME)).unwrap();

        let words = WordList::from(vec![weather_words().entries()[0].clone()]);
        let report =
            illustrate_words(&FakeImageGenerator::new(), &MockBackend::new(), &words, tmp.path(), &config(None))
                .unwrap();
        assert_eq!(report.generated(), 1);
        assert!(tmp.path().join("word_aurinko.png").exists());
    }

    #[test]
    fn real_backend_writes_canvas_sized_cards() {
        use crate::imaging::{Dimensions, RustBackend};
        let tmp = TempDir::new().unwrap();
        let backend = RustBackend::new();
        let cfg = IllustrateConfig {
            canvas_width: 90,
            canvas_height: 180,
            margin: 5,
            ..config(None)
        };
        let words = WordList::from(vec![WordEntry::placeholder("kuu")]);
        illustrate_words(&FakeImageGenerator::new(), &backend, &words, tmp.path(), &cfg).unwrap();

        let dims = backend.identify(&tmp.path().join("word_kuu.png")).unwrap();
        assert_eq!(dims, Dimensions { width: 90, height: 180 });
    }
}
