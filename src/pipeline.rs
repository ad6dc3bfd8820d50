//! Pipeline driver.
//!
//! Runs the stages strictly in order, each reading the previous stage's
//! artifact from disk:
//!
//! ```text
//! words       →  <words_dir>/words_<topic>.json
//! grammar     →  same file, rewritten
//! illustrate  →  <illustrations_dir>/*.png + mapping.json
//! overlay     →  <output_dir>/*.png + .cache-manifest.json
//! caption     →  <words_dir>/caption_<topic>.txt   (full builds only)
//! ```
//!
//! A run may start at any stage ([`PipelineConfig::from`]); the artifacts
//! that stage needs are checked first. The first failing stage stops the run
//! and everything earlier stays on disk.
//!
//! Nothing here is global: the [`PipelineConfig`] and the [`Collaborators`]
//! are built by the caller and passed in.

use crate::caption::{CaptionError, CaptionReport, write_caption};
use crate::config::{Config, GenerationConfig};
use crate::error::ErrorKind;
use crate::genai::{ImageGenerator, TextGenerator};
use crate::grammar::{GrammarError, GrammarReport, verify_file};
use crate::illustrate::{IllustrateConfig, IllustrateError, IllustrateReport, illustrate_file};
use crate::mapping::MAPPING_FILENAME;
use crate::naming::{caption_filename, words_filename};
use crate::overlay::{OverlayConfig, OverlayError, OverlayReport, Renderer, overlay_file};
use crate::words::{
    FallbackVocabulary, LiveWordSource, WordSource, WordsError, WordsReport, write_words,
};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, clap::ValueEnum)]
pub enum Stage {
    Words,
    Grammar,
    Illustrate,
    Overlay,
    Caption,
}

impl Stage {
    /// The card-building stages, in order. Caption runs after them on demand.
    pub const CARD_STAGES: [Stage; 4] = [
        Stage::Words,
        Stage::Grammar,
        Stage::Illustrate,
        Stage::Overlay,
    ];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Words => "words",
            Stage::Grammar => "grammar",
            Stage::Illustrate => "illustrate",
            Stage::Overlay => "overlay",
            Stage::Caption => "caption",
        };
        f.write_str(name)
    }
}

/// The error of whichever stage failed.
#[derive(Error, Debug)]
pub enum StageFailure {
    #[error(transparent)]
    Words(#[from] WordsError),
    #[error(transparent)]
    Grammar(#[from] GrammarError),
    #[error(transparent)]
    Illustrate(#[from] IllustrateError),
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    #[error(transparent)]
    Caption(#[from] CaptionError),
}

impl StageFailure {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StageFailure::Words(e) => e.kind(),
            StageFailure::Grammar(e) => e.kind(),
            StageFailure::Illustrate(e) => e.kind(),
            StageFailure::Overlay(e) => e.kind(),
            StageFailure::Caption(e) => e.kind(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("{stage} stage failed: {source}")]
    Stage { stage: Stage, source: StageFailure },
    #[error("cannot start at {stage}: {} not found (run an earlier stage first)", path.display())]
    MissingArtifact { stage: Stage, path: PathBuf },
    #[error("{0} stage needs the image collaborator; set the API key")]
    NoImageGenerator(Stage),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::Stage { source, .. } => source.kind(),
            PipelineError::MissingArtifact { .. } => ErrorKind::FileIoFailure,
            PipelineError::NoImageGenerator(_) => ErrorKind::CollaboratorUnavailable,
        }
    }
}

/// Everything one run needs to know, resolved from [`Config`] plus CLI flags.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub topic: String,
    pub count: usize,
    /// First stage to run.
    pub from: Stage,
    /// Write the caption after the card stages.
    pub caption: bool,
    pub words_dir: PathBuf,
    pub illustrations_dir: PathBuf,
    pub output_dir: PathBuf,
    pub generation: GenerationConfig,
    pub illustrate: IllustrateConfig,
    pub overlay: OverlayConfig,
}

impl PipelineConfig {
    /// A full build of `topic` from the first stage.
    pub fn from_config(config: &Config, topic: &str) -> Self {
        Self {
            topic: topic.to_string(),
            count: config.generation.count,
            from: Stage::Words,
            caption: true,
            words_dir: config.paths.words_dir.clone(),
            illustrations_dir: config.paths.illustrations_dir.clone(),
            output_dir: config.paths.output_dir.clone(),
            generation: config.generation.clone(),
            illustrate: IllustrateConfig::from_config(config, Some(topic), false),
            overlay: OverlayConfig::from_config(config, false),
        }
    }

    /// Re-run only the overlay from existing artifacts.
    pub fn text_only(mut self) -> Self {
        self.from = Stage::Overlay;
        self.caption = false;
        self
    }

    pub fn words_path(&self) -> PathBuf {
        self.words_dir.join(words_filename(&self.topic))
    }

    pub fn caption_path(&self) -> PathBuf {
        self.words_dir.join(caption_filename(&self.topic))
    }

    pub fn mapping_path(&self) -> PathBuf {
        self.illustrations_dir.join(MAPPING_FILENAME)
    }

    /// Stages this configuration will run, in order.
    pub fn stages(&self) -> Vec<Stage> {
        let mut stages: Vec<Stage> = Stage::CARD_STAGES
            .into_iter()
            .filter(|s| *s >= self.from)
            .collect();
        if self.caption || self.from == Stage::Caption {
            stages.push(Stage::Caption);
        }
        stages
    }

    /// Files that must exist before `stage` can run.
    fn required_artifacts(&self, stage: Stage) -> Vec<PathBuf> {
        match stage {
            Stage::Words | Stage::Caption => Vec::new(),
            Stage::Grammar | Stage::Illustrate => vec![self.words_path()],
            Stage::Overlay => vec![self.words_path(), self.mapping_path()],
        }
    }
}

/// External services and drawing machinery for a run.
///
/// `text` and `image` are `None` when no API key is configured; word
/// generation and captions then fall back to built-in tables, grammar
/// verification is skipped, and illustration cannot run.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub text: Option<&'a dyn TextGenerator>,
    pub image: Option<&'a dyn ImageGenerator>,
    pub renderer: Renderer<'a>,
}

/// Progress notifications, one per stage boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    StageStarted(Stage),
    Words(WordsReport),
    Grammar(GrammarReport),
    Illustrate(IllustrateReport),
    Overlay(OverlayReport),
    Caption(CaptionReport),
}

/// Run the configured stages in order.
///
/// Returns the stages that completed. `observer` sees every event as it
/// happens.
pub fn run_pipeline(
    collaborators: Collaborators<'_>,
    config: &PipelineConfig,
    observer: &mut dyn FnMut(&PipelineEvent),
) -> Result<Vec<Stage>, PipelineError> {
    for path in config.required_artifacts(config.from) {
        if !path.exists() {
            return Err(PipelineError::MissingArtifact {
                stage: config.from,
                path,
            });
        }
    }

    let mut completed = Vec::new();
    for stage in config.stages() {
        info!("starting {} stage for '{}'", stage, config.topic);
        observer(&PipelineEvent::StageStarted(stage));
        let event = run_stage(stage, collaborators, config)?;
        observer(&event);
        completed.push(stage);
    }
    Ok(completed)
}

fn run_stage(
    stage: Stage,
    collaborators: Collaborators<'_>,
    config: &PipelineConfig,
) -> Result<PipelineEvent, PipelineError> {
    let fail = |source: StageFailure| PipelineError::Stage { stage, source };
    let words_path = config.words_path();
    let generation = &config.generation;

    let event = match stage {
        Stage::Words => {
            let live = collaborators
                .text
                .map(|text| LiveWordSource::new(text, &generation.text_model));
            let primary = live.as_ref().map(|s| s as &dyn WordSource);
            let report = write_words(
                primary,
                &FallbackVocabulary,
                &config.topic,
                config.count,
                &words_path,
            )
            .map_err(|e| fail(e.into()))?;
            PipelineEvent::Words(report)
        }
        Stage::Grammar => {
            let report = verify_file(
                collaborators.text,
                &generation.grammar_model,
                &words_path,
                &words_path,
                None,
            )
            .map_err(|e| fail(e.into()))?;
            PipelineEvent::Grammar(report)
        }
        Stage::Illustrate => {
            let image = collaborators
                .image
                .ok_or(PipelineError::NoImageGenerator(stage))?;
            let report = illustrate_file(
                image,
                collaborators.renderer.backend,
                &words_path,
                &config.illustrations_dir,
                &config.illustrate,
            )
            .map_err(|e| fail(e.into()))?;
            PipelineEvent::Illustrate(report)
        }
        Stage::Overlay => {
            let report = overlay_file(
                collaborators.renderer,
                &words_path,
                &config.illustrations_dir,
                &config.output_dir,
                &config.overlay,
            )
            .map_err(|e| fail(e.into()))?;
            PipelineEvent::Overlay(report)
        }
        Stage::Caption => {
            let report = write_caption(
                collaborators.text,
                &generation.caption_model,
                &config.topic,
                &config.caption_path(),
            )
            .map_err(|e| fail(e.into()))?;
            PipelineEvent::Caption(report)
        }
    };
    Ok(event)
}
