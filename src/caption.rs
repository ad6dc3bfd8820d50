//! Social-media caption for a topic.
//!
//! Two lines, Finnish then English. Written next to the words file as
//! `caption_<topic>.txt`. Without a working collaborator a fixed caption is
//! used, so this stage only fails on I/O.

use crate::error::ErrorKind;
use crate::genai::prompts::caption_prompt;
use crate::genai::{TextGenerator, TextRequest};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

const FALLBACK_CAPTIONS: &[(&str, &str)] = &[
    (
        "furniture",
        "Sisusta kotisi tyylillä! 🛋️✨\nDecorate your home with style! 🛋️✨",
    ),
    ("weather", "Opi sääsanoja! ☀️🌧️\nLearn weather words! ☀️🌧️"),
];

const DEFAULT_CAPTION: &str = "Opi uutta sanastoa! 📚🇫🇮\nLearn new vocabulary! 📚🇫🇮";

#[derive(Error, Debug)]
pub enum CaptionError {
    #[error("failed to write caption: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptionError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::FileIoFailure
    }
}

/// The fixed caption for `topic`, or the generic one.
pub fn fallback_caption(topic: &str) -> &'static str {
    let key = topic.trim().to_lowercase();
    FALLBACK_CAPTIONS
        .iter()
        .find(|(t, _)| *t == key)
        .map(|(_, caption)| *caption)
        .unwrap_or(DEFAULT_CAPTION)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    pub text: String,
    pub generated: bool,
}

/// Ask the collaborator for a caption, falling back to the fixed table.
pub fn generate_caption(generator: Option<&dyn TextGenerator>, model: &str, topic: &str) -> Caption {
    let fallback = || Caption {
        text: fallback_caption(topic).to_string(),
        generated: false,
    };
    let Some(generator) = generator else {
        info!("no collaborator configured; using the fixed caption");
        return fallback();
    };
    let prompt = caption_prompt(topic);
    match generator.generate_text(&TextRequest::new(model, &prompt)) {
        Ok(text) if !text.trim().is_empty() => Caption {
            text: text.trim().to_string(),
            generated: true,
        },
        Ok(_) => {
            warn!("empty caption reply; using the fixed caption");
            fallback()
        }
        Err(e) => {
            warn!("caption generation failed ({}); using the fixed caption", e);
            fallback()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptionReport {
    pub path: PathBuf,
    pub caption: Caption,
}

/// Generate a caption and write it to `output`.
pub fn write_caption(
    generator: Option<&dyn TextGenerator>,
    model: &str,
    topic: &str,
    output: &Path,
) -> Result<CaptionReport, CaptionError> {
    let caption = generate_caption(generator, model, topic);
    if let Some(parent) = output.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output, format!("{}\n", caption.text))?;
    Ok(CaptionReport {
        path: output.to_path_buf(),
        caption,
    })
}
