//! Shared test utilities for the kielo test suite.
//!
//! Provides sample entries, scripted fake collaborators, and small image
//! fixtures so stage tests never touch the network.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let text = FakeTextGenerator::replying(&["CORRECT", "CORRECT"]);
//! let report = verify_words(Some(&text), "model", weather_words());
//! assert_eq!(text.prompts().len(), 2);
//! ```

use std::collections::VecDeque;
use std::sync::Mutex;

use image::{ImageEncoder, RgbImage};

use crate::genai::{GenAiError, ImageGenerator, ImageRequest, TextGenerator, TextRequest};
use crate::types::{WordEntry, WordList};

// =========================================================================
// Sample data
// =========================================================================

pub fn entry(word: &str, translation: &str, example: &str, example_translation: &str) -> WordEntry {
    WordEntry::new(word, translation, example, example_translation)
}

/// Three complete weather entries.
pub fn weather_words() -> WordList {
    WordList::from(vec![
        entry("aurinko", "sun", "Aurinko paistaa tänään.", "The sun shines today."),
        entry("sade", "rain", "Sade kastelee pihan.", "The rain waters the yard."),
        entry("lumi", "snow", "Lumi sulaa keväällä.", "Snow melts in spring."),
    ])
}

/// A 503, which every stage treats as "collaborator unavailable".
pub fn unavailable() -> GenAiError {
    GenAiError::Api {
        status: 503,
        message: "service unavailable".to_string(),
    }
}

// =========================================================================
// Image fixtures
// =========================================================================

/// Encode a solid-ish gradient as PNG bytes.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 200])
    });
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
    bytes
}

// =========================================================================
// Fake collaborators
// =========================================================================

/// Text collaborator that replays scripted replies in order and records
/// every prompt. Runs dry with `EmptyContent`.
#[derive(Default)]
pub struct FakeTextGenerator {
    replies: Mutex<VecDeque<Result<String, GenAiError>>>,
    prompts: Mutex<Vec<String>>,
}

impl FakeTextGenerator {
    pub fn replying(replies: &[&str]) -> Self {
        Self::with_results(replies.iter().map(|r| Ok(r.to_string())).collect())
    }

    pub fn with_results(results: Vec<Result<String, GenAiError>>) -> Self {
        Self {
            replies: Mutex::new(results.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Fails every call as unavailable.
    pub fn down(calls: usize) -> Self {
        Self::with_results((0..calls).map(|_| Err(unavailable())).collect())
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TextGenerator for FakeTextGenerator {
    fn generate_text(&self, request: &TextRequest<'_>) -> Result<String, GenAiError> {
        self.prompts.lock().unwrap().push(request.prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(GenAiError::EmptyContent))
    }
}

/// Image collaborator that replays scripted results, then falls back to a
/// small valid PNG for every further call.
#[derive(Default)]
pub struct FakeImageGenerator {
    results: Mutex<VecDeque<Result<Vec<u8>, GenAiError>>>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(results: Vec<Result<Vec<u8>, GenAiError>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `(prompt, aspect_ratio)` of every request so far.
    pub fn requests(&self) -> Vec<(String, String)> {
        self.requests.lock().unwrap().clone()
    }
}

impl ImageGenerator for FakeImageGenerator {
    fn generate_image(&self, request: &ImageRequest<'_>) -> Result<Vec<u8>, GenAiError> {
        self.requests
            .lock()
            .unwrap()
            .push((request.prompt.to_string(), request.aspect_ratio.to_string()));
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(png_bytes(16, 16)))
    }
}
