//! Font loading and glyph metrics.
//!
//! A [`FontSet`] holds the regular and bold faces used on every card. It is
//! both the production [`TextMeasurer`] for the layout engine and the source
//! of glyphs for [`RustBackend`](super::RustBackend), so what is measured is
//! exactly what is drawn.
//!
//! Sizes are em sizes in pixels: a 48px font has an em square 48px tall.
//! `ab_glyph` scales by ascent-to-descent height instead, so [`FontSet::px_scale`]
//! converts between the two.

use super::backend::BackendError;
use crate::config::FontsConfig;
use crate::layout::{FontWeight, TextMeasurer};
use ab_glyph::{Font, FontVec, GlyphId, PxScale, ScaleFont};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Well-known system locations, regular face first, bold second.
const SYSTEM_FONT_CANDIDATES: &[(&str, &str)] = &[
    (
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/dejavu/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/TTF/DejaVuSans.ttf",
        "/usr/share/fonts/TTF/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans.ttf",
        "/usr/share/fonts/dejavu-sans-fonts/DejaVuSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Bold.ttf",
    ),
    (
        "/usr/share/fonts/liberation-sans/LiberationSans-Regular.ttf",
        "/usr/share/fonts/liberation-sans/LiberationSans-Bold.ttf",
    ),
    (
        "/System/Library/Fonts/Supplemental/Arial.ttf",
        "/System/Library/Fonts/Supplemental/Arial Bold.ttf",
    ),
    ("/Library/Fonts/Arial.ttf", "/Library/Fonts/Arial Bold.ttf"),
    ("C:\\Windows\\Fonts\\arial.ttf", "C:\\Windows\\Fonts\\arialbd.ttf"),
];

/// Regular and bold faces plus a content hash identifying them.
pub struct FontSet {
    regular: FontVec,
    bold: FontVec,
    identity: String,
}

impl std::fmt::Debug for FontSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontSet")
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

fn read_font(path: &Path) -> Result<(FontVec, Vec<u8>), BackendError> {
    let bytes = std::fs::read(path)?;
    let font = FontVec::try_from_vec(bytes.clone())
        .map_err(|_| BackendError::FontInvalid(path.to_path_buf()))?;
    Ok((font, bytes))
}

impl FontSet {
    /// Load fonts from explicit files. Without `bold` the regular face is
    /// used for both weights.
    pub fn from_files(regular: &Path, bold: Option<&Path>) -> Result<Self, BackendError> {
        let (regular_font, regular_bytes) = read_font(regular)?;
        let (bold_font, bold_bytes) = match bold {
            Some(path) => read_font(path)?,
            None => read_font(regular)?,
        };

        let mut hasher = Sha256::new();
        hasher.update(&regular_bytes);
        hasher.update(&bold_bytes);
        let identity = format!("{:x}", hasher.finalize());

        debug!("loaded fonts {} (bold: {:?})", regular.display(), bold);
        Ok(Self {
            regular: regular_font,
            bold: bold_font,
            identity,
        })
    }

    /// Configured fonts if `[fonts] regular` is set, system fonts otherwise.
    pub fn load(config: &FontsConfig) -> Result<Self, BackendError> {
        match &config.regular {
            Some(regular) => Self::from_files(regular, config.bold.as_deref()),
            None => Self::discover(),
        }
    }

    /// First installed font from a list of common system locations.
    pub fn discover() -> Result<Self, BackendError> {
        for (regular, bold) in SYSTEM_FONT_CANDIDATES {
            let regular = PathBuf::from(regular);
            if !regular.is_file() {
                continue;
            }
            let bold = PathBuf::from(bold);
            let bold = bold.is_file().then_some(bold);
            info!("using system font {}", regular.display());
            return Self::from_files(&regular, bold.as_deref());
        }
        let tried: Vec<&str> = SYSTEM_FONT_CANDIDATES.iter().map(|(r, _)| *r).collect();
        Err(BackendError::FontNotFound(tried.join(", ")))
    }

    /// SHA-256 over both font files; part of the overlay cache key.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn face(&self, weight: FontWeight) -> &FontVec {
        match weight {
            FontWeight::Regular => &self.regular,
            FontWeight::Bold => &self.bold,
        }
    }

    /// `ab_glyph` scale for an em size of `size` pixels.
    pub fn px_scale(&self, size: f32, weight: FontWeight) -> PxScale {
        let font = self.face(weight);
        let units_per_em = font.units_per_em().unwrap_or(1000.0);
        PxScale::from(size * font.height_unscaled() / units_per_em)
    }
}

impl TextMeasurer for FontSet {
    fn text_width(&self, text: &str, size: f32, weight: FontWeight) -> f32 {
        let font = self.face(weight).as_scaled(self.px_scale(size, weight));
        let mut width = 0.0;
        let mut previous: Option<GlyphId> = None;
        for c in text.chars() {
            let id = font.glyph_id(c);
            if let Some(prev) = previous {
                width += font.kern(prev, id);
            }
            width += font.h_advance(id);
            previous = Some(id);
        }
        width
    }

    fn line_height(&self, size: f32, weight: FontWeight) -> f32 {
        let font = self.face(weight).as_scaled(self.px_scale(size, weight));
        font.ascent() - font.descent()
    }
}
