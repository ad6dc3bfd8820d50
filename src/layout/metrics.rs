//! Text measurement seam.
//!
//! The layout engine never touches a font file. It asks a [`TextMeasurer`]
//! for advance widths and line heights; production uses
//! [`FontSet`](crate::imaging::FontSet), tests use [`FixedAdvance`].

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FontWeight {
    Regular,
    Bold,
}

impl fmt::Display for FontWeight {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FontWeight::Regular => f.write_str("regular"),
            FontWeight::Bold => f.write_str("bold"),
        }
    }
}

pub trait TextMeasurer {
    /// Horizontal advance of `text` set on one line at `size` pixels,
    /// including kerning.
    fn text_width(&self, text: &str, size: f32, weight: FontWeight) -> f32;

    /// Natural line height (ascent minus descent) at `size` pixels.
    fn line_height(&self, size: f32, weight: FontWeight) -> f32;
}

/// Monospace stand-in: every char advances `advance × size`, bold adds
/// `bold_extra × size`, and a line is exactly `size` tall.
#[cfg(test)]
#[derive(Debug, Clone, Copy)]
pub struct FixedAdvance {
    pub advance: f32,
    pub bold_extra: f32,
}

#[cfg(test)]
impl Default for FixedAdvance {
    fn default() -> Self {
        Self {
            advance: 0.6,
            bold_extra: 0.05,
        }
    }
}

#[cfg(test)]
impl TextMeasurer for FixedAdvance {
    fn text_width(&self, text: &str, size: f32, weight: FontWeight) -> f32 {
        let per_char = match weight {
            FontWeight::Regular => self.advance,
            FontWeight::Bold => self.advance + self.bold_extra,
        };
        text.chars().count() as f32 * per_char * size
    }

    fn line_height(&self, size: f32, _weight: FontWeight) -> f32 {
        size
    }
}
