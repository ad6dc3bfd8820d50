//! Text overlay layout.
//!
//! Places the four strings of a card around a centered illustration on a
//! fixed canvas so that nothing overflows the sides and nothing overlaps the
//! picture, however long the strings are.
//!
//! ```text
//! ┌──────────────────────┐
//! │         word         │  1.5×F bold      ┐ above-stack, centered in
//! │     translation      │  0.75×F regular  ┘ the band [0, rect.top]
//! │ ┌──────────────────┐ │
//! │ │   illustration   │ │
//! │ └──────────────────┘ │
//! │       example        │  F, auto-scaled  ┐ below-stack, centered in
//! │ example_translation  │  F, auto-scaled  ┘ the band [rect.bottom, H]
//! └──────────────────────┘
//! ```
//!
//! Every string is greedily wrapped to `W − 2P`. The two example strings are
//! first shrunk in `font_step` decrements towards `min_font_size` to try to
//! keep them on one line. If either stack is still too tall for its band
//! (including a gap of `P × s` on each side and between blocks), every size
//! and gap is multiplied by the next global scale `s` in
//! [`scale_schedule`] and the card is laid out again. The first scale that
//! fits wins; if even the smallest does not, the card is a
//! [`LayoutError::DoesNotFit`].
//!
//! Everything here is pure. Fonts come in through [`TextMeasurer`].

mod metrics;
mod wrap;

pub use metrics::{FontWeight, TextMeasurer};
pub use wrap::{single_line, wrap_greedy};

#[cfg(test)]
pub use metrics::FixedAdvance;

use crate::config::{CanvasConfig, LayoutConfig};
use crate::error::ErrorKind;
use crate::types::WordEntry;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// Decrement between global scale steps.
const SCALE_STEP: f32 = 0.05;

/// Steps closer than this to the minimum scale collapse into it.
const SCALE_TOLERANCE: f32 = 1e-4;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("invalid layout parameters: {0}")]
    InvalidSpec(String),
    #[error("illustration rect {rect} lies outside the {width}x{height} canvas")]
    RectOutOfBounds { rect: Rect, width: u32, height: u32 },
    #[error("text does not fit around the illustration even at scale {min_scale:.2}")]
    DoesNotFit { min_scale: f32 },
}

impl LayoutError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::LayoutFailure
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn from_hex(hex: u32) -> Self {
        Self([(hex >> 16) as u8, (hex >> 8) as u8, hex as u8])
    }
}

/// The four text roles, in stacking order from top to bottom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Word,
    Translation,
    Example,
    ExampleTranslation,
}

impl Role {
    pub const ALL: [Role; 4] = [
        Role::Word,
        Role::Translation,
        Role::Example,
        Role::ExampleTranslation,
    ];

    pub fn style(self) -> RoleStyle {
        match self {
            Role::Word => RoleStyle {
                size_factor: 1.5,
                weight: FontWeight::Bold,
                color: Rgb::from_hex(0x333333),
            },
            Role::Translation => RoleStyle {
                size_factor: 0.75,
                weight: FontWeight::Regular,
                color: Rgb::from_hex(0x777777),
            },
            Role::Example | Role::ExampleTranslation => RoleStyle {
                size_factor: 1.0,
                weight: FontWeight::Regular,
                color: Rgb::from_hex(0x4a5a8c),
            },
        }
    }

    /// Example sentences shrink towards the floor before anything else does.
    pub fn auto_scales(self) -> bool {
        matches!(self, Role::Example | Role::ExampleTranslation)
    }

    fn above_illustration(self) -> bool {
        matches!(self, Role::Word | Role::Translation)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Word => "word",
            Role::Translation => "translation",
            Role::Example => "example",
            Role::ExampleTranslation => "example_translation",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoleStyle {
    /// Font size relative to the base size F.
    pub size_factor: f32,
    pub weight: FontWeight,
    pub color: Rgb,
}

/// Axis-aligned pixel rectangle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn top(&self) -> u32 {
        self.y
    }

    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn right(&self) -> u32 {
        self.x + self.width
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

/// The four strings of one card.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CardText<'a> {
    pub word: &'a str,
    pub translation: &'a str,
    pub example: &'a str,
    pub example_translation: &'a str,
}

impl<'a> CardText<'a> {
    pub fn get(&self, role: Role) -> &'a str {
        match role {
            Role::Word => self.word,
            Role::Translation => self.translation,
            Role::Example => self.example,
            Role::ExampleTranslation => self.example_translation,
        }
    }
}

impl<'a> From<&'a WordEntry> for CardText<'a> {
    fn from(entry: &'a WordEntry) -> Self {
        Self {
            word: &entry.word,
            translation: &entry.translation,
            example: &entry.example,
            example_translation: &entry.example_translation,
        }
    }
}

/// Geometry and sizing for one card. Built per image, never persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutSpec {
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub padding: u32,
    pub font_size: u32,
    pub min_font_size: u32,
    pub font_step: u32,
    pub line_spacing: f32,
    pub illustration: Rect,
}

impl LayoutSpec {
    pub fn new(layout: &LayoutConfig, canvas: &CanvasConfig, illustration: Rect) -> Self {
        Self {
            canvas_width: canvas.width,
            canvas_height: canvas.height,
            padding: layout.padding,
            font_size: layout.font_size,
            min_font_size: layout.min_font_size,
            font_step: layout.font_step,
            line_spacing: layout.line_spacing,
            illustration,
        }
    }

    /// `W − 2P`; may be zero or negative for a degenerate spec.
    pub fn max_line_width(&self) -> f32 {
        self.canvas_width as f32 - 2.0 * self.padding as f32
    }

    fn validate(&self) -> Result<(), LayoutError> {
        let invalid = |msg: &str| Err(LayoutError::InvalidSpec(msg.to_string()));
        if self.canvas_width == 0 || self.canvas_height == 0 {
            return invalid("canvas has zero size");
        }
        if self.max_line_width() <= 0.0 {
            return invalid("padding leaves no room for text");
        }
        if self.font_size == 0 || self.min_font_size == 0 {
            return invalid("font sizes must be non-zero");
        }
        if self.font_step == 0 {
            return invalid("font step must be non-zero");
        }
        if !(self.line_spacing.is_finite() && self.line_spacing > 0.0) {
            return invalid("line spacing must be positive");
        }
        let rect = self.illustration;
        if rect.right() > self.canvas_width || rect.bottom() > self.canvas_height {
            return Err(LayoutError::RectOutOfBounds {
                rect,
                width: self.canvas_width,
                height: self.canvas_height,
            });
        }
        Ok(())
    }
}

/// One line of text, positioned. `(x, y)` is the top-left corner of the
/// glyph box; `width` is the measured advance.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedLine {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
}

/// All lines of one role at its final size.
#[derive(Debug, Clone, PartialEq)]
pub struct TextBlock {
    pub role: Role,
    pub size: f32,
    pub weight: FontWeight,
    pub color: Rgb,
    pub lines: Vec<PlacedLine>,
}

/// The computed placement of all four roles.
#[derive(Debug, Clone, PartialEq)]
pub struct CardLayout {
    /// Global scale that made the card fit.
    pub scale: f32,
    /// One block per role, in [`Role::ALL`] order.
    pub blocks: Vec<TextBlock>,
}

impl CardLayout {
    pub fn block(&self, role: Role) -> Option<&TextBlock> {
        self.blocks.iter().find(|b| b.role == role)
    }

    pub fn lines(&self) -> impl Iterator<Item = (&TextBlock, &PlacedLine)> {
        self.blocks
            .iter()
            .flat_map(|b| b.lines.iter().map(move |l| (b, l)))
    }
}

/// Global scales to try, largest first: 1.0, 0.95, … down to
/// `min_font_size / font_size`, which is always the last step.
pub fn scale_schedule(font_size: u32, min_font_size: u32) -> Vec<f32> {
    let s_min = min_font_size as f32 / font_size.max(1) as f32;
    let mut schedule: Vec<f32> = (0..)
        .map(|k| 1.0 - SCALE_STEP * k as f32)
        .take_while(|&s| s > s_min + SCALE_TOLERANCE && s > 0.0)
        .collect();
    if s_min < 1.0 {
        schedule.push(s_min);
    }
    if schedule.is_empty() {
        schedule.push(1.0);
    }
    schedule
}

/// Size and wrap one example string.
///
/// Starting at `start`, shrink by `step` until the text fits on one line
/// within `max_width` or `floor` is reached. At the floor the text is
/// wrapped. A start at or below the floor is wrapped as is.
pub fn auto_scale(
    measurer: &dyn TextMeasurer,
    text: &str,
    start: f32,
    floor: f32,
    step: f32,
    max_width: f32,
    weight: FontWeight,
) -> (f32, Vec<String>) {
    let wrap_at = |size: f32| {
        wrap_greedy(text, max_width, |s| measurer.text_width(s, size, weight))
    };
    let line = single_line(text);
    if line.is_empty() {
        return (start, Vec::new());
    }
    if start <= floor {
        return (start, wrap_at(start));
    }

    let mut size = start;
    loop {
        if measurer.text_width(&line, size, weight) <= max_width {
            return (size, vec![line]);
        }
        if size <= floor {
            return (floor, wrap_at(floor));
        }
        size = (size - step).max(floor);
    }
}

/// Lay out a card, shrinking globally until it fits.
pub fn layout_card(
    measurer: &dyn TextMeasurer,
    spec: &LayoutSpec,
    text: &CardText<'_>,
) -> Result<CardLayout, LayoutError> {
    spec.validate()?;
    let schedule = scale_schedule(spec.font_size, spec.min_font_size);
    for &scale in &schedule {
        if let Some(layout) = try_layout(measurer, spec, text, scale) {
            return Ok(layout);
        }
        debug!("card '{}' does not fit at scale {:.2}", text.word, scale);
    }
    Err(LayoutError::DoesNotFit {
        min_scale: schedule.last().copied().unwrap_or(1.0),
    })
}

/// A wrapped block before vertical placement.
struct SizedBlock {
    role: Role,
    style: RoleStyle,
    size: f32,
    lines: Vec<String>,
    /// Natural line height of the font at `size`.
    natural: f32,
    /// Distance between consecutive line tops.
    advance: f32,
}

impl SizedBlock {
    fn height(&self) -> f32 {
        self.lines.len() as f32 * self.advance
    }
}

fn size_block(
    measurer: &dyn TextMeasurer,
    spec: &LayoutSpec,
    role: Role,
    text: &str,
    scale: f32,
) -> SizedBlock {
    let style = role.style();
    let max_width = spec.max_line_width();
    let base = spec.font_size as f32 * style.size_factor * scale;
    let (size, lines) = if role.auto_scales() {
        auto_scale(
            measurer,
            text,
            base,
            spec.min_font_size as f32,
            spec.font_step as f32,
            max_width,
            style.weight,
        )
    } else {
        let lines = wrap_greedy(text, max_width, |s| {
            measurer.text_width(s, base, style.weight)
        });
        (base, lines)
    };
    let natural = measurer.line_height(size, style.weight);
    SizedBlock {
        role,
        style,
        size,
        lines,
        natural,
        advance: natural * spec.line_spacing,
    }
}

/// Height of a stack of blocks with `gap` between non-empty neighbours.
fn stack_height(blocks: &[&SizedBlock], gap: f32) -> f32 {
    let filled: Vec<f32> = blocks
        .iter()
        .map(|b| b.height())
        .filter(|&h| h > 0.0)
        .collect();
    if filled.is_empty() {
        return 0.0;
    }
    filled.iter().sum::<f32>() + gap * (filled.len() - 1) as f32
}

fn try_layout(
    measurer: &dyn TextMeasurer,
    spec: &LayoutSpec,
    text: &CardText<'_>,
    scale: f32,
) -> Option<CardLayout> {
    let gap = spec.padding as f32 * scale;
    let sized: Vec<SizedBlock> = Role::ALL
        .iter()
        .map(|&role| size_block(measurer, spec, role, text.get(role), scale))
        .collect();

    let (above, below): (Vec<&SizedBlock>, Vec<&SizedBlock>) =
        sized.iter().partition(|b| b.role.above_illustration());

    let rect = spec.illustration;
    let bands = [
        (0.0, rect.top() as f32),
        (rect.bottom() as f32, spec.canvas_height as f32),
    ];

    let mut tops = Vec::with_capacity(sized.len());
    for (stack, (band_start, band_end)) in [above, below].iter().zip(bands) {
        let height = stack_height(stack, gap);
        let band = band_end - band_start;
        if height > 0.0 && height + 2.0 * gap > band {
            return None;
        }
        let mut y = band_start + (band - height) / 2.0;
        for block in stack.iter() {
            tops.push(y);
            if block.height() > 0.0 {
                y += block.height() + gap;
            }
        }
    }

    let canvas_width = spec.canvas_width as f32;
    let blocks = sized
        .iter()
        .zip(tops)
        .map(|(block, top)| {
            let leading = (block.advance - block.natural) / 2.0;
            let lines = block
                .lines
                .iter()
                .enumerate()
                .map(|(i, line)| {
                    let width = measurer.text_width(line, block.size, block.style.weight);
                    PlacedLine {
                        text: line.clone(),
                        x: (canvas_width - width) / 2.0,
                        y: top + i as f32 * block.advance + leading,
                        width,
                    }
                })
                .collect();
            TextBlock {
                role: block.role,
                size: block.size,
                weight: block.style.weight,
                color: block.style.color,
                lines,
            }
        })
        .collect();

    Some(CardLayout { scale, blocks })
}
