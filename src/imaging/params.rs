//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the stages (which decide what images to create) and the
//! [`backend`](super::backend) (which does the actual pixel work), so tests
//! can swap in a mock backend without changing stage logic.
//!
//! - [`ComposeParams`]: put a freshly generated illustration on a blank card.
//! - [`RenderParams`]: draw a computed [`CardLayout`] onto an illustrated card.

use crate::layout::{CardLayout, Rect};
use std::path::PathBuf;

/// Place an encoded image (PNG, JPEG, WebP) centered in `slot` on a white
/// `canvas_width × canvas_height` canvas and save it as PNG.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposeParams {
    pub image: Vec<u8>,
    pub output: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slot: Rect,
}

/// Draw `layout` onto the card at `source` and save the result as PNG.
///
/// A source that is not `canvas_width × canvas_height` is first re-composed
/// into `slot` on a blank canvas so the layout's geometry holds.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams<'a> {
    pub source: PathBuf,
    pub output: PathBuf,
    pub canvas_width: u32,
    pub canvas_height: u32,
    pub slot: Rect,
    pub layout: &'a CardLayout,
}
