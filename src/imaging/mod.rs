//! Card imaging without external tools.
//!
//! | Operation | How |
//! |---|---|
//! | **Identify** | `image::image_dimensions` |
//! | **Compose** | decode + Lanczos3 fit into the illustration slot on a white canvas |
//! | **Render** | `imageproc::drawing::draw_text_mut` over a computed layout |
//! | **Measure** | `ab_glyph` advances and kerning via [`FontSet`] |
//!
//! Slot and fit geometry lives in `calculations` and is tested without
//! touching pixels. [`ComposeParams`] and [`RenderParams`] describe one
//! operation each; [`FontSet`] doubles as the production text measurer.

pub mod backend;
mod calculations;
pub mod fonts;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, Dimensions, ImageBackend};
pub use calculations::{centered_offset, fit_within, illustration_slot, placement_in_slot};
pub use fonts::FontSet;
pub use params::{ComposeParams, RenderParams};
pub use rust_backend::RustBackend;
