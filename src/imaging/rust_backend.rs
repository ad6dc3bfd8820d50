//! Pure Rust image processing backend.
//!
//! Everything is statically linked into the binary.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG, WebP) | `image::load_from_memory` / `ImageReader` |
//! | Resize into the slot | `image::imageops::resize` with `Lanczos3` filter |
//! | Paste onto the canvas | `image::imageops::overlay` |
//! | Draw text | `imageproc::drawing::draw_text_mut` with `ab_glyph` fonts |
//! | Encode → PNG | `image::RgbaImage::save_with_format` |

use super::backend::{BackendError, Dimensions, ImageBackend};
use super::calculations::placement_in_slot;
use super::fonts::FontSet;
use super::params::{ComposeParams, RenderParams};
use crate::layout::{CardLayout, Rect};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, ImageReader, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use std::path::Path;
use tracing::debug;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// Pure Rust backend using the `image` crate ecosystem.
///
/// Composing needs no fonts; rendering text does. A backend built with
/// [`RustBackend::new`] fails `render` with [`BackendError::FontNotFound`].
#[derive(Debug, Default)]
pub struct RustBackend<'f> {
    fonts: Option<&'f FontSet>,
}

impl<'f> RustBackend<'f> {
    pub fn new() -> Self {
        Self { fonts: None }
    }

    pub fn with_fonts(fonts: &'f FontSet) -> Self {
        Self { fonts: Some(fonts) }
    }
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)?
        .with_guessed_format()?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// A white canvas with `image` fitted and centered inside `slot`.
fn compose_canvas(image: &DynamicImage, width: u32, height: u32, slot: Rect) -> RgbaImage {
    let placed = placement_in_slot((image.width(), image.height()), slot);
    let resized = imageops::resize(
        &image.to_rgba8(),
        placed.width,
        placed.height,
        FilterType::Lanczos3,
    );
    let mut canvas = RgbaImage::from_pixel(width, height, BACKGROUND);
    imageops::overlay(&mut canvas, &resized, placed.x as i64, placed.y as i64);
    canvas
}

fn draw_layout(canvas: &mut RgbaImage, fonts: &FontSet, layout: &CardLayout) {
    for (block, line) in layout.lines() {
        let [r, g, b] = block.color.0;
        draw_text_mut(
            canvas,
            Rgba([r, g, b, 255]),
            line.x.round() as i32,
            line.y.round() as i32,
            fonts.px_scale(block.size, block.weight),
            fonts.face(block.weight),
            &line.text,
        );
    }
}

fn save_png(image: &RgbaImage, path: &Path) -> Result<(), BackendError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    image.save_with_format(path, ImageFormat::Png)?;
    Ok(())
}

impl ImageBackend for RustBackend<'_> {
    fn identify(&self, path: &Path) -> Result<Dimensions, BackendError> {
        let (width, height) = image::image_dimensions(path).map_err(|e| {
            BackendError::ProcessingFailed(format!("Failed to read dimensions: {}", e))
        })?;
        Ok(Dimensions { width, height })
    }

    fn compose(&self, params: &ComposeParams) -> Result<(), BackendError> {
        let image = image::load_from_memory(&params.image)
            .map_err(|e| BackendError::Decode(e.to_string()))?;
        debug!(
            "composing {}x{} illustration into {}",
            image.width(),
            image.height(),
            params.slot
        );
        let canvas = compose_canvas(&image, params.canvas_width, params.canvas_height, params.slot);
        save_png(&canvas, &params.output)
    }

    fn render(&self, params: &RenderParams<'_>) -> Result<(), BackendError> {
        let fonts = self
            .fonts
            .ok_or_else(|| BackendError::FontNotFound("no fonts loaded".to_string()))?;
        let source = load_image(&params.source)?;
        let mut canvas =
            if (source.width(), source.height()) == (params.canvas_width, params.canvas_height) {
                source.to_rgba8()
            } else {
                debug!(
                    "{} is {}x{}, re-composing onto the card canvas",
                    params.source.display(),
                    source.width(),
                    source.height()
                );
                compose_canvas(&source, params.canvas_width, params.canvas_height, params.slot)
            };
        draw_layout(&mut canvas, fonts, params.layout);
        save_png(&canvas, &params.output)
    }
}
