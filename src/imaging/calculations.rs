//! Pure calculation functions for card geometry.
//!
//! All functions here are pure and testable without any I/O or images.

use crate::layout::Rect;

/// Largest size with the source's aspect ratio that fits inside `bounds`.
///
/// Scales up as well as down; neither side is ever zero.
///
/// # Examples
/// ```
/// # use kielo::imaging::fit_within;
/// // Square source into a square slot → exactly the slot
/// assert_eq!(fit_within((1024, 1024), (640, 640)), (640, 640));
///
/// // Landscape source → width matches, height shrinks
/// assert_eq!(fit_within((1600, 900), (640, 640)), (640, 360));
/// ```
pub fn fit_within(source: (u32, u32), bounds: (u32, u32)) -> (u32, u32) {
    let (src_w, src_h) = source;
    let (max_w, max_h) = bounds;
    if src_w == 0 || src_h == 0 {
        return (max_w.max(1), max_h.max(1));
    }

    let scale = (max_w as f64 / src_w as f64).min(max_h as f64 / src_h as f64);
    let w = ((src_w as f64 * scale).round() as u32).clamp(1, max_w.max(1));
    let h = ((src_h as f64 * scale).round() as u32).clamp(1, max_h.max(1));
    (w, h)
}

/// Offset that centers `inner` within `outer` (zero if it does not fit).
pub fn centered_offset(outer: u32, inner: u32) -> u32 {
    outer.saturating_sub(inner) / 2
}

/// The square slot an illustration occupies on the card.
///
/// The side is the shorter canvas side minus `margin` on both ends; the slot
/// is centered on both axes. On the default 720×1440 canvas with a 40px
/// margin that is a 640px square at (40, 400).
pub fn illustration_slot(canvas_width: u32, canvas_height: u32, margin: u32) -> Rect {
    let side = canvas_width
        .min(canvas_height)
        .saturating_sub(margin.saturating_mul(2));
    Rect {
        x: centered_offset(canvas_width, side),
        y: centered_offset(canvas_height, side),
        width: side,
        height: side,
    }
}

/// Where an image of `size` lands when fitted and centered inside `slot`.
pub fn placement_in_slot(size: (u32, u32), slot: Rect) -> Rect {
    let (width, height) = fit_within(size, (slot.width, slot.height));
    Rect {
        x: slot.x + centered_offset(slot.width, width),
        y: slot.y + centered_offset(slot.height, height),
        width,
        height,
    }
}
