//! Text rendering for card labels.

use std::path::Path;

use ab_glyph::{FontVec, PxScale};
use font8x8::{UnicodeFonts, BASIC_FONTS};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;

/// Glyph edge of the built-in bitmap font.
const BITMAP_GLYPH: u32 = 8;

/// Font used for all text on a card.
pub enum CardFont {
    /// Built-in 8×8 bitmap glyphs, scaled by whole pixels.
    Bitmap,
    /// TrueType/OpenType font loaded from disk.
    Outline(FontVec),
}

impl CardFont {
    /// Load an outline font, falling back to the bitmap font.
    pub fn load(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return CardFont::Bitmap;
        };

        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!("Cannot read font {:?}: {}; using bitmap font", path, e);
                return CardFont::Bitmap;
            }
        };

        match FontVec::try_from_vec(bytes) {
            Ok(font) => {
                tracing::info!("Loaded card font from {:?}", path);
                CardFont::Outline(font)
            }
            Err(e) => {
                tracing::warn!("Invalid font {:?}: {}; using bitmap font", path, e);
                CardFont::Bitmap
            }
        }
    }

    /// Width and height of `text` rendered at `size` pixels.
    pub fn measure(&self, size: f32, text: &str) -> (u32, u32) {
        match self {
            CardFont::Bitmap => {
                let glyph = BITMAP_GLYPH * bitmap_scale(size);
                (glyph * text.chars().count() as u32, glyph)
            }
            CardFont::Outline(font) => text_size(PxScale::from(size), font, text),
        }
    }

    /// Draw `text` with its top-left corner at (`x`, `y`). Pixels outside the canvas are dropped.
    pub fn draw(
        &self,
        canvas: &mut RgbImage,
        color: Rgb<u8>,
        x: i32,
        y: i32,
        size: f32,
        text: &str,
    ) {
        match self {
            CardFont::Bitmap => draw_bitmap_text(canvas, color, x, y, bitmap_scale(size), text),
            CardFont::Outline(font) => {
                draw_text_mut(canvas, color, x, y, PxScale::from(size), font, text)
            }
        }
    }
}

fn bitmap_scale(size: f32) -> u32 {
    ((size / 16.0) as u32).max(1)
}

fn draw_bitmap_text(canvas: &mut RgbImage, color: Rgb<u8>, x: i32, y: i32, scale: u32, text: &str) {
    let advance = (BITMAP_GLYPH * scale) as i32;

    for (index, ch) in text.chars().enumerate() {
        let glyph = BASIC_FONTS
            .get(ch)
            .or_else(|| BASIC_FONTS.get('?'))
            .unwrap_or([0; 8]);
        let origin_x = x + index as i32 * advance;

        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..BITMAP_GLYPH {
                // Bit 0 is the leftmost pixel
                if bits & (1 << col) == 0 {
                    continue;
                }
                let px = origin_x + (col * scale) as i32;
                let py = y + (row as u32 * scale) as i32;
                draw_filled_rect_mut(canvas, Rect::at(px, py).of_size(scale, scale), color);
            }
        }
    }
}
