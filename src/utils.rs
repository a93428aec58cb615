//! Utility functions for the annotator window.

use slint::{Rgba8Pixel, SharedPixelBuffer};
use trade_annotator::error::AnnotatorResult;

/// Create a placeholder checkerboard image shown until the chart arrives
pub fn placeholder_image() -> slint::Image {
    let width = 64u32;
    let height = 64u32;
    let mut buffer = SharedPixelBuffer::<Rgba8Pixel>::new(width, height);
    let pixels = buffer.make_mut_slice();
    for y in 0..height {
        for x in 0..width {
            let v = if (x / 8 + y / 8) % 2 == 0 { 30 } else { 45 };
            pixels[(y * width + x) as usize] = Rgba8Pixel {
                r: v,
                g: v,
                b: v,
                a: 255,
            };
        }
    }
    slint::Image::from_rgba8(buffer)
}

/// Parse a hex color string (e.g., "#ff0000") to a Slint Color
pub fn parse_color(hex: &str) -> Option<slint::Color> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(slint::Color::from_rgb_u8(r, g, b))
}

/// A decoded chart image. The pixel buffer is `Send`, so decoding can happen
/// off the UI thread and the `slint::Image` is built on it.
pub struct DecodedChart {
    pub pixels: SharedPixelBuffer<Rgba8Pixel>,
    pub width: u32,
    pub height: u32,
}

pub fn decode_chart(bytes: &[u8]) -> AnnotatorResult<DecodedChart> {
    let rgba = image::load_from_memory(bytes)?.into_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedChart {
        pixels: SharedPixelBuffer::clone_from_slice(rgba.as_raw(), width, height),
        width,
        height,
    })
}
