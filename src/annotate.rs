//! Marker and label overlays burned into composited frames.

use font8x8::legacy::BASIC_LEGACY;

use crate::error::{OverlayError, Result};
use crate::frame::Frame;
use crate::processing::hotspot::HotspotLocation;

/// Glyph cell size of the bitmap font, in font pixels.
const GLYPH_SIZE: i32 = 8;

/// Unfilled circle drawn around the hotspot.
#[derive(Clone, Debug, PartialEq)]
pub struct MarkerStyle {
    /// Circle radius in output pixels.
    pub radius: u32,
    /// Ring thickness in output pixels.
    pub stroke_width: u32,
    pub color: [u8; 3],
}

impl Default for MarkerStyle {
    fn default() -> Self {
        MarkerStyle {
            radius: 10,
            stroke_width: 2,
            color: [255, 0, 0],
        }
    }
}

/// Text label showing the raw maximum.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelStyle {
    /// Text placed before the formatted value.
    pub prefix: String,
    pub color: [u8; 3],
    /// Integer magnification of the 8x8 font.
    pub scale: u32,
    /// Top-left corner of the first glyph.
    pub origin: (i32, i32),
}

impl Default for LabelStyle {
    fn default() -> Self {
        LabelStyle {
            prefix: "Max Temp: ".to_string(),
            color: [255, 0, 0],
            scale: 1,
            origin: (10, 10),
        }
    }
}

impl LabelStyle {
    pub fn text(&self, value: f32) -> String {
        format!("{}{}", self.prefix, hotspot_label(value))
    }
}

/// Raw value formatted to one decimal place.
pub fn hotspot_label(value: f32) -> String {
    format!("{:.1}", value)
}

/// Draw the hotspot ring and the value label onto `frame`.
pub fn annotate_hotspot(frame: &mut Frame, hotspot: &HotspotLocation, marker: &MarkerStyle, label: &LabelStyle) {
    draw_ring(
        frame,
        hotspot.x as i32,
        hotspot.y as i32,
        marker.radius as f32,
        marker.stroke_width as f32,
        marker.color,
    );
    draw_text(frame, label.origin.0, label.origin.1, &label.text(hotspot.value), label.color, label.scale);
}

// ── Point readings ──

/// A single pre-located reading: temperature at a normalized image position.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PointReading {
    pub temperature: f32,
    /// Horizontal position in `[0, 1]` of the frame width.
    pub norm_x: f32,
    /// Vertical position in `[0, 1]` of the frame height.
    pub norm_y: f32,
}

impl PointReading {
    /// Parse a `[temperature, norm_x, norm_y]` triple.
    pub fn from_flat(values: &[f32]) -> Result<Self> {
        match *values {
            [temperature, norm_x, norm_y] => Ok(PointReading { temperature, norm_x, norm_y }),
            _ => Err(OverlayError::FieldShape {
                rows: 1,
                cols: 3,
                expected: 3,
                actual: values.len(),
            }),
        }
    }

    /// Pixel position on a `width x height` frame.
    pub fn position(&self, width: usize, height: usize) -> (i32, i32) {
        (
            (self.norm_x * width as f32).floor() as i32,
            (self.norm_y * height as f32).floor() as i32,
        )
    }
}

/// Style of a point-reading mark.
#[derive(Clone, Debug, PartialEq)]
pub struct PointStyle {
    pub radius: u32,
    pub color: [u8; 3],
    pub label_color: [u8; 3],
    pub label_scale: u32,
}

impl Default for PointStyle {
    fn default() -> Self {
        PointStyle {
            radius: 5,
            color: [0, 255, 0],
            label_color: [255, 0, 0],
            label_scale: 1,
        }
    }
}

/// Copy of `frame` with a filled dot at the reading's position and its
/// temperature printed up and to the right of it.
pub fn mark_reading(frame: &Frame, reading: &PointReading, style: &PointStyle) -> Frame {
    let mut out = frame.clone();
    let (x, y) = reading.position(frame.width(), frame.height());
    fill_disc(&mut out, x, y, style.radius, style.color);

    let text = format!("{:.2}C", reading.temperature);
    let text_top = y - 10 - GLYPH_SIZE * style.label_scale as i32;
    draw_text(&mut out, x + 10, text_top, &text, style.label_color, style.label_scale);
    out
}

// ── Drawing primitives (private) ──

/// Ring of pixels whose centres lie within `stroke / 2` of the circle.
fn draw_ring(frame: &mut Frame, cx: i32, cy: i32, radius: f32, stroke: f32, color: [u8; 3]) {
    let half = stroke.max(1.0) / 2.0;
    let inner = (radius - half).max(0.0);
    let outer = radius + half;
    let reach = outer.ceil() as i32;

    for dy in -reach..=reach {
        for dx in -reach..=reach {
            let d = ((dx * dx + dy * dy) as f32).sqrt();
            if d >= inner && d < outer {
                frame.put(cx + dx, cy + dy, color);
            }
        }
    }
}

fn fill_disc(frame: &mut Frame, cx: i32, cy: i32, radius: u32, color: [u8; 3]) {
    let r = radius as i32;
    for dy in -r..=r {
        for dx in -r..=r {
            if dx * dx + dy * dy <= r * r {
                frame.put(cx + dx, cy + dy, color);
            }
        }
    }
}

fn glyph_for_char(ch: char) -> [u8; 8] {
    let index = ch as usize;
    if index < BASIC_LEGACY.len() {
        BASIC_LEGACY[index]
    } else {
        BASIC_LEGACY[b'?' as usize]
    }
}

/// Render `text` with the 8x8 bitmap font; off-frame pixels are clipped.
fn draw_text(frame: &mut Frame, x: i32, y: i32, text: &str, color: [u8; 3], scale: u32) {
    let scale = scale.max(1) as i32;
    let advance = GLYPH_SIZE * scale;

    for (i, ch) in text.chars().enumerate() {
        let glyph = glyph_for_char(ch);
        let gx = x + i as i32 * advance;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) == 0 {
                    continue;
                }
                for sy in 0..scale {
                    for sx in 0..scale {
                        frame.put(gx + col * scale + sx, y + row as i32 * scale + sy, color);
                    }
                }
            }
        }
    }
}
