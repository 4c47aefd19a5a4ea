use rayon::prelude::*;

use crate::annotate::{annotate_hotspot, LabelStyle, MarkerStyle};
use crate::error::{OverlayError, Result};
use crate::frame::Frame;
use crate::processing::hotspot::HotspotLocation;

/// Blend weight and overlay styling applied by [`composite`].
#[derive(Clone, Debug, PartialEq)]
pub struct CompositeStyle {
    /// Weight of the color field; the base frame gets `1 - alpha`.
    pub alpha: f32,
    pub marker: MarkerStyle,
    pub label: LabelStyle,
}

impl Default for CompositeStyle {
    fn default() -> Self {
        CompositeStyle {
            alpha: 0.5,
            marker: MarkerStyle::default(),
            label: LabelStyle::default(),
        }
    }
}

fn check_dimensions(base: &Frame, overlay: &Frame) -> Result<()> {
    if base.dimensions() != overlay.dimensions() {
        return Err(OverlayError::FrameMismatch {
            base_width: base.width(),
            base_height: base.height(),
            overlay_width: overlay.width(),
            overlay_height: overlay.height(),
        });
    }
    Ok(())
}

/// Channel-wise `alpha * overlay + (1 - alpha) * base`, rounded and clamped.
pub fn blend(base: &Frame, overlay: &Frame, alpha: f32) -> Result<Frame> {
    check_dimensions(base, overlay)?;

    let alpha = alpha.clamp(0.0, 1.0);
    let beta = 1.0 - alpha;
    let mut out = base.clone();

    const CHUNK: usize = 8192 * 3;
    out.data_mut()
        .par_chunks_mut(CHUNK)
        .zip(overlay.data().par_chunks(CHUNK))
        .for_each(|(dst, src)| {
            for (d, &s) in dst.iter_mut().zip(src) {
                let v = alpha * s as f32 + beta * *d as f32;
                *d = v.round().clamp(0.0, 255.0) as u8;
            }
        });

    Ok(out)
}

/// Blend the colorized field over `base`, then draw the hotspot marker and
/// value label. `base` is left untouched; a new frame is returned.
pub fn composite(
    base: &Frame,
    color_field: &Frame,
    hotspot: &HotspotLocation,
    style: &CompositeStyle,
) -> Result<Frame> {
    let mut out = blend(base, color_field, style.alpha)?;
    annotate_hotspot(&mut out, hotspot, &style.marker, &style.label);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 64;
    const H: usize = 48;

    fn hotspot() -> HotspotLocation {
        HotspotLocation { x: 50, y: 35, value: 40.0 }
    }

    /// Pixels far from both the ring (radius 10 around (50, 35)) and the
    /// label strip at the top-left.
    fn untouched_region() -> impl Iterator<Item = (usize, usize)> {
        (0..W).flat_map(|x| (0..H).map(move |y| (x, y))).filter(|&(x, y)| {
            let dx = x as f32 - 50.0;
            let dy = y as f32 - 35.0;
            let far_from_ring = (dx * dx + dy * dy).sqrt() > 13.0;
            let below_label = y > 20;
            far_from_ring && below_label
        })
    }

    #[test]
    fn test_dimension_mismatch_is_error() {
        let base = Frame::filled(4, 4, [0, 0, 0]).unwrap();
        let color = Frame::filled(4, 3, [0, 0, 0]).unwrap();
        let err = composite(&base, &color, &HotspotLocation { x: 0, y: 0, value: 0.0 }, &CompositeStyle::default())
            .unwrap_err();
        assert_eq!(
            err,
            OverlayError::FrameMismatch { base_width: 4, base_height: 4, overlay_width: 4, overlay_height: 3 }
        );
    }

    #[test]
    fn test_alpha_zero_keeps_base() {
        let base = Frame::filled(W, H, [128, 64, 32]).unwrap();
        let color = Frame::filled(W, H, [0, 0, 255]).unwrap();
        let style = CompositeStyle { alpha: 0.0, ..Default::default() };
        let out = composite(&base, &color, &hotspot(), &style).unwrap();
        for (x, y) in untouched_region() {
            assert_eq!(out.pixel(x, y), [128, 64, 32]);
        }
        assert_eq!(out.pixel(60, 35), [255, 0, 0], "ring pixel");
    }

    #[test]
    fn test_alpha_one_keeps_color_field() {
        let base = Frame::filled(W, H, [128, 64, 32]).unwrap();
        let color = Frame::filled(W, H, [0, 0, 255]).unwrap();
        let style = CompositeStyle { alpha: 1.0, ..Default::default() };
        let out = composite(&base, &color, &hotspot(), &style).unwrap();
        for (x, y) in untouched_region() {
            assert_eq!(out.pixel(x, y), [0, 0, 255]);
        }
    }

    #[test]
    fn test_half_alpha_rounds() {
        let base = Frame::filled(2, 1, [128, 128, 128]).unwrap();
        let color = Frame::filled(2, 1, [0, 255, 1]).unwrap();
        let out = blend(&base, &color, 0.5).unwrap();
        // 64.0, 191.5 -> 192, 64.5 -> 65
        assert_eq!(out.pixel(0, 0), [64, 192, 65]);
    }

    #[test]
    fn test_base_not_mutated() {
        let base = Frame::filled(W, H, [10, 20, 30]).unwrap();
        let color = Frame::filled(W, H, [200, 200, 200]).unwrap();
        let _ = composite(&base, &color, &hotspot(), &CompositeStyle::default()).unwrap();
        assert_eq!(base, Frame::filled(W, H, [10, 20, 30]).unwrap());
    }

    #[test]
    fn test_label_drawn_near_top_left() {
        let base = Frame::filled(W, H, [0, 0, 0]).unwrap();
        let style = CompositeStyle {
            alpha: 0.0,
            label: LabelStyle { color: [1, 2, 3], ..Default::default() },
            ..Default::default()
        };
        let out = composite(&base, &base, &hotspot(), &style).unwrap();
        let label_pixels = (10..W)
            .flat_map(|x| (10..18).map(move |y| (x, y)))
            .filter(|&(x, y)| out.pixel(x, y) == [1, 2, 3])
            .count();
        assert!(label_pixels > 0);
    }
}
