use crate::error::{OverlayError, Result};
use crate::field::ScalarField;

/// Maximum of a coarse field: grid cell and raw value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hotspot {
    pub row: usize,
    pub col: usize,
    pub value: f32,
}

/// Hotspot mapped into resampled (pixel) space.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct HotspotLocation {
    pub x: usize,
    pub y: usize,
    /// Raw, non-normalized maximum.
    pub value: f32,
}

/// Find the maximum sample, scanning row-major; the first occurrence wins ties.
///
/// NaN samples never win. A field with no comparable sample reports cell
/// (0, 0) with its raw value.
pub fn locate(field: &ScalarField) -> Result<Hotspot> {
    if field.is_empty() {
        return Err(OverlayError::EmptyField);
    }

    let cols = field.cols();
    let mut best: Option<(usize, f32)> = None;
    for (idx, &v) in field.values().iter().enumerate() {
        if v.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if v <= b => {}
            _ => best = Some((idx, v)),
        }
    }

    let (idx, value) = best.unwrap_or((0, field.get(0, 0)));
    Ok(Hotspot { row: idx / cols, col: idx % cols, value })
}

impl Hotspot {
    /// Map the cell centre onto a `target_w x target_h` grid resampled from a
    /// `src_rows x src_cols` field.
    pub fn project(&self, src_rows: usize, src_cols: usize, target_w: usize, target_h: usize) -> HotspotLocation {
        HotspotLocation {
            x: project_axis(self.col, src_cols, target_w),
            y: project_axis(self.row, src_rows, target_h),
            value: self.value,
        }
    }
}

fn project_axis(index: usize, src_len: usize, dst_len: usize) -> usize {
    if src_len == 0 || dst_len == 0 {
        return 0;
    }
    let centre = (index as f64 + 0.5) * dst_len as f64 / src_len as f64;
    (centre.floor() as usize).min(dst_len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unique_maximum() {
        let field = ScalarField::from_flat(vec![1.0, 2.0, 3.0, 9.0, 4.0, 5.0], (2, 3)).unwrap();
        let h = locate(&field).unwrap();
        assert_eq!((h.row, h.col, h.value), (1, 0, 9.0));
    }

    #[test]
    fn test_tie_breaks_row_major_first() {
        let field = ScalarField::from_rows(&[vec![1.0, 5.0], vec![5.0, 2.0]]).unwrap();
        let h = locate(&field).unwrap();
        assert_eq!((h.row, h.col), (0, 1));

        // At native resolution the projected pixel is the cell itself: x = 1, y = 0.
        let loc = h.project(2, 2, 2, 2);
        assert_eq!((loc.x, loc.y), (1, 0));
        assert_eq!(loc.value, 5.0);
    }

    #[test]
    fn test_nan_never_wins() {
        let field = ScalarField::from_flat(vec![f32::NAN, 3.0, f32::NAN, 1.0], (2, 2)).unwrap();
        let h = locate(&field).unwrap();
        assert_eq!((h.row, h.col, h.value), (0, 1, 3.0));
    }

    #[test]
    fn test_negative_values() {
        let field = ScalarField::from_flat(vec![-7.0, -2.5, -3.0], (1, 3)).unwrap();
        let h = locate(&field).unwrap();
        assert_eq!((h.col, h.value), (1, -2.5));
    }

    #[test]
    fn test_project_upsampled() {
        let h = Hotspot { row: 1, col: 1, value: 40.0 };
        let loc = h.project(2, 2, 4, 4);
        assert_eq!((loc.x, loc.y), (3, 3));

        let h = Hotspot { row: 0, col: 31, value: 0.0 };
        let loc = h.project(24, 32, 640, 480);
        assert_eq!((loc.x, loc.y), (630, 10));
    }

    #[test]
    fn test_project_downsampled_stays_in_bounds() {
        let h = Hotspot { row: 23, col: 31, value: 0.0 };
        let loc = h.project(24, 32, 3, 2);
        assert!(loc.x < 3 && loc.y < 2);
    }
}
