use ndarray::Array2;
use rayon::prelude::*;

use crate::error::{OverlayError, Result};
use crate::field::ScalarField;

/// Interpolation tap along one axis: two neighbour indices and the weight of
/// the second.
#[derive(Copy, Clone, Debug)]
struct Tap {
    i0: usize,
    i1: usize,
    frac: f32,
}

/// Half-pixel-centre taps for mapping `dst_len` samples onto `src_len`.
/// Coordinates outside the source clamp to the border sample.
fn axis_taps(src_len: usize, dst_len: usize) -> Vec<Tap> {
    let scale = src_len as f32 / dst_len as f32;
    let max = (src_len - 1) as f32;
    (0..dst_len)
        .map(|d| {
            let s = ((d as f32 + 0.5) * scale - 0.5).clamp(0.0, max);
            let i0 = s.floor() as usize;
            let i1 = (i0 + 1).min(src_len - 1);
            Tap { i0, i1, frac: s - i0 as f32 }
        })
        .collect()
}

/// Bilinear resize of `field` onto a `target_w x target_h` grid.
///
/// The result has `target_h` rows and `target_w` columns. Resampling a field
/// onto its own shape returns the input unchanged.
pub fn resample(field: &ScalarField, target_w: usize, target_h: usize) -> Result<ScalarField> {
    if target_w == 0 || target_h == 0 {
        return Err(OverlayError::InvalidTarget { width: target_w, height: target_h });
    }
    if field.is_empty() {
        return Err(OverlayError::EmptyField);
    }

    let src = field.values();
    let (src_rows, src_cols) = field.shape();
    let x_taps = axis_taps(src_cols, target_w);
    let y_taps = axis_taps(src_rows, target_h);

    let mut out = vec![0f32; target_w * target_h];
    out.par_chunks_mut(target_w)
        .zip(y_taps.par_iter())
        .for_each(|(row, ty)| {
            for (dst, tx) in row.iter_mut().zip(&x_taps) {
                let p00 = src[[ty.i0, tx.i0]];
                let p01 = src[[ty.i0, tx.i1]];
                let p10 = src[[ty.i1, tx.i0]];
                let p11 = src[[ty.i1, tx.i1]];
                let top = p00 + (p01 - p00) * tx.frac;
                let bottom = p10 + (p11 - p10) * tx.frac;
                *dst = top + (bottom - top) * ty.frac;
            }
        });

    let values = Array2::from_shape_vec((target_h, target_w), out)
        .map_err(|_| OverlayError::InvalidTarget { width: target_w, height: target_h })?;
    Ok(ScalarField::from_array(values))
}
