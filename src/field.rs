use ndarray::Array2;

use crate::error::{OverlayError, Result};

/// Dense grid of real-valued sensor samples, `rows x cols`, row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarField {
    values: Array2<f32>,
}

impl ScalarField {
    /// Reshape a flat sample sequence into a `(rows, cols)` grid.
    ///
    /// The wire format is not self-describing, so `values.len()` must equal
    /// `rows * cols` exactly. A shape whose sample count overflows `usize` is
    /// a shape error.
    pub fn from_flat(values: Vec<f32>, shape: (usize, usize)) -> Result<Self> {
        let (rows, cols) = shape;
        if rows == 0 || cols == 0 {
            return Err(OverlayError::EmptyField);
        }
        let expected = rows.checked_mul(cols).ok_or(OverlayError::FieldShape {
            rows,
            cols,
            expected: usize::MAX,
            actual: values.len(),
        })?;
        if values.len() != expected {
            return Err(OverlayError::FieldShape {
                rows,
                cols,
                expected,
                actual: values.len(),
            });
        }
        let values = Array2::from_shape_vec(shape, values).map_err(|_| OverlayError::FieldShape {
            rows,
            cols,
            expected,
            actual: expected,
        })?;
        Ok(ScalarField { values })
    }

    /// Build a field from nested rows; all rows must have the same length.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        let flat: Vec<f32> = rows.iter().flatten().copied().collect();
        ScalarField::from_flat(flat, (rows.len(), cols))
    }

    pub fn from_array(values: Array2<f32>) -> Self {
        ScalarField { values }
    }

    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn cols(&self) -> usize {
        self.values.ncols()
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        self.values.dim()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> f32 {
        self.values[[row, col]]
    }

    pub fn values(&self) -> &Array2<f32> {
        &self.values
    }

    /// Maximum over finite samples, `None` when there are none.
    pub fn max(&self) -> Option<f32> {
        self.values
            .iter()
            .copied()
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| Some(acc.map_or(v, |m: f32| m.max(v))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_row_major() {
        let field = ScalarField::from_flat(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], (2, 3)).unwrap();
        assert_eq!(field.shape(), (2, 3));
        assert_eq!(field.get(0, 2), 3.0);
        assert_eq!(field.get(1, 0), 4.0);
    }

    #[test]
    fn test_from_flat_length_mismatch() {
        let err = ScalarField::from_flat(vec![1.0; 5], (2, 3)).unwrap_err();
        assert_eq!(
            err,
            OverlayError::FieldShape { rows: 2, cols: 3, expected: 6, actual: 5 }
        );
    }

    #[test]
    fn test_overflowing_shape_rejected() {
        let err = ScalarField::from_flat(vec![], (usize::MAX, 2)).unwrap_err();
        assert_eq!(
            err,
            OverlayError::FieldShape { rows: usize::MAX, cols: 2, expected: usize::MAX, actual: 0 }
        );
        // A product that would wrap to a small count must not pass the length check.
        let half = usize::MAX / 2 + 1;
        assert!(ScalarField::from_flat(vec![0.0; 4], (half, 4)).is_err());
    }

    #[test]
    fn test_empty_shape_rejected() {
        assert_eq!(ScalarField::from_flat(vec![], (0, 4)), Err(OverlayError::EmptyField));
        assert_eq!(ScalarField::from_rows(&[]), Err(OverlayError::EmptyField));
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = ScalarField::from_rows(&[vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_max_skips_nan() {
        let field = ScalarField::from_flat(vec![f32::NAN, 2.0, 7.5, 1.0], (2, 2)).unwrap();
        assert_eq!(field.max(), Some(7.5));
        let all_nan = ScalarField::from_flat(vec![f32::NAN; 2], (1, 2)).unwrap();
        assert_eq!(all_nan.max(), None);
    }
}
