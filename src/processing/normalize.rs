use ndarray::Array2;

use crate::field::ScalarField;

/// Upper bound of the normalized visual range.
pub const V_MAX: u8 = 255;

/// Field rescaled to `[0, V_MAX]` together with the observed source range.
#[derive(Clone, Debug, PartialEq)]
pub struct Normalized {
    pub values: Array2<u8>,
    pub observed_min: f32,
    pub observed_max: f32,
}

/// Min/max over finite samples; `(0.0, 0.0)` when there are none.
fn finite_range(field: &ScalarField) -> (f32, f32) {
    let mut min = f32::INFINITY;
    let mut max = f32::NEG_INFINITY;
    for &v in field.values().iter().filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min > max {
        (0.0, 0.0)
    } else {
        (min, max)
    }
}

/// Min-max normalization onto `[0, V_MAX]`.
///
/// A flat field (`min == max`) maps to all zeros. Non-finite samples do not
/// take part in the range and normalize to 0.
pub fn normalize(field: &ScalarField) -> Normalized {
    let (min, max) = finite_range(field);
    let range = max - min;

    let values = if range > 0.0 {
        let scale = V_MAX as f32 / range;
        field.values().mapv(|v| {
            if v.is_finite() {
                ((v - min) * scale).round().clamp(0.0, V_MAX as f32) as u8
            } else {
                0
            }
        })
    } else {
        Array2::zeros(field.shape())
    };

    Normalized { values, observed_min: min, observed_max: max }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_min_max_map_to_range_ends() {
        let field = ScalarField::from_flat(vec![10.0, 20.0, 30.0, 40.0], (2, 2)).unwrap();
        let n = normalize(&field);
        assert_eq!(n.values[[0, 0]], 0);
        assert_eq!(n.values[[1, 1]], V_MAX);
        assert_eq!(n.values[[0, 1]], 85);
        assert_eq!(n.values[[1, 0]], 170);
        assert_eq!((n.observed_min, n.observed_max), (10.0, 40.0));
    }

    #[test]
    fn test_degenerate_fields_are_zero() {
        for fill in [0.0f32, 36.6, -4.0] {
            let field = ScalarField::from_flat(vec![fill; 12], (3, 4)).unwrap();
            let n = normalize(&field);
            assert!(n.values.iter().all(|&v| v == 0), "fill {}", fill);
            assert_eq!(n.observed_min, n.observed_max);
        }
    }

    #[test]
    fn test_rounding_is_deterministic() {
        let field = ScalarField::from_flat(vec![0.0, 0.5, 1.0], (1, 3)).unwrap();
        let a = normalize(&field);
        let b = normalize(&field);
        assert_eq!(a, b);
        // 0.5 * 255 = 127.5 rounds away from zero.
        assert_eq!(a.values[[0, 1]], 128);
    }

    #[test]
    fn test_nan_samples_ignored() {
        let field = ScalarField::from_flat(vec![f32::NAN, 5.0, 15.0, f32::INFINITY], (2, 2)).unwrap();
        let n = normalize(&field);
        assert_eq!((n.observed_min, n.observed_max), (5.0, 15.0));
        assert_eq!(n.values[[0, 0]], 0);
        assert_eq!(n.values[[0, 1]], 0);
        assert_eq!(n.values[[1, 0]], V_MAX);
        assert_eq!(n.values[[1, 1]], 0);
    }
}
