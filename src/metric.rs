//! Distance helpers.

/// Squared Euclidean distance `Σ (a[i] - b[i])²`.
///
/// No normalization is applied; both slices must have the same length.
#[inline]
pub fn squared_l2(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    a.iter()
        .zip(b)
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_squared_l2_known_values() {
        assert_eq!(squared_l2(&[0.0, 0.0], &[3.0, 4.0]), 25.0);
        assert_eq!(squared_l2(&[1.5, -2.0, 7.0], &[1.5, -2.0, 7.0]), 0.0);
    }

    #[test]
    fn test_squared_l2_is_symmetric() {
        let a = [0.25, -1.0, 3.5];
        let b = [2.0, 0.5, -0.75];
        assert_eq!(squared_l2(&a, &b), squared_l2(&b, &a));
    }
}
