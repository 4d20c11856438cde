//! Mapping reduced-resolution matches back to full-resolution coordinates.

/// Full-resolution horizontal center of a match found at `reduced_x` with a
/// template `reduced_width` pixels wide.
///
/// Computes `(reduced_x + reduced_width / 2) / scale` with an integer half
/// width, the inverse of the reduction applied to frames and templates.
pub fn to_full_res(reduced_x: usize, reduced_width: usize, scale: f32) -> f64 {
    (reduced_x + reduced_width / 2) as f64 / f64::from(scale)
}

#[cfg(test)]
mod tests {
    use super::to_full_res;

    #[test]
    fn inverts_quarter_scale() {
        assert_eq!(to_full_res(100, 16, 0.25), 432.0);
        assert_eq!(to_full_res(0, 1, 0.25), 0.0);
    }

    #[test]
    fn odd_widths_use_integer_half() {
        assert_eq!(to_full_res(10, 5, 0.5), 24.0);
    }

    #[test]
    fn unit_scale_is_identity_on_center() {
        assert_eq!(to_full_res(37, 10, 1.0), 42.0);
    }
}
