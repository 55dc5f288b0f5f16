/// Gamma for the two colormap scale sliders.
///
/// `|(2*scale1)^3 / 8| * 2^(((scale2 + 1) / 2) * 10) + 1`, inverted when
/// `scale1` is negative. Both sliders at zero give gamma 1.
pub fn gamma_from_scales(scale1: f64, scale2: f64) -> f64 {
    const MAX_DIGITS: f64 = 10.0;
    let exponent = 2f64.powf((scale2 + 1.0) / 2.0 * MAX_DIGITS);
    let cubed = (scale1 * 2.0).powi(3) / 8.0;
    let gamma = cubed.abs() * exponent + 1.0;
    if scale1 < 0.0 { 1.0 / gamma } else { gamma }
}

/// Rounds `value` to `digits` significant digits. Returns `value` unchanged
/// when the rounding factor would overflow.
pub fn round_to_digits(value: f64, digits: i32) -> f64 {
    if value == 0.0 || !value.is_finite() || digits <= 0 {
        return value;
    }
    let magnitude = value.abs().log10().floor() as i32;
    let shift = digits.saturating_sub(1).saturating_sub(magnitude);
    let factor = 10f64.powi(shift.saturating_abs());
    let scaled = if shift >= 0 { value * factor } else { value / factor };
    if !factor.is_finite() || !scaled.is_finite() {
        return value;
    }
    let rounded = if shift >= 0 { scaled.round() / factor } else { scaled.round() * factor };
    if rounded.is_finite() { rounded } else { value }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neutral_scales_give_unit_gamma() {
        assert_eq!(gamma_from_scales(0.0, 0.0), 1.0);
    }

    #[test]
    fn negative_scale_inverts() {
        let up = gamma_from_scales(0.5, 0.0);
        let down = gamma_from_scales(-0.5, 0.0);
        assert!((up - 5.0).abs() < 1e-12);
        assert!((down - 0.2).abs() < 1e-12);
    }

    #[test]
    fn rounding_keeps_significant_digits() {
        assert_eq!(round_to_digits(3.14159, 3), 3.14);
        assert_eq!(round_to_digits(0.0012345, 2), 0.0012);
        assert_eq!(round_to_digits(12345.0, 2), 12000.0);
        assert_eq!(round_to_digits(0.0, 6), 0.0);
    }

    #[test]
    fn huge_digit_counts_leave_value_alone() {
        assert_eq!(round_to_digits(2.2, 400), 2.2);
        assert_eq!(round_to_digits(1e300, i32::MAX), 1e300);
        assert!(round_to_digits(3.14159, 20).is_finite());
    }

    #[test]
    fn extreme_second_scale_overflows() {
        assert!(!gamma_from_scales(0.5, 1000.0).is_finite());
    }
}
