//! Fixed-point probability encoding in parts-per-million.
//!
//! Availability and reliability targets are stored as integers in
//! `0..=1_000_000` and converted to fractions only where the checker
//! composes them. `from_decimal_digits` accepts the legacy encoding
//! where `99` means `0.99` and `999` means `0.999`.

/// One million ppm == probability 1.0.
pub const SCALE: u32 = 1_000_000;

/// Convert a ppm value to a fraction in `0.0..=1.0`.
pub fn fraction(ppm: u32) -> f64 {
    f64::from(ppm.min(SCALE)) / f64::from(SCALE)
}

/// Convert a fraction to ppm, clamping to `0.0..=1.0`.
pub fn from_fraction(value: f64) -> u32 {
    let clamped = value.clamp(0.0, 1.0);
    (clamped * f64::from(SCALE)).round() as u32
}

/// Convert the legacy "decimal digits after `0.`" encoding to ppm.
///
/// `99` → 990_000 (0.99), `999` → 999_000 (0.999), `0` → 0.
/// Values with more than six digits are clamped to `SCALE`.
pub fn from_decimal_digits(digits: u32) -> u32 {
    if digits == 0 {
        return 0;
    }
    let mut scaled = digits;
    while scaled < SCALE / 10 {
        scaled *= 10;
    }
    scaled.min(SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fraction_round_trips() {
        assert_eq!(from_fraction(0.99), 990_000);
        assert_eq!(from_fraction(0.999), 999_000);
        assert!((fraction(990_000) - 0.99).abs() < 1e-9);
        assert!((fraction(999_000) - 0.999).abs() < 1e-9);
    }

    #[test]
    fn fraction_clamps_out_of_range() {
        assert_eq!(from_fraction(1.5), SCALE);
        assert_eq!(from_fraction(-0.1), 0);
        assert_eq!(fraction(2_000_000), 1.0);
    }

    #[test]
    fn legacy_digits_scale_by_length() {
        assert_eq!(from_decimal_digits(9), 900_000);
        assert_eq!(from_decimal_digits(99), 990_000);
        assert_eq!(from_decimal_digits(999), 999_000);
        assert_eq!(from_decimal_digits(999_999), 999_999);
        assert_eq!(from_decimal_digits(0), 0);
    }
}
