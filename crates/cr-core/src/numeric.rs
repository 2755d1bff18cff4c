use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// Shortest round-trip rendering of a number as the engine parser expects it.
///
/// Integral values keep a trailing `.0` (`50000.0`, `-2.0`), very large or very
/// small magnitudes switch to exponent form (`2.953e19`).
pub fn fmt_real(v: Real) -> String {
    format!("{v:?}")
}

/// Fixed scientific notation with six fractional digits and a signed two-digit
/// exponent, e.g. `1.000000e+00` or `-2.500000e-03`.
pub fn fmt_sci6(v: Real) -> String {
    let raw = format!("{v:.6e}");
    match raw.split_once('e') {
        Some((mantissa, exp)) => {
            let exp: i32 = exp.parse().unwrap_or(0);
            let sign = if exp < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exp.abs())
        }
        // inf / NaN carry no exponent
        None => raw,
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn fmt_real_round_trips(v in -1.0e30_f64..1.0e30_f64) {
            let parsed: f64 = fmt_real(v).parse().unwrap();
            prop_assert_eq!(parsed, v);
        }

        #[test]
        fn fmt_sci6_parses_back_within_precision(v in 1.0e-20_f64..1.0e20_f64) {
            let parsed: f64 = fmt_sci6(v).parse().unwrap();
            prop_assert!(((parsed - v) / v).abs() < 1.0e-6);
        }
    }
}
