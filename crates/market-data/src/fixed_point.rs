//! Fixed-point decoding
//!
//! The data node encodes decimals as an integer string plus a number of
//! decimal places held elsewhere (market or asset). Scaling happens on an
//! arbitrary-precision decimal; only the final value is rounded to `f64`.

use bigdecimal::BigDecimal;
use observability::record_parse_failure;
use std::str::FromStr;
use tracing::debug;

/// Decode `raw / 10^decimal_places`, or `0.0` when `raw` is not a number.
pub fn decode(raw: &str, decimal_places: u64) -> f64 {
    decode_field(raw, decimal_places, "value")
}

/// [`decode`] with the field name reported on parse failure.
///
/// An empty string is an absent value and decodes to zero silently; any
/// other unparsable input is counted in `market_data_parse_failures_total`.
pub fn decode_field(raw: &str, decimal_places: u64, field: &'static str) -> f64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return 0.0;
    }

    match scale_down(raw, decimal_places) {
        Some(value) => value,
        None => {
            debug!(field, raw, decimal_places, "Unparsable fixed-point value, using 0");
            record_parse_failure(field);
            0.0
        }
    }
}

/// Decode an integer-typed upstream field.
pub fn decode_integer(value: u128, decimal_places: u64) -> f64 {
    decode(&value.to_string(), decimal_places)
}

fn scale_down(raw: &str, decimal_places: u64) -> Option<f64> {
    if !raw
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'-' | b'+' | b'.'))
    {
        return None;
    }

    let value = BigDecimal::from_str(raw).ok()?;
    let (digits, scale) = value.into_bigint_and_exponent();
    let scale = scale.checked_add(i64::try_from(decimal_places).ok()?)?;

    // Rust's float parser rounds correctly, so going through the exact
    // decimal text avoids a second rounding step.
    BigDecimal::new(digits, scale).to_string().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_integer_strings() {
        assert_eq!(decode("123456789", 4), 12345.6789);
        assert_eq!(decode("100", 0), 100.0);
        assert_eq!(decode("5", 3), 0.005);
        assert_eq!(decode("0", 18), 0.0);
    }

    #[test]
    fn test_decode_matches_division_for_small_values() {
        for v in [0u64, 1, 7, 42, 1_000, 123_456, 9_999_999] {
            for d in 0..8u32 {
                let expected = v as f64 / 10f64.powi(d as i32);
                let got = decode(&v.to_string(), d as u64);
                assert!(
                    (got - expected).abs() <= expected.abs() * f64::EPSILON,
                    "decode({v}, {d}) = {got}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_decode_large_values_without_double_rounding() {
        let exact: f64 = "123456789012.345678901234567890".parse().unwrap();
        assert_eq!(decode("123456789012345678901234567890", 18), exact);

        let exact: f64 = "0.000000000000000001".parse().unwrap();
        assert_eq!(decode("1", 18), exact);
    }

    #[test]
    fn test_decode_accepts_signed_and_fractional() {
        assert_eq!(decode("-250", 2), -2.5);
        assert_eq!(decode("1.5", 1), 0.15);
    }

    #[test]
    fn test_unparsable_is_zero() {
        assert_eq!(decode("", 2), 0.0);
        assert_eq!(decode("abc", 2), 0.0);
        assert_eq!(decode("1e5", 0), 0.0);
        assert_eq!(decode("12-3", 0), 0.0);
    }

    #[test]
    fn test_decode_integer() {
        assert_eq!(decode_integer(3, 0), 3.0);
        assert_eq!(decode_integer(1500, 3), 1.5);
        assert_eq!(decode_integer(u128::from(u64::MAX) * 4, 0), 73786976294838206460.0);
    }
}
