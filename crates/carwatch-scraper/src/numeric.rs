//! Lenient integer parsing for loosely typed listing data.

use serde_json::Value;

/// Parses a number or numeric string into an integer.
///
/// Strings have ordinary and non-breaking spaces removed and a decimal comma
/// treated as a decimal point. Fractions are truncated toward zero. Anything
/// unparseable, non-finite or out of `i64` range yields `None`.
#[must_use]
pub fn lenient_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(truncate)),
        Value::String(s) => lenient_int_str(s),
        _ => None,
    }
}

/// String form of [`lenient_int`].
#[must_use]
pub fn lenient_int_str(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| *c != ' ' && *c != '\u{a0}')
        .map(|c| if c == ',' { '.' } else { c })
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned
        .parse::<i64>()
        .ok()
        .or_else(|| cleaned.parse::<f64>().ok().and_then(truncate))
}

/// Same as [`lenient_int`], narrowed to `i32` for the stored columns.
#[must_use]
pub fn lenient_i32(value: &Value) -> Option<i32> {
    lenient_int(value).and_then(|v| i32::try_from(v).ok())
}

#[allow(clippy::cast_possible_truncation)]
fn truncate(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let truncated = value.trunc();
    // i64::MAX is not exactly representable; compare against 2^63.
    if truncated < -9_223_372_036_854_775_808.0 || truncated >= 9_223_372_036_854_775_808.0 {
        return None;
    }
    Some(truncated as i64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_plain_and_spaced_strings() {
        assert_eq!(lenient_int_str("12500"), Some(12_500));
        assert_eq!(lenient_int_str("12 500"), Some(12_500));
        assert_eq!(lenient_int_str("12\u{a0}500"), Some(12_500));
    }

    #[test]
    fn decimal_comma_is_truncated() {
        assert_eq!(lenient_int_str("1,9"), Some(1));
        assert_eq!(lenient_int_str("-3.7"), Some(-3));
    }

    #[test]
    fn garbage_and_empty_yield_none() {
        assert_eq!(lenient_int_str(""), None);
        assert_eq!(lenient_int_str("   "), None);
        assert_eq!(lenient_int_str("12k"), None);
        assert_eq!(lenient_int_str("NaN"), None);
        assert_eq!(lenient_int_str("inf"), None);
    }

    #[test]
    fn json_numbers_and_strings() {
        assert_eq!(lenient_int(&json!(15000)), Some(15_000));
        assert_eq!(lenient_int(&json!(15000.9)), Some(15_000));
        assert_eq!(lenient_int(&json!("15 000")), Some(15_000));
        assert_eq!(lenient_int(&json!(null)), None);
        assert_eq!(lenient_int(&json!({"value": 1})), None);
    }

    #[test]
    fn i32_narrowing_rejects_overflow() {
        assert_eq!(lenient_i32(&json!(2_147_483_647_i64)), Some(i32::MAX));
        assert_eq!(lenient_i32(&json!(2_147_483_648_i64)), None);
    }
}
