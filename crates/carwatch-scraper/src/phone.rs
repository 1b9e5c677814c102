//! Phone number normalization to the canonical `380XXXXXXXXX` integer form.

use std::sync::LazyLock;

use regex::Regex;

const COUNTRY_CODE: &str = "38";
const NATIONAL_LEN: usize = 10;
const INTERNATIONAL_LEN: usize = 12;

/// Loose match for a phone number anywhere in rendered page text.
static LOOSE_PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+?38)?0?\d{9}").expect("valid regex"));
static EMBEDDED_INTERNATIONAL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"38\d{10}").expect("valid regex"));

fn digits_only(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

/// Prefixes the country code to a ten-digit national number starting with `0`.
fn with_country_code(digits: String) -> String {
    if digits.len() == NATIONAL_LEN && digits.starts_with('0') {
        format!("{COUNTRY_CODE}{digits}")
    } else {
        digits
    }
}

/// Normalizes a phone string returned by the reveal endpoint.
///
/// Non-digits are dropped and a national number gains the country code.
/// Fewer than ten digits is treated as no phone.
#[must_use]
pub fn normalize_endpoint_phone(raw: &str) -> Option<i64> {
    let digits = with_country_code(digits_only(raw));
    if digits.len() < NATIONAL_LEN {
        return None;
    }
    digits.parse().ok()
}

/// Normalizes phone text read from a rendered page.
///
/// Stricter than [`normalize_endpoint_phone`]: the result must be a twelve
/// digit number starting with the country code, either directly or as a
/// run embedded in the digit string.
#[must_use]
pub fn normalize_rendered_phone(raw: &str) -> Option<i64> {
    let digits = with_country_code(digits_only(raw));
    if digits.len() == INTERNATIONAL_LEN && digits.starts_with(COUNTRY_CODE) {
        return digits.parse().ok();
    }
    EMBEDDED_INTERNATIONAL_RE
        .find(&digits)
        .and_then(|m| m.as_str().parse().ok())
}

/// Scans arbitrary markup for the first loose phone match that normalizes.
#[must_use]
pub fn find_phone_in_markup(markup: &str) -> Option<i64> {
    LOOSE_PHONE_RE
        .find_iter(markup)
        .find_map(|m| normalize_rendered_phone(m.as_str()))
}
