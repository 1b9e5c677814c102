//! Reveal-endpoint credentials embedded in listing pages.

use super::PageContext;
use crate::patterns::ExtractionPatterns;

const MIN_HASH_LEN: usize = 10;

/// Expiry and hash pair authorizing one call to the phone reveal endpoint.
///
/// Not `Clone`: a token is moved into the single request that spends it.
#[derive(Debug, PartialEq, Eq)]
pub struct RevealToken {
    expires: String,
    hash: String,
}

impl RevealToken {
    /// Validates a raw pair: `expires` must be all digits and the trimmed
    /// `hash` at least ten characters long.
    #[must_use]
    pub fn new(expires: &str, hash: &str) -> Option<Self> {
        let expires = expires.trim();
        if expires.is_empty() || !expires.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        let hash = hash.trim();
        if hash.chars().count() < MIN_HASH_LEN {
            return None;
        }
        Some(Self {
            expires: expires.to_owned(),
            hash: hash.to_owned(),
        })
    }

    #[must_use]
    pub fn expires(&self) -> &str {
        &self.expires
    }

    #[must_use]
    pub fn hash(&self) -> &str {
        &self.hash
    }
}

/// Finds the reveal token in raw page HTML.
///
/// The keyed expiry and hash patterns are tried in catalog order. When
/// either half is still missing, a query-string form
/// (`expires=...&hash=...`) is consulted and fills only the missing half.
#[must_use]
pub fn extract_reveal_token(html: &str, patterns: &ExtractionPatterns) -> Option<RevealToken> {
    let first_match = |regexes: &[regex::Regex]| {
        regexes.iter().find_map(|re| {
            re.captures(html)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_owned())
        })
    };

    let mut expires = first_match(&patterns.expiry);
    let mut hash = first_match(&patterns.hash);

    if expires.is_none() || hash.is_none() {
        if let Some(caps) = patterns.token_query.captures(html) {
            if expires.is_none() {
                expires = caps.get(1).map(|m| m.as_str().to_owned());
            }
            if hash.is_none() {
                hash = caps.get(2).map(|m| m.as_str().to_owned());
            }
        }
    }

    RevealToken::new(&expires?, &hash?)
}

/// Numeric listing id: an embedded `autoId`, else the `_<digits>.html`
/// suffix of the structured `@id` or `url`.
#[must_use]
pub fn extract_auto_id(ctx: &PageContext<'_>) -> Option<i64> {
    auto_id_from_state(ctx.html, ctx.patterns).or_else(|| {
        ["@id", "url"].iter().find_map(|key| {
            let link = ctx.vehicle.str_field(key)?;
            ctx.patterns
                .auto_id_in_url
                .captures(link)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse().ok())
        })
    })
}

fn auto_id_from_state(html: &str, patterns: &ExtractionPatterns) -> Option<i64> {
    patterns
        .auto_id
        .captures(html)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}
