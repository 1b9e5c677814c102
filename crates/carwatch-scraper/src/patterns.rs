//! Compiled regex catalog used by the field resolvers.
//!
//! Token key aliases and the plate pattern come from configuration; the
//! remaining patterns are fixed. Everything is compiled once per run and an
//! invalid override is reported as [`ScraperError::InvalidPattern`].

use carwatch_core::config::{DEFAULT_EXPIRY_KEYS, DEFAULT_HASH_KEYS};
use carwatch_core::AppConfig;
use regex::Regex;

use crate::error::ScraperError;

/// Ukrainian plate: two letters, four digits, two letters, optional spaces.
pub const DEFAULT_PLATE_PATTERN: &str = r"\b[A-ZА-ЯІЇЄ]{2}\s?\d{4}\s?[A-ZА-ЯІЇЄ]{2}\b";

/// Image host whose `<img>` sources count as listing photos.
pub const DEFAULT_IMAGE_CDN_HOST: &str = "cdn.riastatic.com";

const IMAGE_COUNT_KEYS: &[&str] = &[
    "countPhotos",
    "photosCount",
    "countPhoto",
    "photoCount",
    "count_images",
];

/// Raw, uncompiled overrides for [`ExtractionPatterns`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternConfig {
    pub plate_pattern: String,
    pub expiry_keys: Vec<String>,
    pub hash_keys: Vec<String>,
    pub image_cdn_host: String,
}

impl Default for PatternConfig {
    fn default() -> Self {
        Self {
            plate_pattern: DEFAULT_PLATE_PATTERN.to_owned(),
            expiry_keys: DEFAULT_EXPIRY_KEYS.iter().map(|k| (*k).to_owned()).collect(),
            hash_keys: DEFAULT_HASH_KEYS.iter().map(|k| (*k).to_owned()).collect(),
            image_cdn_host: DEFAULT_IMAGE_CDN_HOST.to_owned(),
        }
    }
}

impl PatternConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            plate_pattern: config
                .plate_pattern
                .clone()
                .unwrap_or_else(|| DEFAULT_PLATE_PATTERN.to_owned()),
            expiry_keys: config.token_expiry_keys.clone(),
            hash_keys: config.token_hash_keys.clone(),
            ..Self::default()
        }
    }
}

/// Every regex the resolvers need, in priority order where order matters.
#[derive(Debug, Clone)]
pub struct ExtractionPatterns {
    pub(crate) plate: Regex,
    pub(crate) expiry: Vec<Regex>,
    pub(crate) hash: Vec<Regex>,
    pub(crate) token_query: Regex,
    pub(crate) image_count: Vec<Regex>,
    pub(crate) usd_marker: Regex,
    pub(crate) usd_fields: Vec<Regex>,
    pub(crate) username: Vec<Regex>,
    pub(crate) auto_id: Regex,
    pub(crate) auto_id_in_url: Regex,
    pub(crate) image_cdn_host: String,
}

fn compile(name: &'static str, pattern: &str) -> Result<Regex, ScraperError> {
    Regex::new(pattern).map_err(|source| ScraperError::InvalidPattern { name, source })
}

impl ExtractionPatterns {
    /// Compiles the catalog.
    ///
    /// For each expiry alias `k` two patterns are produced, in this order:
    /// a plain `"k": 123` form and a backslash-escaped `\"k\": 123` form.
    /// Hash aliases get the same pair for quoted values (case-insensitive),
    /// followed by unquoted hex forms of the first alias.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::InvalidPattern`] if the plate override does not compile.
    pub fn compile(config: &PatternConfig) -> Result<Self, ScraperError> {
        let expiry_keys: Vec<String> = config.expiry_keys.iter().map(|k| regex::escape(k)).collect();
        let hash_keys: Vec<String> = config.hash_keys.iter().map(|k| regex::escape(k)).collect();

        let mut expiry = Vec::with_capacity(expiry_keys.len() * 2);
        for key in &expiry_keys {
            expiry.push(compile("expiry", &format!(r#""{key}"\s*:\s*(\d+)"#))?);
            expiry.push(compile("expiry", &format!(r#"\\?"{key}\\?"\s*:\s*(\d+)"#))?);
        }

        let mut hash = Vec::with_capacity(hash_keys.len() * 2 + 2);
        for key in &hash_keys {
            hash.push(compile("hash", &format!(r#"(?i)"{key}"\s*:\s*"([^"]+)""#))?);
            hash.push(compile(
                "hash",
                &format!(r#"(?i)\\?"{key}\\?"\s*:\s*\\?"([^"\\]+)\\?""#),
            )?);
        }
        if let Some(primary) = hash_keys.first() {
            hash.push(compile("hash", &format!(r#"(?i)"{primary}"\s*:\s*([a-f0-9]{{16,}})"#))?);
            hash.push(compile(
                "hash",
                &format!(r#"(?i)\\?"{primary}\\?"\s*:\s*([a-f0-9]{{16,}})"#),
            )?);
        }

        let token_query = compile(
            "token query",
            &format!(
                r"(?i)(?:{})=(\d+).*?(?:{})=([a-f0-9]{{16,}})",
                expiry_keys.join("|"),
                hash_keys.join("|")
            ),
        )?;

        let mut image_count: Vec<Regex> = IMAGE_COUNT_KEYS
            .iter()
            .map(|key| compile("image count", &format!(r#""{key}"\s*:\s*(\d+)"#)))
            .collect::<Result<_, _>>()?;
        image_count.push(compile(
            "image count",
            r#""photos"\s*:\s*\{\s*"count"\s*:\s*(\d+)"#,
        )?);

        Ok(Self {
            plate: compile("plate", &config.plate_pattern)?,
            expiry,
            hash,
            token_query,
            image_count,
            usd_marker: compile("price", r#""USD"\s*[:,]\s*"?(\d{2,7})"?"#)?,
            usd_fields: vec![
                compile("price", r#""priceUsd"\s*:\s*(\d+)"#)?,
                compile("price", r#""usdPrice"\s*:\s*(\d+)"#)?,
            ],
            username: vec![
                compile("username", r#"\["userName"\s*,\s*"([^"]+)"\]"#)?,
                compile("username", r#""userName"\s*:\s*"([^"]+)""#)?,
            ],
            auto_id: compile("auto id", r#""autoId"\s*:\s*(\d+)"#)?,
            auto_id_in_url: compile("auto id", r"_(\d+)\.html")?,
            image_cdn_host: config.image_cdn_host.clone(),
        })
    }
}

impl Default for ExtractionPatterns {
    fn default() -> Self {
        Self::compile(&PatternConfig::default()).expect("built-in patterns are valid")
    }
}
