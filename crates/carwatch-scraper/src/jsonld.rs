//! Structured vehicle data embedded as schema.org JSON-LD.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

static JSONLD_SCRIPT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?is)<script[^>]+type\s*=\s*["']application/ld\+json["'][^>]*>(.*?)</script>"#)
        .expect("valid regex")
});

/// The best-scoring `Vehicle` object on a page, or an empty one when the
/// page has none.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StructuredVehicle {
    fields: Map<String, Value>,
}

impl StructuredVehicle {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns the value of `key` when it is a non-blank string.
    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Completeness score: commercial offer 3, VIN 2, odometer 2, image 1.
#[must_use]
pub fn vehicle_score(object: &Map<String, Value>) -> u32 {
    let mut score = 0;
    if object.contains_key("offers") {
        score += 3;
    }
    if object.contains_key("vehicleIdentificationNumber") || object.contains_key("vin") {
        score += 2;
    }
    if object.contains_key("mileageFromOdometer") {
        score += 2;
    }
    if object.contains_key("image") {
        score += 1;
    }
    score
}

fn is_vehicle(object: &Map<String, Value>) -> bool {
    match object.get("@type") {
        Some(Value::String(t)) => t == "Vehicle",
        Some(Value::Array(types)) => types.iter().any(|t| t.as_str() == Some("Vehicle")),
        _ => false,
    }
}

/// Scans every JSON-LD block in `html` and returns the highest-scoring
/// `Vehicle` object. Ties keep the earliest candidate in document order.
/// Blocks that are not valid JSON are skipped.
#[must_use]
pub fn best_vehicle(html: &str) -> StructuredVehicle {
    let mut best: Option<(u32, Map<String, Value>)> = None;

    for cap in JSONLD_SCRIPT_RE.captures_iter(html) {
        let Some(body) = cap.get(1) else { continue };
        let Ok(value) = serde_json::from_str::<Value>(body.as_str().trim()) else {
            tracing::debug!("skipping malformed JSON-LD block");
            continue;
        };

        let mut candidates: Vec<Value> = match value {
            Value::Array(items) => items,
            other => vec![other],
        };
        let graph: Vec<Value> = candidates
            .iter()
            .filter_map(|item| item.get("@graph").and_then(Value::as_array))
            .flatten()
            .cloned()
            .collect();
        candidates.extend(graph);

        for candidate in candidates {
            let Value::Object(object) = candidate else { continue };
            if !is_vehicle(&object) {
                continue;
            }
            let score = vehicle_score(&object);
            if best.as_ref().is_none_or(|(top, _)| score > *top) {
                best = Some((score, object));
            }
        }
    }

    best.map(|(_, fields)| StructuredVehicle { fields })
        .unwrap_or_default()
}
