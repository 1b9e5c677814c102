//! Field resolution as ordered strategy chains.
//!
//! Each listing field is described by a [`FieldChain`]: a named list of
//! strategies tried in order, where the first one returning `Some` wins.

pub mod fields;
pub mod token;

use scraper::Html;

use crate::jsonld::StructuredVehicle;
use crate::patterns::ExtractionPatterns;

pub use token::{extract_auto_id, extract_reveal_token, RevealToken};

/// Everything a strategy may inspect on one listing page.
pub struct PageContext<'a> {
    pub html: &'a str,
    pub vehicle: &'a StructuredVehicle,
    pub document: &'a Html,
    pub patterns: &'a ExtractionPatterns,
}

/// A single way of deriving a field value from a page.
pub type Strategy<T> = fn(&PageContext<'_>) -> Option<T>;

/// Ordered strategies for one field.
pub struct FieldChain<T: 'static> {
    pub field: &'static str,
    pub strategies: &'static [(&'static str, Strategy<T>)],
}

impl<T> FieldChain<T> {
    /// Runs the strategies in order and returns the first value found.
    pub fn resolve(&self, ctx: &PageContext<'_>) -> Option<T> {
        for (name, strategy) in self.strategies {
            if let Some(value) = strategy(ctx) {
                tracing::trace!(field = self.field, strategy = *name, "field resolved");
                return Some(value);
            }
        }
        None
    }
}
