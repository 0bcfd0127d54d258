//! Aggregate statistics over a catalog snapshot.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::item::Catalog;

/// How many entries each frequency table keeps.
const TOP_N: usize = 10;

/// Brand values longer than this are truncated before counting.
const MAX_BRAND_CHARS: usize = 40;

/// One value/count pair in a frequency table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyEntry {
    /// The observed value.
    pub value: String,

    /// How many items carried it.
    pub count: u64,
}

/// Aggregate statistics derived from one catalog snapshot.
///
/// Recomputed per request; the computation is pure and deterministic, so
/// two calls over the same snapshot produce byte-identical summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    /// Total item count.
    pub count: u64,

    /// Arithmetic mean over items with a known price. `None` when no
    /// item has a parseable price.
    pub average_price: Option<f64>,

    /// Top brands by item count.
    pub top_brands: Vec<FrequencyEntry>,

    /// Top first-category values by item count.
    pub top_categories: Vec<FrequencyEntry>,
}

/// Compute aggregate statistics for a snapshot.
pub fn summarize(catalog: &Catalog) -> AnalyticsSummary {
    let prices: Vec<f64> = catalog.iter().filter_map(|i| i.price).collect();
    let average_price = if prices.is_empty() {
        None
    } else {
        Some(prices.iter().sum::<f64>() / prices.len() as f64)
    };

    let brands = catalog.iter().map(|i| truncate_chars(i.brand.trim(), MAX_BRAND_CHARS));
    let first_categories = catalog
        .iter()
        .map(|i| i.first_category().unwrap_or("").to_string());

    AnalyticsSummary {
        count: catalog.len() as u64,
        average_price,
        top_brands: top_frequencies(brands),
        top_categories: top_frequencies(first_categories),
    }
}

/// Count non-empty values and keep the most frequent ones.
///
/// Sorted by descending count; ties keep first-occurrence order so the
/// output is stable across identical inputs.
fn top_frequencies(values: impl Iterator<Item = String>) -> Vec<FrequencyEntry> {
    let mut counts: IndexMap<String, u64> = IndexMap::new();
    for value in values {
        if value.is_empty() {
            continue;
        }
        *counts.entry(value).or_insert(0) += 1;
    }

    let mut entries: Vec<FrequencyEntry> = counts
        .into_iter()
        .map(|(value, count)| FrequencyEntry { value, count })
        .collect();

    // Stable sort preserves insertion order among equal counts.
    entries.sort_by(|a, b| b.count.cmp(&a.count));
    entries.truncate(TOP_N);
    entries
}

fn truncate_chars(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}
