//! Catalog items and the immutable snapshot that owns them.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Delimiters used by the source data to join multi-value fields.
const LIST_DELIMITERS: [char; 3] = ['|', ',', '/'];

/// Currency symbols stripped before price parsing.
const CURRENCY_SYMBOLS: [char; 4] = ['₹', '$', '€', '£'];

/// One normalized catalog record.
///
/// Every field except `id` and `title` is optional in the source schema;
/// absent columns normalize to empty values so downstream code never has
/// to reason about missing columns.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogItem {
    /// Unique identifier, stable across rebuilds of the same dataset.
    pub id: String,

    /// Display title.
    pub title: String,

    /// Brand name (empty if unknown).
    pub brand: String,

    /// Free-text description from the source.
    pub description: String,

    /// Parsed price. `None` when the source value was absent or not a
    /// recognizable number.
    pub price: Option<f64>,

    /// Ordered category path segments.
    pub categories: Vec<String>,

    /// Ordered image references (filenames or absolute URLs). The first
    /// entry is conventionally treated as the primary image.
    pub images: Vec<String>,

    /// Manufacturer (empty if unknown).
    pub manufacturer: String,

    /// Raw package dimensions string.
    pub package_dimensions: String,

    /// Country of origin (empty if unknown).
    pub country_of_origin: String,

    /// Primary material (empty if unknown).
    pub material: String,

    /// Primary color (empty if unknown).
    pub color: String,
}

impl CatalogItem {
    /// Create an item with just an id and title, all other fields empty.
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            brand: String::new(),
            description: String::new(),
            price: None,
            categories: Vec::new(),
            images: Vec::new(),
            manufacturer: String::new(),
            package_dimensions: String::new(),
            country_of_origin: String::new(),
            material: String::new(),
            color: String::new(),
        }
    }

    /// The primary image reference, if the item has any images.
    pub fn primary_image(&self) -> Option<&str> {
        self.images.first().map(String::as_str)
    }

    /// First category path segment, if any.
    pub fn first_category(&self) -> Option<&str> {
        self.categories.first().map(String::as_str)
    }
}

/// Parse a numeric price out of a noisy source token.
///
/// Strips thousands separators and common currency symbols, then parses
/// the remainder as a float. Anything unparseable maps to `None`; a bad
/// price never rejects a row.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != ',' && !CURRENCY_SYMBOLS.contains(c))
        .collect();

    if cleaned.is_empty() {
        return None;
    }

    cleaned.trim().parse::<f64>().ok()
}

/// Split a delimiter-joined multi-value field into ordered segments.
///
/// Empty segments are dropped; order is preserved as encountered.
pub fn split_list(raw: &str) -> Vec<String> {
    raw.split(LIST_DELIMITERS)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split an image field and sanitize each token.
///
/// Source values look like `"url1|url2"`, `"a.jpg, b.jpg"`, or even
/// `"'41abc.jpg '"` with stray quotes around individual tokens.
pub fn split_images(raw: &str) -> Vec<String> {
    raw.split(LIST_DELIMITERS)
        .map(|s| s.trim().trim_matches(['\'', '"']).trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// An immutable, fully-loaded catalog snapshot.
///
/// Items keep their ingestion order; an id lookup table maps back into
/// that order. The snapshot is never mutated after construction — a new
/// dataset produces a new `Catalog` that replaces this one wholesale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    by_id: HashMap<String, usize>,
}

impl Catalog {
    /// Build a snapshot from normalized items, enforcing id uniqueness.
    ///
    /// Items with an empty id are dropped. For duplicate ids the
    /// first-seen item wins and later occurrences are dropped.
    pub fn from_items(items: impl IntoIterator<Item = CatalogItem>) -> Self {
        let mut kept = Vec::new();
        let mut by_id = HashMap::new();

        for item in items {
            if item.id.is_empty() {
                warn!("dropping catalog row with empty id (title: {})", item.title);
                continue;
            }
            if by_id.contains_key(&item.id) {
                warn!("dropping duplicate catalog id: {}", item.id);
                continue;
            }
            by_id.insert(item.id.clone(), kept.len());
            kept.push(item);
        }

        Self { items: kept, by_id }
    }

    /// Number of items in the snapshot.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the snapshot holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Look up an item by id.
    pub fn get(&self, id: &str) -> Option<&CatalogItem> {
        self.by_id.get(id).map(|&i| &self.items[i])
    }

    /// Items in ingestion order.
    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    /// Iterate items in ingestion order.
    pub fn iter(&self) -> impl Iterator<Item = &CatalogItem> {
        self.items.iter()
    }
}
