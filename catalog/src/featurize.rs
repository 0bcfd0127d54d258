//! Feature-text construction for embedding input.

use crate::item::CatalogItem;

/// Build the canonical text blob embedded for an item.
///
/// Concatenates title, brand, categories, and description with single
/// spaces, skipping empty parts. The output is byte-identical for
/// identical input, which lets embeddings be cached and reused across
/// snapshot rebuilds.
pub fn feature_text(item: &CatalogItem) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3 + item.categories.len());

    if !item.title.is_empty() {
        parts.push(&item.title);
    }
    if !item.brand.is_empty() {
        parts.push(&item.brand);
    }
    for category in &item.categories {
        parts.push(category);
    }
    if !item.description.is_empty() {
        parts.push(&item.description);
    }

    parts.join(" ")
}
