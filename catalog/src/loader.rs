//! CSV catalog ingestion.
//!
//! Turns a raw tabular source into a normalized [`Catalog`] snapshot.
//! Individual dirty fields are repaired with defaults; only a source
//! that lacks the minimum required columns fails the whole load.

use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, info};

use crate::error::{CatalogError, Result};
use crate::item::{Catalog, CatalogItem, parse_price, split_images, split_list};

/// Column names accepted as the id-equivalent, in preference order.
const ID_COLUMNS: [&str; 2] = ["uniq_id", "id"];

/// Loads and normalizes catalog snapshots from CSV sources.
///
/// Loading is idempotent and side-effect-free: identical input bytes
/// always produce an identical snapshot.
pub struct CatalogLoader;

/// Resolved column positions for one source schema.
#[derive(Debug)]
struct ColumnMap {
    id: usize,
    title: usize,
    brand: Option<usize>,
    description: Option<usize>,
    price: Option<usize>,
    categories: Option<usize>,
    images: Option<usize>,
    manufacturer: Option<usize>,
    package_dimensions: Option<usize>,
    country_of_origin: Option<usize>,
    material: Option<usize>,
    color: Option<usize>,
}

impl ColumnMap {
    fn resolve(headers: &StringRecord) -> Result<Self> {
        let position = |name: &str| headers.iter().position(|h| h.trim() == name);

        let id = ID_COLUMNS
            .iter()
            .find_map(|c| position(c))
            .ok_or_else(|| CatalogError::MissingColumn("uniq_id".to_string()))?;
        let title = position("title")
            .ok_or_else(|| CatalogError::MissingColumn("title".to_string()))?;

        Ok(Self {
            id,
            title,
            brand: position("brand"),
            description: position("description"),
            price: position("price"),
            categories: position("categories"),
            images: position("images"),
            manufacturer: position("manufacturer"),
            // The source dataset spells this one with a space.
            package_dimensions: position("package dimensions")
                .or_else(|| position("package_dimensions")),
            country_of_origin: position("country_of_origin"),
            material: position("material"),
            color: position("color"),
        })
    }
}

impl CatalogLoader {
    /// Load a catalog snapshot from a CSV file on disk.
    pub fn load_path(path: impl AsRef<Path>) -> Result<Catalog> {
        let path = path.as_ref();
        let file = std::fs::File::open(path)?;
        let catalog = Self::load_reader(file)?;
        info!("loaded catalog from {} ({} items)", path.display(), catalog.len());
        Ok(catalog)
    }

    /// Load a catalog snapshot from any CSV byte stream.
    pub fn load_reader<R: Read>(reader: R) -> Result<Catalog> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader
            .headers()
            .map_err(|e| CatalogError::Malformed(format!("unreadable header row: {e}")))?
            .clone();
        let columns = ColumnMap::resolve(&headers)?;

        let mut items = Vec::new();
        for (row, record) in csv_reader.records().enumerate() {
            let record = record
                .map_err(|e| CatalogError::Malformed(format!("row {}: {e}", row + 2)))?;
            items.push(Self::normalize_row(&record, &columns));
        }

        debug!("parsed {} catalog rows", items.len());
        Ok(Catalog::from_items(items))
    }

    /// Parse additional rows without snapshotting them, so a caller can
    /// merge them after an existing snapshot's items.
    pub fn load_rows<R: Read>(reader: R) -> Result<Vec<CatalogItem>> {
        let catalog = Self::load_reader(reader)?;
        Ok(catalog.items().to_vec())
    }

    fn normalize_row(record: &StringRecord, columns: &ColumnMap) -> CatalogItem {
        let field = |idx: Option<usize>| -> &str {
            idx.and_then(|i| record.get(i)).map(str::trim).unwrap_or("")
        };

        CatalogItem {
            id: field(Some(columns.id)).to_string(),
            title: field(Some(columns.title)).to_string(),
            brand: field(columns.brand).to_string(),
            description: field(columns.description).to_string(),
            price: parse_price(field(columns.price)),
            categories: split_list(field(columns.categories)),
            images: split_images(field(columns.images)),
            manufacturer: field(columns.manufacturer).to_string(),
            package_dimensions: field(columns.package_dimensions).to_string(),
            country_of_origin: field(columns.country_of_origin).to_string(),
            material: field(columns.material).to_string(),
            color: field(columns.color).to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const SAMPLE: &str = "\
uniq_id,title,brand,price,categories,images
1,Oak Dining Chair,Oakline,\"₹2,499\",Home|Furniture|Chairs,'a.jpg '|b.jpg
2,Plastic Stool,,,Home|Furniture,
";

    #[test]
    fn test_load_normalizes_fields() {
        let catalog = CatalogLoader::load_reader(SAMPLE.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 2);

        let chair = catalog.get("1").unwrap();
        assert_eq!(chair.title, "Oak Dining Chair");
        assert_eq!(chair.price, Some(2499.0));
        assert_eq!(chair.categories, vec!["Home", "Furniture", "Chairs"]);
        assert_eq!(chair.primary_image(), Some("a.jpg"));

        let stool = catalog.get("2").unwrap();
        assert_eq!(stool.price, None);
        assert_eq!(stool.brand, "");
        assert!(stool.images.is_empty());
    }

    #[test]
    fn test_missing_required_column_fails() {
        let csv = "title,brand\nChair,Oakline\n";
        let err = CatalogLoader::load_reader(csv.as_bytes()).unwrap_err();
        assert!(matches!(err, CatalogError::MissingColumn(_)));
    }

    #[test]
    fn test_accepts_plain_id_column() {
        let csv = "id,title\n7,Lamp\n";
        let catalog = CatalogLoader::load_reader(csv.as_bytes()).unwrap();
        assert!(catalog.get("7").is_some());
    }

    #[test]
    fn test_absent_optional_columns_default_empty() {
        let csv = "uniq_id,title\n1,Desk\n";
        let catalog = CatalogLoader::load_reader(csv.as_bytes()).unwrap();
        let desk = catalog.get("1").unwrap();

        assert_eq!(desk.description, "");
        assert_eq!(desk.price, None);
        assert!(desk.categories.is_empty());
    }

    #[test]
    fn test_load_rows_for_append() {
        let extra = "uniq_id,title,price\n3,Brass Floor Lamp,€89\n";
        let rows = CatalogLoader::load_rows(extra.as_bytes()).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].id, "3");
        assert_eq!(rows[0].price, Some(89.0));
    }

    #[test]
    fn test_load_is_idempotent() {
        let a = CatalogLoader::load_reader(SAMPLE.as_bytes()).unwrap();
        let b = CatalogLoader::load_reader(SAMPLE.as_bytes()).unwrap();

        let titles = |c: &Catalog| c.iter().map(|i| i.title.clone()).collect::<Vec<_>>();
        assert_eq!(titles(&a), titles(&b));
    }
}
