//! Geo catalog: municipality id → coordinates
//!
//! The catalog is an external collaborator; [`StaticCatalog`] is a plain
//! indexed lookup over a JSON export, enough to drive the service.

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{info, warn};

use crate::models::{Coordinate, LocationRecord};

pub trait GeoCatalog: Send + Sync {
    fn lookup(&self, location_id: &str) -> Option<LocationRecord>;
}

/// Row of the catalog export. Coordinates may be missing in the source data.
#[derive(Debug, Deserialize)]
struct CatalogRow {
    id: String,
    name: String,
    #[serde(default)]
    state: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
}

/// In-memory catalog indexed by id
#[derive(Debug, Default)]
pub struct StaticCatalog {
    records: HashMap<String, LocationRecord>,
}

impl StaticCatalog {
    #[must_use]
    pub fn from_records(records: Vec<LocationRecord>) -> Self {
        Self {
            records: records.into_iter().map(|r| (r.id.clone(), r)).collect(),
        }
    }

    /// Load a JSON array of `{id, name, state, latitude, longitude}` rows.
    /// Rows without a usable coordinate pair are skipped.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read catalog file: {}", path.display()))?;
        Self::from_json_str(&text)
            .with_context(|| format!("Failed to parse catalog file: {}", path.display()))
    }

    pub fn from_json_str(text: &str) -> Result<Self> {
        let rows: Vec<CatalogRow> = serde_json::from_str(text)?;
        let total = rows.len();
        let records: Vec<LocationRecord> = rows
            .into_iter()
            .filter_map(|row| match Coordinate::from_parts(row.latitude, row.longitude) {
                Some(coordinate) => Some(LocationRecord {
                    id: row.id,
                    name: row.name,
                    state: row.state,
                    coordinate,
                }),
                None => {
                    warn!("Skipping catalog entry {} without usable coordinates", row.id);
                    None
                }
            })
            .collect();
        info!("Loaded {} of {} catalog entries", records.len(), total);
        Ok(Self::from_records(records))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl GeoCatalog for StaticCatalog {
    fn lookup(&self, location_id: &str) -> Option<LocationRecord> {
        self.records.get(location_id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skips_rows_without_coordinates() {
        let catalog = StaticCatalog::from_json_str(
            r#"[
                {"id": "3550308", "name": "São Paulo", "state": "SP", "latitude": -23.55, "longitude": -46.63},
                {"id": "3304557", "name": "Rio de Janeiro", "state": "RJ", "latitude": -22.91},
                {"id": "5300108", "name": "Brasília", "latitude": -15.78, "longitude": -47.93}
            ]"#,
        )
        .unwrap();

        assert_eq!(catalog.len(), 2);
        assert!(catalog.lookup("3304557").is_none());
        let sp = catalog.lookup("3550308").unwrap();
        assert_eq!(sp.display_name(), "São Paulo - SP");
        assert!(catalog.lookup("5300108").unwrap().state.is_none());
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(StaticCatalog::from_json_str("{not json").is_err());
    }
}
