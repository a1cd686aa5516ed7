// Medicine catalog collaborator
//
// The reminder engine only reads id, name and dosage from here. The real
// dispenser feeds this from its cloud database; the kiosk ships with a
// static catalog that can be loaded from a JSON export.

use crate::errors::CatalogError;
use crate::models::Medicine;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{info, instrument};

/// Read-only view of the medicines loaded in the dispenser
#[async_trait]
pub trait MedicineCatalog: Send + Sync {
    async fn list_medicines(&self) -> Result<Vec<Medicine>, CatalogError>;
}

/// Export format: `{"medicines": {"medicine1": {...}, ...}}`
#[derive(Debug, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    medicines: BTreeMap<String, Medicine>,
}

/// Catalog backed by a fixed list
#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    medicines: Vec<Medicine>,
}

impl StaticCatalog {
    pub fn new(medicines: Vec<Medicine>) -> Self {
        Self { medicines }
    }

    /// The four demo medicines the kiosk falls back to when offline
    pub fn demo() -> Self {
        Self::new(vec![
            Medicine::new("22", "Amoxicillin", "500mg").with_quantity(22),
            Medicine::new("11", "Aspirin", "75mg"),
            Medicine::new("12", "Ibuprofen", "200mg").with_quantity(1),
            Medicine::new("21", "Paracetamol", "500mg").with_quantity(1),
        ])
    }

    /// Parse a catalog export. Entries are ordered by their document key.
    pub fn from_json(json: &str) -> Result<Self, CatalogError> {
        let document: CatalogDocument = serde_json::from_str(json)?;
        Ok(Self::new(document.medicines.into_values().collect()))
    }

    #[instrument]
    pub fn from_json_file(path: &Path) -> Result<Self, CatalogError> {
        let json = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            medicine_count = catalog.medicines.len(),
            "Medicine catalog loaded"
        );
        Ok(catalog)
    }
}

#[async_trait]
impl MedicineCatalog for StaticCatalog {
    async fn list_medicines(&self) -> Result<Vec<Medicine>, CatalogError> {
        Ok(self.medicines.clone())
    }
}
