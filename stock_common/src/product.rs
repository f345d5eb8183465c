//! Product catalogue entries and the raw items extracted from their pages.

use crate::model::{EntityId, StockObservation};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Availability labels that mean "cannot be bought right now"
const OUT_OF_STOCK_LABELS: [&str; 4] = ["Notify Me", "Out of Stock", "Out of stock", "OUT OF STOCK"];

/// Shop whose page markup the extractor understands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Vendor {
    Rogue,
    RepFitness,
}

/// How items are laid out on a product page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductLayout {
    /// Several purchasable rows on one page
    Multi,
    /// One purchasable item per page
    Single,
    /// Items embedded as JSON in an inline script
    Script,
}

/// A tracked product page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub name: String,
    pub url: String,
    pub vendor: Vendor,
    pub layout: ProductLayout,
}

impl Product {
    pub fn new(name: &str, url: &str, vendor: Vendor, layout: ProductLayout) -> Self {
        Self {
            name: name.to_string(),
            url: url.to_string(),
            vendor,
            layout,
        }
    }

    /// File name of the offline copy of this page (last URL segment + `.html`)
    pub fn test_file_name(&self) -> String {
        let slug = self
            .url
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .unwrap_or(&self.name);
        format!("{slug}.html")
    }
}

/// Whether an availability label means the item can be bought
pub fn is_available(availability: &str) -> bool {
    !OUT_OF_STOCK_LABELS.contains(&availability.trim())
}

/// One row extracted from a product page, before normalisation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawItem {
    pub product: Arc<Product>,
    pub name: String,
    pub price: String,
    pub availability: String,
}

impl RawItem {
    pub fn id(&self) -> EntityId {
        EntityId::new(self.product.name.clone(), self.name.clone())
    }

    pub fn is_available(&self) -> bool {
        is_available(&self.availability)
    }

    pub fn to_observation(&self) -> StockObservation {
        StockObservation {
            entity_id: self.id(),
            in_stock: self.is_available(),
            price: self.price.clone(),
        }
    }
}

impl fmt::Display for RawItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mark = if self.is_available() { '\u{2705}' } else { '\u{274C}' };
        write!(f, "{} @ {}, in stock: {}", self.name, self.price, mark)
    }
}
