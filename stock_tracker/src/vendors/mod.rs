//! Per-vendor extraction of raw items from product page HTML

pub mod html;
mod rep;
mod rogue;


use std::sync::Arc;
use stock_common::{FetchError, FetchResult, Product, ProductLayout, RawItem, Vendor};

/// Extract every purchasable row from a product page.
///
/// Rows without a name are dropped.
pub fn extract_items(product: &Arc<Product>, page: &str) -> FetchResult<Vec<RawItem>> {
    let items = match (product.vendor, product.layout) {
        (Vendor::Rogue, ProductLayout::Multi) => rogue::multi(product, page),
        (Vendor::Rogue, ProductLayout::Single) => rogue::single(product, page),
        (Vendor::Rogue, ProductLayout::Script) => rogue::script(product, page)?,
        (Vendor::RepFitness, ProductLayout::Multi) => rep::multi(product, page),
        (Vendor::RepFitness, ProductLayout::Single) => rep::single(product, page),
        (vendor, layout) => {
            return Err(FetchError::Extraction {
                product: product.name.clone(),
                reason: format!("{vendor:?} pages have no {layout:?} layout"),
            })
        }
    };

    let items: Vec<RawItem> = items.into_iter().filter(|i| !i.name.is_empty()).collect();
    log::debug!("Extracted {} items from {}", items.len(), product.name);
    Ok(items)
}

fn raw_item(product: &Arc<Product>, name: String, price: String, availability: String) -> RawItem {
    RawItem {
        product: Arc::clone(product),
        name,
        price,
        availability,
    }
}
