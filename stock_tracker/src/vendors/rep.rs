//! Rep Fitness page layouts

use super::html::{
    class_text, elements_by_tag, elements_with_class, first_with_id, joined_text, text_within,
};
use super::raw_item;
use std::sync::Arc;
use stock_common::{Product, RawItem};

/// Rows of the grouped product table. Rows without their own stock label
/// inherit the page-level availability.
pub(super) fn multi(product: &Arc<Product>, page: &str) -> Vec<RawItem> {
    let Some(table) = first_with_id(page, "super-product-table") else {
        log::warn!("No product table found on page for {}", product.name);
        return Vec::new();
    };
    let page_availability = text_within(page, "availability", "span");

    elements_by_tag(table.inner, "tr")
        .into_iter()
        .map(|row| {
            let mut availability = class_text(row.inner, "qty-container");
            if availability.is_empty() {
                availability = page_availability.clone();
            }
            raw_item(
                product,
                class_text(row.inner, "product-item-name"),
                class_text(row.inner, "price"),
                availability,
            )
        })
        .collect()
}

/// A single-item page named after the product
pub(super) fn single(product: &Arc<Product>, page: &str) -> Vec<RawItem> {
    let price = joined_text(
        elements_with_class(page, "price-to")
            .into_iter()
            .flat_map(|el| elements_with_class(el.inner, "price")),
    );

    vec![raw_item(
        product,
        product.name.clone(),
        price,
        text_within(page, "product-info-stock-sku", "span"),
    )]
}
