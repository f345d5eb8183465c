//! Rogue Fitness page layouts

use super::html::{class_text, elements_with_class, script_bodies, text_within};
use super::raw_item;
use serde_json::Value;
use std::sync::Arc;
use stock_common::{FetchError, FetchResult, Product, RawItem};

/// Marker of the inline script carrying the colour swatch JSON
const SWATCH_SCRIPT: &str = "RogueColorSwatches";

/// One `grouped-item` block per purchasable row
pub(super) fn multi(product: &Arc<Product>, page: &str) -> Vec<RawItem> {
    elements_with_class(page, "grouped-item")
        .into_iter()
        .map(|block| {
            raw_item(
                product,
                class_text(block.inner, "item-name"),
                class_text(block.inner, "price"),
                class_text(block.inner, "bin-stock-availability"),
            )
        })
        .collect()
}

/// A single-item page; availability is the sign-up button label
pub(super) fn single(product: &Arc<Product>, page: &str) -> Vec<RawItem> {
    let availability = text_within(page, "bin-signup-dropper", "button");

    vec![raw_item(
        product,
        class_text(page, "product-title"),
        class_text(page, "price"),
        availability,
    )]
}

/// Items embedded as JSON lines inside the swatch script
pub(super) fn script(product: &Arc<Product>, page: &str) -> FetchResult<Vec<RawItem>> {
    let mut items = Vec::new();

    for body in script_bodies(page, "text/javascript") {
        if !body.contains(SWATCH_SCRIPT) {
            continue;
        }
        for line in body.lines() {
            let line = line.trim();
            if !line.starts_with('{') {
                continue;
            }
            let blob = line.trim_end_matches([',', ')', ';']);
            items.extend(parse_swatch_json(product, blob)?);
        }
    }

    Ok(items)
}

fn extraction_error(product: &Product, reason: &str) -> FetchError {
    FetchError::Extraction {
        product: product.name.clone(),
        reason: reason.to_string(),
    }
}

/// Walk `attributes.*.options[].additional_options.*` into items
fn parse_swatch_json(product: &Arc<Product>, blob: &str) -> FetchResult<Vec<RawItem>> {
    let top: Value = serde_json::from_str(blob)?;
    let attributes = top
        .get("attributes")
        .and_then(Value::as_object)
        .ok_or_else(|| extraction_error(product, "swatch data has no attributes"))?;

    let mut items = Vec::new();
    for attribute in attributes.values() {
        let Some(options) = attribute.get("options").and_then(Value::as_array) else {
            continue;
        };
        for option in options {
            let Some(extra) = option.get("additional_options").and_then(Value::as_object) else {
                continue;
            };
            for info in extra.values() {
                items.push(swatch_item(product, info)?);
            }
        }
    }

    Ok(items)
}

fn swatch_item(product: &Arc<Product>, info: &Value) -> FetchResult<RawItem> {
    let in_stock = info
        .get("isInStock")
        .and_then(Value::as_bool)
        .ok_or_else(|| extraction_error(product, "swatch option without isInStock"))?;
    let label = info
        .get("realLabel")
        .and_then(Value::as_str)
        .ok_or_else(|| extraction_error(product, "swatch option without realLabel"))?;
    let price = info
        .get("bin_price")
        .and_then(Value::as_str)
        .ok_or_else(|| extraction_error(product, "swatch option without bin_price"))?;

    // Labels carry a three character prefix before the item name
    let name: String = label.chars().skip(3).collect();
    let price = format!("${}", price.strip_suffix("00").unwrap_or(price));
    let availability = if in_stock { "In stock" } else { "Out of stock" };

    Ok(raw_item(product, name.trim().to_string(), price, availability.to_string()))
}
