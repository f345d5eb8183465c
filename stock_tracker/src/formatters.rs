use crate::analytics::TimelineReport;
use chrono::{DateTime, Utc};
use stock_common::{RawItem, TIMESTAMP_FORMAT};

/// Render a second count as `"<d> days <h>h<mm>"`, dropping the day segment
/// when it is zero. Negative counts render their magnitude; the sign is the
/// caller's business.
pub fn format_duration(seconds: i64) -> String {
    let total_minutes = seconds.unsigned_abs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days == 0 {
        format!("{hours}h{minutes:02}")
    } else {
        format!("{days} days {hours}h{minutes:02}")
    }
}

/// Like [`format_duration`] but with a leading `-` for negative counts
pub fn format_signed_duration(seconds: i64) -> String {
    if seconds < 0 {
        format!("-{}", format_duration(seconds))
    } else {
        format_duration(seconds)
    }
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| "never".to_string())
}

fn format_optional(seconds: Option<i64>, render: fn(i64) -> String) -> String {
    seconds.map(render).unwrap_or_else(|| "undefined".to_string())
}

/// Plain-text report, one statistic per line
pub fn format_report(report: &TimelineReport) -> String {
    let mut output = String::new();

    output.push_str(&format!("Printing report for {}\n", report.entity_id));
    output.push_str(&format!(
        "Data since: {}\n",
        report.since.format(TIMESTAMP_FORMAT)
    ));
    output.push_str(&format!(
        "Last in stock: {}\n",
        format_timestamp(report.last_transition_into_in_stock)
    ));
    output.push_str(&format!(
        "Last out of stock: {}\n",
        format_timestamp(report.last_transition_into_out_of_stock)
    ));
    output.push_str(&format!("Times in stock: {}\n", report.transitions_to_in_stock));
    output.push_str(&format!(
        "Times out of stock: {}\n",
        report.transitions_to_out_of_stock
    ));
    output.push_str(&format!(
        "Time in stock: {}\n",
        format_duration(report.total_seconds_in_stock)
    ));
    output.push_str(&format!(
        "Time out of stock: {}\n",
        format_duration(report.total_seconds_out_of_stock)
    ));
    output.push_str(&format!(
        "Avg time in stock: {}\n",
        format_optional(report.avg_seconds_in_stock, format_duration)
    ));
    output.push_str(&format!(
        "Avg time out of stock: {}\n",
        format_optional(report.avg_seconds_out_of_stock, format_duration)
    ));
    output.push_str(&format!(
        "Predicted next stock change: {}\n",
        format_optional(report.predicted_next_transition_in, format_signed_duration)
    ));

    output
}

/// Group items by product (input order) with a product header and link.
///
/// `marker` prefixes every item line.
fn format_grouped(items: &[&RawItem], marker: &str) -> String {
    let mut output = String::new();
    let mut current_product: Option<&str> = None;

    for item in items {
        if current_product != Some(item.product.name.as_str()) {
            if current_product.is_some() {
                output.push('\n');
            }
            current_product = Some(item.product.name.as_str());
            output.push_str(&format!("{}:\n", item.product.name));
            output.push_str(&format!("Link: {}\n", item.product.url));
        }
        output.push_str(&format!("{marker} {item}\n"));
    }

    output
}

/// Listing of currently available items
pub fn format_available(items: &[&RawItem]) -> String {
    format!("Available Products:\n{}", format_grouped(items, "-"))
}

/// Chat message announcing newly available watched items
pub fn format_notification(items: &[&RawItem]) -> String {
    format!("Watched In Stock Items:\n{}", format_grouped(items, ">"))
}
