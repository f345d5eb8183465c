//! One polling cycle over a collected batch
//!
//! Lists what is available, remembers when each item was last seen in stock
//! and tells the chat about watched items that just became available. Items
//! are notified once per in-stock stint: the notified set is replaced by the
//! currently available watched items, so an item that sells out becomes
//! eligible again.

use crate::error::Result;
use crate::formatters::{format_available, format_notification};
use crate::history::{append_transitions, AppendStats};
use crate::notify::TelegramNotifier;
use crate::state::{StateMap, StateStore};
use crate::store::StockLogStore;
use crate::watch::Watchlist;
use chrono::{DateTime, Utc};
use stock_common::{RawItem, StockObservation};

/// Timestamp format of the last-seen and notified state files
pub const LAST_SEEN_FORMAT: &str = "%b %d, %Y %H:%M";

pub struct CycleContext<'a> {
    pub watchlist: &'a Watchlist,
    pub last_seen: &'a mut dyn StateStore,
    pub notified: &'a mut dyn StateStore,
    /// Without a notifier nothing is sent and the notified set is left alone
    pub notifier: Option<&'a TelegramNotifier>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub items: usize,
    pub available: usize,
    pub watched_available: usize,
    /// Items included in the notification sent this cycle
    pub notified: usize,
    /// Grouped listing of available items
    pub listing: String,
    /// Text of the notification, if one was sent
    pub message: Option<String>,
}

pub async fn run_cycle(
    ctx: &mut CycleContext<'_>,
    items: &[RawItem],
    now: DateTime<Utc>,
) -> Result<CycleSummary> {
    let stamp = now.format(LAST_SEEN_FORMAT).to_string();
    let available: Vec<&RawItem> = items.iter().filter(|i| i.is_available()).collect();

    let mut last_seen = ctx.last_seen.load()?;
    for item in &available {
        last_seen.insert(item.id().to_string(), stamp.clone());
    }
    ctx.last_seen.save(&last_seen)?;

    let watched: Vec<&RawItem> = available
        .iter()
        .copied()
        .filter(|i| ctx.watchlist.is_watched(&i.id()))
        .collect();

    let mut summary = CycleSummary {
        items: items.len(),
        available: available.len(),
        watched_available: watched.len(),
        listing: format_available(&available),
        ..Default::default()
    };

    let Some(notifier) = ctx.notifier else {
        log::debug!("No notifier configured, skipping notification");
        return Ok(summary);
    };

    let already_notified = ctx.notified.load()?;
    let fresh: Vec<&RawItem> = watched
        .iter()
        .copied()
        .filter(|i| !already_notified.contains_key(&i.id().to_string()))
        .collect();

    if !fresh.is_empty() {
        let message = format_notification(&fresh);
        log::info!("Sending notification for {} items", fresh.len());
        notifier.send(&message).await?;
        summary.notified = fresh.len();
        summary.message = Some(message);
    }

    let notified: StateMap = watched
        .iter()
        .map(|i| {
            let key = i.id().to_string();
            let since = already_notified
                .get(&key)
                .cloned()
                .unwrap_or_else(|| stamp.clone());
            (key, since)
        })
        .collect();
    ctx.notified.save(&notified)?;

    Ok(summary)
}

/// Run the change-log writer over a whole batch
pub fn record_batch<S>(store: &mut S, items: &[RawItem], now: DateTime<Utc>) -> Result<AppendStats>
where
    S: StockLogStore + ?Sized,
{
    let observations: Vec<StockObservation> = items.iter().map(RawItem::to_observation).collect();
    append_transitions(store, &observations, now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::MemoryStateStore;
    use crate::store::MemoryStockLog;
    use chrono::{Duration, TimeZone};
    use std::sync::Arc;
    use stock_common::{EntityId, Product, ProductLayout, Vendor};
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fleck() -> Arc<Product> {
        Arc::new(Product::new(
            "Rogue Fleck Plates",
            "https://www.roguefitness.com/rogue-fleck-plates",
            Vendor::Rogue,
            ProductLayout::Multi,
        ))
    }

    fn item(name: &str, availability: &str) -> RawItem {
        RawItem {
            product: fleck(),
            name: name.to_string(),
            price: "$100.00".to_string(),
            availability: availability.to_string(),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 5, 1, 10, 15, 0).unwrap()
    }

    async fn mock_telegram() -> (MockServer, TelegramNotifier) {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ok":true}"#))
            .mount(&server)
            .await;
        let mut notifier = TelegramNotifier::new("token", "chat");
        notifier.base_url = server.uri();
        (server, notifier)
    }

    #[tokio::test]
    async fn lists_available_and_records_last_seen() {
        let watchlist = Watchlist::new::<&str>(&[]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();
        let mut ctx = CycleContext {
            watchlist: &watchlist,
            last_seen: &mut last_seen,
            notified: &mut notified,
            notifier: None,
        };

        let items = [item("45LB", "In stock"), item("10LB", "Notify Me")];
        let summary = run_cycle(&mut ctx, &items, now()).await.unwrap();

        assert_eq!(summary.items, 2);
        assert_eq!(summary.available, 1);
        assert!(summary.listing.contains("- 45LB @ $100.00"));
        assert!(!summary.listing.contains("10LB"));
        assert_eq!(
            last_seen.entries["Rogue Fleck Plates: 45LB"],
            "May 01, 2021 10:15"
        );
        assert_eq!(last_seen.entries.len(), 1);
    }

    #[tokio::test]
    async fn without_notifier_notified_set_is_untouched() {
        let watchlist = Watchlist::new(&["Fleck"]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();
        let mut ctx = CycleContext {
            watchlist: &watchlist,
            last_seen: &mut last_seen,
            notified: &mut notified,
            notifier: None,
        };

        let summary = run_cycle(&mut ctx, &[item("45LB", "In stock")], now())
            .await
            .unwrap();
        assert_eq!(summary.watched_available, 1);
        assert_eq!(summary.notified, 0);
        assert!(notified.entries.is_empty());
    }

    #[tokio::test]
    async fn watched_item_is_notified_once_per_stint() {
        let (server, notifier) = mock_telegram().await;
        let watchlist = Watchlist::new(&["45LB"]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();

        let in_stock = [item("45LB", "In stock"), item("25LB", "In stock")];
        let sold_out = [item("45LB", "Out of stock"), item("25LB", "In stock")];
        let mut sent = Vec::new();

        for (minute, batch) in [(0, &in_stock), (15, &in_stock), (30, &sold_out), (45, &in_stock)] {
            let mut ctx = CycleContext {
                watchlist: &watchlist,
                last_seen: &mut last_seen,
                notified: &mut notified,
                notifier: Some(&notifier),
            };
            let summary = run_cycle(&mut ctx, batch, now() + Duration::minutes(minute))
                .await
                .unwrap();
            sent.push(summary.notified);
        }

        assert_eq!(sent, vec![1, 0, 0, 1]);
        assert_eq!(server.received_requests().await.unwrap().len(), 2);
        assert_eq!(
            notified.entries.keys().cloned().collect::<Vec<_>>(),
            vec!["Rogue Fleck Plates: 45LB".to_string()]
        );
    }

    #[tokio::test]
    async fn notified_time_is_kept_while_in_stock() {
        let (_server, notifier) = mock_telegram().await;
        let watchlist = Watchlist::new(&["45LB"]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();

        for minute in [0, 15] {
            let mut ctx = CycleContext {
                watchlist: &watchlist,
                last_seen: &mut last_seen,
                notified: &mut notified,
                notifier: Some(&notifier),
            };
            run_cycle(&mut ctx, &[item("45LB", "In stock")], now() + Duration::minutes(minute))
                .await
                .unwrap();
        }

        assert_eq!(notified.entries["Rogue Fleck Plates: 45LB"], "May 01, 2021 10:15");
        assert_eq!(last_seen.entries["Rogue Fleck Plates: 45LB"], "May 01, 2021 10:30");
    }

    #[tokio::test]
    async fn message_groups_fresh_items() {
        let (_server, notifier) = mock_telegram().await;
        let watchlist = Watchlist::new(&["LB"]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();
        let mut ctx = CycleContext {
            watchlist: &watchlist,
            last_seen: &mut last_seen,
            notified: &mut notified,
            notifier: Some(&notifier),
        };

        let summary = run_cycle(
            &mut ctx,
            &[item("45LB", "In stock"), item("25LB", "In stock")],
            now(),
        )
        .await
        .unwrap();

        let message = summary.message.unwrap();
        assert!(message.starts_with("Watched In Stock Items:\nRogue Fleck Plates:\n"));
        assert!(message.contains("> 45LB @ $100.00"));
        assert!(message.contains("> 25LB @ $100.00"));
    }

    #[tokio::test]
    async fn failed_send_leaves_notified_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let mut notifier = TelegramNotifier::new("token", "chat");
        notifier.base_url = server.uri();

        let watchlist = Watchlist::new(&["45LB"]).unwrap();
        let mut last_seen = MemoryStateStore::default();
        let mut notified = MemoryStateStore::default();
        let mut ctx = CycleContext {
            watchlist: &watchlist,
            last_seen: &mut last_seen,
            notified: &mut notified,
            notifier: Some(&notifier),
        };

        assert!(run_cycle(&mut ctx, &[item("45LB", "In stock")], now()).await.is_err());
        assert!(notified.entries.is_empty());
    }

    #[test]
    fn record_batch_logs_transitions_only() {
        let mut log = MemoryStockLog::new();
        record_batch(&mut log, &[item("45LB", "In stock")], now()).unwrap();
        record_batch(&mut log, &[item("45LB", "In stock")], now() + Duration::minutes(15)).unwrap();
        let stats =
            record_batch(&mut log, &[item("45LB", "Out of stock")], now() + Duration::minutes(30))
                .unwrap();

        assert_eq!(stats.transitions, 1);
        let rows = log
            .all_rows_for_entity(&EntityId::new("Rogue Fleck Plates", "45LB"))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(!rows[1].in_stock);
    }
}
