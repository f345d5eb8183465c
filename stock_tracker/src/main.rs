//! Stock Tracker - gym equipment availability history
//!
//! Polls product pages, prints what is in stock, notifies a Telegram chat
//! about watched items and keeps a change-only stock log in SQLite.
//! `--analyze` prints the availability report of one item instead.

use chrono::{DateTime, Utc};
use clap::Parser;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use stock_common::{EntityId, RawItem};
use stock_tracker::fetch::http_client;
use stock_tracker::state::{LAST_IN_STOCK_FILE, NOTIFIED_ITEMS_FILE};
use stock_tracker::{
    analyze_entity, collect_items, download_test_files, format_report, record_batch, run_cycle,
    Config, CycleContext, FileStateStore, PageSource, Result, SqliteStockLog, TelegramNotifier,
    TrackerError, Watchlist,
};
use tokio::time::interval;

/// Gym equipment stock tracker - polls product pages and records availability
#[derive(Parser, Debug)]
#[command(name = "stock_tracker")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to the SQLite database file
    #[arg(short, long, default_value_t = default_db_path())]
    database: String,

    /// JSON file with products and watch terms (default: built-in list)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for notified_items.txt and last_in_stock.txt
    #[arg(long, default_value = ".")]
    state_dir: PathBuf,

    /// Print the availability report for "<product>: <item>" and exit
    #[arg(long, value_name = "ID")]
    analyze: Option<String>,

    /// Record stock transitions in the database after each cycle
    #[arg(long, default_value_t = false)]
    update_db: bool,

    /// Read saved pages instead of fetching (offline test mode)
    #[arg(long, default_value_t = false)]
    test: bool,

    /// Directory of saved pages used by --test
    #[arg(long, default_value = "test_pages")]
    test_pages: PathBuf,

    /// Download every product page into the test page directory first
    #[arg(long, default_value_t = false)]
    update_test_files: bool,

    /// Telegram bot API token
    #[arg(long)]
    api: Option<String>,

    /// Telegram chat id
    #[arg(long)]
    chat: Option<String>,

    /// Run one cycle and exit (default: poll continuously)
    #[arg(long, default_value_t = false)]
    once: bool,

    /// Poll interval in minutes when running continuously
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    interval_minutes: u64,

    /// Enable the JSON API on the specified port (default: disabled)
    #[arg(long)]
    web_port: Option<u16>,
}

/// Returns the default database path: ~/.local/share/stock_tracker/stock.db
fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("stock_tracker")
        .join("stock.db")
        .to_string_lossy()
        .to_string()
}

/// Everything one polling cycle needs, kept across cycles
struct Tracker {
    config: Config,
    watchlist: Watchlist,
    source: PageSource,
    notifier: Option<TelegramNotifier>,
    last_seen: FileStateStore,
    notified: FileStateStore,
    stock_log: Option<Arc<Mutex<SqliteStockLog>>>,
    /// Record transitions in `stock_log` after each cycle
    update_db: bool,
}

impl Tracker {
    async fn run_once(&mut self) -> Result<()> {
        let items = collect_items(&self.source, &self.config.products).await?;
        self.process(&items, Utc::now()).await
    }

    /// Record the batch, then list and notify. A failed notification or
    /// state file write does not keep transitions out of the stock log.
    async fn process(&mut self, items: &[RawItem], now: DateTime<Utc>) -> Result<()> {
        let recorded = self.record(items, now);

        let mut ctx = CycleContext {
            watchlist: &self.watchlist,
            last_seen: &mut self.last_seen,
            notified: &mut self.notified,
            notifier: self.notifier.as_ref(),
        };
        let summary = run_cycle(&mut ctx, items, now).await;

        recorded?;
        let summary = summary?;

        println!();
        print!("{}", summary.listing);
        if let Some(message) = &summary.message {
            println!();
            println!("Sent notification:");
            print!("{}", message);
        }

        log::info!(
            "Cycle done: {} items, {} available, {} watched available, {} notified",
            summary.items,
            summary.available,
            summary.watched_available,
            summary.notified
        );
        Ok(())
    }

    fn record(&self, items: &[RawItem], now: DateTime<Utc>) -> Result<()> {
        let (true, Some(stock_log)) = (self.update_db, &self.stock_log) else {
            return Ok(());
        };
        // Appends autocommit, so a poisoned lock still guards a consistent log
        let mut guard = stock_log.lock().unwrap_or_else(PoisonError::into_inner);
        record_batch(&mut *guard, items, now)?;
        Ok(())
    }
}

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let db_path = PathBuf::from(&args.database);

    if let Some(raw_id) = &args.analyze {
        if let Err(e) = print_report(&db_path, raw_id) {
            log::error!("{}", e);
            std::process::exit(1);
        }
        return;
    }

    log::info!("Starting stock_tracker...");

    let mut tracker = match build_tracker(&args, &db_path).await {
        Ok(tracker) => tracker,
        Err(e) => {
            log::error!("Startup failed: {}", e);
            std::process::exit(1);
        }
    };

    // Spawn web server if --web-port specified
    if let (Some(port), Some(stock_log)) = (args.web_port, &tracker.stock_log) {
        let web_log = Arc::clone(stock_log);
        tokio::spawn(async move {
            if let Err(e) = stock_tracker::web::serve(web_log, port).await {
                log::error!("Web server error: {}", e);
            }
        });
    }

    if args.once {
        if let Err(e) = tracker.run_once().await {
            log::error!("Cycle failed: {}", e);
            std::process::exit(1);
        }
    } else {
        log::info!(
            "Running in daemon mode, checking every {} minute(s)",
            args.interval_minutes
        );
        run_daemon(&mut tracker, args.interval_minutes).await;
    }
}

fn print_report(db_path: &std::path::Path, raw_id: &str) -> Result<()> {
    let entity_id =
        EntityId::parse(raw_id).ok_or_else(|| TrackerError::InvalidEntityId(raw_id.to_string()))?;
    let stock_log = SqliteStockLog::open(db_path)?;
    let report = analyze_entity(&stock_log, &entity_id, Utc::now())?;
    print!("{}", format_report(&report));
    Ok(())
}

async fn build_tracker(args: &Args, db_path: &std::path::Path) -> Result<Tracker> {
    let config = Config::load_or_default(args.config.as_deref())?;
    let watchlist = Watchlist::new(config.watch.as_slice())?;

    if args.update_test_files {
        download_test_files(&http_client()?, &config.products, &args.test_pages).await?;
    }

    let source = if args.test {
        log::info!("Offline mode, reading pages from {}", args.test_pages.display());
        PageSource::fixtures(&args.test_pages)
    } else {
        PageSource::live()?
    };

    let notifier = TelegramNotifier::from_credentials(args.api.as_deref(), args.chat.as_deref());
    if notifier.is_none() {
        log::info!("Telegram credentials not given, notifications disabled");
    }

    let stock_log = if args.update_db || args.web_port.is_some() {
        log::info!("Database path: {}", db_path.display());
        Some(Arc::new(Mutex::new(SqliteStockLog::open(db_path)?)))
    } else {
        None
    };

    Ok(Tracker {
        config,
        watchlist,
        source,
        notifier,
        last_seen: FileStateStore::in_dir(&args.state_dir, LAST_IN_STOCK_FILE),
        notified: FileStateStore::in_dir(&args.state_dir, NOTIFIED_ITEMS_FILE),
        stock_log,
        update_db: args.update_db,
    })
}

/// Poll until interrupted; a failed cycle is logged and retried next tick
async fn run_daemon(tracker: &mut Tracker, interval_minutes: u64) {
    let mut ticker = interval(Duration::from_secs(interval_minutes * 60));

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Err(e) = tracker.run_once().await {
                    log::error!("Cycle failed: {}", e);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                log::info!("Shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use stock_common::{Product, ProductLayout, Vendor};
    use stock_tracker::StockLogStore;
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fleck_item(availability: &str) -> RawItem {
        RawItem {
            product: Arc::new(Product::new(
                "Rogue Fleck Plates",
                "https://www.roguefitness.com/rogue-fleck-plates",
                Vendor::Rogue,
                ProductLayout::Multi,
            )),
            name: "45LB Fleck".to_string(),
            price: "$160.00".to_string(),
            availability: availability.to_string(),
        }
    }

    fn tracker(dir: &TempDir, notifier: TelegramNotifier) -> Tracker {
        Tracker {
            config: Config::default(),
            watchlist: Watchlist::new(&["45LB"]).unwrap(),
            source: PageSource::fixtures(dir.path()),
            notifier: Some(notifier),
            last_seen: FileStateStore::in_dir(dir.path(), LAST_IN_STOCK_FILE),
            notified: FileStateStore::in_dir(dir.path(), NOTIFIED_ITEMS_FILE),
            stock_log: Some(Arc::new(Mutex::new(SqliteStockLog::open_in_memory().unwrap()))),
            update_db: true,
        }
    }

    #[tokio::test]
    async fn failed_notification_still_records_transitions() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let mut notifier = TelegramNotifier::new("token", "chat");
        notifier.base_url = server.uri();

        let dir = TempDir::new().unwrap();
        let mut tracker = tracker(&dir, notifier);
        let start = Utc.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap();

        for minute in [0, 15] {
            let now = start + ChronoDuration::minutes(minute);
            let result = tracker.process(&[fleck_item("In stock")], now).await;
            assert!(matches!(result, Err(TrackerError::Notification(_))));
        }
        tracker
            .process(&[fleck_item("Out of stock")], start + ChronoDuration::minutes(30))
            .await
            .unwrap();

        let stock_log = tracker.stock_log.as_ref().unwrap().lock().unwrap();
        let rows = stock_log
            .all_rows_for_entity(&EntityId::new("Rogue Fleck Plates", "45LB Fleck"))
            .unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows[0].in_stock);
        assert_eq!(rows[0].recorded_at, start);
        assert!(!rows[1].in_stock);
    }

    #[tokio::test]
    async fn without_update_db_nothing_is_recorded() {
        let dir = TempDir::new().unwrap();
        let mut tracker = tracker(&dir, TelegramNotifier::new("token", "chat"));
        tracker.notifier = None;
        tracker.update_db = false;

        let now = Utc.with_ymd_and_hms(2021, 5, 1, 10, 0, 0).unwrap();
        tracker.process(&[fleck_item("In stock")], now).await.unwrap();

        let stock_log = tracker.stock_log.as_ref().unwrap().lock().unwrap();
        assert!(stock_log.entities().unwrap().is_empty());
    }
}
