//! Fetching product pages and turning them into raw items
//!
//! Every product is fetched in its own tokio task. A cycle only gets a batch
//! when every product succeeded, so one broken page never looks like a wave
//! of items going out of stock.

use crate::vendors::extract_items;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use stock_common::{FetchError, FetchResult, Product, RawItem};
use tokio::task::JoinSet;

const USER_AGENT: &str = "stock_tracker/0.1";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Where product pages come from
#[derive(Debug, Clone)]
pub enum PageSource {
    /// Live HTTP requests
    Live(reqwest::Client),
    /// Saved pages named after the last URL segment (offline test mode)
    Fixtures(PathBuf),
}

impl PageSource {
    pub fn live() -> FetchResult<Self> {
        Ok(Self::Live(http_client()?))
    }

    pub fn fixtures(dir: impl Into<PathBuf>) -> Self {
        Self::Fixtures(dir.into())
    }

    /// Raw HTML of the product page
    pub async fn page(&self, product: &Product) -> FetchResult<String> {
        match self {
            Self::Live(client) => fetch_page(client, &product.url).await,
            Self::Fixtures(dir) => {
                let path = dir.join(product.test_file_name());
                log::debug!("Reading {}", path.display());
                Ok(tokio::fs::read_to_string(&path).await?)
            }
        }
    }
}

pub fn http_client() -> FetchResult<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// GET a page body; non-2xx responses are errors
pub async fn fetch_page(client: &reqwest::Client, url: &str) -> FetchResult<String> {
    let response = client.get(url).send().await?;

    if !response.status().is_success() {
        return Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: response.status(),
        });
    }

    Ok(response.text().await?)
}

/// Fetch and extract every product concurrently.
///
/// Items come back in product order, page order within a product. The first
/// failure of any product fails the whole batch.
pub async fn collect_items(source: &PageSource, products: &[Product]) -> FetchResult<Vec<RawItem>> {
    let mut tasks = JoinSet::new();

    for (index, product) in products.iter().enumerate() {
        let product = Arc::new(product.clone());
        let source = source.clone();
        log::info!("Getting {}...", product.name);

        tasks.spawn(async move {
            let page = source.page(&product).await?;
            let items = extract_items(&product, &page)?;
            Ok::<_, FetchError>((index, items))
        });
    }

    let mut per_product = Vec::with_capacity(products.len());
    let mut first_error: Option<FetchError> = None;

    while let Some(joined) = tasks.join_next().await {
        let outcome = joined.map_err(|e| FetchError::Task(e.to_string())).and_then(|r| r);
        match outcome {
            Ok(result) => per_product.push(result),
            Err(e) => {
                log::error!("{}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    per_product.sort_by_key(|(index, _)| *index);
    let items: Vec<RawItem> = per_product.into_iter().flat_map(|(_, items)| items).collect();
    log::info!("Collected {} items from {} products", items.len(), products.len());
    Ok(items)
}

/// Save every product page into `dir` for offline runs. Returns the number of
/// pages written.
pub async fn download_test_files(
    client: &reqwest::Client,
    products: &[Product],
    dir: &Path,
) -> FetchResult<usize> {
    tokio::fs::create_dir_all(dir).await?;

    let mut tasks = JoinSet::new();
    for product in products {
        let client = client.clone();
        let url = product.url.clone();
        let path = dir.join(product.test_file_name());
        log::info!("Getting test file for {}...", product.name);

        tasks.spawn(async move {
            let page = fetch_page(&client, &url).await?;
            tokio::fs::write(&path, page).await?;
            Ok::<_, FetchError>(())
        });
    }

    let mut written = 0;
    while let Some(joined) = tasks.join_next().await {
        joined.map_err(|e| FetchError::Task(e.to_string()))??;
        written += 1;
    }

    log::info!("Done fetching {} test files into {}", written, dir.display());
    Ok(written)
}
