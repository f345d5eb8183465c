//! Read-only JSON API over the stock log
//!
//! Exposes the latest state of every item, the raw history of one item and
//! its availability report.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use stock_common::{EntityId, StockLogRow};

use crate::analytics::{analyze_entity, TimelineReport};
use crate::database::SqliteStockLog;
use crate::error::TrackerError;
use crate::store::StockLogStore;

/// Shared application state (thread-safe stock log)
#[derive(Clone)]
struct AppState {
    stock_log: Arc<Mutex<SqliteStockLog>>,
}

/// `?id=<product>: <item>`
#[derive(Deserialize)]
struct ItemParams {
    id: String,
}

/// API response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

type ApiError = (StatusCode, Json<ApiResponse<()>>);
type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

fn ok<T>(data: T) -> ApiResult<T> {
    Ok(Json(ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    }))
}

fn api_error(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ApiResponse {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
}

/// Status code for a tracker error surfaced through the API
fn error_status(err: &TrackerError) -> StatusCode {
    match err {
        TrackerError::EmptyHistory(_) => StatusCode::NOT_FOUND,
        TrackerError::NonMonotonicLog { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        TrackerError::InvalidEntityId(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn from_tracker_error(err: TrackerError) -> ApiError {
    let status = error_status(&err);
    if status == StatusCode::INTERNAL_SERVER_ERROR {
        log::error!("API error: {}", err);
    }
    api_error(status, err.to_string())
}

fn lock_log(state: &AppState) -> Result<MutexGuard<'_, SqliteStockLog>, ApiError> {
    state.stock_log.lock().map_err(|_| {
        log::error!("Stock log lock poisoned");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, "stock log unavailable")
    })
}

fn parse_id(raw: &str) -> Result<EntityId, ApiError> {
    EntityId::parse(raw).ok_or_else(|| from_tracker_error(TrackerError::InvalidEntityId(raw.to_string())))
}

/// GET /api/items - latest row of every item
async fn items_handler(State(state): State<AppState>) -> ApiResult<Vec<StockLogRow>> {
    let stock_log = lock_log(&state)?;
    let latest = stock_log.most_recent_row_per_entity().map_err(from_tracker_error)?;

    let mut rows: Vec<StockLogRow> = latest.into_values().collect();
    rows.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
    ok(rows)
}

/// GET /api/history?id={id} - every row of one item, oldest first
async fn history_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> ApiResult<Vec<StockLogRow>> {
    let id = parse_id(&params.id)?;
    let stock_log = lock_log(&state)?;
    let rows = stock_log.all_rows_for_entity(&id).map_err(from_tracker_error)?;

    if rows.is_empty() {
        return Err(from_tracker_error(TrackerError::EmptyHistory(id)));
    }
    ok(rows)
}

/// GET /api/report?id={id} - availability report of one item
async fn report_handler(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> ApiResult<TimelineReport> {
    let id = parse_id(&params.id)?;
    let stock_log = lock_log(&state)?;
    let report = analyze_entity(&*stock_log, &id, Utc::now()).map_err(from_tracker_error)?;
    ok(report)
}

/// Build the web server router
pub fn create_router(stock_log: Arc<Mutex<SqliteStockLog>>) -> Router {
    let state = AppState { stock_log };

    Router::new()
        .route("/api/items", get(items_handler))
        .route("/api/history", get(history_handler))
        .route("/api/report", get(report_handler))
        .with_state(state)
}

/// Start the web server (async)
///
/// Binds to 0.0.0.0 (all interfaces) to work with Docker port mapping.
pub async fn serve(
    stock_log: Arc<Mutex<SqliteStockLog>>,
    port: u16,
) -> Result<(), Box<dyn std::error::Error>> {
    let app = create_router(stock_log);
    let addr = format!("0.0.0.0:{}", port);

    log::info!("Web API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
