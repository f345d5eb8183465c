//! Timeline analyzer
//!
//! Rebuilds the alternating in-stock/out-of-stock timeline of one entity from
//! its change log and derives time-in-state totals, averages and a linear
//! guess at when the current state will flip.
//!
//! Every gap between two consecutive rows belongs to the state of the
//! *earlier* row: a transition row starts its own state and ends the previous
//! one. The still-open interval from the last row up to `now` is attributed
//! to the last row's state, so in-stock time plus out-of-stock time always
//! equals `now - since`.

use crate::error::{Result, TrackerError};
use crate::store::StockLogStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use stock_common::{EntityId, StockLogRow};

/// Availability statistics for one entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineReport {
    pub entity_id: EntityId,
    /// Timestamp of the earliest row
    pub since: DateTime<Utc>,
    /// State of the latest row, presumed to hold until now
    pub current_state: bool,
    /// When the current state started
    pub current_since: DateTime<Utc>,
    pub last_transition_into_in_stock: Option<DateTime<Utc>>,
    pub last_transition_into_out_of_stock: Option<DateTime<Utc>>,
    /// Rows after the first that flipped into in-stock
    pub transitions_to_in_stock: u32,
    /// Rows after the first that flipped into out-of-stock
    pub transitions_to_out_of_stock: u32,
    pub total_seconds_in_stock: i64,
    pub total_seconds_out_of_stock: i64,
    /// Length of the still-open current interval
    pub tail_seconds: i64,
    /// `None` when there was never a transition into in-stock
    pub avg_seconds_in_stock: Option<i64>,
    /// `None` when there was never a transition into out-of-stock
    pub avg_seconds_out_of_stock: Option<i64>,
    /// Seconds until the current state is expected to flip; negative when overdue.
    /// `None` when the current state's average is undefined.
    pub predicted_next_transition_in: Option<i64>,
}

impl TimelineReport {
    /// Total seconds covered by the report
    pub fn observed_seconds(&self) -> i64 {
        self.total_seconds_in_stock + self.total_seconds_out_of_stock
    }
}

fn average(total: i64, count: u32) -> Option<i64> {
    if count == 0 {
        None
    } else {
        Some(total / i64::from(count))
    }
}

/// Analyze one entity's rows, which must be oldest first.
///
/// Fails with `EmptyHistory` for no rows and `NonMonotonicLog` when a row (or
/// `now`) is earlier than the row before it.
pub fn analyze(
    entity_id: &EntityId,
    rows: &[StockLogRow],
    now: DateTime<Utc>,
) -> Result<TimelineReport> {
    let (first, last) = match (rows.first(), rows.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Err(TrackerError::EmptyHistory(entity_id.clone())),
    };

    let mut seconds_in = 0i64;
    let mut seconds_out = 0i64;
    let mut to_in = 0u32;
    let mut to_out = 0u32;
    let mut last_in = None;
    let mut last_out = None;

    let mut attribute = |in_stock: bool, secs: i64| {
        if in_stock {
            seconds_in += secs;
        } else {
            seconds_out += secs;
        }
    };

    for (index, pair) in rows.windows(2).enumerate() {
        let (prev, curr) = (&pair[0], &pair[1]);
        if curr.recorded_at < prev.recorded_at {
            return Err(TrackerError::NonMonotonicLog {
                entity: entity_id.clone(),
                index: index + 1,
                previous: prev.recorded_at,
                current: curr.recorded_at,
            });
        }

        attribute(prev.in_stock, (curr.recorded_at - prev.recorded_at).num_seconds());

        if curr.in_stock {
            to_in += 1;
        } else {
            to_out += 1;
        }
    }

    for row in rows {
        if row.in_stock {
            last_in = Some(row.recorded_at);
        } else {
            last_out = Some(row.recorded_at);
        }
    }

    if now < last.recorded_at {
        return Err(TrackerError::NonMonotonicLog {
            entity: entity_id.clone(),
            index: rows.len(),
            previous: last.recorded_at,
            current: now,
        });
    }
    let tail = (now - last.recorded_at).num_seconds();
    attribute(last.in_stock, tail);

    let avg_in = average(seconds_in, to_in);
    let avg_out = average(seconds_out, to_out);
    let current_avg = if last.in_stock { avg_in } else { avg_out };

    Ok(TimelineReport {
        entity_id: entity_id.clone(),
        since: first.recorded_at,
        current_state: last.in_stock,
        current_since: last.recorded_at,
        last_transition_into_in_stock: last_in,
        last_transition_into_out_of_stock: last_out,
        transitions_to_in_stock: to_in,
        transitions_to_out_of_stock: to_out,
        total_seconds_in_stock: seconds_in,
        total_seconds_out_of_stock: seconds_out,
        tail_seconds: tail,
        avg_seconds_in_stock: avg_in,
        avg_seconds_out_of_stock: avg_out,
        predicted_next_transition_in: current_avg.map(|avg| avg - tail),
    })
}

/// Load an entity's rows from the store and analyze them
pub fn analyze_entity<S>(store: &S, entity_id: &EntityId, now: DateTime<Utc>) -> Result<TimelineReport>
where
    S: StockLogStore + ?Sized,
{
    let rows = store.all_rows_for_entity(entity_id)?;
    log::debug!("Analyzing {} rows for {}", rows.len(), entity_id);
    analyze(entity_id, &rows, now)
}
