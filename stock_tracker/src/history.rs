//! Change-log writer
//!
//! Compares a batch of observations against the latest logged state of each
//! entity and appends a row only for entities that are new or whose
//! availability flipped. Polling an unchanged state never grows the log.

use crate::error::Result;
use crate::store::StockLogStore;
use chrono::{DateTime, SubsecRound, Utc};
use std::collections::{HashMap, HashSet};
use stock_common::{EntityId, StockLogRow, StockObservation};

/// Outcome of one writer run
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct AppendStats {
    /// Rows appended for entities never seen before
    pub new_entities: usize,
    /// Rows appended because the state flipped
    pub transitions: usize,
    /// Observations matching the logged state
    pub unchanged: usize,
    /// Repeated observations of an entity already handled in this batch
    pub duplicates: usize,
}

impl AppendStats {
    pub fn appended(&self) -> usize {
        self.new_entities + self.transitions
    }
}

/// Append one row per detected transition.
///
/// The batch may arrive in any order. `now` is truncated to whole seconds so
/// every store persists the same timestamp. The first store error aborts the
/// run; rows appended before it stay in the log.
pub fn append_transitions<S>(
    store: &mut S,
    observations: &[StockObservation],
    now: DateTime<Utc>,
) -> Result<AppendStats>
where
    S: StockLogStore + ?Sized,
{
    let recorded_at = now.trunc_subsecs(0);
    let latest: HashMap<EntityId, StockLogRow> = store.most_recent_row_per_entity()?;
    log::debug!(
        "Checking {} observations against {} logged entities",
        observations.len(),
        latest.len()
    );

    let mut stats = AppendStats::default();
    let mut seen: HashSet<&EntityId> = HashSet::new();

    for observation in observations {
        if !seen.insert(&observation.entity_id) {
            log::warn!(
                "Ignoring repeated observation of {} in the same batch",
                observation.entity_id
            );
            stats.duplicates += 1;
            continue;
        }

        let previous = latest.get(&observation.entity_id);
        match previous {
            Some(prev) if prev.in_stock == observation.in_stock => {
                stats.unchanged += 1;
                continue;
            }
            Some(_) => stats.transitions += 1,
            None => stats.new_entities += 1,
        }

        let row = StockLogRow::from_observation(observation, recorded_at);
        store.append(&row)?;
        log::debug!(
            "Logged {} as {}",
            row.entity_id,
            if row.in_stock { "in stock" } else { "out of stock" }
        );
    }

    log::info!(
        "Stock log updated: {} appended ({} new, {} changed), {} unchanged",
        stats.appended(),
        stats.new_entities,
        stats.transitions,
        stats.unchanged
    );
    Ok(stats)
}
