//! Tick ingress: the store's only write path.
//!
//! Deliberately pure: validation and application are synchronous functions
//! over `&mut EntityStore`. Channel plumbing and scheduling live in the
//! session, which calls these in strict arrival order.

use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use crate::counters::Counters;
use crate::error::MalformedTick;
use crate::store::EntityStore;
use crate::types::{EntityPatch, Tick};

/// What happened to one inbound tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The tick referenced an unknown id and created the entity.
    Created,
    /// The tick updated an existing entity.
    Applied,
    /// The tick failed validation and was dropped.
    DroppedMalformed(MalformedTick),
    /// The tick was not strictly newer than stored state and was dropped.
    DroppedStale,
}

impl TickOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TickOutcome::Created | TickOutcome::Applied)
    }
}

/// Check the mandatory tick fields before they can reach the store.
pub fn validate_tick(tick: &Tick) -> Result<(), MalformedTick> {
    if tick.id.trim().is_empty() {
        return Err(MalformedTick::EmptyId);
    }
    if !tick.price.is_finite() {
        return Err(MalformedTick::NonFinitePrice);
    }
    if tick.price < 0.0 {
        return Err(MalformedTick::NegativePrice);
    }
    Ok(())
}

/// Apply one tick.
///
/// Malformed ticks are dropped, counted and logged; never raised. Stale
/// ticks (timestamp not strictly newer than the entity's `last_updated`)
/// are dropped when `reject_stale` is set.
pub fn apply_tick(
    store: &mut EntityStore,
    tick: Tick,
    reject_stale: bool,
    counters: &Counters,
) -> TickOutcome {
    if let Err(reason) = validate_tick(&tick) {
        counters.ticks_malformed.fetch_add(1, Ordering::Relaxed);
        warn!(id = %tick.id, %reason, "dropping malformed tick");
        return TickOutcome::DroppedMalformed(reason);
    }

    if reject_stale {
        if let Some(existing) = store.get(&tick.id) {
            if tick.ts_ms <= existing.last_updated_ms {
                counters.ticks_stale.fetch_add(1, Ordering::Relaxed);
                debug!(
                    id = %tick.id,
                    tick_ts_ms = tick.ts_ms,
                    last_updated_ms = existing.last_updated_ms,
                    "dropping stale tick"
                );
                return TickOutcome::DroppedStale;
            }
        }
    }

    let patch = EntityPatch::from(&tick);
    let created = store.upsert(&tick.id, patch);
    counters.ticks_applied.fetch_add(1, Ordering::Relaxed);

    if created {
        TickOutcome::Created
    } else {
        TickOutcome::Applied
    }
}
