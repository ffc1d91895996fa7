//! Shared data model: the canonical entity record, the inbound tick event,
//! and the partial patch applied through the store's write path.

use serde::{Deserialize, Serialize};

use crate::history::PriceHistory;

pub type EntityId = String;

/// One row of live market state.
///
/// Descriptive fields (`name`, `symbol`, `image_ref`) are set by the
/// baseline snapshot and stay put afterwards; pricing fields follow the
/// tick stream. `history` is process-local and never part of the wire
/// shape; it is rebuilt from applied ticks.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketEntity {
    pub id: EntityId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub image_ref: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub change_percent: f64,
    #[serde(default)]
    pub quote_volume: Option<f64>,
    #[serde(skip)]
    pub history: PriceHistory,
    /// Timestamp (ms since epoch) of the most recent applied tick.
    #[serde(default, rename = "lastUpdated")]
    pub last_updated_ms: u64,
}

impl MarketEntity {
    /// Entity skeleton for an id seen for the first time through the tick
    /// stream: descriptive fields stay empty until an authoritative
    /// snapshot fills them in.
    pub fn with_id(id: impl Into<EntityId>) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            symbol: String::new(),
            image_ref: String::new(),
            price: 0.0,
            change_percent: 0.0,
            quote_volume: None,
            history: PriceHistory::default(),
            last_updated_ms: 0,
        }
    }
}

/// One inbound price/stat update for a single entity.
///
/// The wire payload is dynamic: only `id`, `price` and `timestamp` are
/// mandatory. Optional stats are modeled as `Option` and everything is
/// validated at the ingestion boundary before it can reach the store.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tick {
    pub id: EntityId,
    pub price: f64,
    #[serde(default)]
    pub change_percent: Option<f64>,
    #[serde(default)]
    pub quote_volume: Option<f64>,
    #[serde(rename = "timestamp")]
    pub ts_ms: u64,
}

/// Partial update applied through `EntityStore::upsert`.
///
/// `None` fields leave the existing entity untouched. A present `price` is
/// also appended to the entity's history buffer.
#[derive(Clone, Debug, Default)]
pub struct EntityPatch {
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub image_ref: Option<String>,
    pub price: Option<f64>,
    pub change_percent: Option<f64>,
    pub quote_volume: Option<f64>,
    pub ts_ms: Option<u64>,
}

impl From<&Tick> for EntityPatch {
    fn from(tick: &Tick) -> Self {
        Self {
            price: Some(tick.price),
            change_percent: tick.change_percent,
            quote_volume: tick.quote_volume,
            ts_ms: Some(tick.ts_ms),
            ..Default::default()
        }
    }
}
