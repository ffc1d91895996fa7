//! In-memory entity store.
//!
//! Canonical `MarketEntity` record per id, keys unique, no ordering
//! guarantee; display ordering is the query layer's job. The store is
//! plain data: the owning session serializes access behind one lock, and
//! only the feed reconciler writes.

use std::collections::HashMap;

use crate::history::PriceHistory;
use crate::types::{EntityId, EntityPatch, MarketEntity};

#[derive(Debug)]
pub struct EntityStore {
    entities: HashMap<EntityId, MarketEntity>,
    history_capacity: usize,
}

impl EntityStore {
    pub fn new(history_capacity: usize) -> Self {
        Self {
            entities: HashMap::new(),
            history_capacity: history_capacity.max(1),
        }
    }

    /// Create the entity if absent (defaults for omitted scalar fields,
    /// empty history), otherwise overwrite the fields present in `patch`.
    /// A present price is appended to the entity's history buffer either
    /// way. Returns `true` when the call created a new entity.
    pub fn upsert(&mut self, id: &str, patch: EntityPatch) -> bool {
        let capacity = self.history_capacity;
        let created = !self.entities.contains_key(id);

        let entity = self.entities.entry(id.to_string()).or_insert_with(|| {
            let mut e = MarketEntity::with_id(id);
            e.history = PriceHistory::new(capacity);
            e
        });

        if let Some(name) = patch.name {
            entity.name = name;
        }
        if let Some(symbol) = patch.symbol {
            entity.symbol = symbol;
        }
        if let Some(image_ref) = patch.image_ref {
            entity.image_ref = image_ref;
        }
        if let Some(price) = patch.price {
            entity.price = price;
            entity.history.append(price);
        }
        if let Some(change_percent) = patch.change_percent {
            entity.change_percent = change_percent;
        }
        if let Some(quote_volume) = patch.quote_volume {
            entity.quote_volume = Some(quote_volume);
        }
        if let Some(ts_ms) = patch.ts_ms {
            entity.last_updated_ms = ts_ms;
        }

        created
    }

    /// Install baseline rows. Ids already present are left untouched, so a
    /// delayed baseline fetch can never clobber fresher streamed state.
    /// Returns the number of rows actually inserted.
    pub fn bulk_load(&mut self, entities: Vec<MarketEntity>) -> usize {
        let mut inserted = 0;

        for mut entity in entities {
            if self.entities.contains_key(&entity.id) {
                continue;
            }

            // Baseline rows arrive without history; rebuild the buffer at
            // this store's capacity, keeping any samples that came along.
            let samples = entity.history.snapshot();
            entity.history = PriceHistory::new(self.history_capacity);
            for sample in samples {
                entity.history.append(sample);
            }

            inserted += 1;
            self.entities.insert(entity.id.clone(), entity);
        }

        inserted
    }

    pub fn get(&self, id: &str) -> Option<&MarketEntity> {
        self.entities.get(id)
    }

    /// All entities, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &MarketEntity> + '_ {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Explicit delisting. Nothing in the feed path calls this; an entity
    /// that stops ticking simply goes quiet.
    pub fn remove(&mut self, id: &str) -> Option<MarketEntity> {
        self.entities.remove(id)
    }
}
