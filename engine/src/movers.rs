//! Market movers for the dashboard's top boxes: biggest gainers and
//! heaviest quote volume. Independent of the table's filter/sort/page
//! state; these always rank the whole store.

use crate::store::EntityStore;
use crate::view::ViewRow;

/// Top `n` entities by 24h change, best first.
pub fn top_gainers(store: &EntityStore, n: usize) -> Vec<ViewRow> {
    let mut rows: Vec<ViewRow> = store.list().map(ViewRow::from).collect();
    rows.sort_by(|a, b| b.change_percent.total_cmp(&a.change_percent));
    rows.truncate(n);
    rows
}

/// Top `n` entities by quote volume, heaviest first. Entities without a
/// reported volume rank last.
pub fn top_by_volume(store: &EntityStore, n: usize) -> Vec<ViewRow> {
    let mut rows: Vec<ViewRow> = store.list().map(ViewRow::from).collect();
    rows.sort_by(|a, b| {
        b.quote_volume
            .unwrap_or(f64::NEG_INFINITY)
            .total_cmp(&a.quote_volume.unwrap_or(f64::NEG_INFINITY))
    });
    rows.truncate(n);
    rows
}
