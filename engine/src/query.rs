//! Filter → sort → paginate over one read pass of the entity store.
//!
//! The pipeline is recomputed in full on every input change. At table scale
//! that is cheap, and it keeps the derivation trivially correct: no diffing
//! state to corrupt, no page cursor that can drift out of range.

use crate::view::{ViewRow, ViewSnapshot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortColumn {
    Name,
    Symbol,
    Price,
    ChangePercent,
    QuoteVolume,
    LastUpdated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Query state for one view: free-text filter, optional sort, page cursor.
///
/// Owned by the session; mutated only through the setters below. The page
/// cursor is clamped on every computation pass, so a shrinking result set
/// can never leave it pointing past the end.
#[derive(Debug, Clone)]
pub struct QueryEngine {
    filter_text: String,
    sort: Option<(SortColumn, SortDirection)>,
    page_index: usize,
    page_size: usize,
}

impl QueryEngine {
    pub fn new(page_size: usize) -> Self {
        Self {
            filter_text: String::new(),
            sort: None,
            page_index: 0,
            page_size: page_size.max(1),
        }
    }

    /// Case-insensitive substring match against name OR symbol.
    ///
    /// Any filter change sends the cursor back to the first page, exactly
    /// as typing in the search box does.
    pub fn set_filter(&mut self, text: impl Into<String>) {
        self.filter_text = text.into();
        self.page_index = 0;
    }

    /// Sorting is stable: rows with equal keys keep their relative order
    /// from the store read. With no sort set, display order is whatever
    /// order the store enumerated on that pass; not stable across
    /// recomputations.
    pub fn set_sort(&mut self, column: SortColumn, direction: SortDirection) {
        self.sort = Some((column, direction));
    }

    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    /// Request a page. Out-of-range values are clamped on the next pass
    /// rather than rejected.
    pub fn set_page(&mut self, index: usize) {
        self.page_index = index;
    }

    /// Change the page size and return to the first page, so the view can
    /// never land on a blank trailing page.
    pub fn set_page_size(&mut self, size: usize) {
        self.page_size = size.max(1);
        self.page_index = 0;
    }

    pub fn filter_text(&self) -> &str {
        &self.filter_text
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Run the full pipeline over one store read.
    pub fn compute(&mut self, rows: Vec<ViewRow>) -> ViewSnapshot {
        let total_count = rows.len();

        let mut filtered: Vec<ViewRow> = if self.filter_text.is_empty() {
            rows
        } else {
            let needle = self.filter_text.to_lowercase();
            rows.into_iter()
                .filter(|row| {
                    row.name.to_lowercase().contains(&needle)
                        || row.symbol.to_lowercase().contains(&needle)
                })
                .collect()
        };

        if let Some((column, direction)) = self.sort {
            sort_rows(&mut filtered, column, direction);
        }

        let filtered_count = filtered.len();
        let page_count = filtered_count.div_ceil(self.page_size);

        // Defensive clamp: filtering or delisting may have shrunk the set
        // since the cursor was last set.
        self.page_index = self.page_index.min(page_count.saturating_sub(1));

        let start = self.page_index * self.page_size;
        let end = (start + self.page_size).min(filtered_count);
        let rows = if start < filtered_count {
            filtered[start..end].to_vec()
        } else {
            Vec::new()
        };

        ViewSnapshot {
            rows,
            page_index: self.page_index,
            page_count,
            total_count,
            filtered_count,
        }
    }
}

fn sort_rows(rows: &mut [ViewRow], column: SortColumn, direction: SortDirection) {
    // Vec::sort_by is stable; total_cmp gives floats a total order so NaN
    // cannot poison the comparator.
    rows.sort_by(|a, b| {
        let ordering = match column {
            SortColumn::Name => a.name.cmp(&b.name),
            SortColumn::Symbol => a.symbol.cmp(&b.symbol),
            SortColumn::Price => a.price.total_cmp(&b.price),
            SortColumn::ChangePercent => a.change_percent.total_cmp(&b.change_percent),
            SortColumn::QuoteVolume => a
                .quote_volume
                .unwrap_or(f64::NEG_INFINITY)
                .total_cmp(&b.quote_volume.unwrap_or(f64::NEG_INFINITY)),
            SortColumn::LastUpdated => a.last_updated_ms.cmp(&b.last_updated_ms),
        };

        match direction {
            SortDirection::Ascending => ordering,
            SortDirection::Descending => ordering.reverse(),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn row(id: &str, name: &str, symbol: &str, price: f64) -> ViewRow {
        ViewRow {
            id: id.to_string(),
            name: name.to_string(),
            symbol: symbol.to_string(),
            image_ref: String::new(),
            price,
            change_percent: 0.0,
            quote_volume: None,
            history: Vec::new(),
            last_updated_ms: 0,
        }
    }

    fn market() -> Vec<ViewRow> {
        vec![
            row("bitcoin", "Bitcoin", "BTC", 50_000.0),
            row("ethereum", "Ethereum", "ETH", 3_000.0),
            row("solana", "Solana", "SOL", 150.0),
        ]
    }

    fn ids(snapshot: &ViewSnapshot) -> Vec<&str> {
        snapshot.rows.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn filter_matches_name_or_symbol_case_insensitively() {
        let mut q = QueryEngine::new(20);

        q.set_filter("bt");
        let snapshot = q.compute(market());
        assert_eq!(ids(&snapshot), vec!["bitcoin"]);
        assert_eq!(snapshot.filtered_count, 1);
        assert_eq!(snapshot.total_count, 3);

        q.set_filter("ETH");
        let snapshot = q.compute(market());
        assert_eq!(ids(&snapshot), vec!["ethereum"]);
    }

    #[test]
    fn empty_filter_returns_everything() {
        let mut q = QueryEngine::new(20);
        let snapshot = q.compute(market());

        assert_eq!(snapshot.filtered_count, 3);
        assert_eq!(snapshot.page_count, 1);
    }

    #[test]
    fn same_filter_twice_yields_identical_set() {
        let mut q = QueryEngine::new(20);

        q.set_filter("so");
        let first = q.compute(market());
        q.set_filter("so");
        let second = q.compute(market());

        assert_eq!(ids(&first), ids(&second));
        assert_eq!(first.filtered_count, second.filtered_count);
    }

    #[test]
    fn changing_filter_resets_page_index() {
        let mut q = QueryEngine::new(1);

        q.set_page(2);
        let snapshot = q.compute(market());
        assert_eq!(snapshot.page_index, 2);

        q.set_filter("e");
        let snapshot = q.compute(market());
        assert_eq!(snapshot.page_index, 0);
    }

    #[test]
    fn five_rows_at_page_size_two_make_three_pages() {
        let rows: Vec<ViewRow> = (0..5)
            .map(|i| row(&format!("c{i}"), &format!("Coin{i}"), "C", i as f64))
            .collect();

        let mut q = QueryEngine::new(2);
        q.set_page(2);
        let snapshot = q.compute(rows.clone());

        assert_eq!(snapshot.page_count, 3);
        assert_eq!(snapshot.page_index, 2);
        assert_eq!(ids(&snapshot), vec!["c4"]);
    }

    #[test]
    fn page_index_is_clamped_when_the_set_shrinks() {
        let mut q = QueryEngine::new(1);

        q.set_page(2);
        q.compute(market());

        // Shrink to a single match; the cursor must come back in range.
        q.set_page(2);
        q.set_filter("sol");
        let snapshot = q.compute(market());

        assert_eq!(snapshot.page_count, 1);
        assert_eq!(snapshot.page_index, 0);
        assert_eq!(ids(&snapshot), vec!["solana"]);
    }

    #[test]
    fn empty_result_set_has_zero_pages() {
        let mut q = QueryEngine::new(20);
        q.set_filter("doge");
        let snapshot = q.compute(market());

        assert_eq!(snapshot.page_count, 0);
        assert_eq!(snapshot.page_index, 0);
        assert!(snapshot.rows.is_empty());
        assert_eq!(snapshot.filtered_count, 0);
        assert_eq!(snapshot.total_count, 3);
    }

    #[test]
    fn set_page_size_returns_to_first_page() {
        let mut q = QueryEngine::new(1);
        q.set_page(2);
        q.compute(market());

        q.set_page_size(2);
        let snapshot = q.compute(market());
        assert_eq!(snapshot.page_index, 0);
        assert_eq!(snapshot.rows.len(), 2);
    }

    #[test]
    fn sort_orders_by_price_both_directions() {
        let mut q = QueryEngine::new(20);

        q.set_sort(SortColumn::Price, SortDirection::Ascending);
        let snapshot = q.compute(market());
        assert_eq!(ids(&snapshot), vec!["solana", "ethereum", "bitcoin"]);

        q.set_sort(SortColumn::Price, SortDirection::Descending);
        let snapshot = q.compute(market());
        assert_eq!(ids(&snapshot), vec!["bitcoin", "ethereum", "solana"]);
    }

    #[test]
    fn sort_is_stable_for_equal_keys() {
        let rows = vec![
            row("a", "Alpha", "AAA", 10.0),
            row("b", "Beta", "BBB", 10.0),
            row("c", "Gamma", "CCC", 10.0),
        ];

        let mut q = QueryEngine::new(20);
        q.set_sort(SortColumn::Price, SortDirection::Ascending);
        let snapshot = q.compute(rows);

        assert_eq!(ids(&snapshot), vec!["a", "b", "c"]);
    }

    #[test]
    fn clear_sort_restores_pass_order() {
        let mut q = QueryEngine::new(20);
        q.set_sort(SortColumn::Price, SortDirection::Ascending);
        q.compute(market());

        q.clear_sort();
        let snapshot = q.compute(market());
        assert_eq!(ids(&snapshot), vec!["bitcoin", "ethereum", "solana"]);
    }

    #[test]
    fn missing_quote_volume_sorts_last_when_descending() {
        let mut with_vol = row("a", "Alpha", "AAA", 1.0);
        with_vol.quote_volume = Some(100.0);
        let without_vol = row("b", "Beta", "BBB", 1.0);

        let mut q = QueryEngine::new(20);
        q.set_sort(SortColumn::QuoteVolume, SortDirection::Descending);
        let snapshot = q.compute(vec![without_vol, with_vol]);

        assert_eq!(ids(&snapshot), vec!["a", "b"]);
    }

    proptest! {
        /// Concatenating pages 0..page_count reconstructs exactly the
        /// filtered set, with no duplicate or missing row.
        #[test]
        fn pages_partition_the_filtered_set(
            row_count in 0usize..120,
            page_size in 1usize..50,
        ) {
            let rows: Vec<ViewRow> = (0..row_count)
                .map(|i| row(&format!("id{i}"), &format!("Coin {i}"), "XX", i as f64))
                .collect();

            let mut q = QueryEngine::new(page_size);
            let first = q.compute(rows.clone());

            let mut seen = Vec::new();
            for page in 0..first.page_count {
                q.set_page(page);
                let snapshot = q.compute(rows.clone());
                prop_assert_eq!(snapshot.page_index, page);
                seen.extend(snapshot.rows.iter().map(|r| r.id.clone()));
            }

            let expected: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
            prop_assert_eq!(seen, expected);
        }
    }
}
