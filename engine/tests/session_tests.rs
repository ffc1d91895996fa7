
use std::sync::atomic::Ordering;
use std::time::Duration;

use engine::error::FeedError;
use engine::query::{SortColumn, SortDirection};
use engine::{EngineConfig, MarketViewSession, ViewSnapshot};

use mock_feed::{
    DetachedDelayedFeed, FailingBaseline, InlineFeed, StaticBaseline, baseline_row, tick,
};

fn default_baseline() -> StaticBaseline {
    StaticBaseline {
        rows: vec![
            baseline_row("BTCUSDT", "Bitcoin", "BTC", 49_000.0),
            baseline_row("ETHUSDT", "Ethereum", "ETH", 3_000.0),
            baseline_row("SOLUSDT", "Solana", "SOL", 150.0),
        ],
    }
}

fn row_by_id<'a>(snapshot: &'a ViewSnapshot, id: &str) -> &'a engine::ViewRow {
    snapshot
        .rows
        .iter()
        .find(|r| r.id == id)
        .unwrap_or_else(|| panic!("row {id} missing from snapshot"))
}

#[tokio::test]
async fn tick_updates_only_the_referenced_entity() {
    let session = MarketViewSession::new(EngineConfig::default());

    session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    let feed = InlineFeed {
        ticks: vec![tick("BTCUSDT", 50_000.0, 1)],
    };
    session.start(&feed, &["BTCUSDT".to_string()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.total_count, 3);

    let btc = row_by_id(&snapshot, "BTCUSDT");
    assert_eq!(btc.price, 50_000.0);
    assert_eq!(btc.history, vec![50_000.0]);

    assert!(row_by_id(&snapshot, "ETHUSDT").history.is_empty());
    assert!(row_by_id(&snapshot, "SOLUSDT").history.is_empty());
}

#[tokio::test]
async fn burst_is_coalesced_and_history_stays_bounded() {
    let session = MarketViewSession::new(EngineConfig::default());

    let feed = InlineFeed {
        ticks: (1..=60).map(|i| tick("BTCUSDT", i as f64, i)).collect(),
    };
    session.start(&feed, &["BTCUSDT".to_string()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let counters = session.counters();
    assert_eq!(counters.ticks_applied.load(Ordering::Relaxed), 60);
    // The whole burst was queued before the loop woke up, so it collapses
    // into a single recomputation.
    assert_eq!(counters.snapshots_published.load(Ordering::Relaxed), 1);

    let snapshot = session.snapshot().await;
    let history = &row_by_id(&snapshot, "BTCUSDT").history;
    assert_eq!(history.len(), 50);
    assert_eq!(history[0], 11.0);
    assert_eq!(history[49], 60.0);
}

#[tokio::test]
async fn failed_baseline_is_recoverable_and_ticks_still_land() {
    let session = MarketViewSession::new(EngineConfig::default());

    let err = session.load_baseline(&FailingBaseline, 1000).await;
    assert!(matches!(err, Err(FeedError::BaselineLoad(_))));
    assert!(!session.is_stopped().await);

    let feed = InlineFeed {
        ticks: vec![tick("DOGEUSDT", 0.1, 1)],
    };
    session.start(&feed, &["DOGEUSDT".to_string()]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(50)).await;

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.total_count, 1);

    let doge = row_by_id(&snapshot, "DOGEUSDT");
    assert_eq!(doge.price, 0.1);
    assert_eq!(doge.history, vec![0.1]);
}

#[tokio::test]
async fn late_baseline_does_not_clobber_live_state() {
    let session = MarketViewSession::new(EngineConfig::default());

    let feed = InlineFeed {
        ticks: vec![tick("BTCUSDT", 50_000.0, 10)],
    };
    session.start(&feed, &["BTCUSDT".to_string()]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let inserted = session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    assert_eq!(inserted, 2);

    let snapshot = session.snapshot().await;
    let btc = row_by_id(&snapshot, "BTCUSDT");
    assert_eq!(btc.price, 50_000.0);
    assert_eq!(btc.history, vec![50_000.0]);
}

#[tokio::test]
async fn no_mutation_after_stop_returns() {
    let session = MarketViewSession::new(EngineConfig::default());

    let feed = DetachedDelayedFeed {
        ticks: vec![tick("BTCUSDT", 50_000.0, 1)],
        delay: Duration::from_millis(50),
    };
    session.start(&feed, &["BTCUSDT".to_string()]).await.unwrap();

    session.stop().await;
    tokio::time::sleep(Duration::from_millis(120)).await;

    let counters = session.counters();
    assert_eq!(counters.ticks_applied.load(Ordering::Relaxed), 0);
    assert_eq!(session.snapshot().await.total_count, 0);
}

#[tokio::test]
async fn baseline_resolving_after_stop_is_discarded() {
    let session = MarketViewSession::new(EngineConfig::default());

    session.stop().await;
    let inserted = session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    assert_eq!(inserted, 0);
    assert_eq!(session.snapshot().await.total_count, 0);
}

#[tokio::test]
async fn subscribers_see_query_changes_as_whole_snapshots() {
    let session = MarketViewSession::new(EngineConfig::default());
    session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    let mut rx = session.subscribe_channel().await;

    // Registration hands over the current view immediately.
    let initial = rx.recv().await.unwrap();
    assert_eq!(initial.total_count, 3);

    let filtered = session.set_filter("bt").await;
    assert_eq!(filtered.filtered_count, 1);
    assert_eq!(filtered.rows[0].id, "BTCUSDT");
    assert_eq!(filtered.page_index, 0);

    let published = rx.recv().await.unwrap();
    assert_eq!(published.filtered_count, 1);
    assert_eq!(published.rows[0].id, "BTCUSDT");
}

#[tokio::test]
async fn sorting_applies_to_the_published_view() {
    let session = MarketViewSession::new(EngineConfig::default());
    session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    let snapshot = session
        .set_sort(SortColumn::Price, SortDirection::Ascending)
        .await;

    let ids: Vec<&str> = snapshot.rows.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec!["SOLUSDT", "ETHUSDT", "BTCUSDT"]);
}

#[tokio::test]
async fn independent_sessions_do_not_share_a_store() {
    let a = MarketViewSession::new(EngineConfig::default());
    let b = MarketViewSession::new(EngineConfig::default());

    let feed = InlineFeed {
        ticks: vec![tick("BTCUSDT", 50_000.0, 1)],
    };
    a.start(&feed, &["BTCUSDT".to_string()]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(a.snapshot().await.total_count, 1);
    assert_eq!(b.snapshot().await.total_count, 0);
}

#[tokio::test]
async fn remove_entity_is_explicit_and_republishes() {
    let session = MarketViewSession::new(EngineConfig::default());
    session
        .load_baseline(&default_baseline(), 1000)
        .await
        .unwrap();

    assert!(session.remove_entity("SOLUSDT").await);
    assert!(!session.remove_entity("SOLUSDT").await);

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.total_count, 2);
    assert!(snapshot.rows.iter().all(|r| r.id != "SOLUSDT"));
}

#[tokio::test]
async fn movers_rank_the_whole_store() {
    let session = MarketViewSession::new(EngineConfig::default());

    let feed = InlineFeed {
        ticks: vec![
            engine::types::Tick {
                change_percent: Some(9.0),
                ..tick("SOLUSDT", 160.0, 1)
            },
            engine::types::Tick {
                change_percent: Some(-2.0),
                ..tick("ETHUSDT", 2_900.0, 1)
            },
        ],
    };
    session
        .start(&feed, &["SOLUSDT".to_string(), "ETHUSDT".to_string()])
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    let gainers = session.top_gainers(1).await;
    assert_eq!(gainers[0].id, "SOLUSDT");
}
