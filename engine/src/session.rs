//! MarketViewSession
//!
//! One live table = one session. Responsibilities:
//!   • Own the entity store and query state behind a single lock
//!   • Install the initial baseline snapshot (first writer wins)
//!   • Turn transport ticks into store mutations, in arrival order
//!   • Coalesce same-turn tick bursts into one recomputation
//!   • Publish an atomic view snapshot after every change
//!
//! Sessions are Arc-managed async services: each consuming view constructs
//! its own instance at mount and drops it at unmount, so independent views
//! never share mutable state.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use tokio::sync::{Mutex, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::counters::Counters;
use crate::error::FeedError;
use crate::movers;
use crate::query::{QueryEngine, SortColumn, SortDirection};
use crate::reconciler;
use crate::source::{BaselineSource, FeedHandle, StreamTransport};
use crate::store::EntityStore;
use crate::types::Tick;
use crate::view::{SnapshotPublisher, ViewRow, ViewSnapshot};

pub type SessionId = Uuid;

/// Everything the single lock guards. The stopped flag lives here so that
/// "no mutation after stop()" can be enforced under the same lock every
/// write path already holds.
struct ViewState {
    store: EntityStore,
    query: QueryEngine,
    latest: ViewSnapshot,
    stopped: bool,
}

pub struct MarketViewSession {
    id: SessionId,
    cfg: EngineConfig,
    state: Arc<Mutex<ViewState>>,
    publisher: Arc<SnapshotPublisher>,
    counters: Counters,
    feed: Mutex<Option<FeedHandle>>,
}

impl MarketViewSession {
    /// Create a session wrapped in Arc<Self> so long-lived tasks can
    /// capture it without lifetime gymnastics.
    pub fn new(cfg: EngineConfig) -> Arc<Self> {
        let state = ViewState {
            store: EntityStore::new(cfg.history_capacity),
            query: QueryEngine::new(cfg.default_page_size),
            latest: ViewSnapshot::empty(),
            stopped: false,
        };

        Arc::new(Self {
            id: Uuid::new_v4(),
            cfg,
            state: Arc::new(Mutex::new(state)),
            publisher: Arc::new(SnapshotPublisher::default()),
            counters: Counters::default(),
            feed: Mutex::new(None),
        })
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn counters(&self) -> Counters {
        self.counters.clone()
    }

    /// Register a consumer channel. The current snapshot is delivered
    /// immediately so the consumer does not wait for the next change.
    pub async fn subscribe(&self, sender: mpsc::Sender<ViewSnapshot>) {
        let current = self.state.lock().await.latest.clone();
        let _ = sender.send(current).await;
        self.publisher.subscribe(sender).await;
    }

    /// Convenience: subscribe with a fresh channel sized from the config.
    pub async fn subscribe_channel(&self) -> mpsc::Receiver<ViewSnapshot> {
        let (tx, rx) = mpsc::channel(self.cfg.snapshot_queue_capacity);
        self.subscribe(tx).await;
        rx
    }

    /// Latest published snapshot, without registering a subscriber.
    pub async fn snapshot(&self) -> ViewSnapshot {
        self.state.lock().await.latest.clone()
    }

    /// Fetch and install the initial snapshot. Rows whose id already
    /// exists are ignored; live ticks won the baseline. A fetch that
    /// resolves after `stop()` is discarded. An empty baseline is fine;
    /// the table just starts empty.
    pub async fn load_baseline(
        &self,
        source: &dyn BaselineSource,
        count: usize,
    ) -> Result<usize, FeedError> {
        let rows = match source.fetch(count).await {
            Ok(rows) => rows,
            Err(err) => {
                warn!(
                    session_id = %self.id,
                    error = %err,
                    "baseline load failed; continuing with current store"
                );
                return Err(FeedError::BaselineLoad(err));
            }
        };

        let (inserted, snapshot) = {
            let mut state = self.state.lock().await;
            if state.stopped {
                debug!(session_id = %self.id, "discarding baseline resolved after stop");
                return Ok(0);
            }

            let inserted = state.store.bulk_load(rows);
            self.counters
                .baseline_rows
                .fetch_add(inserted as u64, Ordering::Relaxed);
            (inserted, Self::recompute(&mut state, &self.counters))
        };

        info!(session_id = %self.id, inserted, "baseline loaded");
        self.publisher.publish(&snapshot).await;
        Ok(inserted)
    }

    /// Begin consuming ticks for `symbols`. Spawns the processing loop;
    /// returns once the transport accepted the subscription.
    pub async fn start(
        self: &Arc<Self>,
        transport: &dyn StreamTransport,
        symbols: &[String],
    ) -> anyhow::Result<()> {
        if self.state.lock().await.stopped {
            anyhow::bail!("session is stopped");
        }

        let (tx, rx) = mpsc::channel(self.cfg.tick_queue_capacity);
        let handle = transport.subscribe(symbols, tx).await?;

        // A restart replaces the old subscription; dropping its handle
        // aborts the old delivery task.
        *self.feed.lock().await = Some(handle);

        let session = Arc::clone(self);
        tokio::spawn(async move { session.process_ticks(rx).await });

        info!(session_id = %self.id, symbols = symbols.len(), "feed started");
        Ok(())
    }

    /// Halt feed ingestion irrevocably. The flag flips under the state
    /// lock and every write path rechecks it under that same lock, so no
    /// store mutation can happen after this returns. Query setters keep
    /// working; the view stays readable at last-known values.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock().await;
            state.stopped = true;
        }

        if let Some(handle) = self.feed.lock().await.take() {
            handle.cancel();
        }

        info!(session_id = %self.id, "session stopped");
    }

    pub async fn is_stopped(&self) -> bool {
        self.state.lock().await.stopped
    }

    // ---- Query operations (§ user-driven input) ----

    pub async fn set_filter(&self, text: impl Into<String>) -> ViewSnapshot {
        let text = text.into();
        self.apply_query(move |q| q.set_filter(text)).await
    }

    pub async fn set_sort(&self, column: SortColumn, direction: SortDirection) -> ViewSnapshot {
        self.apply_query(move |q| q.set_sort(column, direction)).await
    }

    pub async fn clear_sort(&self) -> ViewSnapshot {
        self.apply_query(|q| q.clear_sort()).await
    }

    pub async fn set_page(&self, index: usize) -> ViewSnapshot {
        self.apply_query(move |q| q.set_page(index)).await
    }

    pub async fn set_page_size(&self, size: usize) -> ViewSnapshot {
        self.apply_query(move |q| q.set_page_size(size)).await
    }

    /// Top-N movers, independent of the table's query state.
    pub async fn top_gainers(&self, n: usize) -> Vec<ViewRow> {
        movers::top_gainers(&self.state.lock().await.store, n)
    }

    pub async fn top_by_volume(&self, n: usize) -> Vec<ViewRow> {
        movers::top_by_volume(&self.state.lock().await.store, n)
    }

    /// Explicit delisting. Never triggered by the feed; an entity that
    /// stops ticking just goes quiet. Returns false if the id was unknown
    /// or the session already stopped.
    pub async fn remove_entity(&self, id: &str) -> bool {
        let (removed, snapshot) = {
            let mut state = self.state.lock().await;
            if state.stopped {
                return false;
            }

            let removed = state.store.remove(id).is_some();
            if !removed {
                return false;
            }
            (removed, Self::recompute(&mut state, &self.counters))
        };

        self.publisher.publish(&snapshot).await;
        removed
    }

    // ---- Internals ----

    /// Drain-coalescing tick loop: whatever burst accumulated in the
    /// channel is applied as one batch, then the view is recomputed once.
    /// Store mutation always completes before the snapshot is derived.
    async fn process_ticks(self: Arc<Self>, mut rx: mpsc::Receiver<Tick>) {
        while let Some(first) = rx.recv().await {
            let mut batch = vec![first];
            while let Ok(tick) = rx.try_recv() {
                batch.push(tick);
            }

            let snapshot = {
                let mut state = self.state.lock().await;
                if state.stopped {
                    break;
                }

                for tick in batch {
                    reconciler::apply_tick(
                        &mut state.store,
                        tick,
                        self.cfg.reject_stale_ticks,
                        &self.counters,
                    );
                }
                Self::recompute(&mut state, &self.counters)
            };

            self.publisher.publish(&snapshot).await;
        }

        debug!(session_id = %self.id, "tick stream ended");
    }

    async fn apply_query(&self, mutate: impl FnOnce(&mut QueryEngine)) -> ViewSnapshot {
        let snapshot = {
            let mut state = self.state.lock().await;
            mutate(&mut state.query);
            Self::recompute(&mut state, &self.counters)
        };

        self.publisher.publish(&snapshot).await;
        snapshot
    }

    /// One full pipeline pass over the current store read. Runs with the
    /// state lock held, so the snapshot can never mix an old store read
    /// with newer query parameters.
    fn recompute(state: &mut ViewState, counters: &Counters) -> ViewSnapshot {
        let rows: Vec<ViewRow> = state.store.list().map(ViewRow::from).collect();
        let snapshot = state.query.compute(rows);
        state.latest = snapshot.clone();
        counters.snapshots_published.fetch_add(1, Ordering::Relaxed);
        snapshot
    }
}
