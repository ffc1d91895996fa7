use crate::history::HISTORY_CAPACITY;

/// Tunables for one live view session.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Per-entity price history capacity.
    ///
    /// Bounds memory per entity regardless of how long the feed runs.
    pub history_capacity: usize,

    /// Rows per page until the consumer changes it.
    pub default_page_size: usize,

    /// Drop ticks whose timestamp is not strictly newer than the entity's
    /// `last_updated`.
    ///
    /// Guards against out-of-order delivery from the transport. Disable
    /// only for transports that already guarantee per-entity ordering.
    pub reject_stale_ticks: bool,

    /// Capacity of the transport → reconciler tick channel.
    ///
    /// Sized to absorb bursts without back-pressuring the transport; the
    /// processing loop drains whatever accumulated and recomputes once.
    pub tick_queue_capacity: usize,

    /// Capacity of each subscriber's snapshot channel.
    pub snapshot_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: HISTORY_CAPACITY,
            default_page_size: 20,
            reject_stale_ticks: true,
            tick_queue_capacity: 1024,
            snapshot_queue_capacity: 64,
        }
    }
}
