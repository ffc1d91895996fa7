use std::collections::VecDeque;

pub const HISTORY_CAPACITY: usize = 50;

/// Fixed-capacity FIFO of recent price samples for one entity.
///
/// Samples are appended at the newest end; once the buffer is full the
/// oldest sample is evicted first. Insertion order is meaningful
/// (oldest → newest) and drives the trend sparkline.
#[derive(Clone, Debug)]
pub struct PriceHistory {
    samples: VecDeque<f64>,
    capacity: usize,
}

impl Default for PriceHistory {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl PriceHistory {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Add a sample at the newest end, evicting the oldest one when the
    /// buffer is already at capacity. Amortized O(1).
    pub fn append(&mut self, price: f64) {
        if self.samples.len() == self.capacity {
            self.samples.pop_front();
        }
        self.samples.push_back(price);
    }

    /// Current samples, oldest first. Does not mutate the buffer.
    pub fn snapshot(&self) -> Vec<f64> {
        self.samples.iter().copied().collect()
    }

    pub fn latest(&self) -> Option<f64> {
        self.samples.back().copied()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
