//! Simulated feed: a seeded random walk per symbol, plus a static baseline
//! source. Drives the demo binary offline and doubles as a soak input for
//! the engine.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::mpsc::Sender;
use tracing::debug;

use engine::source::{BaselineSource, FeedHandle, StreamTransport};
use engine::types::{MarketEntity, Tick};

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone, Debug)]
pub struct SimFeedConfig {
    /// Delay between tick rounds; every round emits one tick per symbol.
    pub interval: Duration,
    /// RNG seed. Same seed + same symbol set = same price path.
    pub seed: u64,
    /// Starting price for the first symbol; each further symbol starts at
    /// a multiple so the table doesn't look uniform.
    pub start_price: f64,
    /// Maximum per-tick move, as a fraction of the current price.
    pub max_step: f64,
}

impl Default for SimFeedConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(250),
            seed: 7,
            start_price: 100.0,
            max_step: 0.004,
        }
    }
}

/// Random-walk tick generator implementing the stream transport seam.
pub struct SimFeed {
    cfg: SimFeedConfig,
}

impl SimFeed {
    pub fn new(cfg: SimFeedConfig) -> Self {
        Self { cfg }
    }
}

#[async_trait]
impl StreamTransport for SimFeed {
    async fn subscribe(
        &self,
        symbols: &[String],
        sender: Sender<Tick>,
    ) -> anyhow::Result<FeedHandle> {
        let symbols = symbols.to_vec();
        let cfg = self.cfg.clone();

        let task = tokio::spawn(async move {
            let mut rng = StdRng::seed_from_u64(cfg.seed);
            let opens: Vec<f64> = (0..symbols.len())
                .map(|i| cfg.start_price * (i as f64 + 1.0))
                .collect();
            let mut prices = opens.clone();
            let mut interval = tokio::time::interval(cfg.interval);

            loop {
                interval.tick().await;
                let ts_ms = now_ms();

                for (i, symbol) in symbols.iter().enumerate() {
                    let step: f64 = rng.gen_range(-cfg.max_step..=cfg.max_step);
                    prices[i] = (prices[i] * (1.0 + step)).max(0.01);

                    let tick = Tick {
                        id: symbol.clone(),
                        price: prices[i],
                        change_percent: Some((prices[i] - opens[i]) / opens[i] * 100.0),
                        quote_volume: Some(prices[i] * 1_000.0),
                        ts_ms,
                    };

                    if sender.send(tick).await.is_err() {
                        debug!("sim feed receiver gone; stopping");
                        return;
                    }
                }
            }
        });

        Ok(FeedHandle::new(task))
    }
}

/// Fixed in-memory baseline. REST snapshot sources plug into the same seam;
/// this one exists for demos and offline runs.
pub struct StaticBaseline {
    rows: Vec<MarketEntity>,
}

impl StaticBaseline {
    pub fn new(rows: Vec<MarketEntity>) -> Self {
        Self { rows }
    }

    /// Build display-ready rows for a symbol set, empty histories included.
    pub fn for_symbols(symbols: &[String]) -> Self {
        let rows = symbols
            .iter()
            .map(|s| MarketEntity {
                name: s.clone(),
                symbol: s.trim_end_matches("USDT").to_string(),
                ..MarketEntity::with_id(s.clone())
            })
            .collect();
        Self { rows }
    }
}

#[async_trait]
impl BaselineSource for StaticBaseline {
    async fn fetch(&self, count: usize) -> anyhow::Result<Vec<MarketEntity>> {
        Ok(self.rows.iter().take(count).cloned().collect())
    }
}
