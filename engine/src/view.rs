//! The immutable view handed to the rendering layer, and the publisher
//! that fans a freshly computed snapshot out to subscribers.

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::sync::mpsc::Sender;

use crate::types::MarketEntity;

/// One renderable table row. History is materialized oldest-first for the
/// sparkline.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRow {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub image_ref: String,
    pub price: f64,
    pub change_percent: f64,
    pub quote_volume: Option<f64>,
    pub history: Vec<f64>,
    pub last_updated_ms: u64,
}

impl From<&MarketEntity> for ViewRow {
    fn from(entity: &MarketEntity) -> Self {
        Self {
            id: entity.id.clone(),
            name: entity.name.clone(),
            symbol: entity.symbol.clone(),
            image_ref: entity.image_ref.clone(),
            price: entity.price,
            change_percent: entity.change_percent,
            quote_volume: entity.quote_volume,
            history: entity.history.snapshot(),
            last_updated_ms: entity.last_updated_ms,
        }
    }
}

/// Atomic result of one query computation pass. Consumers only ever see a
/// whole snapshot; never a store read mixed with newer query parameters.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSnapshot {
    pub rows: Vec<ViewRow>,
    pub page_index: usize,
    pub page_count: usize,
    pub total_count: usize,
    pub filtered_count: usize,
}

impl ViewSnapshot {
    /// The snapshot a session starts from before anything is loaded.
    pub fn empty() -> Self {
        Self {
            rows: Vec::new(),
            page_index: 0,
            page_count: 0,
            total_count: 0,
            filtered_count: 0,
        }
    }
}

/// Fans snapshots out to subscriber channels.
#[derive(Default)]
pub struct SnapshotPublisher {
    subscribers: Mutex<Vec<Sender<ViewSnapshot>>>,
}

impl SnapshotPublisher {
    pub async fn subscribe(&self, sender: Sender<ViewSnapshot>) {
        self.subscribers.lock().await.push(sender);
    }

    /// Deliver one snapshot to every live subscriber. Channels whose
    /// receiver is gone are pruned from the list.
    pub async fn publish(&self, snapshot: &ViewSnapshot) {
        let mut guard = self.subscribers.lock().await;

        let mut live = Vec::with_capacity(guard.len());
        for sender in guard.drain(..) {
            if sender.send(snapshot.clone()).await.is_ok() {
                live.push(sender);
            }
        }

        *guard = live;
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn publish_reaches_every_subscriber() {
        let publisher = SnapshotPublisher::default();
        let (tx1, mut rx1) = mpsc::channel(4);
        let (tx2, mut rx2) = mpsc::channel(4);

        publisher.subscribe(tx1).await;
        publisher.subscribe(tx2).await;
        publisher.publish(&ViewSnapshot::empty()).await;

        assert_eq!(rx1.recv().await.unwrap().total_count, 0);
        assert_eq!(rx2.recv().await.unwrap().total_count, 0);
    }

    #[tokio::test]
    async fn closed_subscribers_are_pruned() {
        let publisher = SnapshotPublisher::default();
        let (tx, rx) = mpsc::channel(4);

        publisher.subscribe(tx).await;
        drop(rx);
        publisher.publish(&ViewSnapshot::empty()).await;

        assert_eq!(publisher.subscriber_count().await, 0);
    }
}
