//! WebSocket stream transport for a Binance-style market stream.
//!
//! This client:
//! - connects to the exchange WebSocket endpoint
//! - sends a `SUBSCRIBE` frame covering each symbol's miniTicker stream
//! - parses incoming frames and forwards ticks into an mpsc channel
//! - answers pings and reconnects with a fixed backoff when the socket drops
//!
//! Reconnection is this transport's business: the engine only ever observes
//! a silent gap and resumes with whatever frames flow after reconnect.

use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc::Sender;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::connect_async;
use tracing::{debug, info, warn};

use engine::error::FeedError;
use engine::source::{FeedHandle, StreamTransport};
use engine::types::Tick;

pub const DEFAULT_WS_URL: &str = "wss://stream.binance.com:9443/ws";

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

/// One `<symbol>@miniTicker` frame. Numeric fields arrive as strings.
#[derive(Debug, Deserialize)]
struct MiniTickerFrame {
    #[serde(rename = "e")]
    event: String,
    #[serde(rename = "E")]
    event_time_ms: u64,
    #[serde(rename = "s")]
    symbol: String,
    #[serde(rename = "c")]
    close: String,
    #[serde(rename = "o")]
    open: String,
    #[serde(rename = "q", default)]
    quote_volume: Option<String>,
}

impl MiniTickerFrame {
    /// Map a frame onto the engine's tick shape.
    ///
    /// Returns None for frames that are not miniTicker updates or carry
    /// unparseable numbers. The reconciler re-validates whatever we
    /// forward; this is only the first line of defense.
    fn into_tick(self) -> Option<Tick> {
        if self.event != "24hrMiniTicker" {
            return None;
        }

        let price = self.close.parse::<f64>().ok()?;
        let open = self.open.parse::<f64>().ok()?;
        let change_percent = if open > 0.0 {
            Some((price - open) / open * 100.0)
        } else {
            None
        };
        let quote_volume = self.quote_volume.and_then(|q| q.parse().ok());

        Some(Tick {
            id: self.symbol,
            price,
            change_percent,
            quote_volume,
            ts_ms: self.event_time_ms,
        })
    }
}

/// Client for a combined miniTicker WebSocket stream.
pub struct MiniTickerWs {
    ws_url: String,
}

impl MiniTickerWs {
    pub fn new(ws_url: impl Into<String>) -> Self {
        Self {
            ws_url: ws_url.into(),
        }
    }

    /// Send the stream subscription request for the given symbol set.
    async fn send_subscription(
        write: &mut (impl futures::Sink<Message, Error = tungstenite::Error> + Unpin),
        symbols: &[String],
    ) -> anyhow::Result<()> {
        let params: Vec<String> = symbols
            .iter()
            .map(|s| format!("{}@miniTicker", s.to_lowercase()))
            .collect();

        let frame = serde_json::json!({
            "method": "SUBSCRIBE",
            "params": params,
            "id": 1
        });

        write
            .send(Message::Text(serde_json::to_string(&frame)?.into()))
            .await?;

        Ok(())
    }

    /// Main WebSocket event loop: connect, subscribe, forward ticks, and
    /// reconnect until the receiving session goes away.
    async fn run_ws_loop(ws_url: String, symbols: Vec<String>, sender: Sender<Tick>) {
        loop {
            info!(url = %ws_url, "connecting to market stream");

            match connect_async(&ws_url).await {
                Ok((ws, _)) => {
                    let (mut write, mut read) = ws.split();

                    match Self::send_subscription(&mut write, &symbols).await {
                        Ok(()) => {
                            info!(streams = symbols.len(), "market stream subscribed");

                            while let Some(msg) = read.next().await {
                                match msg {
                                    Ok(Message::Text(text)) => {
                                        let Ok(frame) =
                                            serde_json::from_str::<MiniTickerFrame>(&text)
                                        else {
                                            debug!("skipping non-ticker frame");
                                            continue;
                                        };

                                        let Some(tick) = frame.into_tick() else {
                                            continue;
                                        };

                                        if sender.send(tick).await.is_err() {
                                            // Receiving session is gone.
                                            return;
                                        }
                                    }
                                    Ok(Message::Ping(payload)) => {
                                        let _ = write.send(Message::Pong(payload)).await;
                                    }
                                    Ok(Message::Close(_)) => break,
                                    Ok(_) => {}
                                    Err(err) => {
                                        warn!(error = %err, "market stream read error");
                                        break;
                                    }
                                }
                            }

                            let disconnect =
                                FeedError::StreamDisconnected(format!("socket to {ws_url} closed"));
                            warn!(error = %disconnect, "market stream ended; will reconnect");
                        }
                        Err(err) => {
                            warn!(error = %err, "stream subscription failed");
                        }
                    }
                }
                Err(err) => {
                    warn!(error = %err, "market stream connection failed");
                }
            }

            if sender.is_closed() {
                return;
            }
            tokio::time::sleep(RECONNECT_DELAY).await;
        }
    }
}

#[async_trait]
impl StreamTransport for MiniTickerWs {
    async fn subscribe(
        &self,
        symbols: &[String],
        sender: Sender<Tick>,
    ) -> anyhow::Result<FeedHandle> {
        let task = tokio::spawn(Self::run_ws_loop(
            self.ws_url.clone(),
            symbols.to_vec(),
            sender,
        ));
        Ok(FeedHandle::new(task))
    }
}
