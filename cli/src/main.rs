pub mod cli;

use std::sync::atomic::Ordering;
use std::time::Duration;

use clap::Parser;

use cli::*;
use common::logger::init_logger;
use engine::source::StreamTransport;
use engine::{MarketViewSession, ViewSnapshot};
use feed::sim::{SimFeed, SimFeedConfig, StaticBaseline};
use feed::ws::MiniTickerWs;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger("marketview");
    let cli = Cli::parse();

    let session = MarketViewSession::new(build_config(&cli));

    let transport: Box<dyn StreamTransport> = match cli.feed {
        FeedKind::Sim => Box::new(SimFeed::new(SimFeedConfig::default())),
        FeedKind::Ws => Box::new(MiniTickerWs::new(cli.ws_url.clone())),
    };

    // The sim ships a static baseline so the table is populated before the
    // first tick; live runs start empty and let ticks create rows.
    if matches!(cli.feed, FeedKind::Sim) {
        let baseline = StaticBaseline::for_symbols(&cli.symbols);
        if let Err(err) = session.load_baseline(&baseline, cli.baseline_count).await {
            tracing::warn!(error = %err, "continuing without baseline");
        }
    }

    if let Some(filter) = &cli.filter {
        session.set_filter(filter.clone()).await;
    }
    if let Some(sort) = &cli.sort {
        session
            .set_sort(cli_to_sort_column(sort), cli_sort_direction(&cli))
            .await;
    }

    let mut rx = session.subscribe_channel().await;
    let printer = tokio::spawn(async move {
        while let Some(snapshot) = rx.recv().await {
            print_snapshot(&snapshot);
        }
    });

    session.start(transport.as_ref(), &cli.symbols).await?;

    tokio::select! {
        _ = tokio::time::sleep(Duration::from_secs(cli.duration_secs)) => {}
        _ = tokio::signal::ctrl_c() => {
            println!("received Ctrl-C, shutting down");
        }
    }

    session.stop().await;
    printer.abort();

    let counters = session.counters();
    println!(
        "applied={} malformed={} stale={} baseline={} snapshots={}",
        counters.ticks_applied.load(Ordering::Relaxed),
        counters.ticks_malformed.load(Ordering::Relaxed),
        counters.ticks_stale.load(Ordering::Relaxed),
        counters.baseline_rows.load(Ordering::Relaxed),
        counters.snapshots_published.load(Ordering::Relaxed),
    );

    Ok(())
}

fn print_snapshot(snapshot: &ViewSnapshot) {
    println!(
        "page {}/{} | {} of {} rows match",
        snapshot.page_index + 1,
        snapshot.page_count.max(1),
        snapshot.filtered_count,
        snapshot.total_count,
    );

    for row in &snapshot.rows {
        let label = if row.symbol.is_empty() {
            row.id.as_str()
        } else {
            row.symbol.as_str()
        };

        let updated = chrono::DateTime::from_timestamp_millis(row.last_updated_ms as i64)
            .map(|t| t.format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());

        println!(
            "  {label:<10} {price:>14.4} {change:>+8.2}%  {spark}  {updated}",
            price = row.price,
            change = row.change_percent,
            spark = sparkline(&row.history, 30),
        );
    }
}

/// Render the tail of a price history as a block-character sparkline.
fn sparkline(history: &[f64], width: usize) -> String {
    const BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

    let tail = &history[history.len().saturating_sub(width)..];
    if tail.is_empty() {
        return String::new();
    }

    let min = tail.iter().copied().fold(f64::INFINITY, f64::min);
    let max = tail.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = (max - min).max(f64::EPSILON);

    tail.iter()
        .map(|v| {
            let idx = ((v - min) / span * 7.0).round() as usize;
            BARS[idx.min(7)]
        })
        .collect()
}
