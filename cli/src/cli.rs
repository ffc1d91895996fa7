use clap::{Parser, ValueEnum};

use engine::EngineConfig;
use engine::query::{SortColumn, SortDirection};

#[derive(Debug, Clone, ValueEnum)]
pub enum FeedKind {
    /// Seeded random-walk feed, no network required.
    Sim,
    /// Live exchange miniTicker WebSocket stream.
    Ws,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum SortCli {
    Name,
    Symbol,
    Price,
    Change,
    Volume,
    Updated,
}

#[derive(Debug, Parser)]
#[clap(name = "marketview", version)]
pub struct Cli {
    /// Symbols to subscribe (comma-separated)
    #[clap(long, value_delimiter = ',', default_value = "BTCUSDT,ETHUSDT,SOLUSDT")]
    pub symbols: Vec<String>,

    /// Which feed drives the table
    #[clap(long, value_enum, default_value_t = FeedKind::Sim)]
    pub feed: FeedKind,

    /// WebSocket endpoint for --feed ws
    #[clap(long, default_value = feed::ws::DEFAULT_WS_URL)]
    pub ws_url: String,

    /// Rows per page
    #[clap(long, default_value_t = 20)]
    pub page_size: usize,

    /// Initial search filter
    #[clap(long)]
    pub filter: Option<String>,

    /// Initial sort column
    #[clap(long, value_enum)]
    pub sort: Option<SortCli>,

    /// Sort descending instead of ascending
    #[clap(long)]
    pub descending: bool,

    /// Baseline rows to request before streaming starts
    #[clap(long, default_value_t = 1000)]
    pub baseline_count: usize,

    /// How long to run before shutting down (seconds)
    #[clap(long, default_value_t = 15)]
    pub duration_secs: u64,
}

/// Convert CLI sort selection into the engine's sort column.
pub(crate) fn cli_to_sort_column(sort: &SortCli) -> SortColumn {
    match sort {
        SortCli::Name => SortColumn::Name,
        SortCli::Symbol => SortColumn::Symbol,
        SortCli::Price => SortColumn::Price,
        SortCli::Change => SortColumn::ChangePercent,
        SortCli::Volume => SortColumn::QuoteVolume,
        SortCli::Updated => SortColumn::LastUpdated,
    }
}

pub(crate) fn cli_sort_direction(cli: &Cli) -> SortDirection {
    if cli.descending {
        SortDirection::Descending
    } else {
        SortDirection::Ascending
    }
}

/// Build an engine configuration from CLI flags.
pub(crate) fn build_config(cli: &Cli) -> EngineConfig {
    EngineConfig {
        default_page_size: cli.page_size.max(1),
        ..EngineConfig::default()
    }
}
