use thiserror::Error;

/// Reasons a tick fails validation at the ingestion boundary.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedTick {
    #[error("empty entity id")]
    EmptyId,

    #[error("price is not finite")]
    NonFinitePrice,

    #[error("price is negative")]
    NegativePrice,
}

/// Recoverable failures surfaced by the engine.
///
/// Nothing here is fatal: a session keeps serving the best available state
/// after any of these.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("baseline load failed: {0}")]
    BaselineLoad(anyhow::Error),

    #[error("malformed tick dropped: {0}")]
    Malformed(#[from] MalformedTick),

    #[error("stream disconnected: {0}")]
    StreamDisconnected(String),
}
