//! Error types

use thiserror::Error;

/// Everything that can go wrong while protecting a form.
///
/// None of these ever escape an event handler: persist and release failures
/// are logged and dropped. Only initialization (`protect`) returns them.
#[derive(Debug, Error)]
pub enum VapeError {
    /// Neither durable storage nor cookies can be used on this host.
    #[error("neither localStorage nor cookies can be used")]
    NoBackend,

    /// The durable store refused a write, usually because its quota is full.
    #[error("exceeded data quota writing {key}: {reason}")]
    QuotaExceeded { key: String, reason: String },

    /// An `ignoreFields` entry is not a selector we understand.
    #[error("unsupported ignore selector: {0:?}")]
    InvalidSelector(String),

    /// The options object could not be parsed.
    #[error("invalid options: {0}")]
    InvalidOptions(#[from] serde_json::Error),

    /// The host environment misbehaved (missing window, detached element, ...).
    #[error("host error: {0}")]
    Host(String),
}

pub type Result<T> = std::result::Result<T, VapeError>;
