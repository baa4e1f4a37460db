//! Error types for polyvox

use thiserror::Error;

/// Synthesis pipeline errors
///
/// Validation variants (`UnknownProvider`, `UnknownVoice`, `InvalidParameter`)
/// are returned before any subprocess or network call. The rest surface a
/// per-call backend failure; the coordinator never retries on its own.
#[derive(Error, Debug)]
pub enum TtsError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),

    #[error("unknown voice '{voice}' for provider '{provider}'")]
    UnknownVoice { provider: String, voice: String },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("backend '{0}' is not available")]
    BackendUnavailable(String),

    #[error("synthesis timed out after {0} seconds")]
    Timeout(u64),

    #[error("synthesis failed: {0}")]
    Synthesis(String),

    #[error("transcode failed: {0}")]
    Transcode(String),

    #[error("bridge protocol error: {0}")]
    BridgeProtocol(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TtsError {
    /// Whether the failure indicates the backend itself is gone, so its
    /// availability flag should be re-checked before the next dispatch.
    pub fn is_unavailability(&self) -> bool {
        matches!(self, TtsError::BackendUnavailable(_))
    }
}
