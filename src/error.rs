//! Error taxonomy for the media browser core.
//!
//! Network failures are never fatal: callers degrade to a smaller,
//! explicitly scoped local result and surface a non-blocking notice.
//! State-guard violations (double exits, pops on an empty stack,
//! re-entrant select-all) are silent no-ops and never reach this type.

use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum MedleyError {
    /// A remote request failed (listing fetch, bulk apply).
    #[error("network request failed: {0}")]
    Network(String),

    /// The server answered but the payload could not be decoded.
    #[error("malformed server response: {0}")]
    BadResponse(String),

    /// Configuration could not be loaded or parsed.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MedleyError {
    pub fn network(err: impl std::fmt::Display) -> Self {
        Self::Network(err.to_string())
    }

    pub fn bad_response(err: impl std::fmt::Display) -> Self {
        Self::BadResponse(err.to_string())
    }
}
