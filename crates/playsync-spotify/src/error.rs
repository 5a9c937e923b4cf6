//! Error types for the Spotify client.

use thiserror::Error;

/// Errors that can occur when talking to Spotify.
#[derive(Debug, Error)]
pub enum SpotifyError {
    /// No usable token is stored; the one-time login has not happened.
    #[error("not authorized yet: visit /login to authorize with Spotify")]
    NotAuthorized,

    /// Token exchange or refresh failed.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Token file could not be read or written.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error status returned by the Web API.
    #[error("Spotify API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Still rate limited after the retry budget was spent.
    #[error("rate limited{}", match retry_after_secs {
        Some(secs) => format!(" (retry after {}s)", secs),
        None => String::new(),
    })]
    RateLimited {
        /// Seconds to wait before retrying (from Retry-After header, optional).
        retry_after_secs: Option<u64>,
    },

    /// Invalid URL built from configuration.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}
