//! Scheduled playlist features.
//!
//! Each feature is a struct holding the shared [`SpotifyClient`] plus its own
//! settings, with a `run` method and an `into_task` that hands it to the
//! scheduler.

mod recently_played;
mod sync_playlists;

use std::fmt;

use thiserror::Error;

use playsync_spotify::SpotifyError;

pub use recently_played::{RecentlyPlayedToReview, ReviewStateStore};
pub use sync_playlists::SyncPlaylists;

/// Playlist name that stands for the user's saved tracks.
pub const SAVED_TRACKS: &str = "_saved";

/// Errors from a single feature run.
#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Spotify(#[from] SpotifyError),

    /// A configured playlist does not exist.
    #[error("playlist not found: {0}")]
    PlaylistNotFound(String),

    /// State file could not be written.
    #[error("state file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("state JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One side of a playlist sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaylistRef {
    /// The user's saved tracks ("Liked Songs" in the app).
    Saved,
    /// A playlist found by case-insensitive name.
    Named(String),
}

impl PlaylistRef {
    pub fn parse(name: &str) -> Self {
        if name == SAVED_TRACKS {
            PlaylistRef::Saved
        } else {
            PlaylistRef::Named(name.to_string())
        }
    }
}

impl fmt::Display for PlaylistRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaylistRef::Saved => write!(f, "saved tracks"),
            PlaylistRef::Named(name) => write!(f, "\"{}\"", name),
        }
    }
}
