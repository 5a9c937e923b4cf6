//! Web API response models.
//!
//! Only the fields playsync reads are modelled; everything else in the
//! payloads is ignored.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The current user (`GET /me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// One page of an offset-paginated listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    /// Absolute URL of the next page, if any.
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub total: Option<u32>,
}

/// A playlist as listed under `/me/playlists`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl PlaylistSummary {
    /// Case-insensitive name comparison; unnamed playlists never match.
    pub fn is_named(&self, name: &str) -> bool {
        self.name
            .as_deref()
            .is_some_and(|n| n.to_lowercase() == name.to_lowercase())
    }
}

/// A track object. Playlists may also hold episodes, hence the optional
/// fields and the `type` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub is_local: bool,
}

impl Track {
    /// A real catalog track with both an id and a URI.
    pub fn is_catalog_track(&self) -> bool {
        self.kind.as_deref() == Some("track") && self.id.is_some() && self.uri.is_some()
    }
}

/// Entry of a playlist's or the library's track listing.
#[derive(Debug, Clone, Deserialize)]
pub struct TrackItem {
    #[serde(default)]
    pub track: Option<Track>,
}

impl TrackItem {
    /// URI of a non-local track, if present.
    pub fn remote_uri(&self) -> Option<&str> {
        self.track
            .as_ref()
            .filter(|t| !t.is_local)
            .and_then(|t| t.uri.as_deref())
    }
}

/// One entry of `/me/player/recently-played`.
#[derive(Debug, Clone, Deserialize)]
pub struct PlayHistory {
    #[serde(default)]
    pub track: Option<Track>,
    pub played_at: DateTime<Utc>,
}

/// Cursor-paginated response of `/me/player/recently-played`.
#[derive(Debug, Clone, Deserialize)]
pub struct RecentlyPlayed {
    #[serde(default)]
    pub items: Vec<PlayHistory>,
    #[serde(default)]
    pub next: Option<String>,
}

impl RecentlyPlayed {
    /// Latest `played_at` in the page, as epoch milliseconds.
    pub fn latest_played_at_ms(&self) -> Option<i64> {
        self.items.iter().map(|i| i.played_at.timestamp_millis()).max()
    }
}

/// Token endpoint response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    /// Present on code exchange; optional (rotated) on refresh.
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: u64,
}

/// Snapshot id returned by playlist mutations.
#[derive(Debug, Clone, Deserialize)]
pub struct SnapshotResponse {
    #[serde(default)]
    pub snapshot_id: Option<String>,
}
