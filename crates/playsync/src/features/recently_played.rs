//! Collect recently played tracks into a review playlist.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::{debug, info};

use playsync_scheduler::Task;
use playsync_spotify::{SpotifyClient, Track};

use super::FeatureError;

/// Scheduler task name.
pub const RECENTLY_PLAYED_TASK: &str = "recentlyPlayedToReview";

pub const REVIEW_PLAYLIST_DESCRIPTION: &str =
    "Auto-collected recently played tracks to review later";

/// Cursor persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewState {
    /// Only plays strictly after this epoch-millisecond time are fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_after_ms: Option<i64>,
}

/// JSON file holding the [`ReviewState`].
#[derive(Debug, Clone)]
pub struct ReviewStateStore {
    path: PathBuf,
}

impl ReviewStateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Missing or unreadable state starts from scratch.
    pub async fn load(&self) -> ReviewState {
        let Ok(content) = fs::read_to_string(&self.path).await else {
            return ReviewState::default();
        };
        serde_json::from_str(&content).unwrap_or_else(|e| {
            debug!(path = %self.path.display(), error = %e, "ignoring unreadable review state");
            ReviewState::default()
        })
    }

    pub async fn save(&self, state: &ReviewState) -> Result<(), FeatureError> {
        fs::write(&self.path, serde_json::to_string_pretty(state)?).await?;
        Ok(())
    }
}

/// Adds newly played, not-yet-liked tracks to the review playlist.
pub struct RecentlyPlayedToReview {
    client: Arc<SpotifyClient>,
    state: ReviewStateStore,
    playlist_name: String,
}

impl RecentlyPlayedToReview {
    pub fn new(
        client: Arc<SpotifyClient>,
        state: ReviewStateStore,
        playlist_name: impl Into<String>,
    ) -> Self {
        Self {
            client,
            state,
            playlist_name: playlist_name.into(),
        }
    }

    /// Wrap the feature as a scheduler task running every `interval`.
    pub fn into_task(self, interval: Duration) -> Task {
        let feature = Arc::new(self);
        Task::new(RECENTLY_PLAYED_TASK, interval, move || {
            let feature = Arc::clone(&feature);
            async move { feature.run().await.map(|_| ()) }
        })
    }

    /// One poll. Returns the number of tracks added.
    #[tracing::instrument(skip(self), fields(playlist = %self.playlist_name))]
    pub async fn run(&self) -> Result<usize, FeatureError> {
        let mut state = self.state.load().await;
        let recent = self.client.recently_played(state.last_after_ms).await?;

        if recent.items.is_empty() {
            info!("no new plays");
            return Ok(0);
        }

        let candidates = catalog_tracks(recent.items.iter().filter_map(|i| i.track.as_ref()));

        let added = if candidates.is_empty() {
            0
        } else {
            let ids: Vec<String> = candidates.iter().map(|(id, _)| id.clone()).collect();
            let liked = self.client.saved_contains(&ids).await?;

            let playlist_id = self
                .client
                .find_or_create_playlist(&self.playlist_name, REVIEW_PLAYLIST_DESCRIPTION)
                .await?;
            let existing = self.client.playlist_track_uris(&playlist_id).await?;

            let to_add = select_new(&candidates, &liked, &existing);
            self.client.add_to_playlist(&playlist_id, &to_add).await?
        };

        if let Some(latest) = recent.latest_played_at_ms() {
            state.last_after_ms = Some(latest + 1);
            self.state.save(&state).await?;
        }

        info!(added, "added tracks to review playlist");
        Ok(added)
    }
}

/// `(id, uri)` of every catalog track, first occurrence only.
fn catalog_tracks<'a>(tracks: impl Iterator<Item = &'a Track>) -> Vec<(String, String)> {
    let mut seen = HashSet::new();
    tracks
        .filter(|t| t.is_catalog_track())
        .filter_map(|t| Some((t.id.clone()?, t.uri.clone()?)))
        .filter(|(_, uri)| seen.insert(uri.clone()))
        .collect()
}

/// URIs of candidates that are neither liked nor already in the playlist.
fn select_new(
    candidates: &[(String, String)],
    liked_ids: &HashSet<String>,
    existing_uris: &HashSet<String>,
) -> Vec<String> {
    candidates
        .iter()
        .filter(|(id, uri)| !liked_ids.contains(id) && !existing_uris.contains(uri))
        .map(|(_, uri)| uri.clone())
        .collect()
}
