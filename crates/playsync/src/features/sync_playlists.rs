//! Keep two track collections in sync.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use playsync_scheduler::Task;
use playsync_spotify::SpotifyClient;

use super::{FeatureError, PlaylistRef};

/// Scheduler task name.
pub const SYNC_PLAYLISTS_TASK: &str = "syncPlaylists";

/// Tracks added in one sync run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub added_to_target: usize,
    pub added_to_reference: usize,
}

/// Copies reference tracks missing from the target, and optionally the reverse.
pub struct SyncPlaylists {
    client: Arc<SpotifyClient>,
    reference: PlaylistRef,
    target: PlaylistRef,
    both_ways: bool,
}

/// A resolved side with its current contents.
struct Side<'a> {
    playlist: &'a PlaylistRef,
    /// Playlist id, `None` for saved tracks.
    id: Option<String>,
    uris: HashSet<String>,
}

impl SyncPlaylists {
    pub fn new(
        client: Arc<SpotifyClient>,
        reference: PlaylistRef,
        target: PlaylistRef,
        both_ways: bool,
    ) -> Self {
        Self {
            client,
            reference,
            target,
            both_ways,
        }
    }

    /// Wrap the feature as a scheduler task running every `interval`.
    pub fn into_task(self, interval: Duration) -> Task {
        let feature = Arc::new(self);
        Task::new(SYNC_PLAYLISTS_TASK, interval, move || {
            let feature = Arc::clone(&feature);
            async move { feature.run().await.map(|_| ()) }
        })
    }

    #[tracing::instrument(skip(self), fields(reference = %self.reference, target = %self.target))]
    pub async fn run(&self) -> Result<SyncReport, FeatureError> {
        let reference = self.resolve(&self.reference).await?;
        let target = self.resolve(&self.target).await?;

        let mut report = SyncReport::default();

        let missing = missing_from(&reference.uris, &target.uris);
        report.added_to_target = self.add(&target, &missing).await?;
        info!(added = report.added_to_target, "synced reference into target");

        if self.both_ways {
            let missing = missing_from(&target.uris, &reference.uris);
            report.added_to_reference = self.add(&reference, &missing).await?;
            info!(
                added = report.added_to_reference,
                "synced target into reference"
            );
        }

        Ok(report)
    }

    async fn resolve<'a>(&self, playlist: &'a PlaylistRef) -> Result<Side<'a>, FeatureError> {
        match playlist {
            PlaylistRef::Saved => Ok(Side {
                playlist,
                id: None,
                uris: self.client.saved_track_uris().await?,
            }),
            PlaylistRef::Named(name) => {
                let found = self
                    .client
                    .find_playlist(name)
                    .await?
                    .ok_or_else(|| FeatureError::PlaylistNotFound(name.clone()))?;
                let uris = self.client.playlist_track_uris(&found.id).await?;
                Ok(Side {
                    playlist,
                    id: Some(found.id),
                    uris,
                })
            }
        }
    }

    async fn add(&self, side: &Side<'_>, uris: &[String]) -> Result<usize, FeatureError> {
        if uris.is_empty() {
            return Ok(0);
        }

        match &side.id {
            Some(id) => Ok(self.client.add_to_playlist(id, uris).await?),
            None => {
                let ids = track_ids(uris);
                if ids.len() < uris.len() {
                    warn!(
                        skipped = uris.len() - ids.len(),
                        playlist = %side.playlist,
                        "only tracks can be saved to the library"
                    );
                }
                Ok(self.client.save_tracks(&ids).await?)
            }
        }
    }
}

/// Entries of `from` not in `into`, sorted for a stable request order.
fn missing_from(from: &HashSet<String>, into: &HashSet<String>) -> Vec<String> {
    let mut missing: Vec<String> = from.difference(into).cloned().collect();
    missing.sort();
    missing
}

/// Track ids from `spotify:track:<id>` URIs; other URIs are dropped.
fn track_ids(uris: &[String]) -> Vec<String> {
    uris.iter()
        .filter_map(|uri| uri.strip_prefix("spotify:track:"))
        .map(str::to_string)
        .collect()
}
