//! Spotify Web API client.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, warn};

use crate::{
    Paging, PlaylistSummary, RecentlyPlayed, SnapshotResponse, SpotifyAuth, SpotifyError,
    TrackItem, User,
};

/// Spotify Web API base.
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// 429 responses tolerated per request before giving up.
const MAX_RATE_LIMIT_RETRIES: u32 = 5;

/// Upper bound on a single Retry-After wait.
const MAX_RETRY_AFTER_SECS: u64 = 60;

/// Tracks accepted per playlist-add request.
const PLAYLIST_ADD_BATCH: usize = 100;

/// Ids accepted per library request.
const LIBRARY_BATCH: usize = 50;

/// Authenticated client for the endpoints playsync uses.
pub struct SpotifyClient {
    http: Client,
    api_url: String,
    auth: Arc<SpotifyAuth>,
}

impl SpotifyClient {
    pub fn new(auth: Arc<SpotifyAuth>) -> Self {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .build()
            .expect("failed to build HTTP client");

        Self {
            http,
            api_url: DEFAULT_API_URL.to_string(),
            auth,
        }
    }

    /// Point at a different Web API base (used by tests).
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    pub fn auth(&self) -> &SpotifyAuth {
        &self.auth
    }

    /// Paths are relative to the API base; absolute URLs (pagination
    /// `next` links) are used as-is.
    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.api_url, path)
        }
    }

    /// Send a request, refreshing once on 401 and waiting out 429s.
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<T, SpotifyError> {
        let url = self.url(path);
        let mut token = self.auth.valid_token().await?;
        let mut refreshed = false;
        let mut rate_limited = 0;

        loop {
            let mut request = self
                .http
                .request(method.clone(), &url)
                .bearer_auth(&token.access_token);
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            if status == StatusCode::UNAUTHORIZED && !refreshed {
                debug!(%url, "access token rejected, refreshing");
                refreshed = true;
                token = self.auth.force_refresh().await?;
                continue;
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after_secs = response
                    .headers()
                    .get("Retry-After")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok());

                if rate_limited >= MAX_RATE_LIMIT_RETRIES {
                    return Err(SpotifyError::RateLimited { retry_after_secs });
                }
                rate_limited += 1;

                let wait = retry_after_secs.unwrap_or(1).clamp(1, MAX_RETRY_AFTER_SECS);
                warn!(
                    %url,
                    attempt = rate_limited,
                    wait_secs = wait,
                    "rate limited by Spotify, retrying"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return Self::handle_response(response).await;
        }
    }

    /// Map error statuses and parse the JSON body. An empty success body
    /// deserializes as JSON `null`, so `()` works for bodiless endpoints.
    async fn handle_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, SpotifyError> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            return Err(SpotifyError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(serde_json::Value::Null)?);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, SpotifyError> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, SpotifyError> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, SpotifyError> {
        self.request(Method::PUT, path, Some(body)).await
    }

    /// Collect every item of a paginated listing by following `next`.
    async fn get_all<T: DeserializeOwned>(&self, first: &str) -> Result<Vec<T>, SpotifyError> {
        let mut items = Vec::new();
        let mut next = Some(first.to_string());

        while let Some(url) = next {
            let page: Paging<T> = self.get(&url).await?;
            items.extend(page.items);
            next = page.next;
        }

        Ok(items)
    }

    /// The current user.
    pub async fn me(&self) -> Result<User, SpotifyError> {
        self.get("/me").await
    }

    /// Every playlist the current user owns or follows.
    pub async fn my_playlists(&self) -> Result<Vec<PlaylistSummary>, SpotifyError> {
        self.get_all("/me/playlists?limit=50").await
    }

    /// First playlist whose name matches case-insensitively.
    pub async fn find_playlist(
        &self,
        name: &str,
    ) -> Result<Option<PlaylistSummary>, SpotifyError> {
        Ok(self
            .my_playlists()
            .await?
            .into_iter()
            .find(|p| p.is_named(name)))
    }

    /// Create a playlist for `user_id`.
    pub async fn create_playlist(
        &self,
        user_id: &str,
        name: &str,
        description: &str,
        public: bool,
    ) -> Result<PlaylistSummary, SpotifyError> {
        let body = json!({
            "name": name,
            "description": description,
            "public": public,
        });
        self.post(&format!("/users/{}/playlists", user_id), &body)
            .await
    }

    /// Id of the playlist named `name`, creating a private one if needed.
    pub async fn find_or_create_playlist(
        &self,
        name: &str,
        description: &str,
    ) -> Result<String, SpotifyError> {
        if let Some(existing) = self.find_playlist(name).await? {
            return Ok(existing.id);
        }

        let user = self.me().await?;
        let created = self
            .create_playlist(&user.id, name, description, false)
            .await?;
        debug!(playlist = %name, id = %created.id, "created playlist");
        Ok(created.id)
    }

    /// URIs of every non-local track in a playlist.
    pub async fn playlist_track_uris(
        &self,
        playlist_id: &str,
    ) -> Result<HashSet<String>, SpotifyError> {
        let items: Vec<TrackItem> = self
            .get_all(&format!("/playlists/{}/tracks?limit=100", playlist_id))
            .await?;
        Ok(collect_uris(&items))
    }

    /// URIs of every non-local track in the user's library.
    pub async fn saved_track_uris(&self) -> Result<HashSet<String>, SpotifyError> {
        let items: Vec<TrackItem> = self.get_all("/me/tracks?limit=50").await?;
        Ok(collect_uris(&items))
    }

    /// Which of `ids` are already in the user's library.
    pub async fn saved_contains(&self, ids: &[String]) -> Result<HashSet<String>, SpotifyError> {
        let mut saved = HashSet::new();

        for chunk in ids.chunks(LIBRARY_BATCH) {
            let mut url = reqwest::Url::parse(&self.url("/me/tracks/contains"))
                .map_err(|e| SpotifyError::InvalidUrl(e.to_string()))?;
            url.query_pairs_mut().append_pair("ids", &chunk.join(","));

            let flags: Vec<bool> = self.get(url.as_str()).await?;
            saved.extend(
                chunk
                    .iter()
                    .zip(flags)
                    .filter(|(_, liked)| *liked)
                    .map(|(id, _)| id.clone()),
            );
        }

        Ok(saved)
    }

    /// Up to 50 plays strictly after `after_ms` (epoch milliseconds).
    pub async fn recently_played(
        &self,
        after_ms: Option<i64>,
    ) -> Result<RecentlyPlayed, SpotifyError> {
        let path = match after_ms {
            Some(after) => format!("/me/player/recently-played?limit=50&after={}", after),
            None => "/me/player/recently-played?limit=50".to_string(),
        };
        self.get(&path).await
    }

    /// Append `uris` to a playlist in batches. Returns the number added.
    pub async fn add_to_playlist(
        &self,
        playlist_id: &str,
        uris: &[String],
    ) -> Result<usize, SpotifyError> {
        let path = format!("/playlists/{}/tracks", playlist_id);

        for batch in uris.chunks(PLAYLIST_ADD_BATCH) {
            let _: SnapshotResponse = self.post(&path, &json!({ "uris": batch })).await?;
        }

        Ok(uris.len())
    }

    /// Save track ids to the user's library in batches.
    pub async fn save_tracks(&self, ids: &[String]) -> Result<usize, SpotifyError> {
        for batch in ids.chunks(LIBRARY_BATCH) {
            let _: serde_json::Value = self.put("/me/tracks", &json!({ "ids": batch })).await?;
        }

        Ok(ids.len())
    }
}

fn collect_uris(items: &[TrackItem]) -> HashSet<String> {
    items
        .iter()
        .filter_map(TrackItem::remote_uri)
        .map(str::to_string)
        .collect()
}

/// Web API error envelope.
#[derive(Debug, serde::Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}
