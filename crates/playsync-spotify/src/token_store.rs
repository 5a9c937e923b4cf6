//! File-backed OAuth token storage.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::fs;
use tracing::debug;

use crate::SpotifyError;

/// Tokens persisted between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenData {
    pub access_token: String,
    pub refresh_token: String,
    /// Access token expiry, epoch milliseconds.
    pub expiry: i64,
    pub user_id: String,
}

impl TokenData {
    /// A refresh token is present, so the account has been authorized.
    pub fn is_authorized(&self) -> bool {
        !self.refresh_token.is_empty()
    }

    /// The access token is missing or expires within `margin_ms`.
    pub fn needs_refresh(&self, now_ms: i64, margin_ms: i64) -> bool {
        self.access_token.is_empty() || now_ms > self.expiry - margin_ms
    }
}

/// JSON file holding a single [`TokenData`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token.
    ///
    /// A missing or unreadable file means "no token".
    pub async fn load(&self) -> Option<TokenData> {
        let content = fs::read_to_string(&self.path).await.ok()?;
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring unreadable token file");
                None
            }
        }
    }

    pub async fn save(&self, token: &TokenData) -> Result<(), SpotifyError> {
        let json = serde_json::to_string_pretty(token)?;
        fs::write(&self.path, json).await?;
        Ok(())
    }

    /// Overwrite the stored token with an empty one.
    pub async fn clear(&self) -> Result<(), SpotifyError> {
        self.save(&TokenData::default()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sample() -> TokenData {
        TokenData {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            expiry: 1_700_000_000_000,
            user_id: "user-1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        assert_eq!(store.load().await, None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample()).await.unwrap();
        assert_eq!(store.load().await, Some(sample()));
    }

    #[tokio::test]
    async fn test_file_uses_camel_case_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample()).await.unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value["accessToken"], "access");
        assert_eq!(value["refreshToken"], "refresh");
        assert_eq!(value["userId"], "user-1");
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(TokenStore::new(path).load().await, None);
    }

    #[tokio::test]
    async fn test_clear_leaves_unauthorized_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = TokenStore::new(dir.path().join("token.json"));
        store.save(&sample()).await.unwrap();
        store.clear().await.unwrap();

        let token = store.load().await.unwrap();
        assert!(!token.is_authorized());
        assert!(token.access_token.is_empty());
    }

    #[test]
    fn test_needs_refresh() {
        let token = sample();
        let margin = 5 * 60 * 1000;
        assert!(!token.needs_refresh(token.expiry - margin - 1, margin));
        assert!(token.needs_refresh(token.expiry - margin + 1, margin));

        let empty_access = TokenData {
            access_token: String::new(),
            ..sample()
        };
        assert!(empty_access.needs_refresh(0, margin));
    }
}
