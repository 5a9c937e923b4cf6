//! Spotify Web API client for playsync.
//!
//! This crate provides what the playlist features need from Spotify:
//!
//! - **Token store**: JSON file holding the OAuth tokens between runs
//! - **Auth**: authorization-code exchange and access-token refresh
//! - **Client**: authenticated requests with 401 refresh, 429 back-off and
//!   pagination, plus the playlist/library operations built on them

mod auth;
mod client;
mod error;
mod token_store;
mod types;

pub use auth::{DEFAULT_ACCOUNTS_URL, SCOPES, SpotifyAuth, SpotifyCredentials};
pub use client::{DEFAULT_API_URL, SpotifyClient};
pub use error::SpotifyError;
pub use token_store::{TokenData, TokenStore};
pub use types::*;
