//! Authorization web routes for playsync.
//!
//! The daemon needs a refresh token before any scheduled work can talk to
//! Spotify. This crate serves the small web flow that obtains one:
//! - `/login` sends the user to Spotify's consent screen
//! - `/callback` exchanges the returned code and stores the tokens
//! - `/auth-status` and `/logout` inspect and clear the stored token

mod error;
mod routes;

pub use error::WebError;
pub use routes::{AppState, create_router};
