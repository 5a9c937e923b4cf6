//! Web routes.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use playsync_spotify::SpotifyAuth;

use crate::WebError;

/// Shared state for the web server.
pub struct AppState {
    pub auth: Arc<SpotifyAuth>,
}

impl AppState {
    pub fn new(auth: Arc<SpotifyAuth>) -> Self {
        Self { auth }
    }
}

/// Create the authorization router.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login))
        .route("/callback", get(callback))
        .route("/auth-ok", get(auth_ok))
        .route("/auth-status", get(auth_status))
        .route("/logout", axum::routing::delete(logout))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(r#"<p>playsync is running. <a href="/login">Log in with Spotify</a></p>"#)
}

async fn login(State(state): State<Arc<AppState>>) -> Result<Redirect, WebError> {
    let url = state.auth.authorize_url()?;
    Ok(Redirect::to(&url))
}

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
}

async fn callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Response {
    let Some(code) = params.code.filter(|c| !c.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing code").into_response();
    };

    match state.auth.exchange_code(&code).await {
        Ok(token) => {
            info!(user_id = %token.user_id, "login complete");
            Redirect::to("/auth-ok").into_response()
        }
        Err(e) => {
            error!(error = %e, "authorization code exchange failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Auth failed").into_response()
        }
    }
}

async fn auth_ok() -> &'static str {
    "Spotify authorization complete. You can close this tab."
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AuthStatus {
    logged_in: bool,
    user_id: Option<String>,
}

async fn auth_status(State(state): State<Arc<AppState>>) -> Json<AuthStatus> {
    let token = state.auth.store().load().await.unwrap_or_default();
    let logged_in = token.is_authorized();
    Json(AuthStatus {
        logged_in,
        user_id: Some(token.user_id).filter(|id| logged_in && !id.is_empty()),
    })
}

async fn logout(State(state): State<Arc<AppState>>) -> Result<&'static str, WebError> {
    state.auth.store().clear().await?;
    info!("stored Spotify token cleared");
    Ok("Logged out")
}
