//! Daemon command: the authorization web server plus the task scheduler.
//!
//! Both run until SIGINT/SIGTERM. The signal flips a shared watch channel;
//! the scheduler finishes the task it is running (if any) and returns, and
//! the web server drains its connections.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use playsync_scheduler::{Scheduler, SchedulerConfig, StopReason, Task};
use playsync_spotify::{SpotifyAuth, SpotifyClient, SpotifyCredentials, TokenStore};
use playsync_web::{AppState, create_router};

use crate::features::{PlaylistRef, RecentlyPlayedToReview, ReviewStateStore, SyncPlaylists};
use crate::signals::ShutdownSignals;

/// Configuration for the daemon.
#[derive(Debug, Clone)]
pub struct DaemonConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    pub port: u16,
    pub token_path: PathBuf,
    pub poll_interval: Duration,
    pub review_state_path: PathBuf,
    pub review_playlist_name: String,
    pub sync_enabled: bool,
    pub sync_interval: Duration,
    pub sync_reference: String,
    pub sync_target: String,
    pub sync_both_ways: bool,
    pub scheduler: SchedulerConfig,
}

/// Run the daemon until a shutdown signal arrives.
pub async fn run(config: DaemonConfig) -> Result<StopReason> {
    info!("starting playsync daemon");

    let credentials = SpotifyCredentials {
        client_id: config.client_id.clone(),
        client_secret: config.client_secret.clone(),
        redirect_uri: config.redirect_uri.clone(),
    };
    let auth = Arc::new(SpotifyAuth::new(
        credentials,
        TokenStore::new(&config.token_path),
    ));
    let client = Arc::new(SpotifyClient::new(Arc::clone(&auth)));

    let scheduler = Scheduler::with_config(build_tasks(&config, &client), config.scheduler.clone())
        .map_err(|e| miette::miette!("{}", e))?;
    info!(config = ?scheduler.config(), "scheduler configured");

    let authorized = auth
        .store()
        .load()
        .await
        .is_some_and(|t| t.is_authorized());
    if !authorized {
        warn!(
            "not authorized yet: visit http://localhost:{}/login once",
            config.port
        );
    }

    let signals = ShutdownSignals::install()
        .map_err(|e| miette::miette!("failed to install signal handlers: {}", e))?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        signals.recv().await;
        let _ = shutdown_tx.send(true);
    });

    let listener = TcpListener::bind(("0.0.0.0", config.port))
        .await
        .map_err(|e| miette::miette!("failed to bind port {}: {}", config.port, e))?;
    info!("auth server listening on http://localhost:{}", config.port);

    let router = create_router(Arc::new(AppState::new(Arc::clone(&auth))));
    let mut web_shutdown = shutdown_rx.clone();
    let web_handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                // A closed channel also ends the server.
                let _ = web_shutdown.wait_for(|stop| *stop).await;
            })
            .await
    });

    let reason = scheduler.run(shutdown_rx).await;

    match web_handle.await {
        Ok(Ok(())) => info!("auth server stopped"),
        Ok(Err(e)) => warn!(error = %e, "auth server error"),
        Err(e) => warn!(error = %e, "auth server task panicked"),
    }

    Ok(reason)
}

/// Tasks enabled by `config`.
fn build_tasks(config: &DaemonConfig, client: &Arc<SpotifyClient>) -> Vec<Task> {
    let mut tasks = vec![
        RecentlyPlayedToReview::new(
            Arc::clone(client),
            ReviewStateStore::new(&config.review_state_path),
            config.review_playlist_name.clone(),
        )
        .into_task(config.poll_interval),
    ];

    if config.sync_enabled {
        tasks.push(
            SyncPlaylists::new(
                Arc::clone(client),
                PlaylistRef::parse(&config.sync_reference),
                PlaylistRef::parse(&config.sync_target),
                config.sync_both_ways,
            )
            .into_task(config.sync_interval),
        );
    }

    tasks
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(dir: &tempfile::TempDir) -> DaemonConfig {
        DaemonConfig {
            client_id: "client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:3000/callback".to_string(),
            port: 0,
            token_path: dir.path().join("token.json"),
            poll_interval: Duration::from_millis(180_000),
            review_state_path: dir.path().join("review.json"),
            review_playlist_name: "review".to_string(),
            sync_enabled: false,
            sync_interval: Duration::from_millis(300_000),
            sync_reference: "_saved".to_string(),
            sync_target: "Liked Songs".to_string(),
            sync_both_ways: false,
            scheduler: SchedulerConfig::default(),
        }
    }

    fn test_client(config: &DaemonConfig) -> Arc<SpotifyClient> {
        let credentials = SpotifyCredentials {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri: config.redirect_uri.clone(),
        };
        let auth = SpotifyAuth::new(credentials, TokenStore::new(&config.token_path));
        Arc::new(SpotifyClient::new(Arc::new(auth)))
    }

    #[test]
    fn test_review_task_only_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let tasks = build_tasks(&config, &test_client(&config));

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].name, "recentlyPlayedToReview");
        assert_eq!(tasks[0].interval, Duration::from_millis(180_000));
        assert_eq!(tasks[0].initial_delay, None);
    }

    #[test]
    fn test_sync_task_when_enabled() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            sync_enabled: true,
            ..test_config(&dir)
        };
        let tasks = build_tasks(&config, &test_client(&config));

        let names: Vec<&str> = tasks.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["recentlyPlayedToReview", "syncPlaylists"]);
        assert_eq!(tasks[1].interval, Duration::from_millis(300_000));
    }

    #[tokio::test]
    async fn test_tasks_are_accepted_by_scheduler() {
        let dir = tempfile::tempdir().unwrap();
        let config = DaemonConfig {
            sync_enabled: true,
            ..test_config(&dir)
        };
        let scheduler = Scheduler::with_config(
            build_tasks(&config, &test_client(&config)),
            config.scheduler.clone(),
        )
        .unwrap();
        assert_eq!(scheduler.task_names().count(), 2);
        assert_eq!(scheduler.config(), &SchedulerConfig::default());
    }

    #[tokio::test]
    async fn test_review_task_fails_without_login() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(&dir);
        let tasks = build_tasks(&config, &test_client(&config));

        let err = (tasks[0].action)().await.unwrap_err();
        assert!(err.to_string().contains("not authorized"));
    }
}
