//! playsync: scheduled Spotify playlist automation
//!
//! Main binary with subcommands:
//! - `daemon`: authorization web server plus the playlist task scheduler
//! - `auth-status`: report whether a Spotify token is stored

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use playsync_scheduler::SchedulerConfig;
use playsync_spotify::TokenStore;

mod daemon;
mod features;
mod signals;

/// Parse boolean from environment variable, accepting common truthy values.
/// Accepts "1", "true", "yes", "on" (case-insensitive) as true.
/// Accepts "0", "false", "no", "off", "" (case-insensitive) as false.
fn parse_bool_env(s: &str) -> Result<bool, String> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(format!(
            "invalid boolean value '{}', expected 1/true/yes/on or 0/false/no/off",
            s
        )),
    }
}

/// Parse a positive millisecond interval.
fn parse_interval_ms(s: &str) -> Result<Duration, String> {
    match s.trim().parse::<u64>() {
        Ok(0) => Err("interval must be greater than zero".to_string()),
        Ok(ms) => Ok(Duration::from_millis(ms)),
        Err(e) => Err(format!("invalid interval '{}': {}", s, e)),
    }
}

/// Parse a jitter fraction in `[0, 1)`.
fn parse_jitter_pct(s: &str) -> Result<f64, String> {
    let pct: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid jitter '{}': {}", s, e))?;
    if (0.0..1.0).contains(&pct) {
        Ok(pct)
    } else {
        Err(format!("jitter must be in [0, 1), got {}", pct))
    }
}

/// Parse a failure backoff multiplier of at least 1.
fn parse_failure_backoff(s: &str) -> Result<f64, String> {
    let factor: f64 = s
        .trim()
        .parse()
        .map_err(|e| format!("invalid backoff '{}': {}", s, e))?;
    if factor.is_finite() && factor >= 1.0 {
        Ok(factor)
    } else {
        Err(format!("backoff must be at least 1, got {}", factor))
    }
}

#[derive(Parser)]
#[command(name = "playsync")]
#[command(about = "Scheduled Spotify playlist automation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the auth web server and the playlist scheduler
    Daemon {
        /// Spotify application client id
        #[arg(long, env = "SPOTIFY_CLIENT_ID")]
        client_id: String,

        /// Spotify application client secret
        #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
        client_secret: String,

        /// OAuth redirect URI registered with Spotify
        #[arg(
            long,
            env = "SPOTIFY_REDIRECT_URI",
            default_value = "http://localhost:3000/callback"
        )]
        redirect_uri: String,

        /// Auth web server port
        #[arg(long, env = "PORT", default_value = "3000")]
        port: u16,

        /// Token file
        #[arg(long, env = "TOKEN_PATH", default_value = ".spotify-token.json")]
        token_path: PathBuf,

        /// Recently-played poll interval in milliseconds
        #[arg(long, env = "POLL_MS", default_value = "180000", value_parser = parse_interval_ms)]
        poll_ms: Duration,

        /// Review cursor state file
        #[arg(long, env = "REVIEW_STATE_PATH", default_value = ".review-state.json")]
        review_state_path: PathBuf,

        /// Name of the review playlist
        #[arg(long, env = "REVIEW_PLAYLIST_NAME", default_value = "review")]
        review_playlist_name: String,

        /// Enable the playlist sync task
        #[arg(long, env = "SYNC_ENABLED", value_parser = parse_bool_env, action = clap::ArgAction::Set, default_value = "false")]
        sync_enabled: bool,

        /// Playlist sync interval in milliseconds
        #[arg(long, env = "SYNC_MS", default_value = "300000", value_parser = parse_interval_ms)]
        sync_ms: Duration,

        /// Sync reference playlist ("_saved" for saved tracks)
        #[arg(long, env = "SYNC_REF_PLAYLIST_NAME", default_value = "_saved")]
        sync_ref_playlist_name: String,

        /// Sync target playlist ("_saved" for saved tracks)
        #[arg(long, env = "SYNC_TARGET_PLAYLIST_NAME", default_value = "Liked Songs")]
        sync_target_playlist_name: String,

        /// Also copy target-only tracks back into the reference
        #[arg(long, env = "SYNC_BOTH_WAY", value_parser = parse_bool_env, action = clap::ArgAction::Set, default_value = "false")]
        sync_both_way: bool,

        /// Fraction of each interval added or removed at random
        #[arg(long, env = "SCHEDULER_JITTER_PCT", default_value = "0.2", value_parser = parse_jitter_pct)]
        scheduler_jitter_pct: f64,

        /// Interval multiplier applied after a failed run
        #[arg(long, env = "SCHEDULER_FAILURE_BACKOFF", default_value = "1.5", value_parser = parse_failure_backoff)]
        scheduler_failure_backoff: f64,

        /// Process exit code after a graceful stop
        #[arg(long, env = "STOP_EXIT_CODE", default_value = "1")]
        stop_exit_code: i32,
    },

    /// Report whether a Spotify token is stored
    AuthStatus {
        /// Token file
        #[arg(long, env = "TOKEN_PATH", default_value = ".spotify-token.json")]
        token_path: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| {
                "playsync=info,playsync_scheduler=info,playsync_spotify=info,playsync_web=info"
                    .to_string()
            }),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Daemon {
            client_id,
            client_secret,
            redirect_uri,
            port,
            token_path,
            poll_ms,
            review_state_path,
            review_playlist_name,
            sync_enabled,
            sync_ms,
            sync_ref_playlist_name,
            sync_target_playlist_name,
            sync_both_way,
            scheduler_jitter_pct,
            scheduler_failure_backoff,
            stop_exit_code,
        } => {
            let reason = daemon::run(daemon::DaemonConfig {
                client_id,
                client_secret,
                redirect_uri,
                port,
                token_path,
                poll_interval: poll_ms,
                review_state_path,
                review_playlist_name,
                sync_enabled,
                sync_interval: sync_ms,
                sync_reference: sync_ref_playlist_name,
                sync_target: sync_target_playlist_name,
                sync_both_ways: sync_both_way,
                scheduler: SchedulerConfig {
                    jitter_pct: scheduler_jitter_pct,
                    failure_backoff: scheduler_failure_backoff,
                    ..SchedulerConfig::default()
                },
            })
            .await?;

            tracing::info!(?reason, exit_code = stop_exit_code, "exiting");
            std::process::exit(stop_exit_code);
        }

        Commands::AuthStatus { token_path } => {
            match TokenStore::new(token_path).load().await {
                Some(token) if token.is_authorized() => {
                    println!("logged in as {}", token.user_id);
                }
                _ => println!("not logged in"),
            }
            Ok(())
        }
    }
}
