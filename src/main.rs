//! playback-presence - now-playing presence engine
//!
//! Keeps a floating "now playing" widget and a lyrics overlay in sync with a
//! remote streaming account.

mod api;
mod auth;
mod config;
mod engine;
mod logging;
mod lyrics;
mod models;
mod presence;
#[cfg(test)]
mod test_support;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::sync::mpsc;

use api::{PlayerAction, SpotifyClient};
use auth::AuthConfig;
use config::{FileStore, Settings};
use engine::{Engine, EngineDeps, EngineStatus};
use models::{PreferencesUpdate, SizePreset, StylePreset};
use presence::{
    probe_for, widget_size, ChannelSink, HeadlessWindows, Position, PresenceEvent, Rect, Surface,
    LYRICS_SIZE,
};

#[derive(Parser)]
#[command(name = "playback-presence")]
#[command(about = "Now-playing widget and lyrics presence for your streaming account", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also append logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the OAuth client id of your app registration
    ClientId {
        /// Client ID from the provider's developer dashboard
        id: String,
    },

    /// Connect your account in the browser
    Login,

    /// Forget stored tokens
    Logout,

    /// Show connection and token status
    Status {
        /// Print the full diagnostics as JSON
        #[arg(long)]
        json: bool,
    },

    /// Poll playback and drive the widget until Ctrl-C
    Run,

    /// Control playback
    Control {
        /// previous, next or toggle
        action: PlayerAction,
    },

    /// Show listening stats
    Stats {
        /// Maximum number of entries per list
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show or change widget preferences
    Prefs {
        /// small, medium or large
        #[arg(long)]
        size: Option<SizePreset>,

        /// style1 or style2
        #[arg(long)]
        style: Option<StylePreset>,

        /// Show the progress bar
        #[arg(long)]
        progress: Option<bool>,

        /// Hide the widget while another app is fullscreen
        #[arg(long)]
        hide_on_fullscreen: Option<bool>,

        /// Open (true) or close (false) the lyrics overlay
        #[arg(long)]
        lyrics: Option<bool>,
    },

    /// Pin a surface at a screen position
    Place {
        /// widget or lyrics
        surface: Surface,
        x: i32,
        y: i32,
    },

    /// Look up lyrics for a track
    Lyrics {
        track: String,
        artist: String,

        /// Track length, used to pick the right version
        #[arg(long, default_value = "0")]
        duration_ms: u64,
    },
}

fn build_engine(settings: &Settings) -> Result<(Arc<Engine>, mpsc::UnboundedReceiver<PresenceEvent>)> {
    let store = FileStore::open_default()?;
    tracing::debug!("Using store at {}", store.path().display());

    let client = SpotifyClient::new(settings.http_timeout()).context("Failed to build HTTP client")?;
    let lyrics_sources = lyrics::default_sources(client.http().clone());
    let (sink, events) = ChannelSink::new();

    let engine = Engine::new(EngineDeps {
        settings: settings.clone(),
        auth: AuthConfig::default(),
        store: Arc::new(store),
        api: Arc::new(client),
        windows: Arc::new(HeadlessWindows::single()),
        sink: Arc::new(sink),
        probe: probe_for(&settings.fullscreen),
        lyrics_sources,
    });
    Ok((engine, events))
}

fn format_expiry(expires_at: i64) -> String {
    chrono::DateTime::from_timestamp_millis(expires_at)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| expires_at.to_string())
}

async fn login(engine: &Engine, events: &mut mpsc::UnboundedReceiver<PresenceEvent>) -> Result<()> {
    let url = engine.connect().await?;

    println!("Open this URL to connect your account:\n\n  {}\n", url);
    if let Err(e) = webbrowser::open(url.as_str()) {
        tracing::warn!("Failed to open browser automatically: {}", e);
    }
    println!("Waiting for the browser redirect (Ctrl-C to abort)...");

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(PresenceEvent::Connected) => break,
                Some(_) => {}
                None => anyhow::bail!("Event channel closed before login completed"),
            },
            _ = tokio::signal::ctrl_c() => anyhow::bail!("Login aborted"),
        }
    }

    engine.stop_polling();
    println!("Connected.");
    Ok(())
}

fn print_status(status: &EngineStatus) {
    println!("Client ID:      {}", if status.has_client_id { "set" } else { "missing" });
    if !status.has_token {
        println!("Connection:     not connected");
        return;
    }

    println!("Connection:     connected");
    println!(
        "Access token:   {}",
        if status.token_valid { "valid" } else { "expired (refreshed on next use)" }
    );
    if let Some(expires_at) = status.token_expires_at {
        println!("Expires:        {}", format_expiry(expires_at));
    }
    println!(
        "Refresh token:  {}",
        if status.has_refresh_token { "present" } else { "missing" }
    );
    println!("Lyrics overlay: {}", if status.lyrics_visible { "on" } else { "off" });
    println!(
        "Widget:         {:?}, {:?}, progress {}, hide on fullscreen {}",
        status.preferences.size_preset,
        status.preferences.style_preset,
        status.preferences.show_progress,
        status.preferences.hide_on_fullscreen
    );
}

async fn print_stats(engine: &Engine, limit: usize) -> Result<()> {
    let stats = engine.stats().await?;

    println!("Recently played:");
    for entry in stats.recently_played.iter().take(limit) {
        let artists: Vec<&str> = entry.track.artists.iter().map(|a| a.name.as_str()).collect();
        println!("  {}  {} - {}", entry.played_at, artists.join(", "), entry.track.name);
    }

    for (title, tracks) in [
        ("Top tracks (4 weeks)", &stats.top_tracks_short),
        ("Top tracks (6 months)", &stats.top_tracks_medium),
    ] {
        println!("\n{}:", title);
        for (i, track) in tracks.iter().take(limit).enumerate() {
            let artists: Vec<&str> = track.artists.iter().map(|a| a.name.as_str()).collect();
            println!("  {:>2}. {} - {}", i + 1, artists.join(", "), track.name);
        }
    }

    for (title, artists) in [
        ("Top artists (4 weeks)", &stats.top_artists_short),
        ("Top artists (6 months)", &stats.top_artists_medium),
    ] {
        println!("\n{}:", title);
        for (i, artist) in artists.iter().take(limit).enumerate() {
            println!("  {:>2}. {}", i + 1, artist.name);
        }
    }
    Ok(())
}

/// Log presence events; the headless window layer has no UI to feed.
async fn log_events(mut events: mpsc::UnboundedReceiver<PresenceEvent>) {
    let mut last_line: Option<String> = None;
    while let Some(event) = events.recv().await {
        match event {
            PresenceEvent::NowPlaying(snapshot) => {
                let line = snapshot
                    .as_ref()
                    .filter(|s| s.is_active())
                    .and_then(|s| s.item.as_ref())
                    .map(|item| item.display_line());
                if line != last_line {
                    match &line {
                        Some(line) => tracing::info!("Now playing: {}", line),
                        None => tracing::info!("Nothing playing"),
                    }
                    last_line = line;
                }
            }
            PresenceEvent::Lyrics(payload) if !payload.loading => {
                let lines = payload.lyrics.as_deref().map(|l| l.lines().count());
                tracing::debug!("Lyrics update: {:?} lines", lines);
            }
            PresenceEvent::Connected => tracing::info!("Account connected"),
            other => tracing::debug!("Event: {:?}", other),
        }
    }
}

async fn run(engine: Arc<Engine>, events: mpsc::UnboundedReceiver<PresenceEvent>) -> Result<()> {
    tokio::spawn(log_events(events));
    engine.resume();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for Ctrl-C")?;
    tracing::info!("Shutting down");
    engine.stop_polling();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load()?;

    let log_file = cli.log_file.clone().or_else(|| settings.log_file.clone());
    logging::init(cli.verbose, log_file.as_deref())?;

    let (engine, mut events) = build_engine(&settings)?;

    match cli.command {
        Commands::ClientId { id } => {
            engine.set_client_id(&id)?;
            println!("Client ID saved.");
        }
        Commands::Login => {
            tracing::info!("Starting authentication flow...");
            login(&engine, &mut events).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            engine.disconnect()?;
            println!("Logged out.");
        }
        Commands::Status { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(&engine.status())?);
            } else {
                print_status(&engine.status());
            }
        }
        Commands::Run => {
            run(engine, events).await?;
        }
        Commands::Control { action } => {
            if action == PlayerAction::Toggle {
                // Pause or play depends on the current state
                engine.poll_once().await;
            }
            engine.player_action(action).await?;
            println!("OK: {}", action);
        }
        Commands::Stats { limit } => {
            print_stats(&engine, limit).await?;
        }
        Commands::Prefs {
            size,
            style,
            progress,
            hide_on_fullscreen,
            lyrics,
        } => {
            let update = PreferencesUpdate {
                size_preset: size,
                show_progress: progress,
                style_preset: style,
                hide_on_fullscreen,
            };
            let prefs = if update == PreferencesUpdate::default() {
                engine.preferences()
            } else {
                engine.set_preferences(&update)?
            };
            if let Some(visible) = lyrics {
                engine.toggle_lyrics(Some(visible)).await?;
            }
            println!("{}", serde_json::to_string_pretty(&prefs)?);
        }
        Commands::Place { surface, x, y } => {
            let size = match surface {
                Surface::Widget => widget_size(engine.preferences().size_preset),
                Surface::Lyrics => LYRICS_SIZE,
            };
            engine.surface_moved(surface, Rect::new(Position { x, y }, size))?;
            engine.display_metrics_changed();
            println!("Saved {} position ({}, {}).", surface.name(), x, y);
        }
        Commands::Lyrics {
            track,
            artist,
            duration_ms,
        } => match engine.lookup_lyrics(&track, &artist, duration_ms).await {
            Some(text) => println!("{}", text),
            None => println!("No lyrics found."),
        },
    }

    Ok(())
}
