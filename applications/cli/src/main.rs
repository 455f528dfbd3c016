/// Beat Player - terminal music player
use beat_catalog::{CatalogCache, JsonFileSource};
use beat_cli::{
    commands::render_status, BeatConfig, CliError, Command, Outcome, Session, SimulatedDevice,
};
use beat_core::{SongId, UserId};
use beat_playback::{
    Coordinator, CoordinatorHandle, PlaybackError, PlaybackEvent, TransportState,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "beat")]
#[command(about = "Beat Player terminal client", long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Catalog document (overrides catalog.path)
    #[arg(long, global = true)]
    catalog: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start an interactive playback session (default)
    Play {
        /// Song ID to start with
        #[arg(short, long)]
        song: Option<String>,
    },
    /// List songs in the catalog
    Songs {
        /// Only songs whose title or artist contain this text
        query: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = BeatConfig::load(cli.config.as_deref())?;
    if let Some(path) = cli.catalog {
        config.catalog.path = path;
    }
    config.validate()?;

    // Initialize tracing (stderr, so it never interleaves with command output)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let source = Arc::new(JsonFileSource::new(config.catalog.path.clone()));
    let catalog = Arc::new(CatalogCache::new(source));
    if let Err(e) = catalog.refresh().await {
        tracing::warn!(
            error = %e,
            path = %config.catalog.path.display(),
            "Starting with an empty catalog"
        );
    }

    match cli.command.unwrap_or(Commands::Play { song: None }) {
        Commands::Songs { query } => list_songs(&catalog, query.as_deref()),
        Commands::Play { song } => run_session(config, catalog, song).await?,
    }

    Ok(())
}

fn list_songs(catalog: &CatalogCache, query: Option<&str>) {
    let notice = catalog.status().borrow().error.clone();
    if let Some(message) = notice {
        eprintln!("{}", message);
    }

    for song in catalog.search(query.unwrap_or_default()) {
        println!("{}\t{}\t{}", song.id, song.artist, song.title);
    }
}

async fn run_session(
    config: BeatConfig,
    catalog: Arc<CatalogCache>,
    first_song: Option<String>,
) -> anyhow::Result<()> {
    let device = Arc::new(SimulatedDevice::new(config.device.clone()));
    let player = Coordinator::spawn(config.playback.clone(), device, catalog.subscribe());
    tracing::info!(songs = catalog.len(), "Playback session started");

    if let Some(user_id) = &config.catalog.user_id {
        greet_new_user(&catalog, UserId::new(user_id.clone()));
    }
    tokio::spawn(print_events(player.clone()));

    let session = Session {
        catalog: Arc::clone(&catalog),
        player,
    };

    let notice = catalog.status().borrow().error.clone();
    match notice {
        Some(message) => println!("{}", message),
        None => println!("{} songs loaded. Type `help` for commands.", catalog.len()),
    }

    if let Some(id) = first_song {
        report(session.execute(Command::Play(SongId::new(id))).await);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };

        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let outcome = match line.parse::<Command>() {
            Ok(command) => session.execute(command).await,
            Err(e) => Err(e),
        };
        if report(outcome) {
            break;
        }
    }

    session.player.shutdown().await;
    tracing::info!("Playback session ended");
    Ok(())
}

/// Print a command result; returns true when the session should end
fn report(outcome: beat_cli::Result<Outcome>) -> bool {
    match outcome {
        Ok(Outcome::Continue(output)) => {
            println!("{}", output);
            false
        }
        Ok(Outcome::Quit) => true,
        // Published as an event too; the event printer shows it
        Err(CliError::Playback(PlaybackError::QueueEmpty)) => false,
        Err(e) => {
            eprintln!("! {}", e);
            false
        }
    }
}

/// Announce songs as they start and surface errors
async fn print_events(player: CoordinatorHandle) {
    let mut events = player.events();
    loop {
        match events.recv().await {
            Ok(PlaybackEvent::StateChanged {
                state: TransportState::Playing,
            }) => println!("{}", render_status(&player.snapshot())),
            Ok(PlaybackEvent::Error { message }) => eprintln!("! {}", message),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "Event printer lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

fn greet_new_user(catalog: &CatalogCache, user_id: UserId) {
    let mut is_new = catalog.track_new_user(&user_id);

    tokio::spawn(async move {
        // The first value is the default; wait for the profile's answer
        if is_new.changed().await.is_ok() && *is_new.borrow() {
            println!("Welcome, {}! Try `songs`, then `play <id>`.", user_id);
        }
    });
}
