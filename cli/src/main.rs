use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use tunegrab::library::{self, Library, NewTrack, TrackOrder};
use tunegrab::spotify::SpotifyClient;
use tunegrab::{
    AcquisitionOutcome, FetchMode, Pipeline, PipelineConfig, RunReport, YtDlpFetcher, YtDlpLocator,
};

#[derive(Parser)]
#[command(name = "tunegrab")]
#[command(version)]
#[command(about = "Fetches music from catalog links and keeps a local library index")]
struct Cli {
    /// Root directory holding the Music tree and the index.
    /// Defaults to the user's Downloads directory.
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire a track, an album, or a direct media link
    Acquire {
        /// Catalog link (track or album) or a direct media URL
        reference: String,

        /// Write placeholder files instead of invoking the fetch tool
        #[arg(long)]
        simulate: bool,

        /// Retry a failed tool invocation once per track
        #[arg(long)]
        retry: bool,

        /// Catalog application client id
        #[arg(long, env = "SPOTIFY_CLIENT_ID", hide_env_values = true)]
        client_id: Option<String>,

        /// Catalog application client secret
        #[arg(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
        client_secret: Option<String>,
    },
    /// Scan the Music tree and rebuild the index from files on disk
    Scan,
    /// List indexed tracks
    List {
        #[arg(long, value_enum, default_value_t = SortArg::Default)]
        sort: SortArg,
    },
    /// Manage playlists in the index
    Playlist {
        #[command(subcommand)]
        command: PlaylistCommands,
    },
}

#[derive(Subcommand)]
enum PlaylistCommands {
    /// Create a playlist (no-op if it already exists)
    Create { name: String },
    /// List playlists
    List,
    /// Show the tracks of a playlist in order
    Show { name: String },
    /// Append an indexed track to a playlist
    Add { name: String, track_id: i64 },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SortArg {
    /// Artist, album, track number
    Default,
    Title,
    Newest,
    Oldest,
}

impl From<SortArg> for TrackOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Default => TrackOrder::Default,
            SortArg::Title => TrackOrder::Title,
            SortArg::Newest => TrackOrder::NewestFirst,
            SortArg::Oldest => TrackOrder::OldestFirst,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunegrab=info,cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let root = resolve_root(cli.root)?;

    match cli.command {
        Commands::Acquire {
            reference,
            simulate,
            retry,
            client_id,
            client_secret,
        } => acquire(&root, &reference, simulate, retry, client_id, client_secret).await,
        Commands::Scan => scan(&root),
        Commands::List { sort } => list(&root, sort.into()),
        Commands::Playlist { command } => playlist(&root, command),
    }
}

fn resolve_root(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    if let Some(root) = explicit {
        return Ok(root);
    }
    if let Some(downloads) = dirs::download_dir() {
        return Ok(downloads);
    }
    warn!("No Downloads directory found, using the current directory");
    std::env::current_dir().context("could not determine current directory")
}

fn open_library(root: &std::path::Path) -> anyhow::Result<Library> {
    let path = root.join(library::DB_FILE_NAME);
    Library::open(&path).with_context(|| format!("could not open index at {}", path.display()))
}

async fn acquire(
    root: &std::path::Path,
    reference: &str,
    simulate: bool,
    retry: bool,
    client_id: Option<String>,
    client_secret: Option<String>,
) -> anyhow::Result<()> {
    let mode = if simulate {
        FetchMode::Simulate
    } else {
        FetchMode::Real
    };
    let mut config = PipelineConfig::new(root);
    config.retry_tool_errors = retry;

    let mut pipeline = Pipeline::new(
        config,
        Arc::new(YtDlpLocator::new()),
        Arc::new(YtDlpFetcher::new(mode)),
    );
    if let (Some(id), Some(secret)) = (&client_id, &client_secret) {
        let catalog = SpotifyClient::builder()
            .client_id(id)
            .client_secret(secret)
            .build()?;
        pipeline = pipeline.with_catalog(Arc::new(catalog));
    }

    let report = pipeline.run(reference).await?;
    render_report(&report);

    let library = open_library(root)?;
    let indexed = record_successes(&library, &report)?;
    if indexed > 0 {
        info!("Indexed {} new track(s)", indexed);
    }

    if report.failed > 0 && report.succeeded == 0 {
        bail!("no tracks could be acquired");
    }
    Ok(())
}

fn render_report(report: &RunReport) {
    println!(
        "Processed {} track(s): {} succeeded, {} failed",
        report.len(),
        report.succeeded,
        report.failed
    );
    for entry in &report.entries {
        let label = format!("{} - {}", entry.descriptor.artist_names(), entry.descriptor.title);
        match &entry.outcome {
            AcquisitionOutcome::Succeeded { final_path } => {
                println!("  [OK]      {} -> {}", label, final_path.display());
            }
            AcquisitionOutcome::LocatorMiss { detail } => {
                println!("  [MISS]    {}: {}", label, detail);
            }
            AcquisitionOutcome::FetchFailed { kind, message } => {
                println!("  [FAILED]  {} ({:?}): {}", label, kind, message);
            }
            AcquisitionOutcome::PathMismatch { reported } => match reported {
                Some(path) => println!(
                    "  [LOST]    {}: tool reported {}, file not found",
                    label,
                    path.display()
                ),
                None => println!("  [LOST]    {}: tool did not report a file path", label),
            },
        }
    }
}

/// Records successfully acquired files into the index so they show up in
/// listings without a separate scan.
fn record_successes(library: &Library, report: &RunReport) -> anyhow::Result<usize> {
    let mut indexed = 0;
    for entry in &report.entries {
        let AcquisitionOutcome::Succeeded { final_path } = &entry.outcome else {
            continue;
        };
        let track = NewTrack {
            filepath: final_path.to_string_lossy().into_owned(),
            title: Some(entry.descriptor.title.clone()),
            artist: Some(entry.descriptor.primary_artist().to_string()),
            album: Some(entry.descriptor.album.clone()),
            track_number: entry.descriptor.track_number,
            duration_secs: None,
        };
        let (_, created) = library.add_track(&track)?;
        if created {
            indexed += 1;
        }
    }
    Ok(indexed)
}

fn scan(root: &std::path::Path) -> anyhow::Result<()> {
    let music_root = root.join(tunegrab::organize::MUSIC_DIR_NAME);
    if !music_root.is_dir() {
        bail!("no Music directory at {}", music_root.display());
    }
    let library = open_library(root)?;
    let report = library::scan(&library, &music_root)?;
    println!(
        "Scan complete: {} added, {} already indexed, {} errored",
        report.added, report.existing, report.errored
    );
    println!("Index now holds {} track(s)", library.track_count()?);
    Ok(())
}

fn list(root: &std::path::Path, order: TrackOrder) -> anyhow::Result<()> {
    let library = open_library(root)?;
    let tracks = library.list_tracks(order)?;
    if tracks.is_empty() {
        println!("Index is empty. Run `tunegrab scan` or acquire something first.");
        return Ok(());
    }
    for track in tracks {
        println!(
            "{:>5}  {} - {} - {}{}",
            track.id,
            track.artist.as_deref().unwrap_or("?"),
            track.album.as_deref().unwrap_or("?"),
            track
                .track_number
                .map(|n| format!("{n:02}. "))
                .unwrap_or_default(),
            track.title.as_deref().unwrap_or("?"),
        );
    }
    Ok(())
}

fn playlist(root: &std::path::Path, command: PlaylistCommands) -> anyhow::Result<()> {
    let library = open_library(root)?;
    match command {
        PlaylistCommands::Create { name } => {
            let (id, created) = library.create_playlist(&name)?;
            if created {
                println!("Created playlist '{}' (ID: {})", name, id);
            } else {
                println!("Playlist '{}' already exists (ID: {})", name, id);
            }
        }
        PlaylistCommands::List => {
            let playlists = library.playlists()?;
            if playlists.is_empty() {
                println!("No playlists yet.");
            }
            for playlist in playlists {
                let count = library.playlist_tracks(playlist.id)?.len();
                println!("{:>5}  {} ({} track(s))", playlist.id, playlist.name, count);
            }
        }
        PlaylistCommands::Show { name } => {
            let Some(playlist) = library.playlist_by_name(&name)? else {
                bail!("no playlist named '{name}'");
            };
            for (position, track) in library.playlist_tracks(playlist.id)?.iter().enumerate() {
                println!(
                    "{:>3}. {} - {}",
                    position + 1,
                    track.artist.as_deref().unwrap_or("?"),
                    track.title.as_deref().unwrap_or("?"),
                );
            }
        }
        PlaylistCommands::Add { name, track_id } => {
            let Some(playlist) = library.playlist_by_name(&name)? else {
                bail!("no playlist named '{name}'");
            };
            let Some(track) = library.track_by_id(track_id)? else {
                bail!("no track with id {track_id} in the index");
            };
            library.append_to_playlist(playlist.id, track_id)?;
            println!(
                "Added '{}' to '{}'",
                track.title.as_deref().unwrap_or("?"),
                name
            );
        }
    }
    Ok(())
}
