/// Playlist Collector - command-line client
use clap::{Parser, Subcommand};
use collector_client::{export_filename, ClientConfig, CollectorClient};
use collector_core::types::{CollectionId, CollectionKind, ExportFormat, TrackId};
use collector_session::{CompletionStore, LoginEntry, SessionConfig, SessionManager};
use crate::config::AppConfig;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;

#[derive(Parser)]
#[command(name = "collector")]
#[command(about = "Export playlists from your music service to CSV/JSON/TXT", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in against the backend
    Login {
        /// OAuth authorization code from the redirect callback
        #[arg(long)]
        code: Option<String>,
        /// OAuth error from the redirect callback
        #[arg(long)]
        error: Option<String>,
    },
    /// Show session status and quota
    Status,
    /// List your playlists
    Playlists,
    /// List your albums
    Albums,
    /// Export the selection to a file
    Export {
        /// Output format: csv, json, or txt
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Restrict the export to these collection ids (default: everything)
        #[arg(long, value_delimiter = ',')]
        collections: Vec<String>,
    },
    /// Export a public playlist without logging in
    Public {
        /// Public playlist URL
        url: String,
        /// Output format: csv, json, or txt
        #[arg(short, long, default_value = "csv")]
        format: String,
        /// Restrict the export to these track ids (default: every track)
        #[arg(long, value_delimiter = ',')]
        tracks: Vec<String>,
    },
    /// Clear the stored credential
    Logout,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    "collector_cli=info,collector_session=info,collector_client=info".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let app_config = AppConfig::load()?;
    app_config.validate()?;
    tracing::debug!(backend = %app_config.backend.api_url, "Configuration loaded");

    match cli.command {
        Commands::Login { code, error } => {
            login(&app_config, code, error).await?;
        }
        Commands::Status => {
            status(&app_config).await?;
        }
        Commands::Playlists => {
            list_catalog(&app_config, CollectionKind::Playlists).await?;
        }
        Commands::Albums => {
            list_catalog(&app_config, CollectionKind::Albums).await?;
        }
        Commands::Export {
            format,
            collections,
        } => {
            export(&app_config, &format, collections).await?;
        }
        Commands::Public {
            url,
            format,
            tracks,
        } => {
            public(&app_config, &url, &format, tracks).await?;
        }
        Commands::Logout => {
            build_client(&app_config)?.logout();
            println!("Logged out.");
        }
    }

    Ok(())
}

fn build_client(app_config: &AppConfig) -> anyhow::Result<Arc<CollectorClient>> {
    let client_config = ClientConfig::new(
        &app_config.backend.api_url,
        &app_config.storage.token_path,
    );
    Ok(Arc::new(CollectorClient::new(client_config)?))
}

fn build_session(
    app_config: &AppConfig,
    kind: CollectionKind,
) -> anyhow::Result<(Arc<CollectorClient>, SessionManager)> {
    let client = build_client(app_config)?;
    let session_config = SessionConfig {
        kind,
        prefetch_tracks: app_config.catalog.prefetch_tracks,
        completion_store: Some(CompletionStore::new(&app_config.storage.signal_dir)),
    };
    let manager = SessionManager::new(Arc::clone(&client), session_config);
    Ok((client, manager))
}

async fn login(
    app_config: &AppConfig,
    code: Option<String>,
    error: Option<String>,
) -> anyhow::Result<()> {
    let (_client, mut manager) = build_session(app_config, app_config.catalog.kind)?;

    if code.is_some() || error.is_some() {
        manager
            .synchronize(LoginEntry::RedirectCallback { code, error })
            .await;
    } else {
        let auth_url = manager.begin_login();
        println!("Open this URL in your browser to log in:\n");
        println!("  {auth_url}\n");
        println!("Checking for login completion...");
        manager.synchronize(LoginEntry::None).await;
    }

    report_session(&manager);
    Ok(())
}

async fn status(app_config: &AppConfig) -> anyhow::Result<()> {
    let (_client, mut manager) = build_session(app_config, app_config.catalog.kind)?;
    manager.synchronize(LoginEntry::None).await;
    report_session(&manager);
    Ok(())
}

async fn list_catalog(app_config: &AppConfig, kind: CollectionKind) -> anyhow::Result<()> {
    // The listing commands override the configured catalog family.
    let (_client, mut manager) = build_session(app_config, kind)?;

    manager.synchronize(LoginEntry::None).await;

    if !manager.is_authenticated() {
        report_session(&manager);
        anyhow::bail!("Not logged in. Run `collector login` first.");
    }

    let catalog = manager.catalog();
    println!("{} collections found", catalog.collections().len());
    for collection in catalog.collections() {
        match catalog.tracks_for(&collection.id) {
            Some(tracks) => {
                println!(
                    "  [{}] {} ({} songs)",
                    collection.id,
                    collection.name,
                    tracks.len()
                );
            }
            None => match collection.track_count {
                Some(count) => {
                    println!("  [{}] {} ({} songs)", collection.id, collection.name, count);
                }
                None => println!("  [{}] {}", collection.id, collection.name),
            },
        }
    }
    print_quota(&manager);
    Ok(())
}

async fn export(
    app_config: &AppConfig,
    format: &str,
    collections: Vec<String>,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let (_client, mut manager) = build_session(app_config, app_config.catalog.kind)?;

    manager.synchronize(LoginEntry::None).await;
    if !manager.is_authenticated() {
        report_session(&manager);
        anyhow::bail!("Not logged in. Run `collector login` first.");
    }

    if collections.is_empty() {
        manager.select_all_collections(true).await;
    } else {
        for id in collections {
            let id = CollectionId::new(id);
            manager.select_collection(&id, true).await;
        }
    }

    match manager.download(format).await {
        Ok(download) => {
            let path =
                write_export(&app_config.storage.output_dir, format, &download.bytes).await?;
            println!("Saved export to {}", path.display());

            if !download.skipped_tracks.is_empty() {
                println!(
                    "{} track(s) weren't able to be processed:",
                    download.skipped_tracks.len()
                );
                for track in &download.skipped_tracks {
                    println!("  {} ({})", track.title, track.playlist_name);
                }
            }
            print_quota(&manager);
            Ok(())
        }
        Err(e) => {
            report_session(&manager);
            Err(e.into())
        }
    }
}

async fn public(
    app_config: &AppConfig,
    url: &str,
    format: &str,
    tracks: Vec<String>,
) -> anyhow::Result<()> {
    let format: ExportFormat = format.parse()?;
    let client = build_client(app_config)?;

    let playlist = client.public().fetch_playlist(url).await?;
    println!(
        "{} ({} songs)",
        playlist.playlist.name,
        playlist.tracks.len()
    );

    let selected: Vec<TrackId> = if tracks.is_empty() {
        playlist.tracks.iter().map(|t| t.id.clone()).collect()
    } else {
        tracks.into_iter().map(TrackId::new).collect()
    };

    let download = client.public().download(url, &selected, format).await?;
    let path = write_export(&app_config.storage.output_dir, format, &download.bytes).await?;
    println!("Saved export to {}", path.display());

    if !download.skipped_tracks.is_empty() {
        println!(
            "{} track(s) weren't able to be processed:",
            download.skipped_tracks.len()
        );
        for track in &download.skipped_tracks {
            println!("  {} ({})", track.title, track.playlist_name);
        }
    }
    Ok(())
}

async fn write_export(
    output_dir: &Path,
    format: ExportFormat,
    bytes: &[u8],
) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(output_dir).await?;
    let path = output_dir.join(export_filename(format));
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

fn report_session(manager: &SessionManager) {
    if manager.is_authenticated() {
        println!("Logged in.");
    } else {
        println!("Not logged in.");
    }
    if let Some(error) = manager.last_error() {
        println!("{error}");
    }
    print_quota(manager);
}

fn print_quota(manager: &SessionManager) {
    if let Some(quota) = manager.catalog().quota() {
        println!(
            "Quota: {}/{} API calls, {}/{} downloads, {} tracks downloaded",
            quota.api_calls,
            quota.api_limit,
            quota.downloads,
            quota.download_limit,
            quota.downloaded_tracks
        );
    }
}
