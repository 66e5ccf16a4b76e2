use anyhow::{bail, Context};
use backoff::{backoff::Backoff, ExponentialBackoff};
use chunkdav::assembly::FileTimes;
use chunkdav::config::Config;
use chunkdav::coordinator::{SessionControl, UploadCoordinator, UploadError, UploadEvent, UploadSession};
use chunkdav::dav::{DavClient, FileMetadata};
use chunkdav::journal::{JournalEntry, UploadJournal};
use chunkdav::metrics::{start_metrics_server, MetricsConfig};
use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "chunkdav", version = env!("CARGO_PKG_VERSION"), about, long_about = None)]
struct Cli {
    /// TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Journal of failed sessions
    #[arg(long, global = true, default_value = "chunkdav.db")]
    journal: PathBuf,

    /// Serve Prometheus metrics on this address
    #[arg(long, global = true)]
    metrics_addr: Option<SocketAddr>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a file in chunks
    Upload {
        file: PathBuf,
        /// Destination directory on the server
        server_dir: String,
        #[arg(long)]
        chunk_size: Option<u64>,
        /// Resume attempts after a recoverable failure
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },
    /// Resume a journaled session
    Resume {
        session_id: String,
        #[arg(long, default_value_t = 3)]
        retries: u32,
    },
    /// List journaled sessions
    Sessions,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref()).context("loading config")?;

    if let Some(addr) = cli.metrics_addr {
        start_metrics_server(MetricsConfig::with_addr(addr))?;
        tracing::info!("Serving metrics on http://{}/metrics", addr);
    }

    let journal = UploadJournal::open(&cli.journal)
        .await
        .with_context(|| format!("opening journal {}", cli.journal.display()))?;

    match cli.command {
        Command::Upload {
            file,
            server_dir,
            chunk_size,
            retries,
        } => {
            let session = new_session(&file, server_dir)?
                .with_chunk_size(chunk_size.unwrap_or(config.upload.chunk_size));
            let session_id = uuid::Uuid::new_v4().to_string();
            tracing::info!("Session {}", session_id);
            let metadata = run(&config, &journal, &session_id, session, retries).await?;
            print_metadata(&metadata);
        }
        Command::Resume {
            session_id,
            retries,
        } => {
            let entry = journal
                .load(&session_id)
                .await?
                .with_context(|| format!("no journaled session {session_id}"))?;
            if !entry.is_resumable() {
                bail!("session {session_id} already completed");
            }
            let metadata = run(&config, &journal, &session_id, entry.to_session(), retries).await?;
            print_metadata(&metadata);
        }
        Command::Sessions => {
            for entry in journal.list().await? {
                let stage = entry
                    .last_stage
                    .map(|stage| stage.to_string())
                    .unwrap_or_else(|| "-".into());
                let remaining = entry
                    .remaining_bytes()
                    .map(|bytes| format!("{bytes} bytes left"))
                    .unwrap_or_else(|| "not planned".into());
                println!(
                    "{}  {:?}  {}  {} -> {}  ({})",
                    entry.session_id,
                    entry.status,
                    stage,
                    entry.source_path.display(),
                    entry.server_dir,
                    remaining
                );
            }
        }
    }

    journal.close().await;
    Ok(())
}

fn new_session(file: &Path, server_dir: String) -> anyhow::Result<UploadSession> {
    let file_name = file
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .with_context(|| format!("{} is not a file path", file.display()))?;
    let directory = file
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let metadata = std::fs::metadata(file).with_context(|| format!("reading {}", file.display()))?;
    let times = FileTimes::new(
        metadata.created().ok().and_then(epoch_secs),
        metadata.modified().ok().and_then(epoch_secs),
    );

    Ok(UploadSession::new(directory, file_name, server_dir).with_times(times))
}

fn epoch_secs(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|elapsed| elapsed.as_secs() as i64)
}

/// Run a session, resuming it with backoff while failures stay recoverable
async fn run(
    config: &Config,
    journal: &UploadJournal,
    session_id: &str,
    mut session: UploadSession,
    retries: u32,
) -> anyhow::Result<FileMetadata> {
    let client = DavClient::new(config.to_account()?)?;
    let coordinator = UploadCoordinator::new(
        Arc::new(client.clone()),
        client.endpoints(),
        config.upload.policy.clone(),
    );

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after the current chunk");
            on_interrupt.cancel();
        }
    });

    let mut backoff = ExponentialBackoff {
        initial_interval: Duration::from_secs(1),
        max_interval: Duration::from_secs(60),
        max_elapsed_time: None,
        ..Default::default()
    };
    let mut attempt = 0;

    loop {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = tokio::spawn(report_progress(rx));
        let control = SessionControl::new()
            .with_events(tx)
            .with_cancel(cancel.clone());

        let outcome = coordinator.upload_with(&session, &control).await;
        drop(control);
        let _ = reporter.await;

        let failure = match outcome {
            Ok(metadata) => {
                if journal.load(session_id).await?.is_some() {
                    journal.mark_completed(session_id).await?;
                }
                return Ok(metadata);
            }
            Err(failure) => failure,
        };

        journal
            .record_failure(&JournalEntry::from_failure(session_id, &session, &failure))
            .await?;

        let cancelled = matches!(failure.error, UploadError::Cancelled);
        if cancelled || !failure.is_resumable() || attempt >= retries {
            tracing::warn!("Resume later with: chunkdav resume {}", session_id);
            return Err(failure.into());
        }

        attempt += 1;
        let delay = backoff.next_backoff().unwrap_or(backoff.max_interval);
        tracing::warn!(
            "Attempt {} failed, resuming in {:?}: {}",
            attempt,
            delay,
            failure
        );

        tokio::select! {
            _ = cancel.cancelled() => return Err(failure.into()),
            _ = tokio::time::sleep(delay) => {}
        }
        session = session.resume_from(&failure);
    }
}

async fn report_progress(mut events: mpsc::UnboundedReceiver<UploadEvent>) {
    while let Some(event) = events.recv().await {
        match event {
            UploadEvent::StateChanged(state) => tracing::info!("{:?}", state),
            UploadEvent::ChunksPlanned {
                total_chunks,
                total_bytes,
            } => tracing::info!("{} chunks to send ({} bytes)", total_chunks, total_bytes),
            UploadEvent::Progress(progress) => tracing::info!(
                "{:.1}% ({} / {} bytes)",
                progress.fraction_completed * 100.0,
                progress.staged_bytes,
                progress.total_bytes
            ),
            _ => {}
        }
    }
}

fn print_metadata(metadata: &FileMetadata) {
    println!("Uploaded {}", metadata.href);
    println!("  size:    {}", metadata.size);
    if let Some(file_id) = &metadata.file_id {
        println!("  file id: {}", file_id);
    }
    if let Some(etag) = &metadata.etag {
        println!("  etag:    {}", etag);
    }
}
