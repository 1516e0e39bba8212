#![forbid(unsafe_code)]
mod cli;

use clap::Parser;
use cli::Cli;
use color_eyre::eyre::{self, eyre};
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use upload_tracker::model::upload_status::UploadStatus;
use upload_tracker::services::local_blob_store::LocalBlobStore;
use upload_tracker::services::upload_in_progress::UploadCallback;
use upload_tracker::services::upload_registry::UploadRegistry;
use upload_tracker::settings::upload_settings::UploadSettings;
use upload_tracker::utils::{format_elapsed, initialize_logging, initialize_panic_handler};
use url::Url;

/// Context handed back with every upload report
#[derive(Debug, Clone)]
struct FileContext {
    index: usize,
    source: PathBuf,
}

#[derive(Debug)]
struct UploadReport {
    status: UploadStatus,
    blob_uri: Option<Url>,
    context: FileContext,
}

fn report_callback(tx: mpsc::UnboundedSender<UploadReport>) -> UploadCallback<FileContext> {
    Box::new(move |status, blob_uri, context| {
        tx.send(UploadReport {
            status,
            blob_uri,
            context,
        })
        .map_err(|_| eyre!("report channel closed"))
    })
}

async fn sleep_or_forever(delay: Option<Duration>) {
    match delay {
        Some(delay) => tokio::time::sleep(delay).await,
        None => std::future::pending().await,
    }
}

#[tokio::main]
async fn main() -> eyre::Result<()> {
    initialize_logging()?;
    initialize_panic_handler()?;
    let args = Cli::parse();
    let settings = UploadSettings::load(args.config.as_deref())?;
    tracing::info!(?settings, files = args.files.len(), "starting uploads");

    let store = LocalBlobStore::new(settings.blob_store_dir.clone());
    tracing::debug!(root = %store.root().display(), "blob store ready");
    let registry = UploadRegistry::new();
    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let started = Instant::now();

    for (index, source) in args.files.iter().enumerate() {
        let name = source.display().to_string();
        let context = FileContext {
            index,
            source: source.clone(),
        };
        let store = store.clone();
        let source = source.clone();
        let chunk_size = settings.chunk_size;
        let chunk_delay = settings.chunk_delay();
        registry
            .spawn_upload(name, Some(report_callback(report_tx.clone())), context, async move {
                store.upload_outcome(source, chunk_size, chunk_delay).await
            })
            .await?;
    }
    // Only the trackers' callbacks hold senders from here on
    drop(report_tx);

    let cancel_after = sleep_or_forever(args.cancel_after_ms.map(Duration::from_millis));
    tokio::pin!(cancel_after);
    let mut sweep = tokio::time::interval(Duration::from_millis(500));
    let mut closed = false;
    let mut succeeded = 0;
    let mut cancelled = 0;
    let mut reported = 0;

    loop {
        tokio::select! {
            report = report_rx.recv() => match report {
                Some(report) => {
                    reported += 1;
                    if report.status.is_success() {
                        succeeded += 1;
                    } else if report.status.is_cancelled() {
                        cancelled += 1;
                    }
                    let location = report
                        .blob_uri
                        .as_ref()
                        .map(Url::to_string)
                        .unwrap_or_else(|| "-".to_string());
                    println!(
                        "[{}] {} {} -> {}",
                        report.context.index,
                        report.status,
                        report.context.source.display(),
                        location
                    );
                }
                None => break,
            },
            _ = &mut cancel_after, if !closed => {
                closed = true;
                let count = registry.close_now().await;
                tracing::info!(count, "cancel deadline reached");
            },
            _ = sweep.tick() => {
                let crashed = registry.cleanup_finished().await;
                if crashed > 0 {
                    tracing::warn!(crashed, "uploads ended without reporting");
                }
            },
            _ = tokio::signal::ctrl_c(), if !closed => {
                closed = true;
                let count = registry.close_now().await;
                tracing::info!(count, "closed per user request");
            },
        }
    }

    println!(
        "{} of {} uploads succeeded, {} cancelled, in {}",
        succeeded,
        reported,
        cancelled,
        format_elapsed(started.elapsed())
    );
    Ok(())
}
