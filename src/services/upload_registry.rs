//! Registry of in-flight uploads
//!
//! This is the transport-side owner of [`UploadInProgress`] trackers. Each
//! upload future is spawned on tokio, its task is attached to the tracker, and
//! the tracker's callback fires once when the upload completes, is cancelled,
//! or the registry is closed. Whichever path removes the entry from the table
//! is the one that triggers the callback.

use crate::model::tracker_error::{TrackerError, TrackerResult};
use crate::model::upload_id::UploadId;
use crate::model::upload_status::{UploadOutcome, UploadStatus};
use crate::model::upload_task::UploadHandle;
use crate::services::upload_in_progress::{UploadCallback, UploadInProgress};
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Mutex;
use url::Url;

/// Information about an in-flight upload
#[derive(Debug, Clone)]
pub struct UploadInfo {
    pub id: UploadId,
    /// Human-readable name, usually the destination blob name
    pub name: String,
    pub started_at: Instant,
}

struct UploadEntry<C> {
    info: UploadInfo,
    tracker: UploadInProgress<C>,
    handle: UploadHandle,
}

type Uploads<C> = Arc<Mutex<HashMap<UploadId, UploadEntry<C>>>>;

/// Table of uploads that have been started and not yet reported
pub struct UploadRegistry<C> {
    next_id: AtomicU64,
    uploads: Uploads<C>,
}

impl<C: Send + 'static> UploadRegistry<C> {
    pub fn new() -> Self {
        UploadRegistry {
            next_id: AtomicU64::new(1),
            uploads: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    fn generate_id(&self) -> UploadId {
        UploadId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Start tracking an upload and spawn the future performing it
    ///
    /// Fails with `InvalidArgument` when no callback is given, in which case
    /// nothing is spawned. The callback runs on the tokio worker that
    /// finishes the upload.
    pub async fn spawn_upload<F>(
        &self,
        name: impl Into<String>,
        callback: Option<UploadCallback<C>>,
        context: C,
        upload: F,
    ) -> TrackerResult<UploadId>
    where
        F: Future<Output = UploadOutcome> + Send + 'static,
    {
        let mut tracker = UploadInProgress::new(callback, context)?;
        let id = self.generate_id();
        let name = name.into();
        let uploads_cleanup = self.uploads.clone();

        // Held across spawn so the upload cannot report before it is recorded
        let mut uploads = self.uploads.lock().await;

        let join_handle = tokio::spawn(async move {
            let outcome = upload.await;
            let entry = uploads_cleanup.lock().await.remove(&id);
            match entry {
                Some(entry) => {
                    report(entry, outcome.status, outcome.blob_uri);
                }
                None => tracing::debug!(%id, "upload finished after it was already reported"),
            }
        });

        let handle = UploadHandle::new(join_handle.abort_handle());
        tracker.set_task(Some(handle.clone()))?;

        tracing::info!(%id, name = %name, "upload started");
        uploads.insert(
            id,
            UploadEntry {
                info: UploadInfo {
                    id,
                    name,
                    started_at: Instant::now(),
                },
                tracker,
                handle,
            },
        );
        Ok(id)
    }

    /// Cancel one upload and report it as cancelled
    ///
    /// The entry leaves the table before its task is cancelled, so a
    /// cancelled upload is never listed as active.
    pub async fn cancel(&self, id: UploadId) -> TrackerResult<()> {
        let entry = self
            .uploads
            .lock()
            .await
            .remove(&id)
            .ok_or(TrackerError::UnknownUpload(id))?;
        entry.handle.cancel();
        report(entry, UploadStatus::MessageCancelledOnClose, None);
        Ok(())
    }

    /// Whether the task behind an upload still in the table has been cancelled
    ///
    /// Cancellation through the registry removes the entry, so this only turns
    /// true for a task cancelled by other means.
    pub async fn is_cancelled(&self, id: UploadId) -> TrackerResult<bool> {
        let uploads = self.uploads.lock().await;
        let entry = uploads.get(&id).ok_or(TrackerError::UnknownUpload(id))?;
        entry.tracker.is_cancelled()
    }

    /// Uploads still in flight, oldest first
    pub async fn active_uploads(&self) -> Vec<UploadInfo> {
        let uploads = self.uploads.lock().await;
        let mut infos: Vec<_> = uploads.values().map(|e| e.info.clone()).collect();
        infos.sort_by_key(|info| info.id);
        infos
    }

    /// Number of uploads still in flight
    pub async fn active_count(&self) -> usize {
        self.uploads.lock().await.len()
    }

    /// Whether `id` is still in flight
    pub async fn is_active(&self, id: UploadId) -> bool {
        self.uploads.lock().await.contains_key(&id)
    }

    /// Cancel everything still in flight and report each as cancelled
    ///
    /// Returns the number of callbacks triggered.
    pub async fn close_now(&self) -> usize {
        let mut entries: Vec<_> = {
            let mut uploads = self.uploads.lock().await;
            uploads.drain().map(|(_, entry)| entry).collect()
        };
        entries.sort_by_key(|entry| entry.info.id);

        let count = entries.len();
        for entry in entries {
            entry.handle.cancel();
            report(entry, UploadStatus::MessageCancelledOnClose, None);
        }
        if count > 0 {
            tracing::info!(count, "closed registry with uploads in flight");
        }
        count
    }

    /// Report uploads whose task ended without reporting, e.g. a panicking future
    ///
    /// Those are completed with `UploadStatus::Error`. Returns how many were found.
    pub async fn cleanup_finished(&self) -> usize {
        let finished: Vec<_> = {
            let mut uploads = self.uploads.lock().await;
            let ids: Vec<_> = uploads
                .iter()
                .filter(|(_, entry)| entry.handle.is_finished())
                .map(|(id, _)| *id)
                .collect();
            ids.into_iter().filter_map(|id| uploads.remove(&id)).collect()
        };

        let count = finished.len();
        for entry in finished {
            tracing::warn!(id = %entry.info.id, name = %entry.info.name, "upload task ended without reporting");
            report(entry, UploadStatus::Error, None);
        }
        count
    }
}

impl<C: Send + 'static> Default for UploadRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

/// Trigger the entry's callback; a failing callback is a defect in
/// application code, so it is logged rather than returned
fn report<C>(entry: UploadEntry<C>, status: UploadStatus, blob_uri: Option<Url>) {
    let UploadEntry { info, tracker, .. } = entry;
    tracing::debug!(id = %info.id, %status, elapsed = ?info.started_at.elapsed(), "reporting upload");
    if let Err(err) = tracker.trigger_callback(status, blob_uri) {
        tracing::error!(id = %info.id, name = %info.name, "upload callback failed: {:#}", err);
    }
}
