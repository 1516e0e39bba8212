//! Filesystem-backed blob sink
//!
//! Stands in for a network blob transport: an upload copies the source file
//! into the store's root in fixed-size chunks and yields a `file://` URL for
//! the stored blob.

use crate::model::tracker_error::{TrackerError, TrackerResult};
use crate::model::upload_status::{UploadOutcome, UploadStatus};
use color_eyre::eyre::{self, eyre};
use humansize::{file_size_opts as options, FileSize};
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::fs;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use url::Url;

const PARTIAL_SUFFIX: &str = ".part";
const MAX_NAME_ATTEMPTS: usize = 1000;

/// `report.csv`, `report-1.csv`, `report-2.csv`, ...
fn numbered_name(name: &str, attempt: usize) -> String {
    if attempt == 0 {
        return name.to_string();
    }
    match name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}-{}.{}", stem, attempt, ext),
        _ => format!("{}-{}", name, attempt),
    }
}

/// Blob store rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    /// Store rooted at `root`, which is created on the first upload
    pub fn new(root: impl Into<PathBuf>) -> Self {
        LocalBlobStore { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Location of a blob inside the store. Names must be a single path component.
    pub fn blob_path(&self, name: &str) -> TrackerResult<PathBuf> {
        if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(TrackerError::invalid_argument(format!(
                "invalid blob name: {:?}",
                name
            )));
        }
        Ok(self.root.join(name))
    }

    /// `file://` URL of a blob. Fails for a relative root.
    pub fn blob_uri(&self, name: &str) -> TrackerResult<Url> {
        let path = self.blob_path(name)?;
        Url::from_file_path(&path).map_err(|_| {
            TrackerError::invalid_argument(format!("blob path is not absolute: {}", path.display()))
        })
    }

    /// Copy `source` into the store, pausing `chunk_delay` after every chunk
    ///
    /// Data goes to a temporary file private to this upload, which is deleted
    /// when the upload fails or its future is dropped. A finished upload is
    /// stored under the source's file name, or under `<stem>-<n>.<ext>` when a
    /// blob with that name already exists. Existing blobs are never replaced.
    pub async fn upload(&self, source: &Path, chunk_size: usize, chunk_delay: Duration) -> eyre::Result<Url> {
        if chunk_size == 0 {
            return Err(TrackerError::invalid_argument("chunk size must be positive").into());
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| eyre!("source has no file name: {}", source.display()))?;
        // Fail on a bad name before any data is read
        self.blob_uri(&name)?;

        fs::create_dir_all(&self.root).await?;
        let mut reader = fs::File::open(source).await?;
        let partial = tempfile::Builder::new()
            .prefix(&format!(".{}.", name))
            .suffix(PARTIAL_SUFFIX)
            .tempfile_in(&self.root)?;
        let mut writer = fs::File::from_std(partial.as_file().try_clone()?);
        let mut buffer = vec![0u8; chunk_size];
        let mut total: u64 = 0;

        loop {
            let read = reader.read(&mut buffer).await?;
            if read == 0 {
                break;
            }
            writer.write_all(&buffer[..read]).await?;
            total += read as u64;
            if !chunk_delay.is_zero() {
                tokio::time::sleep(chunk_delay).await;
            }
        }
        writer.flush().await?;
        drop(writer);

        let stored_name = self.persist(partial, &name)?;
        let uri = self.blob_uri(&stored_name)?;
        let size = total
            .file_size(options::CONVENTIONAL)
            .unwrap_or_else(|_| "0 B".to_string());
        tracing::info!(blob = %uri, size = %size, "blob stored");
        Ok(uri)
    }

    /// Move a finished temporary file to the first free blob name
    fn persist(&self, mut partial: NamedTempFile, name: &str) -> eyre::Result<String> {
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let candidate = numbered_name(name, attempt);
            match partial.persist_noclobber(self.blob_path(&candidate)?) {
                Ok(_) => return Ok(candidate),
                Err(err) if err.error.kind() == io::ErrorKind::AlreadyExists => {
                    partial = err.file;
                }
                Err(err) => return Err(err.error.into()),
            }
        }
        Err(eyre!("no free blob name for {} after {} attempts", name, MAX_NAME_ATTEMPTS))
    }

    /// Run an upload and turn its result into the outcome reported to callbacks
    pub async fn upload_outcome(&self, source: PathBuf, chunk_size: usize, chunk_delay: Duration) -> UploadOutcome {
        match self.upload(&source, chunk_size, chunk_delay).await {
            Ok(uri) => UploadOutcome::success(uri),
            Err(err) => {
                tracing::warn!(source = %source.display(), "upload failed: {:#}", err);
                UploadOutcome::failure(UploadStatus::Error)
            }
        }
    }
}
