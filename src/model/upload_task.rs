//! The contract the tracker consumes from a running upload
//!
//! Anything that can answer "was this unit of work cancelled?" without
//! blocking can stand in for an upload task. The registry hands out
//! [`UploadHandle`]s for tokio tasks; callers that drive their own futures can
//! attach a [`CancellationToken`] instead.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::AbortHandle;
use tokio_util::sync::CancellationToken;

/// A cancellable unit of asynchronous work observed by an upload tracker
#[cfg_attr(test, mockall::automock)]
pub trait UploadTask: Send + Sync {
    /// Current cancellation state. Must not block.
    fn is_cancelled(&self) -> bool;
}

impl UploadTask for CancellationToken {
    fn is_cancelled(&self) -> bool {
        CancellationToken::is_cancelled(self)
    }
}

impl<T: UploadTask + ?Sized> UploadTask for Arc<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

impl<T: UploadTask + ?Sized> UploadTask for Box<T> {
    fn is_cancelled(&self) -> bool {
        (**self).is_cancelled()
    }
}

/// Handle to an upload running as a tokio task
///
/// tokio only reports cancellation once the task has been joined, so the
/// handle records it in a shared flag at the moment `cancel` is called.
#[derive(Debug, Clone)]
pub struct UploadHandle {
    abort_handle: AbortHandle,
    cancelled: Arc<AtomicBool>,
}

impl UploadHandle {
    pub fn new(abort_handle: AbortHandle) -> Self {
        UploadHandle {
            abort_handle,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Mark the upload cancelled and abort the underlying task
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.abort_handle.abort();
    }

    /// Returns true once the tokio task has stopped running, for any reason
    pub fn is_finished(&self) -> bool {
        self.abort_handle.is_finished()
    }
}

impl UploadTask for UploadHandle {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration};

    #[tokio::test]
    async fn test_upload_handle_reports_cancel() {
        let join_handle = tokio::spawn(async {
            sleep(Duration::from_secs(10)).await;
        });
        let handle = UploadHandle::new(join_handle.abort_handle());
        assert!(!handle.is_cancelled());

        handle.cancel();

        assert!(handle.is_cancelled());
        let err = join_handle.await.unwrap_err();
        assert!(err.is_cancelled());
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_upload_handle_clones_share_state() {
        let join_handle = tokio::spawn(async {
            sleep(Duration::from_secs(10)).await;
        });
        let handle = UploadHandle::new(join_handle.abort_handle());
        let observer = handle.clone();

        handle.cancel();

        assert!(observer.is_cancelled());
    }

    #[tokio::test]
    async fn test_finished_upload_is_not_cancelled() {
        let join_handle = tokio::spawn(async {});
        let handle = UploadHandle::new(join_handle.abort_handle());
        join_handle.await.unwrap();

        assert!(handle.is_finished());
        assert!(!handle.is_cancelled());
    }

    #[test]
    fn test_cancellation_token_as_upload_task() {
        let token = CancellationToken::new();
        let task: Box<dyn UploadTask> = Box::new(token.clone());
        assert!(!task.is_cancelled());

        token.cancel();

        assert!(task.is_cancelled());
    }

    #[test]
    fn test_arc_delegates_to_inner_task() {
        let mut mock = MockUploadTask::new();
        mock.expect_is_cancelled().times(1).return_const(true);
        let task = Arc::new(mock);

        assert!(UploadTask::is_cancelled(&task));
    }
}
