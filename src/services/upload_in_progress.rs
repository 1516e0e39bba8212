//! Tracking object for a single in-flight upload
//!
//! An [`UploadInProgress`] pairs the application's completion callback and
//! context with the task performing the upload. The transport creates one when
//! an upload begins, attaches the running task, may poll its cancellation
//! state, and finally triggers the callback with the outcome.
//!
//! Triggering consumes the tracker, so the callback runs at most once.

use crate::model::tracker_error::{TrackerError, TrackerResult};
use crate::model::upload_status::UploadStatus;
use crate::model::upload_task::UploadTask;
use color_eyre::eyre;
use std::fmt;
use url::Url;

/// Completion handler invoked with `(status, blob_uri, context)`
///
/// `blob_uri` is `None` when the upload failed and no blob was produced.
/// Whatever the handler returns is handed back to the code that triggered it.
pub type UploadCallback<C> =
    Box<dyn FnOnce(UploadStatus, Option<Url>, C) -> eyre::Result<()> + Send>;

/// Callback, context and task of one upload that has not reported yet
pub struct UploadInProgress<C> {
    callback: UploadCallback<C>,
    context: C,
    task: Option<Box<dyn UploadTask>>,
}

impl<C> UploadInProgress<C> {
    /// Create a tracker for an upload that has not been attached to a task yet
    ///
    /// The callback arrives as an `Option` because the transport forwards
    /// whatever the application handed to the client; a missing callback is
    /// rejected here rather than at trigger time.
    pub fn new(callback: Option<UploadCallback<C>>, context: C) -> TrackerResult<Self> {
        let callback = callback
            .ok_or_else(|| TrackerError::invalid_argument("upload callback is required"))?;
        Ok(UploadInProgress {
            callback,
            context,
            task: None,
        })
    }

    /// Attach the task performing the upload, replacing any previous one
    pub fn set_task<T>(&mut self, task: Option<T>) -> TrackerResult<()>
    where
        T: UploadTask + 'static,
    {
        let task = task.ok_or_else(|| TrackerError::invalid_argument("upload task is required"))?;
        self.task = Some(Box::new(task));
        Ok(())
    }

    /// Report the attached task's cancellation state as-is
    pub fn is_cancelled(&self) -> TrackerResult<bool> {
        match &self.task {
            Some(task) => Ok(task.is_cancelled()),
            None => Err(TrackerError::not_ready("no upload task attached")),
        }
    }

    /// Whether a task has been attached
    pub fn has_task(&self) -> bool {
        self.task.is_some()
    }

    /// The context that will be handed to the callback
    pub fn context(&self) -> &C {
        &self.context
    }

    /// Hand the outcome to the application's callback
    ///
    /// Runs the callback on the current thread and returns its result
    /// unmodified. The tracker is gone afterwards.
    pub fn trigger_callback(self, status: UploadStatus, blob_uri: Option<Url>) -> eyre::Result<()> {
        (self.callback)(status, blob_uri, self.context)
    }
}

impl<C: fmt::Debug> fmt::Debug for UploadInProgress<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadInProgress")
            .field("context", &self.context)
            .field("has_task", &self.has_task())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::upload_task::MockUploadTask;
    use color_eyre::eyre::eyre;
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use tokio_util::sync::CancellationToken;

    type Calls<C> = Arc<Mutex<Vec<(UploadStatus, Option<Url>, C)>>>;

    fn recording_callback<C: Send + 'static>() -> (UploadCallback<C>, Calls<C>) {
        let calls: Calls<C> = Arc::new(Mutex::new(Vec::new()));
        let calls_clone = calls.clone();
        let callback: UploadCallback<C> = Box::new(move |status, uri, context| {
            calls_clone.lock().unwrap().push((status, uri, context));
            Ok(())
        });
        (callback, calls)
    }

    fn mock_task(cancelled: bool) -> MockUploadTask {
        let mut task = MockUploadTask::new();
        task.expect_is_cancelled().times(1).return_const(cancelled);
        task
    }

    #[test]
    fn test_new_stores_context() {
        let (callback, _calls) = recording_callback();
        let context = HashMap::from([("id".to_string(), 42)]);

        let tracker = UploadInProgress::new(Some(callback), context.clone()).unwrap();

        assert_eq!(tracker.context(), &context);
        assert!(!tracker.has_task());
    }

    #[test]
    fn test_new_accepts_absent_context() {
        let (callback, _calls) = recording_callback::<Option<String>>();
        let tracker = UploadInProgress::new(Some(callback), None).unwrap();
        assert_eq!(tracker.context(), &None);
    }

    #[test]
    fn test_new_without_callback_is_invalid_argument() {
        let result = UploadInProgress::<()>::new(None, ());
        assert!(matches!(result, Err(TrackerError::InvalidArgument(_))));
    }

    #[test]
    fn test_set_task_stores_task() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();

        tracker.set_task(Some(mock_task(false))).unwrap();

        assert!(tracker.has_task());
        assert_eq!(tracker.is_cancelled(), Ok(false));
    }

    #[test]
    fn test_set_task_without_task_is_invalid_argument() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();

        let result = tracker.set_task::<MockUploadTask>(None);

        assert!(matches!(result, Err(TrackerError::InvalidArgument(_))));
        assert!(!tracker.has_task());
    }

    #[test]
    fn test_set_task_replaces_previous_task() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();
        let mut first = MockUploadTask::new();
        first.expect_is_cancelled().never();

        tracker.set_task(Some(first)).unwrap();
        tracker.set_task(Some(mock_task(true))).unwrap();

        assert_eq!(tracker.is_cancelled(), Ok(true));
    }

    #[test]
    fn test_is_cancelled_true() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();
        tracker.set_task(Some(mock_task(true))).unwrap();

        assert_eq!(tracker.is_cancelled(), Ok(true));
    }

    #[test]
    fn test_is_cancelled_false() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();
        tracker.set_task(Some(mock_task(false))).unwrap();

        assert_eq!(tracker.is_cancelled(), Ok(false));
    }

    #[test]
    fn test_is_cancelled_without_task_is_not_ready() {
        let (callback, _calls) = recording_callback::<Option<()>>();
        let tracker = UploadInProgress::new(Some(callback), None).unwrap();

        let result = tracker.is_cancelled();

        assert!(matches!(result, Err(TrackerError::NotReady(_))));
    }

    #[test]
    fn test_is_cancelled_follows_token_state() {
        let (callback, _calls) = recording_callback();
        let mut tracker = UploadInProgress::new(Some(callback), ()).unwrap();
        let token = CancellationToken::new();
        tracker.set_task(Some(token.clone())).unwrap();

        assert_eq!(tracker.is_cancelled(), Ok(false));
        token.cancel();
        assert_eq!(tracker.is_cancelled(), Ok(true));
    }

    #[test]
    fn test_trigger_callback_passes_arguments_unchanged() {
        let (callback, calls) = recording_callback();
        let context = HashMap::from([("id".to_string(), 42)]);
        let mut tracker = UploadInProgress::new(Some(callback), context.clone()).unwrap();
        tracker.set_task(Some(mock_task(false))).unwrap();
        let uri = Url::parse("https://blob/x").unwrap();

        assert_eq!(tracker.is_cancelled(), Ok(false));
        tracker.trigger_callback(UploadStatus::Ok, Some(uri.clone())).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0], (UploadStatus::Ok, Some(uri), context));
    }

    #[test]
    fn test_trigger_callback_without_uri() {
        let (callback, calls) = recording_callback();
        let tracker = UploadInProgress::new(Some(callback), "ctx").unwrap();

        tracker.trigger_callback(UploadStatus::Error, None).unwrap();

        let calls = calls.lock().unwrap();
        assert_eq!(calls.as_slice(), &[(UploadStatus::Error, None, "ctx")]);
    }

    #[test]
    fn test_trigger_callback_returns_callback_error() {
        let callback: UploadCallback<()> = Box::new(|_, _, _| -> eyre::Result<()> { Err(eyre!("handler exploded")) });
        let tracker = UploadInProgress::new(Some(callback), ()).unwrap();

        let err = tracker.trigger_callback(UploadStatus::Ok, None).unwrap_err();

        assert_eq!(err.to_string(), "handler exploded");
    }

    #[test]
    #[should_panic(expected = "handler panicked")]
    fn test_trigger_callback_propagates_panic() {
        let callback: UploadCallback<()> = Box::new(|_, _, _| -> eyre::Result<()> { panic!("handler panicked") });
        let tracker = UploadInProgress::new(Some(callback), ()).unwrap();

        let _ = tracker.trigger_callback(UploadStatus::Ok, None);
    }

    #[test]
    fn test_debug_hides_callback() {
        let (callback, _calls) = recording_callback();
        let tracker = UploadInProgress::new(Some(callback), 5u8).unwrap();
        assert_eq!(
            format!("{:?}", tracker),
            "UploadInProgress { context: 5, has_task: false, .. }"
        );
    }
}
