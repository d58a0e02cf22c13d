use std::future::Future;
use std::pin::Pin;
use std::task::Poll;

use crate::WorkspaceError;

/// `FutureResult` is a handle that makes it possible to wait for the completion
/// of an ongoing task.
///
/// Contrary to some `Future`, it does not need to be polled for the task to
/// progress. Dropping the `FutureResult` does not cancel the task being executed
/// either.
///
/// - In a sync context, you can call `FutureResult::wait()`. The function
/// does not rely on `block_on`.
/// - In an async context, you can call simply use `FutureResult` as a future.
pub struct FutureResult<T> {
    inner: Inner<T>,
}

enum Inner<T> {
    FailedBeforeStart(Option<WorkspaceError>),
    InProgress { receiver: oneshot::Receiver<crate::Result<T>>, error_msg_if_failure: &'static str },
}

impl<T> From<WorkspaceError> for FutureResult<T> {
    fn from(err: WorkspaceError) -> Self {
        FutureResult { inner: Inner::FailedBeforeStart(Some(err)) }
    }
}

impl<T> FutureResult<T> {
    pub(crate) fn create(
        error_msg_if_failure: &'static str,
    ) -> (Self, oneshot::Sender<crate::Result<T>>) {
        let (sender, receiver) = oneshot::channel();
        let inner: Inner<T> = Inner::InProgress { receiver, error_msg_if_failure };
        (FutureResult { inner }, sender)
    }

    /// Blocks until the scheduled result is available.
    ///
    /// In an async context, you should simply use `ScheduledResult` as a future.
    pub fn wait(self) -> crate::Result<T> {
        match self.inner {
            Inner::FailedBeforeStart(err) => Err(err.unwrap_or_else(|| {
                WorkspaceError::SystemError("FutureResult polled twice".to_string())
            })),
            Inner::InProgress { receiver, error_msg_if_failure } => receiver.recv().unwrap_or_else(|_| {
                Err(WorkspaceError::SystemError(error_msg_if_failure.to_string()))
            }),
        }
    }
}

impl<T> Future for FutureResult<T> {
    type Output = crate::Result<T>;

    fn poll(self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        unsafe {
            match &mut Pin::get_unchecked_mut(self).inner {
                Inner::FailedBeforeStart(err) => Poll::Ready(Err(err.take().unwrap_or_else(|| {
                    WorkspaceError::SystemError("FutureResult polled twice".to_string())
                }))),
                Inner::InProgress { receiver, error_msg_if_failure } => {
                    Pin::new_unchecked(receiver).poll(cx).map(|oneshot_res| {
                        let res = oneshot_res.map_err(|_| {
                            WorkspaceError::SystemError(error_msg_if_failure.to_string())
                        });
                        res.and_then(|res| res)
                    })
                }
            }
        }
    }
}
