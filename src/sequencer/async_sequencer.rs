use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use log::{debug, error, info};
use parking_lot::{Mutex, RwLock};

use super::ChangesetProcessor;
use crate::common::constants::SEQUENCER_THREAD_PREFIX;
use crate::common::thread_name;
use crate::future_result::FutureResult;
use crate::indexer::Changeset;
use crate::WorkspaceError;

struct QueuedChangeset {
    changeset: Changeset,
    result_sender: oneshot::Sender<crate::Result<()>>,
}

type ChangesetSender = Sender<QueuedChangeset>;
type ChangesetReceiver = Receiver<QueuedChangeset>;

/// Bounded FIFO of changesets for one index, drained by a single consumer thread.
///
/// Changesets are applied in submission order. Once `queue_max_len` changesets are
/// waiting, [`AsyncSequencer::submit`] blocks until the consumer takes one.
pub struct AsyncSequencer<P: ChangesetProcessor> {
    index_name: String,
    processor: Arc<P>,
    sender: RwLock<Option<ChangesetSender>>,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl<P: ChangesetProcessor> AsyncSequencer<P> {
    pub fn start(index_name: &str, queue_max_len: usize, processor: Arc<P>) -> crate::Result<Self> {
        if queue_max_len == 0 {
            return Err(WorkspaceError::InvalidArgument(
                "queue_max_len must be at least 1".to_string(),
            ));
        }
        let (sender, receiver) = crossbeam_channel::bounded(queue_max_len);
        let consumer_processor = processor.clone();
        let consumer_index_name = index_name.to_string();
        let consumer = thread::Builder::new()
            .name(format!("{SEQUENCER_THREAD_PREFIX}-{index_name}"))
            .spawn(move || consume(consumer_index_name, receiver, consumer_processor))
            .map_err(|_| {
                WorkspaceError::SystemError("Failed to spawn sequencer thread".to_string())
            })?;
        info!(
            "[{}] [AsyncSequencer::start] '{}' with queue_max_len {}",
            thread_name(),
            index_name,
            queue_max_len
        );
        Ok(AsyncSequencer {
            index_name: index_name.to_string(),
            processor,
            sender: RwLock::new(Some(sender)),
            consumer: Mutex::new(Some(consumer)),
        })
    }

    pub fn processor(&self) -> &Arc<P> {
        &self.processor
    }

    /// Enqueues `changeset`, blocking while the queue is full.
    ///
    /// The returned future resolves once the changeset was applied.
    pub fn submit(&self, changeset: Changeset) -> FutureResult<()> {
        let sender = match self.sender.read().clone() {
            Some(sender) => sender,
            None => {
                return WorkspaceError::InvariantViolation(format!(
                    "changeset submitted to '{}' after shutdown",
                    self.index_name
                ))
                .into();
            }
        };
        let (future_result, result_sender) =
            FutureResult::create("The sequencer dropped a changeset without applying it");
        if sender.send(QueuedChangeset { changeset, result_sender }).is_err() {
            return WorkspaceError::ErrorInThread(format!(
                "sequencer thread of '{}' is gone",
                self.index_name
            ))
            .into();
        }
        future_result
    }

    /// Number of changesets waiting to be applied.
    pub fn queue_len(&self) -> usize {
        self.sender.read().as_ref().map_or(0, |sender| sender.len())
    }

    pub fn is_running(&self) -> bool {
        self.sender.read().is_some()
    }

    /// Stops accepting changesets, applies the queued ones, then shuts the processor down.
    pub fn shutdown(&self) -> crate::Result<()> {
        drop(self.sender.write().take());
        let consumer = match self.consumer.lock().take() {
            Some(consumer) => consumer,
            None => return Ok(()),
        };
        consumer.join().map_err(|_| {
            WorkspaceError::ErrorInThread(format!("sequencer thread of '{}' panicked", self.index_name))
        })?;
        info!("[{}] [shutdown] sequencer of '{}' drained", thread_name(), self.index_name);
        self.processor.shutdown()
    }
}

impl<P: ChangesetProcessor> Drop for AsyncSequencer<P> {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("[{}] [drop] sequencer of '{}': {}", thread_name(), self.index_name, err);
        }
    }
}

fn consume<P: ChangesetProcessor>(index_name: String, receiver: ChangesetReceiver, processor: Arc<P>) {
    for QueuedChangeset { changeset, result_sender } in receiver {
        let result = processor.apply_changeset(&changeset);
        debug!(
            "[{}] [consume] '{}' applied {} operations, ok: {}",
            thread_name(),
            index_name,
            changeset.len(),
            result.is_ok()
        );
        // The submitter may not wait for the result.
        let _ = result_sender.send(result);
    }
}
