use std::panic::{catch_unwind, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Sender, TrySendError};
use passage_core::{Error, Result};

type Job = Box<dyn FnOnce() + Send + 'static>;

/// Fixed set of inference threads fed by a bounded queue.
///
/// Submissions never wait for queue space: when `queue_capacity` jobs are
/// already pending the call fails with `ResourceExhausted`.
pub struct InferencePool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl InferencePool {
    pub fn new(workers: usize, queue_capacity: usize) -> Result<Self> {
        if workers == 0 || queue_capacity == 0 {
            return Err(Error::InvalidConfig(
                "inference pool needs at least one worker and one queue slot".into(),
            ));
        }
        let (sender, receiver) = bounded::<Job>(queue_capacity);
        let mut handles = Vec::with_capacity(workers);
        for i in 0..workers {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("passage-embed-{i}"))
                .spawn(move || {
                    for job in receiver {
                        // A panicking job drops its reply channel; the caller sees the error.
                        if catch_unwind(AssertUnwindSafe(job)).is_err() {
                            tracing::error!("embedding job panicked");
                        }
                    }
                })?;
            handles.push(handle);
        }
        tracing::debug!(workers, queue_capacity, "started inference pool");
        Ok(Self { sender: Some(sender), workers: handles, queue_capacity })
    }

    /// Runs `f` on a worker thread and waits for its result.
    pub fn run<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce() -> T + Send + 'static,
    {
        let sender = self
            .sender
            .as_ref()
            .ok_or_else(|| Error::Embedding("inference pool is shut down".into()))?;
        let (reply_tx, reply_rx) = bounded(1);
        let job: Job = Box::new(move || {
            let _ = reply_tx.send(f());
        });
        sender.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::ResourceExhausted { capacity: self.queue_capacity },
            TrySendError::Disconnected(_) => Error::Embedding("inference pool is shut down".into()),
        })?;
        reply_rx
            .recv()
            .map_err(|_| Error::Embedding("inference worker dropped the request".into()))
    }

    /// Jobs waiting for a free worker.
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    pub fn workers(&self) -> usize {
        self.workers.len()
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

impl Drop for InferencePool {
    fn drop(&mut self) {
        // Closing the channel ends each worker loop once the queue drains.
        self.sender.take();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}
