use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};

use crate::error::{DriverError, DriverResult};

type Job = Box<dyn FnOnce() -> DriverResult + Send>;

struct WorkItem {
    job: Job,
    reply: oneshot::Sender<DriverResult>,
}

/// Serialized execution context: one in-flight work item at a time, run
/// in submission order. All Device mutations on the user-client path go
/// through here, which is what makes them mutually exclusive in time.
pub struct WorkQueue {
    tx: mpsc::UnboundedSender<WorkItem>,
}

impl WorkQueue {
    /// Spawns the queue's worker task on the current runtime.
    pub fn new() -> Arc<Self> {
        let (tx, mut rx) = mpsc::unbounded_channel::<WorkItem>();

        tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                // Receiver may have given up; the work item still ran.
                let _ = item.reply.send((item.job)());
            }
        });

        Arc::new(Self { tx })
    }

    /// Runs `job` on the queue and waits for it to complete. Once
    /// submitted a job runs to completion; there is no cancellation.
    pub async fn dispatch_sync(
        &self,
        job: impl FnOnce() -> DriverResult + Send + 'static,
    ) -> DriverResult {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(WorkItem {
                job: Box::new(job),
                reply: reply_tx,
            })
            .map_err(|_| DriverError::InvalidState)?;

        reply_rx.await.unwrap_or(Err(DriverError::InvalidState))
    }
}
