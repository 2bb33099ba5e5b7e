//! Bounded queue of received messages drained by a fixed number of workers.
use std::ops::AddAssign;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;

use crate::config::WorkerConfig;
use crate::processor::{MessageRouter, Outcome};
use crate::protocol::ReceivedMessage;

#[derive(thiserror::Error, Debug)]
pub enum WorkerError {
    #[error("Message queue is closed.")]
    QueueClosed,
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub processed: u64,
    pub duplicates: u64,
    pub failed: u64,
}

impl AddAssign for WorkerStats {
    fn add_assign(&mut self, other: WorkerStats) {
        self.processed += other.processed;
        self.duplicates += other.duplicates;
        self.failed += other.failed;
    }
}

pub struct Workers {
    sender: mpsc::Sender<ReceivedMessage>,
    handles: Vec<JoinHandle<WorkerStats>>,
}

impl Workers {
    /// Spawns `config.count` workers (at least one) on the current runtime.
    pub fn spawn(router: Arc<MessageRouter>, config: &WorkerConfig) -> Workers {
        let (sender, receiver) = mpsc::channel(config.queue_size.max(1));
        let receiver = Arc::new(Mutex::new(receiver));

        let handles = (0..config.count.max(1))
            .map(|worker| {
                let router = router.clone();
                let receiver = receiver.clone();
                tokio::spawn(run_worker(worker, router, receiver))
            })
            .collect();

        log::debug!(
            "Started {} message worker(s), queue size {}.",
            config.count.max(1),
            config.queue_size.max(1)
        );
        Workers { sender, handles }
    }

    /// Waits for a free queue slot when the queue is full.
    pub async fn submit(&self, message: ReceivedMessage) -> Result<(), WorkerError> {
        self.sender
            .send(message)
            .await
            .map_err(|_| WorkerError::QueueClosed)
    }

    pub fn sender(&self) -> mpsc::Sender<ReceivedMessage> {
        self.sender.clone()
    }

    /// Closes the queue and waits until the workers drain it. Messages can
    /// still be queued through senders obtained earlier, until they are
    /// dropped.
    pub async fn finish(self) -> Result<WorkerStats, WorkerError> {
        drop(self.sender);

        let mut stats = WorkerStats::default();
        for handle in self.handles {
            stats += handle.await?;
        }
        log::info!(
            "Message workers finished: {} processed, {} duplicates, {} failed.",
            stats.processed,
            stats.duplicates,
            stats.failed
        );
        Ok(stats)
    }
}

async fn run_worker(
    worker: usize,
    router: Arc<MessageRouter>,
    receiver: Arc<Mutex<mpsc::Receiver<ReceivedMessage>>>,
) -> WorkerStats {
    let mut stats = WorkerStats::default();
    loop {
        let message = receiver.lock().await.recv().await;
        let message = match message {
            Some(message) => message,
            None => break,
        };

        match router.route(message).await {
            Ok(processed) => {
                stats.processed += 1;
                if processed.outcome() == Outcome::MatchedExisting {
                    stats.duplicates += 1;
                }
            }
            // Already logged by the router. A failure aborts only this message.
            Err(_) => stats.failed += 1,
        }
    }
    log::trace!("Message worker {} stopped.", worker);
    stats
}
