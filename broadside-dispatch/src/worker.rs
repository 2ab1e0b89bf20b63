//! Job queue and send worker pool.
//!
//! Bulk sends are decoupled from the HTTP request path: callers enqueue a
//! job and poll its status on the job board, while a pool of workers
//! drains the queue and invokes the dispatcher synchronously.

use std::sync::Arc;

use broadside_common::Signal;
use dashmap::DashMap;
use serde::Serialize;
use tokio::{
    sync::{Mutex, broadcast, mpsc},
    task::JoinHandle,
};
use ulid::Ulid;

use crate::{BulkResult, CampaignPayload, CancelToken, DispatchError, Dispatcher};

/// Lifecycle of a queued bulk send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Queued,
    Running,
    Done,
    Failed,
}

/// Job board entry.
#[derive(Debug, Clone, Serialize)]
pub struct JobStatus {
    pub id: String,
    pub state: JobState,
    pub result: Option<BulkResult>,
    pub error: Option<String>,
}

impl JobStatus {
    fn new(id: String, state: JobState) -> Self {
        Self {
            id,
            state,
            result: None,
            error: None,
        }
    }
}

#[derive(Debug)]
struct Job {
    id: String,
    payload: CampaignPayload,
}

/// Bounded job queue with a shared status board.
#[derive(Debug, Clone)]
pub struct JobQueue {
    tx: mpsc::Sender<Job>,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    board: Arc<DashMap<String, JobStatus>>,
}

impl JobQueue {
    #[must_use]
    pub fn new(depth: usize) -> Self {
        let (tx, rx) = mpsc::channel(depth.max(1));
        Self {
            tx,
            rx: Arc::new(Mutex::new(rx)),
            board: Arc::new(DashMap::new()),
        }
    }

    /// Enqueue a bulk send, returning the job id for status polling.
    pub fn submit(&self, payload: CampaignPayload) -> Result<String, DispatchError> {
        let id = Ulid::new().to_string();
        self.board
            .insert(id.clone(), JobStatus::new(id.clone(), JobState::Queued));

        let job = Job {
            id: id.clone(),
            payload,
        };
        if self.tx.try_send(job).is_err() {
            self.board.remove(&id);
            return Err(DispatchError::QueueFull);
        }

        tracing::info!(job = %id, "Queued bulk send job");
        Ok(id)
    }

    #[must_use]
    pub fn status(&self, id: &str) -> Option<JobStatus> {
        self.board.get(id).map(|entry| entry.value().clone())
    }

    /// Spawn the worker pool. Workers stop on `Signal::Shutdown` and skip
    /// not-yet-started sends when `cancel` fires.
    pub fn spawn_workers(
        &self,
        count: usize,
        dispatcher: Arc<Dispatcher>,
        shutdown: &broadcast::Sender<Signal>,
        cancel: CancelToken,
    ) -> Vec<JoinHandle<()>> {
        (0..count.max(1))
            .map(|worker| {
                let rx = Arc::clone(&self.rx);
                let board = Arc::clone(&self.board);
                let dispatcher = Arc::clone(&dispatcher);
                let mut shutdown = shutdown.subscribe();
                let cancel = cancel.clone();

                tokio::spawn(async move {
                    loop {
                        let job = tokio::select! {
                            job = next_job(&rx) => job,
                            _ = shutdown.recv() => None,
                        };
                        let Some(job) = job else {
                            tracing::info!(worker, "Send worker stopping");
                            break;
                        };

                        tracing::info!(
                            worker,
                            job = %job.id,
                            campaign = %job.payload.campaign_id,
                            "Send worker picked up job"
                        );
                        board.insert(job.id.clone(), JobStatus::new(job.id.clone(), JobState::Running));

                        match dispatcher.send_bulk(job.payload, &cancel).await {
                            Ok(result) => {
                                let mut status = JobStatus::new(job.id.clone(), JobState::Done);
                                status.result = Some(result);
                                board.insert(job.id, status);
                            }
                            Err(e) => {
                                tracing::error!(worker, job = %job.id, error = %e, "Bulk send job failed");
                                let mut status = JobStatus::new(job.id.clone(), JobState::Failed);
                                status.error = Some(e.to_string());
                                board.insert(job.id, status);
                            }
                        }
                    }
                })
            })
            .collect()
    }
}

async fn next_job(rx: &Arc<Mutex<mpsc::Receiver<Job>>>) -> Option<Job> {
    rx.lock().await.recv().await
}
