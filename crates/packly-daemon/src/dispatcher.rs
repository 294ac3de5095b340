// Copyright (c) 2026 Joseph Verdicchio and Packly Contributors
// SPDX-License-Identifier: Apache-2.0

//! FIFO batch queue and its supervised worker pool.
//!
//! A single loop pulls jobs in admission order and spawns each into a
//! `JoinSet`, bounded by a semaphore. Every job runs in its own inner task so
//! that errors and panics surface as values at the task boundary; the active
//! marker is dropped before the completion handle fires.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, OwnedSemaphorePermit, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::fulfillment::{BatchReport, JobRunner, FAILURE_NOTICE};
use crate::store::ActiveJobGuard;
use crate::telemetry::{LifecycleEvent, Telemetry};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum JobOutcome {
    Completed { report: BatchReport },
    Failed { job_id: u64, message: String },
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("job queue is closed")]
    QueueClosed,
}

#[derive(Debug)]
pub struct PendingJob {
    pub job_id: u64,
    pub user: String,
    pub count: u64,
    pub guard: ActiveJobGuard,
    pub completion: oneshot::Sender<JobOutcome>,
}

/// Producer half handed to the command surface.
#[derive(Debug)]
pub struct JobQueue {
    tx: mpsc::UnboundedSender<PendingJob>,
    next_id: AtomicU64,
}

impl JobQueue {
    pub fn submit(
        &self,
        user: &str,
        count: u64,
        guard: ActiveJobGuard,
    ) -> Result<(u64, oneshot::Receiver<JobOutcome>), DispatchError> {
        let job_id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (completion, receiver) = oneshot::channel();
        self.tx
            .send(PendingJob {
                job_id,
                user: user.to_string(),
                count,
                guard,
                completion,
            })
            .map_err(|_| DispatchError::QueueClosed)?;
        Ok((job_id, receiver))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DispatchStats {
    pub dispatched: u64,
    pub completed: u64,
    pub failed: u64,
    pub panicked: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobResult {
    Completed,
    Failed,
    Panicked,
}

impl JobResult {
    fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Panicked => "panicked",
        }
    }
}

impl DispatchStats {
    fn absorb(&mut self, result: JobResult) {
        match result {
            JobResult::Completed => self.completed += 1,
            JobResult::Failed => self.failed += 1,
            JobResult::Panicked => self.panicked += 1,
        }
    }
}

pub struct Dispatcher {
    rx: mpsc::UnboundedReceiver<PendingJob>,
    runner: Arc<dyn JobRunner>,
    permits: Arc<Semaphore>,
    telemetry: Telemetry,
}

/// Starts the dispatcher loop. Dropping every `JobQueue` lets it drain the
/// queue, await in-flight work and resolve the handle with its statistics.
pub fn start(
    runner: Arc<dyn JobRunner>,
    max_concurrent_jobs: usize,
    telemetry: Telemetry,
) -> (JobQueue, JoinHandle<DispatchStats>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let dispatcher = Dispatcher {
        rx,
        runner,
        permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        telemetry,
    };
    let handle = tokio::spawn(dispatcher.run());
    (
        JobQueue {
            tx,
            next_id: AtomicU64::new(1),
        },
        handle,
    )
}

impl Dispatcher {
    async fn run(mut self) -> DispatchStats {
        let mut tasks: JoinSet<JobResult> = JoinSet::new();
        let mut stats = DispatchStats::default();
        loop {
            tokio::select! {
                maybe_job = self.rx.recv() => {
                    let Some(job) = maybe_job else { break };
                    let permit = match Arc::clone(&self.permits).acquire_owned().await {
                        Ok(permit) => permit,
                        Err(_) => {
                            tracing::error!(target: "packly.lifecycle", job_id = job.job_id, "worker permits closed; dropping job");
                            continue;
                        }
                    };
                    stats.dispatched += 1;
                    tasks.spawn(supervise(
                        job,
                        Arc::clone(&self.runner),
                        permit,
                        self.telemetry.clone(),
                    ));
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    record_join(&mut stats, joined);
                }
            }
        }
        while let Some(joined) = tasks.join_next().await {
            record_join(&mut stats, joined);
        }
        tracing::info!(target: "packly.lifecycle", ?stats, "dispatcher drained");
        stats
    }
}

fn record_join(stats: &mut DispatchStats, joined: Result<JobResult, tokio::task::JoinError>) {
    match joined {
        Ok(result) => stats.absorb(result),
        Err(err) => {
            tracing::error!(target: "packly.lifecycle", error = %err, "job supervisor aborted");
            stats.panicked += 1;
        }
    }
}

async fn supervise(
    job: PendingJob,
    runner: Arc<dyn JobRunner>,
    permit: OwnedSemaphorePermit,
    telemetry: Telemetry,
) -> JobResult {
    let PendingJob {
        job_id,
        user,
        count,
        guard,
        completion,
    } = job;
    telemetry.lifecycle_event(&LifecycleEvent {
        job_id,
        user: &user,
        count,
        from: "queued",
        to: "running",
    });

    let task_runner = Arc::clone(&runner);
    let task_user = user.clone();
    let joined = tokio::spawn(async move { task_runner.run(&task_user, count).await }).await;

    let (outcome, result) = match joined {
        Ok(Ok(report)) => (JobOutcome::Completed { report }, JobResult::Completed),
        Ok(Err(err)) => {
            tracing::error!(target: "packly.lifecycle", job_id, %user, error = %err, "batch fulfillment failed");
            notify(runner.as_ref(), &user).await;
            (
                JobOutcome::Failed {
                    job_id,
                    message: err.to_string(),
                },
                JobResult::Failed,
            )
        }
        Err(join_err) => {
            let message = if join_err.is_panic() {
                "fulfillment task panicked"
            } else {
                "fulfillment task cancelled"
            };
            tracing::error!(target: "packly.lifecycle", job_id, %user, error = %join_err, "{message}");
            notify(runner.as_ref(), &user).await;
            (
                JobOutcome::Failed {
                    job_id,
                    message: message.to_string(),
                },
                JobResult::Panicked,
            )
        }
    };

    drop(guard);
    drop(permit);
    telemetry.record_job(result.as_str());
    telemetry.lifecycle_event(&LifecycleEvent {
        job_id,
        user: &user,
        count,
        from: "running",
        to: result.as_str(),
    });
    // The requester may have stopped listening.
    let _ = completion.send(outcome);
    result
}

async fn notify(runner: &dyn JobRunner, user: &str) {
    if let Err(err) = runner.notify_failure(user, FAILURE_NOTICE).await {
        tracing::warn!(target: "packly.lifecycle", %user, error = %err, "failure notice not delivered");
    }
}
