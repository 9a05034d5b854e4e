//! Async job orchestrator: a fixed worker pool over an unbounded queue.
//!
//! Submitting returns immediately with a [`JobId`]; workers pick jobs up in
//! submission order and drive them through `PENDING -> PROCESSING ->
//! COMPLETED | FAILED`. Each job body runs in its own task, so a panic inside
//! a pipeline only fails that job and the worker keeps serving the queue.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};

use sitedigest_shared::{JobId, JobKind, JobsConfig, Result, SiteDigestError};

use crate::jobs::{Job, JobContent, JobOutput, JobRegistry};

/// Runs the work behind one job.
#[async_trait]
pub trait JobRunner: Send + Sync {
    async fn run(&self, kind: JobKind, url: &str) -> Result<JobOutput>;
}

#[derive(Debug)]
struct QueuedJob {
    id: JobId,
    kind: JobKind,
    url: String,
}

type SharedQueue = Arc<Mutex<mpsc::UnboundedReceiver<QueuedJob>>>;

// ---------------------------------------------------------------------------
// JobManager
// ---------------------------------------------------------------------------

/// Owns the job registry and the worker pool.
pub struct JobManager {
    registry: JobRegistry,
    queue: mpsc::UnboundedSender<QueuedJob>,
    workers: Vec<JoinHandle<()>>,
}

impl JobManager {
    /// Spawn `config.workers` workers that execute jobs with `runner`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(config: &JobsConfig, runner: Arc<dyn JobRunner>) -> Self {
        let registry = JobRegistry::new();
        let (queue, rx) = mpsc::unbounded_channel();
        let rx: SharedQueue = Arc::new(Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    rx.clone(),
                    registry.clone(),
                    runner.clone(),
                ))
            })
            .collect::<Vec<_>>();

        info!(workers = workers.len(), "job manager started");
        Self {
            registry,
            queue,
            workers,
        }
    }

    /// Register a `PENDING` job and enqueue it.
    #[instrument(skip(self), fields(kind = %kind))]
    pub async fn submit(&self, kind: JobKind, url: &str) -> Result<JobId> {
        let job = Job::new(kind, url);
        let id = job.id();
        self.registry.insert(job).await;

        let queued = QueuedJob {
            id,
            kind,
            url: url.to_string(),
        };
        if self.queue.send(queued).is_err() {
            self.registry.remove(id).await;
            return Err(SiteDigestError::validation("job queue is closed"));
        }

        info!(job_id = %id, url, status = "PENDING", "job submitted");
        Ok(id)
    }

    pub async fn submit_single(&self, url: &str) -> Result<JobId> {
        self.submit(JobKind::Single, url).await
    }

    pub async fn submit_crawl(&self, url: &str) -> Result<JobId> {
        self.submit(JobKind::Crawl, url).await
    }

    /// Snapshot of a job, or `None` for an unknown id.
    pub async fn get_job(&self, id: JobId) -> Option<Job> {
        self.registry.get(id).await
    }

    /// Content of a completed job.
    pub async fn get_job_content(&self, id: JobId) -> Result<JobContent> {
        self.registry
            .get(id)
            .await
            .ok_or(SiteDigestError::JobNotFound(id))?
            .content()
    }

    pub fn registry(&self) -> &JobRegistry {
        &self.registry
    }

    /// Stop accepting jobs, drain the queue, and wait for every worker.
    pub async fn shutdown(self) {
        let Self {
            registry,
            queue,
            workers,
        } = self;
        drop(queue);

        for handle in workers {
            if let Err(e) = handle.await {
                warn!(error = %e, "worker exited abnormally");
            }
        }
        info!(jobs = registry.job_count().await, "job manager stopped");
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

async fn worker_loop(
    worker: usize,
    queue: SharedQueue,
    registry: JobRegistry,
    runner: Arc<dyn JobRunner>,
) {
    debug!(worker, "worker ready");
    loop {
        // The lock is released before the job runs.
        let next = queue.lock().await.recv().await;
        let Some(job) = next else {
            break;
        };
        execute(worker, job, &registry, runner.clone()).await;
    }
    debug!(worker, "worker finished");
}

async fn execute(worker: usize, job: QueuedJob, registry: &JobRegistry, runner: Arc<dyn JobRunner>) {
    let QueuedJob { id, kind, url } = job;

    if let Err(e) = registry.update(id, |j| j.start()).await {
        warn!(job_id = %id, error = %e, "could not start job");
        return;
    }
    info!(job_id = %id, worker, status = "PROCESSING", "job started");

    let task_url = url.clone();
    let outcome = tokio::spawn(async move { runner.run(kind, &task_url).await }).await;

    let transition = match outcome {
        Ok(Ok(output)) => registry.update(id, move |j| j.complete(output)).await,
        Ok(Err(e)) => {
            let message = e.to_string();
            warn!(job_id = %id, url, error = %message, "job failed");
            registry.update(id, move |j| j.fail(message)).await
        }
        Err(join) => {
            let message = join_failure(join);
            warn!(job_id = %id, url, error = %message, "job panicked");
            registry.update(id, move |j| j.fail(message)).await
        }
    };

    match transition {
        Ok(status) => info!(job_id = %id, worker, %status, "job finished"),
        Err(e) => warn!(job_id = %id, error = %e, "could not record job result"),
    }
}

fn join_failure(err: JoinError) -> String {
    if err.is_cancelled() {
        return "job task was cancelled".into();
    }
    let panic = err.into_panic();
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("job panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("job panicked: {s}")
    } else {
        "job panicked".into()
    }
}
