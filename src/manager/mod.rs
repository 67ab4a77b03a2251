pub mod types;

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use derive_builder::Builder;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::types::Error;

pub use types::ManagerError;

fn default_worker_num() -> usize {
    num_cpus::get().max(4)
}

/// Limits for a [`PipelineManager`] run.
///
/// `worker_num` defaults to the CPU count, but never below four.
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// How many pipelines may be in flight at once; the rest queue
    #[builder(default = "default_worker_num()")]
    pub worker_num: usize,
}

impl Config {
    /// Allows at most `worker_num` pipelines to run concurrently.
    pub fn new(worker_num: usize) -> Self {
        Config { worker_num }
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            worker_num: default_worker_num(),
        }
    }
}

type Pipeline = BoxFuture<'static, Result<(), Error>>;

/// Runs independent pipelines concurrently and reports the first failure.
///
/// A pipeline is any future resolving to the outcome of a complete run, such
/// as `Transformer::sink`. Pipelines share nothing; give each its own sink.
pub struct PipelineManager {
    pipelines: Vec<(String, Pipeline)>,
    cfg: Config,
}

impl PipelineManager {
    pub fn new(cfg: &Config) -> Self {
        PipelineManager {
            pipelines: Vec::new(),
            cfg: cfg.clone(),
        }
    }

    /// Queues a pipeline. It does not start until [`run_all`](Self::run_all).
    pub fn add_pipeline<F>(&mut self, name: impl Into<String>, pipeline: F)
    where
        F: Future<Output = Result<(), Error>> + Send + 'static,
    {
        self.pipelines.push((name.into(), pipeline.boxed()));
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Runs every queued pipeline, at most `worker_num` at a time.
    ///
    /// Returns only after all pipelines have finished. Every failure is
    /// logged; the first one to arrive is returned. Cancelling `cancel`
    /// abandons the pipelines still running, which stops their tables and
    /// drops their sinks.
    pub async fn run_all(self, cancel: &CancellationToken) -> Result<(), ManagerError> {
        let semaphore = Arc::new(Semaphore::new(self.cfg.worker_num.max(1)));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for (name, pipeline) in self.pipelines {
            let sem = Arc::clone(&semaphore);
            let cancel = cancel.clone();
            let tx = tx.clone();

            tokio::spawn(async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(ManagerError::Cancelled(name.clone())),
                    outcome = run_one(&name, sem, pipeline) => outcome,
                };
                if let Err(failure) = outcome {
                    let _ = tx.send(failure);
                }
            });
        }

        // closes once every pipeline task has dropped its sender
        drop(tx);
        let mut first = None;
        while let Some(failure) = rx.recv().await {
            error!(pipeline = failure.pipeline(), error = %failure, "pipeline failed");
            if first.is_none() {
                first = Some(failure);
            }
        }

        match first {
            Some(failure) => Err(failure),
            None => Ok(()),
        }
    }
}

async fn run_one(name: &str, sem: Arc<Semaphore>, pipeline: Pipeline) -> Result<(), ManagerError> {
    let _permit = sem
        .acquire_owned()
        .await
        .map_err(|_| ManagerError::Cancelled(name.to_string()))?;

    info!(pipeline = name, "pipeline started");
    match AssertUnwindSafe(pipeline).catch_unwind().await {
        Ok(Ok(())) => {
            info!(pipeline = name, "pipeline finished");
            Ok(())
        }
        Ok(Err(source)) => Err(ManagerError::PipelineFailed {
            name: name.to_string(),
            source,
        }),
        Err(_) => Err(ManagerError::Panicked(name.to_string())),
    }
}

#[cfg(test)]
#[path = "manager_test.rs"]
mod tests;
