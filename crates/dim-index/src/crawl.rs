//! Full index build.
//!
//! Stage 1 walks every repository concurrently, one task per repository,
//! and pushes its images onto a bounded queue. Stage 2 drains the queue and
//! parses and indexes each image on the blocking pool, at most
//! `index_workers` at a time. Stage 2 stages documents without committing;
//! a single commit follows once the queue has drained. The completion signal
//! fires after that commit.

use std::sync::Arc;
use std::time::Instant;

use dim_core::{ImageDescriptor, IndexedImage};
use dim_registry::Registry;
use futures::StreamExt;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::task::{JoinError, JoinSet};

use crate::config::IndexConfig;
use crate::engine::DocumentIndex;
use crate::error::Result;

/// Counters of a finished build.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    /// Repositories walked.
    pub repositories: u64,
    /// Images indexed.
    pub images: u64,
    /// Images that could not be indexed.
    pub failed: u64,
}

/// Single-shot completion signal of a build.
#[derive(Debug)]
pub struct BuildHandle {
    done: oneshot::Receiver<BuildStats>,
}

impl BuildHandle {
    /// Waits for every enumerated image to be indexed and committed.
    pub async fn wait(self) -> BuildStats {
        self.done.await.unwrap_or_else(|_| {
            tracing::warn!("Index build ended without reporting");
            BuildStats::default()
        })
    }
}

/// An image waiting to be indexed.
struct QueuedImage {
    repository: String,
    image: ImageDescriptor,
}

/// Starts a build on the current Tokio runtime. Queue capacity and worker
/// count are raised to one when zero.
pub(crate) fn spawn_build(
    registry: Arc<dyn Registry>,
    index: Arc<dyn DocumentIndex>,
    config: &IndexConfig,
) -> BuildHandle {
    let (done_tx, done_rx) = oneshot::channel();
    let queue_capacity = config.queue_capacity.max(1);
    let workers = config.index_workers.max(1);

    tokio::spawn(async move {
        let stats = run(registry, index, queue_capacity, workers).await;
        // The caller may have dropped the handle.
        let _ = done_tx.send(stats);
    });

    BuildHandle { done: done_rx }
}

async fn run(
    registry: Arc<dyn Registry>,
    index: Arc<dyn DocumentIndex>,
    queue_capacity: usize,
    workers: usize,
) -> BuildStats {
    let started = Instant::now();
    tracing::info!(queue_capacity, workers, "Index build started");

    let (tx, rx) = mpsc::channel(queue_capacity);
    let producers = tokio::spawn(walk_registry(registry, tx));
    let consumer = tokio::spawn(index_queue(Arc::clone(&index), rx, workers));

    let repositories = producers.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Repository walk aborted");
        0
    });
    let (mut images, mut failed) = consumer.await.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Indexing aborted");
        (0, 0)
    });

    let flushed = tokio::task::spawn_blocking(move || index.flush())
        .await
        .map_err(|e| e.to_string())
        .and_then(|result| result.map_err(|e| e.to_string()));
    if let Err(error) = flushed {
        tracing::error!(error = %error, images, "Failed to commit indexed images");
        failed += images;
        images = 0;
    }

    let stats = BuildStats {
        repositories,
        images,
        failed,
    };
    tracing::info!(
        repositories,
        images,
        failed,
        elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        "Index build finished"
    );
    stats
}

/// Stage 1: one walker per repository. Returns the number of repositories.
async fn walk_registry(registry: Arc<dyn Registry>, queue: mpsc::Sender<QueuedImage>) -> u64 {
    let mut walkers = JoinSet::new();
    let mut repositories = registry.walk_repositories();
    let mut count = 0;

    while let Some(repository) = repositories.next().await {
        count += 1;
        let queue = queue.clone();
        walkers.spawn(async move {
            let name = repository.name().to_string();
            tracing::debug!(repository = %name, "Walking repository");
            let mut images = repository.walk_images();
            while let Some(image) = images.next().await {
                let item = QueuedImage {
                    repository: name.clone(),
                    image,
                };
                if queue.send(item).await.is_err() {
                    tracing::warn!(repository = %name, "Index queue closed");
                    break;
                }
            }
        });
    }
    drop(queue);

    while let Some(result) = walkers.join_next().await {
        if let Err(e) = result {
            tracing::warn!(error = %e, "Repository walker failed");
        }
    }
    count
}

/// Stage 2: bounded parallel parse and index. Returns `(indexed, failed)`.
async fn index_queue(
    index: Arc<dyn DocumentIndex>,
    mut queue: mpsc::Receiver<QueuedImage>,
    workers: usize,
) -> (u64, u64) {
    let permits = Arc::new(Semaphore::new(workers));
    let mut tasks = JoinSet::new();
    let mut tally = Tally::default();

    while let Some(item) = queue.recv().await {
        let Ok(permit) = Arc::clone(&permits).acquire_owned().await else {
            break;
        };
        let index = Arc::clone(&index);
        tasks.spawn_blocking(move || {
            let _permit = permit;
            index_one(index.as_ref(), &item)
        });

        while let Some(result) = tasks.try_join_next() {
            tally.record(result);
        }
    }

    while let Some(result) = tasks.join_next().await {
        tally.record(result);
    }
    (tally.indexed, tally.failed)
}

fn index_one(index: &dyn DocumentIndex, item: &QueuedImage) -> Result<()> {
    let image = IndexedImage::parse(&item.repository, &item.image);
    index.stage(&image.full_name, &image).inspect_err(|e| {
        tracing::warn!(image_id = %image.id, full_name = %image.full_name, error = %e, "Failed to index image");
    })
}

#[derive(Debug, Default)]
struct Tally {
    indexed: u64,
    failed: u64,
}

impl Tally {
    fn record(&mut self, result: std::result::Result<Result<()>, JoinError>) {
        match result {
            Ok(Ok(())) => self.indexed += 1,
            Ok(Err(_)) => self.failed += 1,
            Err(e) => {
                tracing::warn!(error = %e, "Indexing task failed");
                self.failed += 1;
            }
        }
    }
}
