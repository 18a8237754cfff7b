//! File-level batch orchestration.
//!
//! A batch is a list of audio files analyzed with one shared, immutable
//! [`RunConfiguration`]. With fewer than two CPU workers the files are
//! classified one after another on the calling thread; otherwise they are
//! fanned out to a bounded pool of blocking workers and collected in the
//! order they complete.

use crate::config::RunConfiguration;
use crate::error::{Error, Result};
use crate::inference::Classifier;
use crate::output::PredictionSegment;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info};

/// Progress callback, invoked as `(completed, total)` after every file.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(usize, usize);

/// One file queued for analysis.
#[derive(Debug, Clone)]
pub struct AudioFileTask {
    /// Audio file to classify.
    pub path: PathBuf,
    /// Configuration snapshot shared by every task of the batch.
    pub config: Arc<RunConfiguration>,
}

impl AudioFileTask {
    /// Classify the file, turning errors and panics into a failure result.
    pub fn run(&self, classifier: &dyn Classifier) -> AnalysisResult {
        debug!("Analyzing {}", self.path.display());

        let outcome = catch_unwind(AssertUnwindSafe(|| {
            classifier.classify(&self.path, &self.config)
        }));

        match outcome {
            Ok(Ok(segments)) => AnalysisResult::Success(segments),
            Ok(Err(e)) => {
                error!("Cannot analyze audio file {}: {e}", self.path.display());
                AnalysisResult::Failure(e.to_string())
            }
            Err(panic) => {
                let reason = panic_message(panic.as_ref());
                error!(
                    "Worker panicked while analyzing {}: {reason}",
                    self.path.display()
                );
                AnalysisResult::Failure(format!("worker panicked: {reason}"))
            }
        }
    }
}

/// Outcome of one task.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisResult {
    /// Classified segments, possibly empty.
    Success(Vec<PredictionSegment>),
    /// Human-readable failure reason.
    Failure(String),
}

impl AnalysisResult {
    /// Whether the task succeeded.
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }
}

/// Results of a batch, in arrival order.
#[derive(Debug, Clone)]
pub struct BatchResults {
    entries: Vec<(PathBuf, AnalysisResult)>,
    elapsed: Duration,
}

impl BatchResults {
    /// Number of results (always the number of submitted files).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the batch holds no results.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Results in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = (&Path, &AnalysisResult)> {
        self.entries.iter().map(|(p, r)| (p.as_path(), r))
    }

    /// Result for `path`, if it was part of the batch.
    pub fn get(&self, path: &Path) -> Option<&AnalysisResult> {
        self.entries
            .iter()
            .find(|(p, _)| p == path)
            .map(|(_, result)| result)
    }

    /// Results ordered by path.
    pub fn sorted_by_path(&self) -> Vec<(&Path, &AnalysisResult)> {
        let mut sorted: Vec<_> = self.iter().collect();
        sorted.sort_by(|a, b| a.0.cmp(b.0));
        sorted
    }

    /// Number of successful files.
    pub fn success_count(&self) -> usize {
        self.entries.iter().filter(|(_, r)| r.is_success()).count()
    }

    /// Number of failed files.
    pub fn failure_count(&self) -> usize {
        self.len() - self.success_count()
    }

    /// Wall-clock time of the batch.
    pub const fn elapsed(&self) -> Duration {
        self.elapsed
    }
}

/// Runs batches of audio files through a [`Classifier`].
#[derive(Clone)]
pub struct BatchOrchestrator {
    classifier: Arc<dyn Classifier>,
}

impl BatchOrchestrator {
    /// Create an orchestrator for `classifier`.
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    /// Analyze `files` with `config`.
    ///
    /// Every file yields exactly one result. Per-file failures are recorded
    /// and the batch continues.
    ///
    /// # Errors
    /// - `NoInputFiles` when `files` is empty
    /// - `WorkerPool` when the parallel pool cannot be started
    pub fn run(
        &self,
        files: Vec<PathBuf>,
        config: Arc<RunConfiguration>,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<BatchResults> {
        if files.is_empty() {
            return Err(Error::NoInputFiles);
        }

        let tasks: Vec<AudioFileTask> = files
            .into_iter()
            .map(|path| AudioFileTask {
                path,
                config: Arc::clone(&config),
            })
            .collect();

        let total = tasks.len();
        let workers = config.cpu_workers;
        info!("Analyzing {total} files with {workers} worker(s)");

        let start = Instant::now();
        let entries = if workers < 2 {
            self.run_sequential(tasks, on_progress)
        } else {
            self.run_parallel(tasks, workers, on_progress)?
        };

        let results = BatchResults {
            entries,
            elapsed: start.elapsed(),
        };
        info!(
            "Finished {} files in {:.2}s ({} succeeded, {} failed)",
            results.len(),
            results.elapsed.as_secs_f64(),
            results.success_count(),
            results.failure_count()
        );
        Ok(results)
    }

    fn run_sequential(
        &self,
        tasks: Vec<AudioFileTask>,
        mut on_progress: Option<ProgressCallback<'_>>,
    ) -> Vec<(PathBuf, AnalysisResult)> {
        let total = tasks.len();
        let mut entries = Vec::with_capacity(total);

        for task in tasks {
            let result = task.run(self.classifier.as_ref());
            entries.push((task.path, result));
            if let Some(callback) = on_progress.as_mut() {
                callback(entries.len(), total);
            }
        }

        entries
    }

    fn run_parallel(
        &self,
        tasks: Vec<AudioFileTask>,
        workers: usize,
        mut on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<(PathBuf, AnalysisResult)>> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .thread_name("battyd-worker")
            .max_blocking_threads(workers)
            .build()
            .map_err(|e| Error::WorkerPool {
                reason: e.to_string(),
            })?;

        let total = tasks.len();
        let semaphore = Arc::new(Semaphore::new(workers));

        let entries = runtime.block_on(async {
            let mut set = JoinSet::new();

            for task in tasks {
                let semaphore = Arc::clone(&semaphore);
                let classifier = Arc::clone(&self.classifier);
                set.spawn(async move {
                    // The semaphore is never closed.
                    let _permit = semaphore.acquire_owned().await.ok();
                    let path = task.path.clone();
                    let result =
                        tokio::task::spawn_blocking(move || task.run(classifier.as_ref()))
                            .await
                            .unwrap_or_else(|e| {
                                error!("Worker for {} failed: {e}", path.display());
                                AnalysisResult::Failure(format!("worker failed: {e}"))
                            });
                    (path, result)
                });
            }

            let mut entries = Vec::with_capacity(total);
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(entry) => entries.push(entry),
                    Err(e) => error!("Worker task failed: {e}"),
                }
                if let Some(callback) = on_progress.as_mut() {
                    callback(entries.len(), total);
                }
            }
            entries
        });

        Ok(entries)
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
