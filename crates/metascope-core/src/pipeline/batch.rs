//! Concurrent batch processing with a bounded number of files in flight.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::report::assemble;
use crate::types::{BatchStats, FileReport, MediaFile, ReportStatus};

use super::input::display_name;
use super::processor::MetadataPipeline;

/// Reports in input order plus their tallies.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub reports: Vec<FileReport>,
    pub stats: BatchStats,
}

/// One unit of batch work.
enum Job {
    Path(PathBuf),
    Memory(MediaFile),
}

impl Job {
    fn name(&self) -> String {
        match self {
            Job::Path(path) => display_name(path),
            Job::Memory(file) => file.name.clone(),
        }
    }
}

/// Runs a [`MetadataPipeline`] over many inputs.
///
/// At most `workers` files are read and extracted at the same time. A file
/// that fails in any way still produces its report; the batch never aborts.
pub struct BatchProcessor {
    pipeline: Arc<MetadataPipeline>,
    workers: usize,
}

impl BatchProcessor {
    /// Create a batch processor. A worker count of 0 is treated as 1.
    pub fn new(pipeline: Arc<MetadataPipeline>, workers: usize) -> Self {
        Self {
            pipeline,
            workers: workers.max(1),
        }
    }

    /// Process files on disk. `on_report` is called as each file finishes,
    /// in completion order; the returned reports are in input order.
    pub async fn process_paths<F>(&self, paths: Vec<PathBuf>, on_report: F) -> BatchOutcome
    where
        F: FnMut(&FileReport),
    {
        self.run(paths.into_iter().map(Job::Path).collect(), on_report)
            .await
    }

    /// Process in-memory files.
    pub async fn process_files(&self, files: Vec<MediaFile>) -> BatchOutcome {
        self.run(files.into_iter().map(Job::Memory).collect(), |_| {})
            .await
    }

    async fn run<F>(&self, jobs: Vec<Job>, on_report: F) -> BatchOutcome
    where
        F: FnMut(&FileReport),
    {
        let names = jobs.iter().map(Job::name).collect();
        let pipeline = Arc::clone(&self.pipeline);
        let work = move |job: Job| {
            let pipeline = Arc::clone(&pipeline);
            async move {
                match job {
                    Job::Path(path) => pipeline.process_path(&path).await,
                    Job::Memory(file) => pipeline.process(file).await,
                }
            }
        };
        self.drive(jobs, names, work, on_report).await
    }

    /// Run `work` over `jobs` with at most `workers` in flight. A job whose
    /// work panics gets a failure report under its own name.
    async fn drive<J, W, Fut, F>(
        &self,
        jobs: Vec<J>,
        names: Vec<String>,
        work: W,
        mut on_report: F,
    ) -> BatchOutcome
    where
        W: Fn(J) -> Fut,
        Fut: Future<Output = FileReport> + Send + 'static,
        F: FnMut(&FileReport),
    {
        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut slots: Vec<Option<FileReport>> = vec![None; jobs.len()];
        let mut tasks = JoinSet::new();

        tracing::debug!(
            "Processing {} files with {} workers",
            jobs.len(),
            self.workers
        );

        for (index, job) in jobs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let job = work(job);
            tasks.spawn(async move {
                // The semaphore is never closed, so acquiring only waits
                let _permit = semaphore.acquire_owned().await;
                (index, tokio::spawn(job).await)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, report) = match joined {
                Ok((index, Ok(report))) => (index, report),
                Ok((index, Err(e))) => {
                    tracing::error!("{}: processing task failed: {}", names[index], e);
                    (index, failed_report(&names[index], &e.to_string()))
                }
                Err(e) => {
                    tracing::error!("Batch task failed: {}", e);
                    continue;
                }
            };
            on_report(&report);
            slots[index] = Some(report);
        }

        let mut stats = BatchStats::default();
        let reports: Vec<FileReport> = slots
            .into_iter()
            .zip(&names)
            .map(|(slot, name)| {
                slot.unwrap_or_else(|| failed_report(name, "task did not complete"))
            })
            .inspect(|report| stats.record(report))
            .collect();

        tracing::info!(
            "Batch finished: {} parsed, {} corrupt, {} unrecognized, {} unreadable",
            stats.parsed,
            stats.corrupt,
            stats.unrecognized,
            stats.unreadable
        );

        BatchOutcome { reports, stats }
    }
}

fn failed_report(name: &str, detail: &str) -> FileReport {
    FileReport::new(
        name,
        ReportStatus::Unreadable,
        assemble(
            None,
            Vec::new(),
            None,
            vec![format!("Processing failed: {detail}")],
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::jpeg::tests::sample_jpeg;
    use crate::extract::png::tests::sample_png;
    use crate::tags::tests::pittsburgh_tiff;

    fn processor(workers: usize) -> BatchProcessor {
        let pipeline = Arc::new(MetadataPipeline::new(&Config::default()));
        BatchProcessor::new(pipeline, workers)
    }

    #[tokio::test]
    async fn test_mixed_batch_keeps_order_and_counts() {
        let mut truncated = sample_png();
        truncated.truncate(40);

        let files = vec![
            MediaFile::new("gps.jpg", sample_jpeg(Some(&pittsburgh_tiff()))),
            MediaFile::new("noise.bin", b"not a media file".to_vec()),
            MediaFile::new("cut.png", truncated),
            MediaFile::new("plain.png", sample_png()),
        ];

        let outcome = processor(2).process_files(files).await;
        let names: Vec<_> = outcome.reports.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["gps.jpg", "noise.bin", "cut.png", "plain.png"]);

        assert_eq!(outcome.stats.parsed, 2);
        assert_eq!(outcome.stats.unrecognized, 1);
        assert_eq!(outcome.stats.corrupt, 1);
        assert_eq!(outcome.stats.with_gps, 1);
        assert_eq!(outcome.reports[2].status, ReportStatus::Corrupt);
        assert!(!outcome.reports[2].report.fields.is_empty());
    }

    #[tokio::test]
    async fn test_paths_with_progress_callback() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("a.png");
        std::fs::write(&good, sample_png()).unwrap();
        let missing = dir.path().join("missing.gif");

        let mut seen = 0;
        let outcome = processor(4)
            .process_paths(vec![good, missing], |_| seen += 1)
            .await;

        assert_eq!(seen, 2);
        assert_eq!(outcome.stats.parsed, 1);
        assert_eq!(outcome.stats.unreadable, 1);
        assert_eq!(outcome.reports[1].file_name, "missing.gif");
    }

    #[tokio::test]
    async fn test_panicking_job_is_reported_under_its_own_name() {
        let names = vec!["a.jpg".to_string(), "b.jpg".to_string(), "c.jpg".to_string()];
        let work = |index: usize| async move {
            if index != 1 {
                panic!("job {index} exploded");
            }
            FileReport::new(
                "b.jpg",
                ReportStatus::Parsed,
                assemble(Some("JPEG"), Vec::new(), None, Vec::new()),
            )
        };

        let mut finished = Vec::new();
        let outcome = processor(3)
            .drive(vec![0, 1, 2], names, work, |r| finished.push(r.file_name.clone()))
            .await;

        assert_eq!(finished.len(), 3);
        let names: Vec<_> = outcome.reports.iter().map(|r| r.file_name.as_str()).collect();
        assert_eq!(names, vec!["a.jpg", "b.jpg", "c.jpg"]);
        assert_eq!(outcome.reports[1].status, ReportStatus::Parsed);
        for i in [0, 2] {
            assert_eq!(outcome.reports[i].status, ReportStatus::Unreadable);
            assert!(outcome.reports[i].report.warnings[0].starts_with("Processing failed"));
        }
        assert_eq!(outcome.stats.unreadable, 2);
    }

    #[tokio::test]
    async fn test_zero_workers_still_runs() {
        let outcome = processor(0)
            .process_files(vec![MediaFile::new("x", Vec::new())])
            .await;
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.stats.unrecognized, 1);
    }
}
