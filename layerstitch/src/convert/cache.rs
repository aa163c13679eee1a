//! Content-hash keyed conversion cache.
//!
//! Wraps a [`Converter`] so that each proprietary tile is converted at most
//! once per distinct content. A file is up to date when its SHA-256 matches
//! the stored record *and* the recorded output still exists in the cache
//! directory; anything else is (re)converted.
//!
//! Records live in memory for the lifetime of the cache and are rewritten to
//! `conversion_cache.json` after every batch that changed them. The converter
//! writes into a staging directory and its output replaces the cached raster
//! only once it exists, so failed conversions never touch a file's existing
//! record or raster.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::checksum::calculate_file_checksum;
use super::converter::{ConversionFailure, Converter, ExternalConverter};
use super::record::{CacheEntry, RecordStore};
use super::ConvertError;
use crate::config::DEFAULT_RASTER_EXTENSION;
use crate::executor::{clamp_workers, WorkerPool, DEFAULT_WORKERS};
use crate::pipeline::ProgressObserver;

/// Name of the record file inside the cache directory.
pub const RECORD_FILE_NAME: &str = "conversion_cache.json";

/// Subdirectory the converter writes into before outputs are renamed into
/// the cache directory. Tile scans are non-recursive, so staged files are
/// never picked up as tiles.
pub const STAGING_DIR_NAME: &str = ".staging";

/// A conversion that failed for one file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{filename}: {failure}")]
pub struct ConversionError {
    pub filename: String,
    #[source]
    pub failure: ConversionFailure,
}

/// Result of [`ConversionCache::ensure_converted`].
#[derive(Debug, Clone, Default)]
pub struct ConversionOutcome {
    /// Raster filenames (in the cache directory) valid after this batch,
    /// in input order. Includes both reused and freshly converted outputs.
    pub produced: Vec<String>,
    /// Number of files the converter was run on successfully.
    pub converted: usize,
    /// Number of files whose cached output was reused.
    pub reused: usize,
    /// Per-file failures.
    pub failures: Vec<ConversionError>,
}

/// What happened to one file in a batch.
enum FileOutcome {
    Reused(String),
    Converted { hash: String, produced: String },
}

/// Conversion cache bound to one directory.
#[derive(Debug)]
pub struct ConversionCache {
    cache_dir: PathBuf,
    record_path: PathBuf,
    raster_extension: String,
    workers: usize,
    records: Mutex<RecordStore>,
    /// Held for a whole batch so concurrent batches do not interleave their
    /// read-modify-write of the records.
    batch_lock: tokio::sync::Mutex<()>,
}

impl ConversionCache {
    /// Open the cache in `cache_dir`, creating the directory if needed.
    ///
    /// A missing or corrupt record file yields an empty cache.
    pub fn open(cache_dir: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let cache_dir = cache_dir.into();
        std::fs::create_dir_all(&cache_dir).map_err(|source| ConvertError::CacheDirectory {
            path: cache_dir.clone(),
            source,
        })?;

        let record_path = cache_dir.join(RECORD_FILE_NAME);
        let records = RecordStore::load_or_default(&record_path);
        info!(
            cache_dir = %cache_dir.display(),
            records = records.len(),
            "Opened conversion cache"
        );

        Ok(Self {
            cache_dir,
            record_path,
            raster_extension: DEFAULT_RASTER_EXTENSION.to_string(),
            workers: DEFAULT_WORKERS,
            records: Mutex::new(records),
            batch_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Set the extension used for converter output (without the dot).
    pub fn with_raster_extension(mut self, extension: impl Into<String>) -> Self {
        self.raster_extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Set the number of concurrent conversions (clamped to 1..=64).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = clamp_workers(workers);
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn record_path(&self) -> &Path {
        &self.record_path
    }

    pub fn raster_extension(&self) -> &str {
        &self.raster_extension
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }

    /// Stored record for a source filename.
    pub fn entry(&self, filename: &str) -> Option<CacheEntry> {
        self.records.lock().get(filename).cloned()
    }

    /// All stored records in filename order.
    pub fn entries(&self) -> Vec<(String, CacheEntry)> {
        self.records
            .lock()
            .iter()
            .map(|(name, entry)| (name.to_string(), entry.clone()))
            .collect()
    }

    /// Drop every record and delete the record file.
    ///
    /// Converted outputs in the cache directory are left in place; without a
    /// record they will be regenerated on the next run.
    pub fn clear(&self) -> io::Result<()> {
        self.records.lock().clear();
        match std::fs::remove_file(&self.record_path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        info!(cache_dir = %self.cache_dir.display(), "Cleared conversion cache");
        Ok(())
    }

    /// Where the converted raster for `source_filename` is written.
    pub fn output_path_for(&self, source_filename: &str) -> PathBuf {
        let stem = Path::new(source_filename)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(source_filename);
        self.cache_dir
            .join(format!("{}.{}", stem, self.raster_extension))
    }

    /// Where the converter writes the raster destined for `output`.
    fn staging_path_for(&self, output: &Path) -> PathBuf {
        let name = output.file_name().unwrap_or(output.as_os_str());
        self.cache_dir.join(STAGING_DIR_NAME).join(name)
    }

    /// Ensure every file in `files` has an up-to-date raster in the cache.
    ///
    /// Resolves `converter_path` into an [`ExternalConverter`] first, so an
    /// unset or missing converter fails the whole call before any file is
    /// touched.
    pub async fn ensure_converted_with(
        &self,
        files: &[String],
        source_dir: &Path,
        converter_path: Option<&Path>,
        timeout: Duration,
        observer: &dyn ProgressObserver,
    ) -> Result<ConversionOutcome, ConvertError> {
        let converter = ExternalConverter::from_configured(converter_path)?.with_timeout(timeout);
        let converter: Arc<dyn Converter> = Arc::new(converter);
        Ok(self
            .ensure_converted(files, source_dir, &converter, observer)
            .await)
    }

    /// Ensure every file in `files` has an up-to-date raster in the cache.
    ///
    /// Files are hashed and, when stale, converted on a bounded worker pool.
    /// Progress is reported once per file in input order. Records for
    /// successful conversions are persisted at the end of the batch; a
    /// failure to persist is logged and the in-memory records stay in use.
    pub async fn ensure_converted(
        &self,
        files: &[String],
        source_dir: &Path,
        converter: &Arc<dyn Converter>,
        observer: &dyn ProgressObserver,
    ) -> ConversionOutcome {
        let _batch = self.batch_lock.lock().await;

        let mut seen = HashSet::new();
        let files: Vec<&String> = files.iter().filter(|f| seen.insert(f.as_str())).collect();
        let total = files.len();
        let mut outcome = ConversionOutcome::default();
        if total == 0 {
            return outcome;
        }

        info!(
            files = total,
            converter = converter.name(),
            cache_dir = %self.cache_dir.display(),
            "Checking conversion cache"
        );
        observer.report_status(&format!("Checking {} files for conversion...", total));
        observer.report_progress(0, total);

        let jobs: Vec<_> = {
            let records = self.records.lock();
            files
                .iter()
                .map(|filename| {
                    let output = self.output_path_for(filename);
                    let job = ConversionJob {
                        source: source_dir.join(filename.as_str()),
                        staged: self.staging_path_for(&output),
                        output,
                        cache_dir: self.cache_dir.clone(),
                        previous: records.get(filename).cloned(),
                        converter: Arc::clone(converter),
                    };
                    job.run()
                })
                .collect()
        };

        let pool = WorkerPool::new(self.workers, total, "converter");
        let results = pool
            .run(jobs, |done, total| observer.report_progress(done, total))
            .await;

        let mut changed = false;
        let snapshot = {
            let mut records = self.records.lock();
            for (filename, result) in files.iter().zip(results) {
                let result =
                    result.unwrap_or_else(|e| Err(ConversionFailure::Worker(e.to_string())));
                match result {
                    Ok(FileOutcome::Reused(produced)) => {
                        debug!(filename = %filename, produced = %produced, "Reusing cached conversion");
                        outcome.reused += 1;
                        outcome.produced.push(produced);
                    }
                    Ok(FileOutcome::Converted { hash, produced }) => {
                        debug!(filename = %filename, produced = %produced, "Converted");
                        records.insert(filename.as_str(), CacheEntry::new(hash, produced.clone()));
                        changed = true;
                        outcome.converted += 1;
                        outcome.produced.push(produced);
                    }
                    Err(failure) => {
                        warn!(filename = %filename, error = %failure, "Conversion failed");
                        outcome.failures.push(ConversionError {
                            filename: filename.to_string(),
                            failure,
                        });
                    }
                }
            }

            changed.then(|| records.clone())
        };

        if let Some(snapshot) = snapshot {
            self.persist(snapshot).await;
        }

        info!(
            converted = outcome.converted,
            reused = outcome.reused,
            failed = outcome.failures.len(),
            "Conversion batch complete"
        );
        observer.report_status(&format!(
            "Conversion complete: {} converted, {} cached, {} failed",
            outcome.converted,
            outcome.reused,
            outcome.failures.len()
        ));

        outcome
    }

    /// Write `snapshot` to the record file off the async runtime.
    ///
    /// Failures are logged; the in-memory records stay authoritative.
    async fn persist(&self, snapshot: RecordStore) {
        let path = self.record_path.clone();
        let result = tokio::task::spawn_blocking(move || snapshot.save(&path))
            .await
            .map_err(|e| io::Error::other(e.to_string()))
            .and_then(|saved| saved);
        if let Err(e) = result {
            warn!(
                path = %self.record_path.display(),
                error = %e,
                "Failed to persist conversion records; continuing with in-memory cache"
            );
        }
    }
}

/// Everything one pool task needs to bring a single file up to date.
struct ConversionJob {
    source: PathBuf,
    /// Where the converter writes; renamed over `output` once verified.
    staged: PathBuf,
    output: PathBuf,
    cache_dir: PathBuf,
    previous: Option<CacheEntry>,
    converter: Arc<dyn Converter>,
}

impl ConversionJob {
    async fn run(self) -> Result<FileOutcome, ConversionFailure> {
        let hash = hash_source(self.source.clone()).await?;

        if let Some(previous) = &self.previous {
            if previous.hash == hash && self.cache_dir.join(&previous.produced_file).is_file() {
                return Ok(FileOutcome::Reused(previous.produced_file.clone()));
            }
        }

        self.stage().await?;
        let converted = self.converter.convert(&self.source, &self.staged).await;
        if let Err(failure) = converted {
            let _ = tokio::fs::remove_file(&self.staged).await;
            return Err(failure);
        }
        self.publish().await?;

        let produced = self
            .output
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| ConversionFailure::MissingOutput(self.output.clone()))?;

        Ok(FileOutcome::Converted { hash, produced })
    }

    /// Prepare an empty staging slot so a leftover file from an earlier run
    /// cannot pass for fresh output.
    async fn stage(&self) -> Result<(), ConversionFailure> {
        let publish_failed = |e: io::Error| ConversionFailure::Publish {
            path: self.staged.clone(),
            reason: e.to_string(),
        };
        if let Some(dir) = self.staged.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(publish_failed)?;
        }
        match tokio::fs::remove_file(&self.staged).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(publish_failed(e)),
        }
    }

    /// Move verified converter output over the previous raster.
    async fn publish(&self) -> Result<(), ConversionFailure> {
        let staged_is_file = tokio::fs::metadata(&self.staged)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false);
        if !staged_is_file {
            return Err(ConversionFailure::MissingOutput(self.staged.clone()));
        }
        tokio::fs::rename(&self.staged, &self.output)
            .await
            .map_err(|e| ConversionFailure::Publish {
                path: self.output.clone(),
                reason: e.to_string(),
            })
    }
}

async fn hash_source(path: PathBuf) -> Result<String, ConversionFailure> {
    let read_failed = |path: &Path, reason: String| ConversionFailure::ReadSource {
        path: path.to_path_buf(),
        reason,
    };
    let path_for_error = path.clone();
    tokio::task::spawn_blocking(move || calculate_file_checksum(&path))
        .await
        .map_err(|e| read_failed(&path_for_error, e.to_string()))?
        .map_err(|e| read_failed(&path_for_error, e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::converter::BoxFuture;
    use crate::pipeline::progress::RecordingObserver;
    use crate::pipeline::NullObserver;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Copies input to output and counts invocations.
    #[derive(Default)]
    struct CopyConverter {
        calls: AtomicUsize,
    }

    impl Converter for CopyConverter {
        fn convert<'a>(
            &'a self,
            input: &'a Path,
            output: &'a Path,
        ) -> BoxFuture<'a, Result<(), ConversionFailure>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                std::fs::copy(input, output)
                    .map(|_| ())
                    .map_err(|e| ConversionFailure::Spawn(e.to_string()))
            })
        }

        fn name(&self) -> &str {
            "copy"
        }
    }

    /// Fails every file whose name contains `needle`, copies the rest.
    struct SelectiveConverter {
        needle: &'static str,
        failure: ConversionFailure,
    }

    impl Converter for SelectiveConverter {
        fn convert<'a>(
            &'a self,
            input: &'a Path,
            output: &'a Path,
        ) -> BoxFuture<'a, Result<(), ConversionFailure>> {
            Box::pin(async move {
                if input.to_string_lossy().contains(self.needle) {
                    return Err(self.failure.clone());
                }
                std::fs::copy(input, output)
                    .map(|_| ())
                    .map_err(|e| ConversionFailure::Spawn(e.to_string()))
            })
        }

        fn name(&self) -> &str {
            "selective"
        }
    }

    /// Reports success without writing anything.
    struct SilentConverter;

    impl Converter for SilentConverter {
        fn convert<'a>(
            &'a self,
            _input: &'a Path,
            _output: &'a Path,
        ) -> BoxFuture<'a, Result<(), ConversionFailure>> {
            Box::pin(async { Ok(()) })
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    struct Fixture {
        _temp: TempDir,
        source: PathBuf,
        cache: PathBuf,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("tiles");
        let cache = temp.path().join("cache");
        std::fs::create_dir_all(&source).unwrap();
        for (name, bytes) in files {
            std::fs::write(source.join(name), bytes).unwrap();
        }
        Fixture {
            _temp: temp,
            source,
            cache,
        }
    }

    fn names(files: &[&str]) -> Vec<String> {
        files.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_converts_once_for_unchanged_file() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        let files = names(&["S_0_0_lco.paa"]);

        let first = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;
        let second = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;

        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(first.produced, vec!["S_0_0_lco.png".to_string()]);
        assert_eq!(first.converted, 1);
        assert_eq!(second.produced, first.produced);
        assert_eq!(second.reused, 1);
        assert_eq!(second.converted, 0);
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        let files = names(&["S_0_0_lco.paa"]);

        {
            let cache = ConversionCache::open(&fx.cache).unwrap();
            cache
                .ensure_converted(&files, &fx.source, &converter, &NullObserver)
                .await;
        }
        let reopened = ConversionCache::open(&fx.cache).unwrap();
        assert_eq!(reopened.len(), 1);
        let entry = reopened.entry("S_0_0_lco.paa").unwrap();
        assert_eq!(entry.produced_file, "S_0_0_lco.png");

        reopened
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_memory_records() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        // A directory in place of the record file makes every save fail.
        std::fs::create_dir_all(fx.cache.join(RECORD_FILE_NAME)).unwrap();
        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        let files = names(&["S_0_0_lco.paa"]);

        let first = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;
        let second = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;

        assert_eq!(first.converted, 1);
        assert_eq!(cache.len(), 1);
        assert_eq!(second.reused, 1);
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_changed_bytes_force_reconversion() {
        let fx = fixture(&[("S_0_0_lco.paa", "before")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        let files = names(&["S_0_0_lco.paa"]);

        cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;
        let first_hash = cache.entry("S_0_0_lco.paa").unwrap().hash;

        std::fs::write(fx.source.join("S_0_0_lco.paa"), b"after").unwrap();
        let outcome = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;

        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert_eq!(outcome.converted, 1);
        assert_ne!(cache.entry("S_0_0_lco.paa").unwrap().hash, first_hash);
        assert_eq!(
            std::fs::read(fx.cache.join("S_0_0_lco.png")).unwrap(),
            b"after"
        );
    }

    #[tokio::test]
    async fn test_deleted_output_forces_reconversion() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        let files = names(&["S_0_0_lco.paa"]);

        cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;
        std::fs::remove_file(fx.cache.join("S_0_0_lco.png")).unwrap();
        cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;

        assert_eq!(counter.calls.load(Ordering::SeqCst), 2);
        assert!(fx.cache.join("S_0_0_lco.png").exists());
    }

    #[tokio::test]
    async fn test_timeout_creates_no_record() {
        let fx = fixture(&[("S_0_0_lco.paa", "a"), ("S_1_0_lco.paa", "b")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let converter: Arc<dyn Converter> = Arc::new(SelectiveConverter {
            needle: "S_1_0",
            failure: ConversionFailure::TimedOut { timeout_secs: 30 },
        });

        let outcome = cache
            .ensure_converted(
                &names(&["S_0_0_lco.paa", "S_1_0_lco.paa"]),
                &fx.source,
                &converter,
                &NullObserver,
            )
            .await;

        assert_eq!(outcome.produced, vec!["S_0_0_lco.png".to_string()]);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].filename, "S_1_0_lco.paa");
        assert_eq!(
            outcome.failures[0].failure,
            ConversionFailure::TimedOut { timeout_secs: 30 }
        );
        assert!(cache.entry("S_1_0_lco.paa").is_none());
    }

    #[tokio::test]
    async fn test_failed_reconversion_keeps_prior_record() {
        let fx = fixture(&[("S_0_0_lco.paa", "v1")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let files = names(&["S_0_0_lco.paa"]);

        let good: Arc<dyn Converter> = Arc::new(CopyConverter::default());
        cache
            .ensure_converted(&files, &fx.source, &good, &NullObserver)
            .await;
        let prior = cache.entry("S_0_0_lco.paa").unwrap();

        std::fs::write(fx.source.join("S_0_0_lco.paa"), b"v2").unwrap();
        let bad: Arc<dyn Converter> = Arc::new(SelectiveConverter {
            needle: "S_0_0",
            failure: ConversionFailure::NonZeroExit {
                code: Some(1),
                stderr: String::new(),
            },
        });
        let outcome = cache
            .ensure_converted(&files, &fx.source, &bad, &NullObserver)
            .await;

        assert!(outcome.produced.is_empty());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(cache.entry("S_0_0_lco.paa"), Some(prior));
        assert_eq!(std::fs::read(fx.cache.join("S_0_0_lco.png")).unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_silent_reconversion_keeps_prior_output() {
        let fx = fixture(&[("S_0_0_lco.paa", "v1")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let files = names(&["S_0_0_lco.paa"]);

        let good: Arc<dyn Converter> = Arc::new(CopyConverter::default());
        cache
            .ensure_converted(&files, &fx.source, &good, &NullObserver)
            .await;
        let prior = cache.entry("S_0_0_lco.paa").unwrap();

        std::fs::write(fx.source.join("S_0_0_lco.paa"), b"v2").unwrap();
        let silent: Arc<dyn Converter> = Arc::new(SilentConverter);
        let outcome = cache
            .ensure_converted(&files, &fx.source, &silent, &NullObserver)
            .await;

        assert_eq!(outcome.converted, 0);
        assert_eq!(outcome.failures.len(), 1);
        assert!(matches!(
            outcome.failures[0].failure,
            ConversionFailure::MissingOutput(_)
        ));
        assert_eq!(cache.entry("S_0_0_lco.paa"), Some(prior.clone()));
        assert_eq!(
            ConversionCache::open(&fx.cache).unwrap().entry("S_0_0_lco.paa"),
            Some(prior)
        );
        assert_eq!(std::fs::read(fx.cache.join("S_0_0_lco.png")).unwrap(), b"v1");
    }

    #[tokio::test]
    async fn test_converter_writes_through_staging() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let files = names(&["S_0_0_lco.paa"]);

        // A leftover from an interrupted run does not count as output.
        let staging = fx.cache.join(STAGING_DIR_NAME);
        std::fs::create_dir_all(&staging).unwrap();
        std::fs::write(staging.join("S_0_0_lco.png"), b"stale").unwrap();
        let silent: Arc<dyn Converter> = Arc::new(SilentConverter);
        let outcome = cache
            .ensure_converted(&files, &fx.source, &silent, &NullObserver)
            .await;
        assert_eq!(outcome.failures.len(), 1);
        assert!(!fx.cache.join("S_0_0_lco.png").exists());
        assert!(cache.is_empty());

        let converter: Arc<dyn Converter> = Arc::new(CopyConverter::default());
        let outcome = cache
            .ensure_converted(&files, &fx.source, &converter, &NullObserver)
            .await;

        assert_eq!(outcome.converted, 1);
        assert_eq!(std::fs::read(fx.cache.join("S_0_0_lco.png")).unwrap(), b"tile");
        assert!(!staging.join("S_0_0_lco.png").exists());
    }

    #[tokio::test]
    async fn test_unreadable_source_is_per_file_error() {
        let fx = fixture(&[]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let converter: Arc<dyn Converter> = Arc::new(CopyConverter::default());

        let outcome = cache
            .ensure_converted(
                &names(&["S_0_0_lco.paa"]),
                &fx.source,
                &converter,
                &NullObserver,
            )
            .await;

        assert!(matches!(
            outcome.failures[0].failure,
            ConversionFailure::ReadSource { .. }
        ));
    }

    #[tokio::test]
    async fn test_corrupt_record_file_is_empty_cache() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        std::fs::create_dir_all(&fx.cache).unwrap();
        std::fs::write(fx.cache.join(RECORD_FILE_NAME), b"\x00garbage").unwrap();

        let cache = ConversionCache::open(&fx.cache).unwrap();
        assert!(cache.is_empty());

        let counter = Arc::new(CopyConverter::default());
        let converter: Arc<dyn Converter> = counter.clone();
        cache
            .ensure_converted(&names(&["S_0_0_lco.paa"]), &fx.source, &converter, &NullObserver)
            .await;
        assert_eq!(counter.calls.load(Ordering::SeqCst), 1);
        assert_eq!(ConversionCache::open(&fx.cache).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_and_duplicates() {
        let fx = fixture(&[("S_0_0_lco.paa", "a"), ("S_1_0_lco.paa", "b")]);
        let cache = ConversionCache::open(&fx.cache).unwrap().with_workers(2);
        let converter: Arc<dyn Converter> = Arc::new(CopyConverter::default());
        let observer = RecordingObserver::default();

        let outcome = cache
            .ensure_converted(
                &names(&["S_0_0_lco.paa", "S_1_0_lco.paa", "S_0_0_lco.paa"]),
                &fx.source,
                &converter,
                &observer,
            )
            .await;

        assert_eq!(outcome.produced.len(), 2);
        assert_eq!(*observer.progress.lock(), vec![(0, 2), (1, 2), (2, 2)]);
    }

    #[tokio::test]
    async fn test_unconfigured_converter_fails_before_work() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();

        let result = cache
            .ensure_converted_with(
                &names(&["S_0_0_lco.paa"]),
                &fx.source,
                None,
                Duration::from_secs(30),
                &NullObserver,
            )
            .await;
        assert!(matches!(result, Err(ConvertError::ConverterNotConfigured)));

        let result = cache
            .ensure_converted_with(
                &names(&["S_0_0_lco.paa"]),
                &fx.source,
                Some(Path::new("/nonexistent/converter")),
                Duration::from_secs(30),
                &NullObserver,
            )
            .await;
        assert!(matches!(result, Err(ConvertError::ConverterNotFound(_))));
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_clear() {
        let fx = fixture(&[("S_0_0_lco.paa", "tile")]);
        let cache = ConversionCache::open(&fx.cache).unwrap();
        let converter: Arc<dyn Converter> = Arc::new(CopyConverter::default());
        cache
            .ensure_converted(&names(&["S_0_0_lco.paa"]), &fx.source, &converter, &NullObserver)
            .await;
        assert!(cache.record_path().exists());

        cache.clear().unwrap();
        assert!(cache.is_empty());
        assert!(!cache.record_path().exists());
        cache.clear().unwrap();
    }

    #[test]
    fn test_output_path_for() {
        let temp = TempDir::new().unwrap();
        let cache = ConversionCache::open(temp.path())
            .unwrap()
            .with_raster_extension(".tga");
        assert_eq!(
            cache.output_path_for("M_3_4_lco.paa"),
            temp.path().join("M_3_4_lco.tga")
        );
    }
}
