//! Configuration for index builds.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use dim_core::query::DEFAULT_FUZZINESS;

/// Format of build directory names, e.g. `20240131093015.042`.
pub const BUILD_DIR_FORMAT: &str = "%Y%m%d%H%M%S%.3f";

/// Configuration of the index and of the crawl pipeline.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Directory under which each build gets its own timestamped directory.
    pub root_dir: PathBuf,

    /// Capacity of the queue between repository walkers and indexers.
    pub queue_capacity: usize,

    /// Maximum number of images parsed and indexed concurrently.
    pub index_workers: usize,

    /// Memory budget of the index writer, in bytes.
    pub writer_heap_bytes: usize,

    /// Edit distance used when matching image names.
    pub fuzziness: u8,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            root_dir: PathBuf::from("dim.index"),
            queue_capacity: 3,
            index_workers: 8,
            writer_heap_bytes: 50_000_000,
            fuzziness: DEFAULT_FUZZINESS,
        }
    }
}

impl IndexConfig {
    /// Creates a configuration builder.
    #[must_use]
    pub fn builder() -> IndexConfigBuilder {
        IndexConfigBuilder::default()
    }

    /// Directory of a build started at `now`.
    ///
    /// ```
    /// use chrono::TimeZone;
    /// use dim_index::IndexConfig;
    ///
    /// let config = IndexConfig::builder().root_dir("/var/lib/dim").build();
    /// let now = chrono::Local.with_ymd_and_hms(2024, 1, 31, 9, 30, 15).unwrap();
    /// assert_eq!(
    ///     config.build_dir(now),
    ///     std::path::Path::new("/var/lib/dim/20240131093015.000")
    /// );
    /// ```
    #[must_use]
    pub fn build_dir(&self, now: DateTime<Local>) -> PathBuf {
        build_dir(&self.root_dir, now)
    }
}

pub(crate) fn build_dir(root: &Path, now: DateTime<Local>) -> PathBuf {
    root.join(now.format(BUILD_DIR_FORMAT).to_string())
}

/// Builder for `IndexConfig`.
#[derive(Debug, Default)]
pub struct IndexConfigBuilder {
    root_dir: Option<PathBuf>,
    queue_capacity: Option<usize>,
    index_workers: Option<usize>,
    writer_heap_bytes: Option<usize>,
    fuzziness: Option<u8>,
}

impl IndexConfigBuilder {
    /// Sets the root directory of index builds.
    #[must_use]
    pub fn root_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(dir.into());
        self
    }

    /// Sets the capacity of the repository-to-indexer queue.
    #[must_use]
    pub const fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Sets the number of concurrent indexing workers.
    #[must_use]
    pub const fn index_workers(mut self, workers: usize) -> Self {
        self.index_workers = Some(workers);
        self
    }

    /// Sets the index writer memory budget.
    #[must_use]
    pub const fn writer_heap_bytes(mut self, bytes: usize) -> Self {
        self.writer_heap_bytes = Some(bytes);
        self
    }

    /// Sets the edit distance used for name matching.
    #[must_use]
    pub const fn fuzziness(mut self, fuzziness: u8) -> Self {
        self.fuzziness = Some(fuzziness);
        self
    }

    /// Builds the configuration. Queue capacity and worker count are at
    /// least one.
    #[must_use]
    pub fn build(self) -> IndexConfig {
        let defaults = IndexConfig::default();
        IndexConfig {
            root_dir: self.root_dir.unwrap_or(defaults.root_dir),
            queue_capacity: self
                .queue_capacity
                .unwrap_or(defaults.queue_capacity)
                .max(1),
            index_workers: self.index_workers.unwrap_or(defaults.index_workers).max(1),
            writer_heap_bytes: self
                .writer_heap_bytes
                .unwrap_or(defaults.writer_heap_bytes),
            fuzziness: self.fuzziness.unwrap_or(defaults.fuzziness),
        }
    }
}
