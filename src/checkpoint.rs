//! Resumable download progress, persisted as a flat JSON document.
//!
//! The checkpoint tracks one [`FileStatus`] per partition file plus aggregate
//! [`Statistics`]. Files move `pending -> processing -> completed`, or to `failed` when the
//! partition itself cannot be read. `failed` is not terminal: it is picked up again by
//! [`Checkpoint::next_pending`] just like `pending`.
//!
//! Older checkpoints may lack some statistics keys. They are decoded through a separate,
//! fully optional stored shape and upgraded with explicit zero defaults; the repaired
//! document is written back right away.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, warn};

use crate::json_io::{ensure_dir, list_json_files, read_json, write_json_pretty};
use crate::{Error, Result};

/// Lifecycle of one partition file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl FileState {
    /// Whether the "next pending" policy may pick a file in this state.
    pub fn is_selectable(self) -> bool {
        matches!(self, FileState::Pending | FileState::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileState::Pending => "pending",
            FileState::Processing => "processing",
            FileState::Completed => "completed",
            FileState::Failed => "failed",
        }
    }
}

/// Progress of one partition file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStatus {
    pub filename: String,
    pub word_count: usize,
    pub status: FileState,
    pub completed_words: usize,
    pub failed_words: usize,

    /// Local time of the last state change, `YYYY-MM-DD HH:MM:SS`.
    #[serde(default)]
    pub last_updated: Option<String>,
}

impl FileStatus {
    pub fn pending(filename: impl Into<String>, word_count: usize) -> Self {
        Self {
            filename: filename.into(),
            word_count,
            status: FileState::Pending,
            completed_words: 0,
            failed_words: 0,
            last_updated: None,
        }
    }

    /// Share of the file's words downloaded successfully, in percent.
    pub fn progress(&self) -> f64 {
        percent(self.completed_words as u64, self.word_count as u64)
    }
}

/// Aggregate counters across all partition files.
///
/// `downloaded_audios`, `failed_downloads` and `skipped_phrases` count attempts. Re-running a
/// `failed` or `processing` file adds to them again, so they are not per-word totals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statistics {
    pub total_files: u64,
    pub completed_files: u64,
    pub total_words: u64,
    pub downloaded_audios: u64,
    pub failed_downloads: u64,
    pub skipped_phrases: u64,
}

impl Statistics {
    pub fn file_progress(&self) -> f64 {
        percent(self.completed_files, self.total_files)
    }

    /// Every word is expected to yield two clips.
    pub fn expected_audios(&self) -> u64 {
        self.total_words * 2
    }

    pub fn audio_progress(&self) -> f64 {
        percent(self.downloaded_audios, self.expected_audios())
    }
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}

/// How [`Checkpoint::load_or_create`] obtained its checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// No checkpoint existed; one was built from the partition directory.
    Created,
    /// Loaded as-is.
    Loaded,
    /// Loaded from an older schema, backfilled and rewritten.
    Repaired,
}

/// Files discovered by [`Checkpoint::rescan`].
#[derive(Debug, Clone, Default)]
pub struct RescanReport {
    /// `(filename, word_count)` of every newly tracked file.
    pub added: Vec<(String, usize)>,

    /// `(filename, reason)` of files that could not be read and were not tracked.
    pub unreadable: Vec<(String, String)>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub files: Vec<FileStatus>,
    pub completed_files: Vec<String>,
    pub statistics: Statistics,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a fresh checkpoint tracking every partition currently in `split_dir`.
    pub fn scan(split_dir: &Path) -> Result<(Self, RescanReport)> {
        let mut checkpoint = Self::new();
        let report = checkpoint.rescan(split_dir)?;
        Ok((checkpoint, report))
    }

    /// Load the checkpoint at `path`, or create (and persist) one from `split_dir`.
    pub fn load_or_create(path: &Path, split_dir: &Path) -> Result<(Self, Origin)> {
        if path.exists() {
            let stored: StoredCheckpoint = read_json(path)?;
            let (checkpoint, repaired) = stored.upgrade();
            if repaired {
                info!(path = %path.display(), "backfilled missing checkpoint statistics");
                checkpoint.save(path)?;
                return Ok((checkpoint, Origin::Repaired));
            }
            return Ok((checkpoint, Origin::Loaded));
        }

        let (checkpoint, report) = Self::scan(split_dir)?;
        for (name, reason) in &report.unreadable {
            warn!(file = %name, reason = %reason, "partition left out of new checkpoint");
        }
        checkpoint.save(path)?;
        info!(path = %path.display(), files = checkpoint.files.len(), "created checkpoint");
        Ok((checkpoint, Origin::Created))
    }

    /// Rewrite the whole checkpoint at `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            ensure_dir(parent)?;
        }
        write_json_pretty(path, self)
    }

    /// Track partitions in `split_dir` that the checkpoint does not know about yet.
    ///
    /// New files are appended in file-name order. Existing records are never touched.
    pub fn rescan(&mut self, split_dir: &Path) -> Result<RescanReport> {
        let mut report = RescanReport::default();

        for path in list_json_files(split_dir)? {
            let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            if self.file(name).is_some() {
                continue;
            }

            match read_json::<Vec<Value>>(&path) {
                Ok(words) => {
                    let count = words.len();
                    self.files.push(FileStatus::pending(name, count));
                    self.statistics.total_files += 1;
                    self.statistics.total_words += count as u64;
                    report.added.push((name.to_string(), count));
                }
                Err(err) => {
                    warn!(file = %name, error = %err, "cannot read partition");
                    report.unreadable.push((name.to_string(), err.to_string()));
                }
            }
        }

        Ok(report)
    }

    /// First file, in stored order, that is pending or failed.
    pub fn next_pending(&self) -> Option<&str> {
        self.files
            .iter()
            .find(|f| f.status.is_selectable())
            .map(|f| f.filename.as_str())
    }

    pub fn file(&self, filename: &str) -> Option<&FileStatus> {
        self.files.iter().find(|f| f.filename == filename)
    }

    fn file_mut(&mut self, filename: &str) -> Result<&mut FileStatus> {
        self.files
            .iter_mut()
            .find(|f| f.filename == filename)
            .ok_or_else(|| Error::UnknownPartition(filename.to_string()))
    }

    pub fn begin_file(&mut self, filename: &str) -> Result<()> {
        let record = self.file_mut(filename)?;
        record.status = FileState::Processing;
        record.last_updated = Some(timestamp());
        Ok(())
    }

    pub fn fail_file(&mut self, filename: &str) -> Result<()> {
        let record = self.file_mut(filename)?;
        record.status = FileState::Failed;
        record.last_updated = Some(timestamp());
        Ok(())
    }

    pub fn update_progress(&mut self, filename: &str, completed: usize, failed: usize) -> Result<()> {
        let record = self.file_mut(filename)?;
        record.completed_words = completed;
        record.failed_words = failed;
        Ok(())
    }

    pub fn complete_file(&mut self, filename: &str, completed: usize, failed: usize) -> Result<()> {
        let record = self.file_mut(filename)?;
        record.completed_words = completed;
        record.failed_words = failed;
        record.status = FileState::Completed;
        record.last_updated = Some(timestamp());

        if !self.completed_files.iter().any(|f| f == filename) {
            self.completed_files.push(filename.to_string());
            self.statistics.completed_files += 1;
        }
        Ok(())
    }
}

fn timestamp() -> String {
    chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

/// On-disk shape accepted from any earlier version of the tool.
#[derive(Debug, Deserialize)]
struct StoredCheckpoint {
    #[serde(default)]
    files: Vec<FileStatus>,
    #[serde(default)]
    completed_files: Vec<String>,
    #[serde(default)]
    statistics: Option<StoredStatistics>,
}

#[derive(Debug, Default, Deserialize)]
struct StoredStatistics {
    total_files: Option<u64>,
    completed_files: Option<u64>,
    total_words: Option<u64>,
    downloaded_audios: Option<u64>,
    failed_downloads: Option<u64>,
    skipped_phrases: Option<u64>,
}

impl StoredCheckpoint {
    /// Convert into the current schema. The flag is `true` when anything was backfilled.
    fn upgrade(self) -> (Checkpoint, bool) {
        let mut repaired = self.statistics.is_none();
        let s = self.statistics.unwrap_or_default();

        let mut fill = |v: Option<u64>| {
            repaired |= v.is_none();
            v.unwrap_or(0)
        };
        let statistics = Statistics {
            total_files: fill(s.total_files),
            completed_files: fill(s.completed_files),
            total_words: fill(s.total_words),
            downloaded_audios: fill(s.downloaded_audios),
            failed_downloads: fill(s.failed_downloads),
            skipped_phrases: fill(s.skipped_phrases),
        };

        let checkpoint = Checkpoint {
            files: self.files,
            completed_files: self.completed_files,
            statistics,
        };
        (checkpoint, repaired)
    }
}
