//! Merge word entries from many dictionary exports into one ranked list.
//!
//! Entries are keyed by their lowercased `headWord`; the first occurrence (by file order,
//! then line order) wins. The merged list is ordered by the entries' original `wordRank`
//! (rankless entries last, keeping their relative order) and then renumbered 1..N.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::json_io::{ensure_dir, list_json_files, read_json_lines, write_json_pretty};
use crate::word_entry::{WordEntry, renumber};
use crate::{Error, Result};

/// First-seen entries keyed by lowercased head word, in insertion order.
#[derive(Debug, Default)]
pub struct UniqueWordSet {
    index: HashMap<String, usize>,
    entries: Vec<WordEntry>,
}

impl UniqueWordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `entry` unless its key is already present.
    ///
    /// Returns `true` when the entry was retained. Entries without a usable key are dropped.
    pub fn insert(&mut self, entry: WordEntry) -> bool {
        let Some(key) = entry.key() else {
            return false;
        };
        if self.index.contains_key(&key) {
            return false;
        }

        self.index.insert(key, self.entries.len());
        self.entries.push(entry);
        true
    }

    pub fn get(&self, key: &str) -> Option<&WordEntry> {
        self.index.get(key).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort by original rank and renumber `wordRank` as 1-based positions.
    pub fn into_ranked(self) -> Vec<WordEntry> {
        let mut entries = self.entries;
        // `sort_by` is stable, so ties and rankless entries keep first-seen order.
        entries.sort_by(|a, b| compare_rank(a.rank(), b.rank()));
        renumber(&mut entries);
        entries
    }
}

fn compare_rank(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.total_cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Per-input-file outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DedupFileReport {
    pub path: PathBuf,

    /// Valid JSON objects read from the file.
    pub entries: usize,

    /// Entries from this file that introduced a new key.
    pub new_unique: usize,

    /// Lines that could not be decoded as JSON objects.
    pub malformed: usize,
}

/// An input file that could not be read at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

/// Summary of one deduplication run.
#[derive(Debug, Clone)]
pub struct DedupReport {
    pub files: Vec<DedupFileReport>,
    pub skipped: Vec<SkippedFile>,
    pub total_entries: usize,
    pub unique_entries: usize,
    pub output_file: PathBuf,
}

impl DedupReport {
    /// Share of input entries dropped as duplicates (or keyless), in percent.
    pub fn duplicate_ratio(&self) -> f64 {
        if self.total_entries == 0 {
            return 0.0;
        }
        (self.total_entries - self.unique_entries) as f64 / self.total_entries as f64 * 100.0
    }
}

/// Deduplicate every `*.json` file in `input_dir` into `output_file`.
///
/// Unreadable files are logged and skipped. The output file itself is never treated as an
/// input, even when it lives inside `input_dir`.
pub fn deduplicate_dir(input_dir: &Path, output_file: &Path) -> Result<DedupReport> {
    let inputs: Vec<PathBuf> = list_json_files(input_dir)?
        .into_iter()
        .filter(|p| !same_file(p, output_file))
        .collect();

    if inputs.is_empty() {
        return Err(Error::NoInputFiles(input_dir.to_path_buf()));
    }

    let mut set = UniqueWordSet::new();
    let mut files = Vec::with_capacity(inputs.len());
    let mut skipped = Vec::new();
    let mut total_entries = 0;

    for path in inputs {
        let lines = match read_json_lines(&path) {
            Ok(lines) => lines,
            Err(err) => {
                warn!(file = %path.display(), error = %err, "skipping unreadable input");
                skipped.push(SkippedFile {
                    path,
                    reason: err.to_string(),
                });
                continue;
            }
        };

        let entries = lines.entries.len();
        let mut new_unique = 0;
        for entry in lines.entries {
            if set.insert(entry) {
                new_unique += 1;
            }
        }
        total_entries += entries;

        info!(
            file = %path.display(),
            entries,
            new_unique,
            malformed = lines.malformed,
            "merged input file"
        );
        files.push(DedupFileReport {
            path,
            entries,
            new_unique,
            malformed: lines.malformed,
        });
    }

    let ranked = set.into_ranked();
    let unique_entries = ranked.len();

    if let Some(parent) = output_file.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    write_json_pretty(output_file, &ranked)?;

    Ok(DedupReport {
        files,
        skipped,
        total_entries,
        unique_entries,
        output_file: output_file.to_path_buf(),
    })
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
