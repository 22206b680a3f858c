//! Re-chunk the consolidated word list into fixed-size partition files.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::json_io::{ensure_dir, read_entries, write_json_pretty};
use crate::word_entry::{WordEntry, renumber};
use crate::{Error, Result};

/// File name of the 1-based partition `index` (`words_001.json`, ...).
pub fn partition_file_name(index: usize) -> String {
    format!("words_{index:03}.json")
}

/// Slice `entries` into contiguous chunks of at most `batch_size`, each renumbered from 1.
///
/// # Panics
///
/// Panics if `batch_size` is zero.
pub fn partition(entries: Vec<WordEntry>, batch_size: usize) -> Vec<Vec<WordEntry>> {
    assert!(batch_size > 0, "batch size must be positive");

    let mut chunks = Vec::with_capacity(entries.len().div_ceil(batch_size));
    let mut iter = entries.into_iter().peekable();
    while iter.peek().is_some() {
        let mut chunk: Vec<WordEntry> = iter.by_ref().take(batch_size).collect();
        renumber(&mut chunk);
        chunks.push(chunk);
    }
    chunks
}

/// One written partition file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionSummary {
    pub file_name: String,
    pub path: PathBuf,
    pub entries: usize,
    pub first_word: Option<String>,
    pub last_word: Option<String>,
}

/// Summary of one split run, including the read-back verification.
#[derive(Debug, Clone)]
pub struct SplitReport {
    pub total_entries: usize,
    pub partitions: Vec<PartitionSummary>,

    /// Entry count summed over the partitions as read back from disk.
    pub verified_total: usize,
}

impl SplitReport {
    pub fn is_verified(&self) -> bool {
        self.total_entries == self.verified_total
    }
}

/// Split the JSON array at `input` into `words_NNN.json` files under `output_dir`.
///
/// Every written file is read back afterwards to confirm no entry was lost. Existing
/// partition files with the same names are overwritten; stale higher-numbered ones are left.
pub fn split_file(input: &Path, output_dir: &Path, batch_size: usize) -> Result<SplitReport> {
    if batch_size == 0 {
        return Err(Error::msg("batch size must be positive"));
    }

    let entries = read_entries(input)?;
    let total_entries = entries.len();
    ensure_dir(output_dir)?;

    let mut partitions = Vec::new();
    for (i, chunk) in partition(entries, batch_size).into_iter().enumerate() {
        let file_name = partition_file_name(i + 1);
        let path = output_dir.join(&file_name);
        write_json_pretty(&path, &chunk)?;

        info!(file = %file_name, entries = chunk.len(), "wrote partition");
        partitions.push(PartitionSummary {
            first_word: chunk.first().and_then(|e| e.head_word()).map(String::from),
            last_word: chunk.last().and_then(|e| e.head_word()).map(String::from),
            entries: chunk.len(),
            file_name,
            path,
        });
    }

    let mut verified_total = 0;
    for p in &partitions {
        verified_total += read_entries(&p.path)?.len();
    }

    Ok(SplitReport {
        total_entries,
        partitions,
        verified_total,
    })
}
