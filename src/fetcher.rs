//! Sequential, resumable pronunciation downloader.
//!
//! The fetcher walks partition files one at a time. For every entry it either skips a phrase
//! or requests each [`Variant`] in turn, pausing after every request. Progress lives in the
//! [`Checkpoint`], which is persisted every `checkpoint_interval` entries and when a file
//! completes. A clip already on disk counts as success without touching the network, so
//! entries replayed after a crash cost nothing.

use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread;

use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{error, info, warn};

use crate::audio_client::{
    AudioClient, DownloadError, Variant, audio_file_name, audio_url, is_safe_file_stem,
};
use crate::checkpoint::{Checkpoint, FileState, Origin, RescanReport};
use crate::json_io::{ensure_dir, read_json};
use crate::opts::{DataLayout, FetchPolicy};
use crate::word_entry::HEAD_WORD_KEY;
use crate::{Error, Result};

/// Phrases (anything with a space or a hyphen) are never sent to the service.
pub fn is_phrase(word: &str) -> bool {
    word.contains(' ') || word.contains('-')
}

/// Result of obtaining one clip.
#[derive(Debug)]
pub enum VariantOutcome {
    /// The destination file was already present; no request was made.
    AlreadyExists,
    Downloaded,
    Failed(DownloadError),
}

impl VariantOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, VariantOutcome::Failed(_))
    }

    pub fn describe(&self) -> String {
        match self {
            VariantOutcome::AlreadyExists => "already exists".to_string(),
            VariantOutcome::Downloaded => "downloaded".to_string(),
            VariantOutcome::Failed(err) => err.to_string(),
        }
    }
}

/// Result of handling one word entry.
#[derive(Debug)]
pub enum WordOutcome {
    Phrase,
    Succeeded(Vec<(Variant, VariantOutcome)>),
    /// Some variant failed. Every variant was still attempted.
    Failed(Vec<(Variant, VariantOutcome)>),
}

impl WordOutcome {
    /// Number of clips freshly written by this word.
    pub fn downloaded(&self) -> u64 {
        match self {
            WordOutcome::Phrase => 0,
            WordOutcome::Succeeded(v) | WordOutcome::Failed(v) => v
                .iter()
                .filter(|(_, o)| matches!(o, VariantOutcome::Downloaded))
                .count() as u64,
        }
    }
}

/// How a file run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Completed,
    /// The checkpoint already marked this file completed; nothing was done.
    AlreadyCompleted,
    /// The partition could not be read; the file is now `failed`.
    Unreadable(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileReport {
    pub filename: String,
    pub outcome: FileOutcome,
    pub total_words: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_phrases: usize,
}

impl FileReport {
    fn empty(filename: &str, outcome: FileOutcome) -> Self {
        Self {
            filename: filename.to_string(),
            outcome,
            total_words: 0,
            succeeded: 0,
            failed: 0,
            skipped_phrases: 0,
        }
    }
}

/// Which files a run should process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// These partition file names, in the given order.
    Files(Vec<String>),
    /// Up to this many files chosen by the "next pending" policy.
    Next(usize),
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub files: Vec<FileReport>,

    /// Requested file names the checkpoint does not track.
    pub unknown: Vec<String>,

    /// `true` when the run stopped because nothing was left to process.
    pub exhausted: bool,
}

/// Receives progress notifications while a file is processed.
///
/// All methods default to doing nothing.
pub trait FetchObserver {
    fn on_file_start(&mut self, _filename: &str, _total: usize) {}

    /// `index` is 1-based over all entries of the file.
    fn on_word(&mut self, _index: usize, _total: usize, _word: &str, _outcome: &WordOutcome) {}

    fn on_file_done(&mut self, _report: &FileReport) {}
}

/// An observer that ignores everything.
pub struct SilentObserver;

impl FetchObserver for SilentObserver {}

pub struct AudioFetcher<C: AudioClient> {
    layout: DataLayout,
    policy: FetchPolicy,
    client: C,
    checkpoint: Checkpoint,
}

impl<C: AudioClient> AudioFetcher<C> {
    /// Prepare the audio directory and load (or create) the checkpoint.
    pub fn open(layout: DataLayout, policy: FetchPolicy, client: C) -> Result<(Self, Origin)> {
        ensure_dir(&layout.audio_dir)?;
        let (checkpoint, origin) =
            Checkpoint::load_or_create(&layout.checkpoint_file, &layout.split_dir)?;

        let fetcher = Self {
            layout,
            policy,
            client,
            checkpoint,
        };
        Ok((fetcher, origin))
    }

    pub fn checkpoint(&self) -> &Checkpoint {
        &self.checkpoint
    }

    pub fn layout(&self) -> &DataLayout {
        &self.layout
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    /// Track partitions added since the checkpoint was created.
    pub fn rescan(&mut self) -> Result<RescanReport> {
        let report = self.checkpoint.rescan(&self.layout.split_dir)?;
        if !report.added.is_empty() {
            self.persist();
        }
        Ok(report)
    }

    /// Write the checkpoint. Failures are logged; in-memory progress is kept and the next
    /// successful write catches up.
    fn persist(&self) {
        if let Err(err) = self.checkpoint.save(&self.layout.checkpoint_file) {
            error!(error = %err, "failed to save checkpoint");
        }
    }

    pub fn run(&mut self, selection: Selection, observer: &mut dyn FetchObserver) -> Result<RunReport> {
        let mut report = RunReport::default();

        match selection {
            Selection::Files(names) => {
                for name in names {
                    if self.checkpoint.file(&name).is_none() {
                        warn!(file = %name, "requested file is not tracked");
                        report.unknown.push(name);
                        continue;
                    }
                    report.files.push(self.process_file(&name, observer)?);
                }
            }
            Selection::Next(count) => {
                // Files attempted in this run are not picked again, so an unreadable
                // partition cannot eat the whole budget.
                let mut attempted = HashSet::new();
                while report.files.len() < count {
                    let next = self
                        .checkpoint
                        .files
                        .iter()
                        .find(|f| f.status.is_selectable() && !attempted.contains(&f.filename))
                        .map(|f| f.filename.clone());

                    let Some(name) = next else {
                        report.exhausted = true;
                        break;
                    };
                    report.files.push(self.process_file(&name, observer)?);
                    attempted.insert(name);
                }
            }
        }

        Ok(report)
    }

    /// Download every word of one tracked partition file.
    ///
    /// Per-word failures never fail the file; only an unreadable partition does.
    pub fn process_file(
        &mut self,
        filename: &str,
        observer: &mut dyn FetchObserver,
    ) -> Result<FileReport> {
        let record = self
            .checkpoint
            .file(filename)
            .ok_or_else(|| Error::UnknownPartition(filename.to_string()))?;

        if record.status == FileState::Completed {
            info!(file = %filename, "file already completed");
            return Ok(FileReport::empty(filename, FileOutcome::AlreadyCompleted));
        }

        let path = self.layout.split_dir.join(filename);
        let entries: Vec<Value> = match read_json(&path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(file = %filename, error = %err, "cannot read partition");
                self.checkpoint.fail_file(filename)?;
                self.persist();
                return Ok(FileReport::empty(
                    filename,
                    FileOutcome::Unreadable(err.to_string()),
                ));
            }
        };

        self.checkpoint.begin_file(filename)?;
        let total = entries.len();
        observer.on_file_start(filename, total);
        info!(file = %filename, words = total, "processing file");

        let mut report = FileReport::empty(filename, FileOutcome::Completed);
        report.total_words = total;

        for (i, entry) in entries.iter().enumerate() {
            let index = i + 1;
            let word = entry
                .get(HEAD_WORD_KEY)
                .and_then(Value::as_str)
                .map(str::trim)
                .unwrap_or_default();

            if !word.is_empty() {
                let outcome = self.fetch_word(word);
                let stats = &mut self.checkpoint.statistics;
                stats.downloaded_audios += outcome.downloaded();
                match &outcome {
                    WordOutcome::Phrase => {
                        report.skipped_phrases += 1;
                        stats.skipped_phrases += 1;
                    }
                    WordOutcome::Succeeded(_) => report.succeeded += 1,
                    WordOutcome::Failed(_) => {
                        report.failed += 1;
                        stats.failed_downloads += 1;
                    }
                }
                observer.on_word(index, total, word, &outcome);
            }

            if self.policy.checkpoint_interval > 0 && index % self.policy.checkpoint_interval == 0 {
                self.checkpoint
                    .update_progress(filename, report.succeeded, report.failed)?;
                self.persist();
            }
        }

        self.checkpoint
            .complete_file(filename, report.succeeded, report.failed)?;
        self.persist();

        info!(
            file = %filename,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped_phrases = report.skipped_phrases,
            "file completed"
        );
        observer.on_file_done(&report);
        Ok(report)
    }

    /// Fetch every variant of `word`, unless it is a phrase.
    pub fn fetch_word(&self, word: &str) -> WordOutcome {
        if is_phrase(word) {
            return WordOutcome::Phrase;
        }

        let mut outcomes = Vec::with_capacity(Variant::ALL.len());
        for variant in Variant::ALL {
            let outcome = self.fetch_variant(word, variant);
            thread::sleep(self.policy.request_delay);
            outcomes.push((variant, outcome));
        }

        let ok = if self.policy.require_all_variants {
            outcomes.iter().all(|(_, o)| o.is_success())
        } else {
            outcomes.iter().any(|(_, o)| o.is_success())
        };

        if ok {
            WordOutcome::Succeeded(outcomes)
        } else {
            WordOutcome::Failed(outcomes)
        }
    }

    /// Obtain one clip, short-circuiting when it is already on disk.
    ///
    /// Words that would not name a file directly inside the audio directory fail without a
    /// request.
    pub fn fetch_variant(&self, word: &str, variant: Variant) -> VariantOutcome {
        if !is_safe_file_stem(word) {
            warn!(word = %word, "refusing unsafe clip file name");
            return VariantOutcome::Failed(DownloadError::UnsafeName(word.to_string()));
        }

        let dest = self.audio_path(word, variant);
        if dest.exists() {
            return VariantOutcome::AlreadyExists;
        }

        let url = audio_url(&self.policy.endpoint, word, variant);
        let payload = match self.client.fetch(&url) {
            Ok(payload) => payload,
            Err(err) => return VariantOutcome::Failed(err),
        };

        if !payload.looks_like_audio(self.policy.min_audio_bytes) {
            return VariantOutcome::Failed(DownloadError::InvalidAudio {
                bytes: payload.body.len(),
                content_type: payload.content_type,
            });
        }

        match write_clip(&dest, &payload.body) {
            Ok(()) => VariantOutcome::Downloaded,
            Err(source) => VariantOutcome::Failed(DownloadError::Io { path: dest, source }),
        }
    }

    pub fn audio_path(&self, word: &str, variant: Variant) -> PathBuf {
        self.layout.audio_dir.join(audio_file_name(word, variant))
    }
}

/// Write to a temp file next to `dest`, then rename, so a half-written clip is never
/// mistaken for an existing one.
fn write_clip(dest: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = dest.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(dest).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio_client::AudioPayload;
    use std::cell::RefCell;
    use std::fs;
    use std::time::Duration;

    /// Serves canned responses keyed by the `type=` code and records every URL.
    struct ScriptedClient {
        calls: RefCell<Vec<String>>,
        us_status: Option<u16>,
    }

    impl ScriptedClient {
        fn ok() -> Self {
            Self {
                calls: RefCell::new(Vec::new()),
                us_status: None,
            }
        }
    }

    impl AudioClient for ScriptedClient {
        fn fetch(&self, url: &str) -> std::result::Result<AudioPayload, DownloadError> {
            self.calls.borrow_mut().push(url.to_string());
            if let (true, Some(code)) = (url.ends_with("type=2"), self.us_status) {
                return Err(DownloadError::Status(code));
            }
            Ok(AudioPayload {
                content_type: Some("audio/mpeg".to_string()),
                body: b"ID3fake".to_vec(),
            })
        }
    }

    fn policy() -> FetchPolicy {
        FetchPolicy {
            endpoint: "http://dict.test/voice".to_string(),
            request_delay: Duration::ZERO,
            ..FetchPolicy::default()
        }
    }

    fn setup(words: &[&str]) -> anyhow::Result<tempfile::TempDir> {
        let base = tempfile::tempdir()?;
        let layout = DataLayout::new(base.path());
        fs::create_dir_all(&layout.split_dir)?;
        let entries: Vec<Value> = words
            .iter()
            .map(|w| serde_json::json!({"headWord": w}))
            .collect();
        fs::write(
            layout.split_dir.join("words_001.json"),
            serde_json::to_string(&entries)?,
        )?;
        Ok(base)
    }

    #[test]
    fn phrase_detection() {
        assert!(is_phrase("ice cream"));
        assert!(is_phrase("well-known"));
        assert!(!is_phrase("aardvark"));
    }

    #[test]
    fn fetch_word_requests_both_variants() -> anyhow::Result<()> {
        let base = setup(&[])?;
        let (fetcher, _) =
            AudioFetcher::open(DataLayout::new(base.path()), policy(), ScriptedClient::ok())?;

        let outcome = fetcher.fetch_word("Zebra");
        assert!(matches!(outcome, WordOutcome::Succeeded(_)));
        assert_eq!(outcome.downloaded(), 2);
        assert_eq!(
            *fetcher.client().calls.borrow(),
            vec![
                "http://dict.test/voice?audio=zebra&type=1".to_string(),
                "http://dict.test/voice?audio=zebra&type=2".to_string(),
            ]
        );
        assert!(fetcher.audio_path("Zebra", Variant::Uk).exists());
        assert!(fetcher.audio_path("Zebra", Variant::Us).exists());
        Ok(())
    }

    #[test]
    fn one_failed_variant_fails_the_word_without_short_circuit() -> anyhow::Result<()> {
        let base = setup(&[])?;
        let client = ScriptedClient {
            calls: RefCell::new(Vec::new()),
            us_status: Some(404),
        };
        let (fetcher, _) = AudioFetcher::open(DataLayout::new(base.path()), policy(), client)?;

        let outcome = fetcher.fetch_word("zebra");
        let WordOutcome::Failed(variants) = &outcome else {
            panic!("expected failure, got {outcome:?}");
        };
        assert!(matches!(variants[0].1, VariantOutcome::Downloaded));
        assert!(matches!(
            variants[1].1,
            VariantOutcome::Failed(DownloadError::Status(404))
        ));
        assert_eq!(fetcher.client().calls.borrow().len(), 2);
        assert!(!fetcher.audio_path("zebra", Variant::Us).exists());
        Ok(())
    }

    #[test]
    fn invalid_payload_is_not_written() -> anyhow::Result<()> {
        struct HtmlClient;
        impl AudioClient for HtmlClient {
            fn fetch(&self, _url: &str) -> std::result::Result<AudioPayload, DownloadError> {
                Ok(AudioPayload {
                    content_type: Some("text/html".to_string()),
                    body: b"<html>oops</html>".to_vec(),
                })
            }
        }

        let base = setup(&[])?;
        let (fetcher, _) = AudioFetcher::open(DataLayout::new(base.path()), policy(), HtmlClient)?;

        let outcome = fetcher.fetch_variant("zebra", Variant::Uk);
        assert!(matches!(
            outcome,
            VariantOutcome::Failed(DownloadError::InvalidAudio { bytes: 17, .. })
        ));
        assert!(!fetcher.audio_path("zebra", Variant::Uk).exists());
        Ok(())
    }

    #[test]
    fn process_file_counts_outcomes_and_completes() -> anyhow::Result<()> {
        let base = setup(&["cat", "ice cream", "", "well-known", "dog"])?;
        let (mut fetcher, origin) =
            AudioFetcher::open(DataLayout::new(base.path()), policy(), ScriptedClient::ok())?;
        assert_eq!(origin, Origin::Created);

        let report = fetcher.process_file("words_001.json", &mut SilentObserver)?;
        assert_eq!(report.outcome, FileOutcome::Completed);
        assert_eq!(report.succeeded, 2);
        assert_eq!(report.failed, 0);
        assert_eq!(report.skipped_phrases, 2);

        let cp = fetcher.checkpoint();
        assert_eq!(cp.files[0].status, FileState::Completed);
        assert_eq!(cp.files[0].completed_words, 2);
        assert_eq!(cp.statistics.downloaded_audios, 4);
        assert_eq!(cp.statistics.skipped_phrases, 2);
        assert_eq!(cp.statistics.completed_files, 1);
        assert_eq!(cp.completed_files, vec!["words_001.json".to_string()]);

        let calls = fetcher.client().calls.borrow().clone();
        assert_eq!(calls.len(), 4);
        assert!(calls.iter().all(|url| url.contains("audio=cat") || url.contains("audio=dog")));

        let again = fetcher.process_file("words_001.json", &mut SilentObserver)?;
        assert_eq!(again.outcome, FileOutcome::AlreadyCompleted);
        Ok(())
    }

    #[test]
    fn path_like_words_fail_without_writing_outside_audio_dir() -> anyhow::Result<()> {
        let base = setup(&["../escaped", "/rooted", "cat"])?;
        let layout = DataLayout::new(base.path());
        let (mut fetcher, _) = AudioFetcher::open(layout.clone(), policy(), ScriptedClient::ok())?;

        let report = fetcher.run(Selection::Next(1), &mut SilentObserver)?;
        assert_eq!(report.files[0].failed, 2);
        assert_eq!(report.files[0].succeeded, 1);

        assert!(!base.path().join("escaped_uk.mp3").exists());
        assert!(!base.path().join("escaped_us.mp3").exists());
        assert!(!Path::new("/rooted_uk.mp3").exists());

        let calls = fetcher.client().calls.borrow().clone();
        assert_eq!(calls.len(), 2);
        assert!(calls.iter().all(|url| url.contains("audio=cat")));

        let mut clips: Vec<String> = fs::read_dir(&layout.audio_dir)?
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().into_string().ok())
            .collect();
        clips.sort();
        assert_eq!(clips, vec!["cat_uk.mp3".to_string(), "cat_us.mp3".to_string()]);
        Ok(())
    }

    #[test]
    fn unreadable_partition_marks_file_failed() -> anyhow::Result<()> {
        let base = setup(&["cat"])?;
        let layout = DataLayout::new(base.path());
        let (mut fetcher, _) = AudioFetcher::open(layout.clone(), policy(), ScriptedClient::ok())?;

        fs::write(layout.split_dir.join("words_001.json"), "not json")?;
        let report = fetcher.process_file("words_001.json", &mut SilentObserver)?;

        assert!(matches!(report.outcome, FileOutcome::Unreadable(_)));
        assert_eq!(fetcher.checkpoint().files[0].status, FileState::Failed);
        assert_eq!(
            fetcher.checkpoint().next_pending(),
            Some("words_001.json")
        );
        Ok(())
    }

    #[test]
    fn run_next_stops_when_exhausted_and_reports_unknown_targets() -> anyhow::Result<()> {
        let base = setup(&["cat"])?;
        let (mut fetcher, _) =
            AudioFetcher::open(DataLayout::new(base.path()), policy(), ScriptedClient::ok())?;

        let report = fetcher.run(Selection::Next(3), &mut SilentObserver)?;
        assert_eq!(report.files.len(), 1);
        assert!(report.exhausted);

        let report = fetcher.run(
            Selection::Files(vec!["words_009.json".to_string(), "words_001.json".to_string()]),
            &mut SilentObserver,
        )?;
        assert_eq!(report.unknown, vec!["words_009.json".to_string()]);
        assert_eq!(report.files[0].outcome, FileOutcome::AlreadyCompleted);
        Ok(())
    }

    #[test]
    fn checkpoint_is_persisted_every_interval() -> anyhow::Result<()> {
        struct Peek {
            path: PathBuf,
            seen: Vec<(usize, usize)>,
        }
        impl FetchObserver for Peek {
            fn on_word(&mut self, index: usize, _: usize, _: &str, _: &WordOutcome) {
                let text = fs::read_to_string(&self.path).unwrap_or_default();
                let v: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
                let done = v["files"][0]["completed_words"].as_u64().unwrap_or(0) as usize;
                self.seen.push((index, done));
            }
        }

        let words: Vec<String> = (0..12).map(|i| format!("w{i}")).collect();
        let refs: Vec<&str> = words.iter().map(String::as_str).collect();
        let base = setup(&refs)?;
        let layout = DataLayout::new(base.path());
        let (mut fetcher, _) = AudioFetcher::open(layout.clone(), policy(), ScriptedClient::ok())?;

        let mut peek = Peek {
            path: layout.checkpoint_file.clone(),
            seen: Vec::new(),
        };
        fetcher.process_file("words_001.json", &mut peek)?;

        // The save after word 10 happens once its observer callback has run.
        assert_eq!(peek.seen[9], (10, 0));
        assert_eq!(peek.seen[10], (11, 10));
        assert_eq!(peek.seen[11], (12, 10));
        Ok(())
    }
}
