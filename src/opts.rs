use std::path::{Path, PathBuf};
use std::time::Duration;

/// Maximum number of entries per partition file.
pub const BATCH_SIZE: usize = 1000;

/// Where every stage of the toolkit reads and writes.
///
/// This struct represents *library-level configuration*, not CLI flags directly.
/// The binaries map user input into it so that:
/// - the library never reaches for process-wide paths on its own
/// - tests can point every stage at a temporary directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataLayout {
    /// Root of the shared data directory.
    pub base_dir: PathBuf,

    /// Consolidated output of the deduplicator, input of the splitter.
    pub unique_words_file: PathBuf,

    /// Directory holding the `words_NNN.json` partitions.
    pub split_dir: PathBuf,

    /// Directory receiving downloaded `.mp3` clips.
    pub audio_dir: PathBuf,

    /// Download progress checkpoint.
    pub checkpoint_file: PathBuf,
}

impl DataLayout {
    /// Derive the standard file layout under `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        Self {
            unique_words_file: base_dir.join("unique_words.json"),
            split_dir: base_dir.join("split_words"),
            audio_dir: base_dir.join("audio_downloads"),
            checkpoint_file: base_dir.join("download_progress.json"),
            base_dir,
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}

/// Policy values for talking to the remote pronunciation service.
///
/// The defaults encode the service's informal rate-limit contract:
/// one request at a time, half a second apart, ten seconds at most each.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Endpoint base; the query string `?audio={word}&type={n}` is appended.
    pub endpoint: String,

    /// Browser-like User-Agent sent with every request.
    pub user_agent: String,

    /// Per-request timeout.
    pub request_timeout: Duration,

    /// Pause after every variant request, whatever its outcome.
    pub request_delay: Duration,

    /// Persist the checkpoint after this many entries of a file.
    pub checkpoint_interval: usize,

    /// Bodies strictly larger than this are accepted even without an `audio/*` content type.
    pub min_audio_bytes: usize,

    /// A word only counts as downloaded when every variant succeeded.
    pub require_all_variants: bool,
}

pub const DEFAULT_ENDPOINT: &str = "https://dict.youdao.com/dictvoice";

pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            request_timeout: Duration::from_secs(10),
            request_delay: Duration::from_millis(500),
            checkpoint_interval: 10,
            min_audio_bytes: 1000,
            require_all_variants: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_derives_paths_from_base() {
        let layout = DataLayout::new("/data/notes");
        assert_eq!(layout.base_dir(), Path::new("/data/notes"));
        assert_eq!(
            layout.unique_words_file,
            PathBuf::from("/data/notes/unique_words.json")
        );
        assert_eq!(layout.split_dir, PathBuf::from("/data/notes/split_words"));
        assert_eq!(layout.audio_dir, PathBuf::from("/data/notes/audio_downloads"));
        assert_eq!(
            layout.checkpoint_file,
            PathBuf::from("/data/notes/download_progress.json")
        );
    }

    #[test]
    fn default_policy_matches_service_contract() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.request_timeout, Duration::from_secs(10));
        assert_eq!(policy.request_delay, Duration::from_millis(500));
        assert_eq!(policy.checkpoint_interval, 10);
        assert_eq!(policy.min_audio_bytes, 1000);
        assert!(policy.require_all_variants);
        assert!(policy.user_agent.starts_with("Mozilla/5.0"));
    }
}
