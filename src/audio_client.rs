use std::path::{Component, Path, PathBuf};

use thiserror::Error;

/// The two pronunciation clips requested for every word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    /// British pronunciation, service `type=1`.
    Uk,
    /// American pronunciation, service `type=2`.
    Us,
}

impl Variant {
    pub const ALL: [Variant; 2] = [Variant::Uk, Variant::Us];

    /// Value of the service's `type` query parameter.
    pub fn type_code(self) -> u8 {
        match self {
            Variant::Uk => 1,
            Variant::Us => 2,
        }
    }

    pub fn suffix(self) -> &'static str {
        match self {
            Variant::Uk => "uk",
            Variant::Us => "us",
        }
    }
}

/// `{endpoint}?audio={lowercased, URL-escaped word}&type={1|2}`
pub fn audio_url(endpoint: &str, word: &str, variant: Variant) -> String {
    format!(
        "{endpoint}?audio={}&type={}",
        urlencoding::encode(&word.to_lowercase()),
        variant.type_code()
    )
}

/// Destination file name for `word`'s clip; keeps the word's original casing.
pub fn audio_file_name(word: &str, variant: Variant) -> String {
    format!("{word}_{}.mp3", variant.suffix())
}

/// Whether `word` can be used as a clip file name stem inside the audio directory.
///
/// Rejects separators and anything `Path` would read as a root, prefix, `.` or `..`.
pub fn is_safe_file_stem(word: &str) -> bool {
    !word.is_empty()
        && !word.contains(['/', '\\'])
        && Path::new(word)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
}

/// A successful response from the pronunciation service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl AudioPayload {
    /// Heuristic against empty bodies and HTML error pages: either the server says it is
    /// audio, or the body is larger than `min_bytes`.
    pub fn looks_like_audio(&self, min_bytes: usize) -> bool {
        let declared_audio = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.starts_with("audio"));
        declared_audio || self.body.len() > min_bytes
    }
}

/// Why a single clip could not be obtained.
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    #[error("invalid audio ({bytes} bytes, content-type {content_type:?})")]
    InvalidAudio {
        bytes: usize,
        content_type: Option<String>,
    },

    #[error("word {0:?} is not a safe file name")]
    UnsafeName(String),

    #[error("cannot write '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Transport used by the fetcher to GET one clip.
///
/// Implementations only perform the request; existence checks, validation, persistence and
/// pacing are handled by [`crate::fetcher::AudioFetcher`].
pub trait AudioClient {
    fn fetch(&self, url: &str) -> std::result::Result<AudioPayload, DownloadError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audio_url_lowercases_and_escapes() {
        assert_eq!(
            audio_url("https://dict.example/voice", "Café", Variant::Uk),
            "https://dict.example/voice?audio=caf%C3%A9&type=1"
        );
        assert_eq!(
            audio_url("https://dict.example/voice", "it's", Variant::Us),
            "https://dict.example/voice?audio=it%27s&type=2"
        );
    }

    #[test]
    fn audio_file_name_keeps_case() {
        assert_eq!(audio_file_name("Paris", Variant::Uk), "Paris_uk.mp3");
        assert_eq!(audio_file_name("paris", Variant::Us), "paris_us.mp3");
    }

    #[test]
    fn file_stems_cannot_leave_the_audio_dir() {
        assert!(is_safe_file_stem("aardvark"));
        assert!(is_safe_file_stem("it's"));
        assert!(is_safe_file_stem("a.m."));
        assert!(!is_safe_file_stem("../escaped"));
        assert!(!is_safe_file_stem(".."));
        assert!(!is_safe_file_stem("."));
        assert!(!is_safe_file_stem("/etc/passwd"));
        assert!(!is_safe_file_stem("dir\\name"));
        assert!(!is_safe_file_stem(""));
    }

    #[test]
    fn looks_like_audio_accepts_content_type_or_size() {
        let tagged = AudioPayload {
            content_type: Some("audio/mpeg".to_string()),
            body: vec![0; 10],
        };
        assert!(tagged.looks_like_audio(1000));

        let large = AudioPayload {
            content_type: Some("application/octet-stream".to_string()),
            body: vec![0; 1001],
        };
        assert!(large.looks_like_audio(1000));

        let error_page = AudioPayload {
            content_type: Some("text/html".to_string()),
            body: vec![0; 1000],
        };
        assert!(!error_page.looks_like_audio(1000));

        let untagged = AudioPayload {
            content_type: None,
            body: Vec::new(),
        };
        assert!(!untagged.looks_like_audio(1000));
    }
}
