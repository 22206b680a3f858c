//! `wordvox`: a small toolkit for preparing vocabulary data.
//!
//! This crate provides:
//! - Deduplication of newline-delimited dictionary exports into one ranked list
//! - Splitting of that list into fixed-size partition files
//! - A sequential pronunciation downloader with a resumable JSON checkpoint
//!
//! Each stage is driven by its own binary; the library keeps every stage usable (and
//! testable) on its own, with all paths and policy values passed in explicitly.

mod error;

pub use error::{Error, Result};

// Configuration shared by every stage.
pub mod opts;

// Entry model and JSON file plumbing.
pub mod json_io;
pub mod word_entry;

// Stage 1 and 2.
pub mod dedup;
pub mod split;

// Stage 3: progress tracking and downloading.
pub mod audio_client;
pub mod checkpoint;
pub mod fetcher;
#[cfg(feature = "http")]
pub mod http_client;
pub mod status;

// Helpers for the binaries.
#[cfg(feature = "cli")]
pub mod cli;
#[cfg(feature = "logging")]
pub mod logging;

pub use audio_client::{AudioClient, Variant};
pub use checkpoint::{Checkpoint, FileState, FileStatus, Statistics};
pub use fetcher::{AudioFetcher, FetchObserver, Selection};
pub use opts::{BATCH_SIZE, DataLayout, FetchPolicy};
pub use word_entry::WordEntry;

#[cfg(feature = "http")]
pub use http_client::HttpAudioClient;
