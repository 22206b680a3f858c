use std::path::PathBuf;

use clap::Args;

use crate::opts::DataLayout;

/// `--data-dir`, shared by every binary.
#[derive(Args, Debug, Clone)]
pub struct DataDirArgs {
    /// Shared data directory (unique_words.json, split_words/, audio_downloads/, ...).
    ///
    /// Defaults to `~/Desktop/myNote`.
    #[arg(short = 'd', long = "data-dir", env = "WORDVOX_DATA_DIR")]
    pub data_dir: Option<PathBuf>,
}

impl DataDirArgs {
    pub fn layout(&self) -> DataLayout {
        DataLayout::new(self.data_dir.clone().unwrap_or_else(default_data_dir))
    }
}

/// `~/Desktop/myNote`, falling back to the current directory when no home is known.
pub fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Desktop").join("myNote"))
        .unwrap_or_else(|| PathBuf::from("."))
}
