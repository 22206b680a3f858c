// Download UK/US pronunciation clips for every partition word, resuming from the checkpoint.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use wordvox::checkpoint::{Origin, RescanReport};
use wordvox::cli::DataDirArgs;
use wordvox::fetcher::{FileOutcome, FileReport, WordOutcome};
use wordvox::status::{StatusView, render_status};
use wordvox::{AudioFetcher, FetchObserver, FetchPolicy, HttpAudioClient, Selection, Variant};

#[derive(Parser, Debug)]
#[command(name = "wordvox-fetch")]
#[command(about = "Download pronunciation audio for split word files", long_about = None)]
struct Args {
    /// Partition files to process (e.g. words_001.json words_002.json).
    #[arg(short = 'f', long = "files", num_args = 1..)]
    files: Option<Vec<String>>,

    /// Number of pending files to process when --files is not given.
    #[arg(short = 'n', long = "num", default_value_t = 1)]
    num: usize,

    /// Show detailed status and exit.
    #[arg(short = 's', long = "status")]
    status: bool,

    /// Show brief status and exit.
    #[arg(short = 'b', long = "brief")]
    brief: bool,

    /// Rescan the partition directory for new files first.
    #[arg(short = 'r', long = "rescan")]
    rescan: bool,

    #[command(flatten)]
    data: DataDirArgs,
}

fn main() -> Result<()> {
    wordvox::logging::init();
    let args = Args::parse();
    let layout = args.data.layout();
    let policy = FetchPolicy::default();

    let client = HttpAudioClient::new(&policy).context("failed to build HTTP client")?;
    let checkpoint_path = layout.checkpoint_file.clone();
    let (mut fetcher, origin) = AudioFetcher::open(layout, policy, client)
        .with_context(|| format!("failed to open progress file {}", checkpoint_path.display()))?;

    match origin {
        Origin::Created => println!("🆕 created progress file {}", checkpoint_path.display()),
        Origin::Repaired => println!("🔧 upgraded progress file {}", checkpoint_path.display()),
        Origin::Loaded => println!("📋 loaded progress file {}", checkpoint_path.display()),
    }

    if args.status || args.brief {
        if args.rescan {
            print_rescan(&fetcher.rescan().context("rescan failed")?);
        }
        let view = if args.brief {
            StatusView::Brief
        } else {
            StatusView::Full
        };
        print!("{}", render_status(fetcher.checkpoint(), view));
        return Ok(());
    }

    println!("🎵 pronunciation downloader");
    println!("{}", "=".repeat(50));
    println!("📂 word files: {}", fetcher.layout().split_dir.display());
    println!("🎵 audio dir:  {}", fetcher.layout().audio_dir.display());
    println!("📋 progress:   {}", checkpoint_path.display());

    if args.rescan {
        println!("\n🔍 rescanning word files...");
        print_rescan(&fetcher.rescan().context("rescan failed")?);
    }

    print!("{}", render_status(fetcher.checkpoint(), StatusView::Full));

    let selection = match args.files {
        Some(files) => Selection::Files(files),
        None => Selection::Next(args.num),
    };

    let mut observer = ConsoleObserver::default();
    let report = fetcher.run(selection, &mut observer)?;

    for name in &report.unknown {
        println!("❌ not a tracked file: {name}");
    }
    for f in &report.files {
        match &f.outcome {
            FileOutcome::AlreadyCompleted => println!("✅ already completed: {}", f.filename),
            FileOutcome::Unreadable(reason) => {
                println!("❌ cannot read {}: {reason}", f.filename)
            }
            FileOutcome::Completed => {}
        }
    }
    if report.exhausted {
        println!("\n✅ all files have been processed!");
    }

    println!("\n{}", "=".repeat(50));
    print!("{}", render_status(fetcher.checkpoint(), StatusView::Full));
    Ok(())
}

fn print_rescan(report: &RescanReport) {
    for (name, count) in &report.added {
        println!("📁 new file: {name} ({count} words)");
    }
    for (name, reason) in &report.unreadable {
        println!("❌ cannot read new file {name}: {reason}");
    }
    if !report.added.is_empty() {
        println!("✅ added {} new files", report.added.len());
    }
}

/// Prints one line per word above a per-file progress bar.
#[derive(Default)]
struct ConsoleObserver {
    pb: Option<ProgressBar>,
}

impl FetchObserver for ConsoleObserver {
    fn on_file_start(&mut self, filename: &str, total: usize) {
        println!("\n📂 processing {filename}");
        println!("{}", "=".repeat(50));
        println!("📊 words: {total}");

        let pb = ProgressBar::new(total as u64);
        pb.set_style(
            ProgressStyle::with_template("{spinner:.green} {pos}/{len} {bar:40.cyan/blue} {eta}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.pb = Some(pb);
    }

    fn on_word(&mut self, index: usize, total: usize, word: &str, outcome: &WordOutcome) {
        let line = word_line(index, total, word, outcome);
        match &self.pb {
            Some(pb) => {
                pb.println(line);
                pb.set_position(index as u64);
            }
            None => println!("{line}"),
        }
    }

    fn on_file_done(&mut self, report: &FileReport) {
        if let Some(pb) = self.pb.take() {
            pb.finish_and_clear();
        }
        print!("{}", file_summary(report));
    }
}

fn word_line(index: usize, total: usize, word: &str, outcome: &WordOutcome) -> String {
    let verdict = match outcome {
        WordOutcome::Phrase => "⏭️  phrase skipped".to_string(),
        WordOutcome::Succeeded(_) => "✅ ok".to_string(),
        WordOutcome::Failed(variants) => {
            let detail: Vec<String> = variants
                .iter()
                .map(|(variant, o)| format!("{}: {}", label(*variant), o.describe()))
                .collect();
            format!("❌ failed ({})", detail.join(", "))
        }
    };
    format!("[{index:4}/{total}] {word} {verdict}")
}

fn label(variant: Variant) -> &'static str {
    match variant {
        Variant::Uk => "UK",
        Variant::Us => "US",
    }
}

fn file_summary(report: &FileReport) -> String {
    format!(
        "\n✅ finished {}\n   succeeded: {} words\n   failed:    {} words\n   skipped:   {} phrases\n",
        report.filename, report.succeeded, report.failed, report.skipped_phrases
    )
}
