// Re-chunk `unique_words.json` into `split_words/words_NNN.json` partitions.

use anyhow::{Context, Result};
use clap::Parser;

use wordvox::BATCH_SIZE;
use wordvox::cli::DataDirArgs;
use wordvox::split::{SplitReport, split_file};

#[derive(Parser, Debug)]
#[command(name = "wordvox-split")]
#[command(about = "Split the deduplicated word list into 1000-entry partitions", long_about = None)]
struct Args {
    #[command(flatten)]
    data: DataDirArgs,
}

fn main() -> Result<()> {
    wordvox::logging::init();
    let args = Args::parse();
    let layout = args.data.layout();

    println!("🔍 input:  {}", layout.unique_words_file.display());
    println!("📂 output: {}", layout.split_dir.display());
    println!("📋 entries per file: {BATCH_SIZE}");
    println!("{}", "=".repeat(50));

    let report = split_file(&layout.unique_words_file, &layout.split_dir, BATCH_SIZE)
        .with_context(|| format!("failed to split {}", layout.unique_words_file.display()))?;

    print!("{}", summary_string(&report));
    Ok(())
}

fn summary_string(report: &SplitReport) -> String {
    let mut out = String::new();
    let n = report.partitions.len();

    for (i, p) in report.partitions.iter().enumerate() {
        let pct = (i + 1) as f64 / n as f64 * 100.0;
        out.push_str(&format!(
            "✅ [{:3}/{}] {} - {} entries ({pct:.1}%)\n",
            i + 1,
            n,
            p.file_name,
            p.entries
        ));
    }

    out.push_str(&"=".repeat(50));
    out.push('\n');
    out.push_str(&format!("📁 files written: {n}\n"));
    out.push_str(&format!("📊 entries in:  {}\n", report.total_entries));
    out.push_str(&format!("📊 entries out: {}\n", report.verified_total));
    if report.is_verified() {
        out.push_str("✅ verification passed: counts match\n");
    } else {
        out.push_str("❌ verification failed: counts differ\n");
    }

    if let (Some(first), Some(last)) = (report.partitions.first(), report.partitions.last()) {
        out.push_str("\n📄 samples:\n");
        out.push_str(&format!(
            "   {}: {} entries, first word: {}\n",
            first.file_name,
            first.entries,
            first.first_word.as_deref().unwrap_or("-")
        ));
        out.push_str(&format!(
            "   {}: {} entries, last word: {}\n",
            last.file_name,
            last.entries,
            last.last_word.as_deref().unwrap_or("-")
        ));
    }
    out
}
