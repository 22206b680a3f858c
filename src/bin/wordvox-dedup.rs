// Merge newline-delimited dictionary exports into a single ranked `unique_words.json`.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use wordvox::Error;
use wordvox::cli::DataDirArgs;
use wordvox::dedup::{DedupReport, deduplicate_dir};

#[derive(Parser, Debug)]
#[command(name = "wordvox-dedup")]
#[command(about = "Deduplicate word entries across JSON dictionary exports", long_about = None)]
struct Args {
    /// Directory holding the `*.json` exports (one JSON object per line).
    #[arg(short = 'i', long = "input-dir", default_value = ".")]
    input_dir: PathBuf,

    #[command(flatten)]
    data: DataDirArgs,
}

fn main() -> Result<()> {
    wordvox::logging::init();
    let args = Args::parse();
    let output = args.data.layout().unique_words_file;

    println!("🔍 scanning {}", args.input_dir.display());
    println!("{}", "=".repeat(50));

    let report = match deduplicate_dir(&args.input_dir, &output) {
        Ok(report) => report,
        Err(Error::NoInputFiles(dir)) => {
            println!("⚠️  no JSON files found in {}", dir.display());
            return Ok(());
        }
        Err(err) => {
            return Err(err)
                .with_context(|| format!("deduplication into {} failed", output.display()));
        }
    };

    print!("{}", summary_string(&report));
    Ok(())
}

fn summary_string(report: &DedupReport) -> String {
    let mut out = String::new();
    let total = report.files.len() + report.skipped.len();

    for (i, f) in report.files.iter().enumerate() {
        out.push_str(&format!(
            "[{}/{}] {}: {} entries, {} new unique",
            i + 1,
            total,
            f.path.display(),
            f.entries,
            f.new_unique
        ));
        if f.malformed > 0 {
            out.push_str(&format!(", {} malformed lines skipped", f.malformed));
        }
        out.push('\n');
    }
    for s in &report.skipped {
        out.push_str(&format!("❌ skipped {}: {}\n", s.path.display(), s.reason));
    }

    out.push_str(&"=".repeat(50));
    out.push('\n');
    out.push_str("✨ done\n");
    out.push_str(&format!("📁 files processed: {}\n", total));
    out.push_str(&format!("📊 entries read:    {}\n", report.total_entries));
    out.push_str(&format!("🎯 unique entries:  {}\n", report.unique_entries));
    out.push_str(&format!(
        "🗂️  duplicate ratio: {:.1}%\n",
        report.duplicate_ratio()
    ));
    out.push_str(&format!("💾 saved to {}\n", report.output_file.display()));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordvox::dedup::{DedupFileReport, SkippedFile};

    #[test]
    fn summary_lists_files_and_totals() {
        let report = DedupReport {
            files: vec![DedupFileReport {
                path: PathBuf::from("cet4.json"),
                entries: 4,
                new_unique: 3,
                malformed: 1,
            }],
            skipped: vec![SkippedFile {
                path: PathBuf::from("bad.json"),
                reason: "permission denied".to_string(),
            }],
            total_entries: 4,
            unique_entries: 3,
            output_file: PathBuf::from("/tmp/unique_words.json"),
        };

        let text = summary_string(&report);
        assert!(text.contains("[1/2] cet4.json: 4 entries, 3 new unique, 1 malformed lines skipped"));
        assert!(text.contains("❌ skipped bad.json: permission denied"));
        assert!(text.contains("duplicate ratio: 25.0%"));
    }

    #[test]
    fn args_default_to_current_dir() {
        let args = Args::try_parse_from(["wordvox-dedup"]).expect("parse");
        assert_eq!(args.input_dir, PathBuf::from("."));
    }
}
