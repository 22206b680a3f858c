//! Human-readable rendering of a [`Checkpoint`].

use std::fmt::{self, Write};

use crate::checkpoint::{Checkpoint, FileState, FileStatus};

/// How much per-file detail to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusView {
    /// Every file with its own progress bar.
    Full,
    /// Long completed/pending lists are truncated.
    Brief,
}

const RULE_WIDTH: usize = 70;

/// `[████░░░░] 50.0%`
pub fn progress_bar(percentage: f64, width: usize) -> String {
    let filled = ((width as f64 * percentage / 100.0) as usize).min(width);
    format!(
        "[{}{}] {percentage:.1}%",
        "█".repeat(filled),
        "░".repeat(width - filled)
    )
}

/// `1234567` -> `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

fn file_count(n: usize) -> String {
    if n == 1 {
        "1 file".to_string()
    } else {
        format!("{n} files")
    }
}

pub fn render_status(checkpoint: &Checkpoint, view: StatusView) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_status(&mut out, checkpoint, view);
    out
}

fn write_status(out: &mut String, cp: &Checkpoint, view: StatusView) -> fmt::Result {
    let stats = &cp.statistics;
    let rule = "=".repeat(RULE_WIDTH);

    writeln!(out)?;
    writeln!(out, "{rule}")?;
    writeln!(out, "🎵 Pronunciation downloader - progress")?;
    writeln!(out, "{rule}")?;

    writeln!(out, "📊 Overall:")?;
    writeln!(
        out,
        "   📁 Files:  {} {}/{} ({:.1}%)",
        progress_bar(stats.file_progress(), 30),
        stats.completed_files,
        stats.total_files,
        stats.file_progress()
    )?;
    writeln!(
        out,
        "   🎵 Audio:  {} {}/{} ({:.1}%)",
        progress_bar(stats.audio_progress(), 30),
        stats.downloaded_audios,
        stats.expected_audios(),
        stats.audio_progress()
    )?;

    writeln!(out)?;
    writeln!(out, "📈 Details:")?;
    writeln!(out, "   📝 Total words:       {}", group_thousands(stats.total_words))?;
    writeln!(out, "   🎵 Downloaded clips:  {}", group_thousands(stats.downloaded_audios))?;
    writeln!(out, "   ❌ Failed words:      {}", group_thousands(stats.failed_downloads))?;
    writeln!(out, "   ⏭️  Skipped phrases:   {}", group_thousands(stats.skipped_phrases))?;

    writeln!(out)?;
    writeln!(out, "📋 Files by status:")?;

    let groups = [
        (FileState::Completed, "✅ Completed"),
        (FileState::Processing, "🔄 Processing"),
        (FileState::Failed, "❌ Failed"),
        (FileState::Pending, "⏳ Pending"),
    ];

    for (state, label) in groups {
        let files: Vec<&FileStatus> = cp.files.iter().filter(|f| f.status == state).collect();
        if files.is_empty() {
            continue;
        }

        writeln!(out)?;
        writeln!(out, "   {label} ({}):", file_count(files.len()))?;

        let detailed = view == StatusView::Full
            || matches!(state, FileState::Processing | FileState::Failed);

        if detailed {
            for f in &files {
                write_detailed(out, f)?;
            }
        } else if state == FileState::Completed && files.len() > 5 {
            for f in &files[..3] {
                writeln!(
                    out,
                    "      ✅ {} ({}/{})",
                    f.filename, f.completed_words, f.word_count
                )?;
            }
            if files.len() > 6 {
                writeln!(out, "      ... ({} more files)", files.len() - 6)?;
            }
            for f in &files[files.len() - 3..] {
                writeln!(
                    out,
                    "      ✅ {} ({}/{})",
                    f.filename, f.completed_words, f.word_count
                )?;
            }
        } else if state == FileState::Pending && files.len() > 8 {
            for f in &files[..5] {
                writeln!(out, "      ⏳ {} ({} words)", f.filename, f.word_count)?;
            }
            writeln!(out, "      ... ({} more pending files)", files.len() - 5)?;
        } else {
            for f in &files {
                writeln!(
                    out,
                    "      📄 {} ({}/{} - {:.1}%)",
                    f.filename,
                    f.completed_words,
                    f.word_count,
                    f.progress()
                )?;
            }
        }
    }

    writeln!(out, "{rule}")
}

fn write_detailed(out: &mut String, f: &FileStatus) -> fmt::Result {
    writeln!(
        out,
        "      📄 {} {} {}/{}",
        f.filename,
        progress_bar(f.progress(), 20),
        f.completed_words,
        f.word_count
    )?;
    if let Some(ts) = &f.last_updated {
        writeln!(out, "         ⏰ Last updated: {ts}")?;
    }
    if f.failed_words > 0 {
        writeln!(out, "         ❌ Failed words: {}", f.failed_words)?;
    }
    Ok(())
}
