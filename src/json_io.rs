//! JSON file helpers shared by every stage.
//!
//! Reads come in two shapes: newline-delimited objects (raw dictionary exports) and plain
//! JSON arrays (our own outputs). Writes always go through a temp file in the destination
//! directory followed by a rename, so a crash mid-write leaves the previous file intact.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::word_entry::WordEntry;
use crate::{Error, Result};

/// Entries decoded from a newline-delimited JSON file.
#[derive(Debug, Default)]
pub struct JsonLines {
    pub entries: Vec<WordEntry>,

    /// Non-blank lines that were not valid JSON objects.
    pub malformed: usize,
}

/// Read one JSON object per line, skipping blank and malformed lines.
pub fn read_json_lines(path: &Path) -> Result<JsonLines> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    let reader = BufReader::new(file);

    let mut out = JsonLines::default();
    for line in reader.lines() {
        let line = line.map_err(|e| Error::io(path, e))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_str::<Value>(line)
            .ok()
            .and_then(WordEntry::from_value)
        {
            Some(entry) => out.entries.push(entry),
            None => out.malformed += 1,
        }
    }

    Ok(out)
}

/// Read a whole JSON document from `path`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_reader(BufReader::new(file)).map_err(|e| Error::json(path, e))
}

/// Read a JSON array of word entries.
pub fn read_entries(path: &Path) -> Result<Vec<WordEntry>> {
    read_json(path)
}

/// Serialize `value` as 2-space indented JSON and move it into place at `path`.
///
/// Non-ASCII text is written as-is.
pub fn write_json_pretty<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| Error::io(dir, e))?;
    {
        let mut writer = BufWriter::new(tmp.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, value).map_err(|e| Error::json(path, e))?;
        writer.flush().map_err(|e| Error::io(path, e))?;
    }
    tmp.as_file().sync_all().map_err(|e| Error::io(path, e))?;

    tmp.persist(path).map_err(|e| Error::io(path, e.error))?;
    Ok(())
}

/// List regular `*.json` files directly inside `dir`, sorted by file name.
pub fn list_json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for dirent in fs::read_dir(dir).map_err(|e| Error::io(dir, e))? {
        let dirent = dirent.map_err(|e| Error::io(dir, e))?;
        let path = dirent.path();
        let is_json = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(".json"));
        if is_json && path.is_file() {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}

/// Create `dir` (and parents) if it does not exist yet.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn json_lines_skip_blank_and_malformed() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("book.json");
        fs::write(
            &path,
            "{\"headWord\": \"cat\"}\n\n  not json\n[1,2]\n{\"headWord\": \"dog\"}\n",
        )?;

        let lines = read_json_lines(&path)?;
        assert_eq!(lines.entries.len(), 2);
        assert_eq!(lines.malformed, 2);
        assert_eq!(lines.entries[1].head_word(), Some("dog"));
        Ok(())
    }

    #[test]
    fn write_json_pretty_indents_and_keeps_unicode() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.json");

        write_json_pretty(&path, &json!([{"headWord": "café"}]))?;

        let text = fs::read_to_string(&path)?;
        assert_eq!(text, "[\n  {\n    \"headWord\": \"café\"\n  }\n]");
        Ok(())
    }

    #[test]
    fn write_json_pretty_overwrites_existing_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("out.json");
        fs::write(&path, "stale contents that are longer than the new ones")?;

        write_json_pretty(&path, &json!([]))?;

        assert_eq!(fs::read_to_string(&path)?, "[]");
        Ok(())
    }

    #[test]
    fn list_json_files_filters_and_sorts() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("b.json"), "[]")?;
        fs::write(dir.path().join("a.json"), "[]")?;
        fs::write(dir.path().join("notes.txt"), "")?;
        fs::create_dir(dir.path().join("nested.json"))?;

        let names: Vec<_> = list_json_files(dir.path())?
            .iter()
            .filter_map(|p| p.file_name().and_then(|n| n.to_str()).map(String::from))
            .collect();
        assert_eq!(names, vec!["a.json", "b.json"]);
        Ok(())
    }

    #[test]
    fn read_entries_reports_bad_json_with_path() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("broken.json");
        fs::write(&path, "[{\"headWord\": ")?;

        let err = read_entries(&path).unwrap_err();
        assert!(matches!(err, Error::Json { .. }));
        assert!(err.to_string().contains("broken.json"));
        Ok(())
    }
}
