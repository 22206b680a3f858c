use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const HEAD_WORD_KEY: &str = "headWord";
pub const WORD_RANK_KEY: &str = "wordRank";

/// A single dictionary entry.
///
/// We only ever look at `headWord` and `wordRank`; every other field is carried through
/// untouched (and in its original key order) so downstream consumers see the upstream record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WordEntry {
    fields: Map<String, Value>,
}

impl WordEntry {
    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Accept a decoded JSON value if it is an object.
    pub fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Object(fields) => Some(Self { fields }),
            _ => None,
        }
    }

    /// The raw `headWord`, if present and a string.
    pub fn head_word(&self) -> Option<&str> {
        self.fields.get(HEAD_WORD_KEY).and_then(Value::as_str)
    }

    /// Case-insensitive dedup key. `None` for missing or empty head words.
    pub fn key(&self) -> Option<String> {
        self.head_word()
            .filter(|w| !w.is_empty())
            .map(str::to_lowercase)
    }

    /// The entry's current rank, when it carries a numeric one.
    pub fn rank(&self) -> Option<f64> {
        self.fields.get(WORD_RANK_KEY).and_then(Value::as_f64)
    }

    pub fn set_rank(&mut self, rank: usize) {
        self.fields
            .insert(WORD_RANK_KEY.to_string(), Value::from(rank));
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }
}

/// Overwrite `wordRank` with the 1-based position of each entry.
pub fn renumber(entries: &mut [WordEntry]) {
    for (i, entry) in entries.iter_mut().enumerate() {
        entry.set_rank(i + 1);
    }
}
