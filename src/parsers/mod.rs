//! Output dialect parsers
//!
//! Each parser turns the complete stdout of one tool call into an ordered
//! list of [`Record`]s. Parsers never fail: lines they cannot understand are
//! skipped or kept as partial records, so the number of records is the
//! measure of how much of the output was understood.

pub mod freetext;
pub mod json;
pub mod key_value;
pub mod lines;
pub mod porcelain;
pub mod search;
pub mod status;
pub mod tabular;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use porcelain::{BlockField, PorcelainParser};
pub use search::SearchMode;
pub use tabular::{Column, TableSpec};

/// One structured unit of tool output
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Builder-style insert
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: &str, value: impl Into<Value>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a field, `None` when absent or not a string
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Which parser an operation's stdout goes through
#[derive(Debug, Clone)]
pub enum OutputDialect {
    /// Output carries no structure worth keeping (mutating commands)
    Discard,
    /// One record per non-empty line
    Lines,
    /// git clean `Would remove` / `Removing` lines
    Removals,
    Tabular(TableSpec),
    JsonLines,
    /// A single JSON array or object; `items_key` selects a nested array
    JsonDocument { items_key: Option<&'static str> },
    KeyValue,
    /// git blame --porcelain
    Blame,
    /// Blank-line separated `key value` blocks
    Blocks(&'static [BlockField]),
    /// git log / git show in medium or fuller format
    CommitLog,
    /// git log --oneline
    OneLineLog,
    Search {
        mode: SearchMode,
        revision: Option<String>,
    },
    /// git status --porcelain=v1
    Status,
    /// git diff --name-status
    NameStatus,
}

impl OutputDialect {
    pub fn name(&self) -> &'static str {
        match self {
            OutputDialect::Discard => "discard",
            OutputDialect::Lines => "lines",
            OutputDialect::Removals => "removals",
            OutputDialect::Tabular(_) => "tabular",
            OutputDialect::JsonLines => "json_lines",
            OutputDialect::JsonDocument { .. } => "json_document",
            OutputDialect::KeyValue => "key_value",
            OutputDialect::Blame => "blame_porcelain",
            OutputDialect::Blocks(_) => "porcelain_blocks",
            OutputDialect::CommitLog => "commit_log",
            OutputDialect::OneLineLog => "oneline_log",
            OutputDialect::Search { .. } => "search",
            OutputDialect::Status => "status",
            OutputDialect::NameStatus => "name_status",
        }
    }

    pub fn parse(&self, stdout: &str) -> Vec<Record> {
        match self {
            OutputDialect::Discard => Vec::new(),
            OutputDialect::Lines => lines::parse_lines(stdout),
            OutputDialect::Removals => lines::parse_removals(stdout),
            OutputDialect::Tabular(spec) => tabular::parse_table(stdout, spec),
            OutputDialect::JsonLines => json::parse_json_lines(stdout),
            OutputDialect::JsonDocument { items_key } => {
                json::parse_json_document(stdout, *items_key)
            }
            OutputDialect::KeyValue => key_value::parse_key_values(stdout),
            OutputDialect::Blame => PorcelainParser::blame().parse(stdout),
            OutputDialect::Blocks(fields) => PorcelainParser::blocks(fields).parse(stdout),
            OutputDialect::CommitLog => freetext::parse_commit_log(stdout),
            OutputDialect::OneLineLog => freetext::parse_oneline_log(stdout),
            OutputDialect::Search { mode, revision } => {
                search::parse_search_output(stdout, *mode, revision.as_deref())
            }
            OutputDialect::Status => status::parse_status_output(stdout),
            OutputDialect::NameStatus => status::parse_name_status(stdout),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_builder_and_accessors() {
        let record = Record::new()
            .with("file", "a.txt")
            .with("line", 3)
            .with("missing", Value::Null);

        assert_eq!(record.get_str("file"), Some("a.txt"));
        assert_eq!(record.get_i64("line"), Some(3));
        assert_eq!(record.get_str("line"), None);
        assert_eq!(record.len(), 3);
        assert_eq!(
            serde_json::to_value(&record).unwrap(),
            json!({"file": "a.txt", "line": 3, "missing": null})
        );
    }

    #[test]
    fn test_empty_output_yields_no_records_for_every_dialect() {
        let dialects = vec![
            OutputDialect::Discard,
            OutputDialect::Lines,
            OutputDialect::Removals,
            OutputDialect::Tabular(tabular::docker_search_table()),
            OutputDialect::JsonLines,
            OutputDialect::JsonDocument { items_key: None },
            OutputDialect::KeyValue,
            OutputDialect::Blame,
            OutputDialect::Blocks(porcelain::WORKTREE_FIELDS),
            OutputDialect::CommitLog,
            OutputDialect::OneLineLog,
            OutputDialect::Search {
                mode: SearchMode::Matches { line_numbers: true },
                revision: None,
            },
            OutputDialect::Status,
            OutputDialect::NameStatus,
        ];

        for dialect in dialects {
            assert!(
                dialect.parse("").is_empty(),
                "{} produced records from empty output",
                dialect.name()
            );
        }
    }
}
