//! Line-oriented porcelain formats
//!
//! Two shapes share this parser:
//! - `git blame --porcelain`: a commit line opens a context, header lines
//!   fill an accumulator and every tab-prefixed payload line flushes one
//!   record. Headers are printed only the first time git sees a commit, so
//!   they are cached per commit and restored when the commit repeats.
//! - blank-line separated blocks of `key value` lines
//!   (`git worktree list --porcelain`), declared with [`BlockField`]s.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::Record;

static COMMIT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9a-f]{40}|[0-9a-f]{64}) (\d+) (\d+)(?: (\d+))?$")
        .expect("Valid regex pattern")
});

/// Header names in the order git prints them, paired with record keys
const BLAME_HEADERS: &[(&str, &str)] = &[
    ("author", "author"),
    ("author-mail", "author_mail"),
    ("author-time", "author_time"),
    ("author-tz", "author_tz"),
    ("committer", "committer"),
    ("committer-mail", "committer_mail"),
    ("committer-time", "committer_time"),
    ("committer-tz", "committer_tz"),
    ("summary", "summary"),
    ("previous", "previous"),
    ("filename", "filename"),
];

/// A field of a porcelain block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockField {
    /// `name value`, defaults to an empty string
    Text {
        name: &'static str,
        key: &'static str,
    },
    /// Bare `name` (optionally followed by a reason), defaults to false
    Flag {
        name: &'static str,
        key: &'static str,
    },
}

impl BlockField {
    fn name(&self) -> &'static str {
        match self {
            BlockField::Text { name, .. } | BlockField::Flag { name, .. } => name,
        }
    }

    fn key(&self) -> &'static str {
        match self {
            BlockField::Text { key, .. } | BlockField::Flag { key, .. } => key,
        }
    }

    fn default_value(&self) -> Value {
        match self {
            BlockField::Text { .. } => Value::from(""),
            BlockField::Flag { .. } => Value::from(false),
        }
    }
}

/// `git worktree list --porcelain`; the first field opens each block
pub const WORKTREE_FIELDS: &[BlockField] = &[
    BlockField::Text {
        name: "worktree",
        key: "path",
    },
    BlockField::Text {
        name: "HEAD",
        key: "head",
    },
    BlockField::Text {
        name: "branch",
        key: "branch",
    },
    BlockField::Flag {
        name: "detached",
        key: "detached",
    },
    BlockField::Flag {
        name: "bare",
        key: "bare",
    },
    BlockField::Flag {
        name: "locked",
        key: "locked",
    },
    BlockField::Flag {
        name: "prunable",
        key: "prunable",
    },
];

#[derive(Debug, Clone, Copy)]
enum Mode {
    Blame,
    Blocks(&'static [BlockField]),
}

#[derive(Debug, Clone, Copy)]
pub struct PorcelainParser {
    mode: Mode,
}

impl PorcelainParser {
    pub fn blame() -> Self {
        Self { mode: Mode::Blame }
    }

    pub fn blocks(fields: &'static [BlockField]) -> Self {
        Self {
            mode: Mode::Blocks(fields),
        }
    }

    pub fn parse(&self, output: &str) -> Vec<Record> {
        match self.mode {
            Mode::Blame => parse_blame(output),
            Mode::Blocks(fields) => parse_blocks(output, fields),
        }
    }
}

#[derive(Debug, Clone, Default)]
struct CommitHeaders {
    values: HashMap<&'static str, String>,
    boundary: bool,
}

#[derive(Debug, Default)]
struct BlameState {
    commit: String,
    original_line: Option<i64>,
    final_line: Option<i64>,
    headers: CommitHeaders,
    seen: HashMap<String, CommitHeaders>,
    /// A commit or header line arrived and no payload has consumed it yet
    dirty: bool,
    records: Vec<Record>,
}

impl BlameState {
    fn start_commit(&mut self, commit: &str, original: Option<i64>, final_line: Option<i64>) {
        if self.dirty {
            self.flush(String::new());
        }
        self.commit = commit.to_string();
        self.original_line = original;
        self.final_line = final_line;
        self.headers = self.seen.get(commit).cloned().unwrap_or_default();
        self.dirty = true;
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if name == "boundary" {
            self.headers.boundary = true;
        } else if let Some((_, key)) = BLAME_HEADERS.iter().find(|(n, _)| *n == name) {
            self.headers.values.insert(*key, value.to_string());
        } else {
            return;
        }
        self.dirty = true;
    }

    fn flush(&mut self, content: String) {
        let mut record = Record::new()
            .with("line_number", self.final_line)
            .with("original_line", self.original_line)
            .with("commit", self.commit.as_str());
        for (_, key) in BLAME_HEADERS {
            let value = self.headers.values.get(key).cloned().unwrap_or_default();
            record.insert(key, value);
        }
        record.insert("boundary", self.headers.boundary);
        record.insert("content", content);
        self.records.push(record);

        if !self.commit.is_empty() {
            self.seen.insert(self.commit.clone(), self.headers.clone());
        }
        self.dirty = false;
    }
}

fn parse_blame(output: &str) -> Vec<Record> {
    let mut state = BlameState::default();

    for line in output.lines() {
        if let Some(payload) = line.strip_prefix('\t') {
            state.flush(payload.to_string());
            continue;
        }

        if let Some(caps) = COMMIT_LINE.captures(line) {
            let number = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<i64>().ok());
            state.start_commit(&caps[1], number(2), number(3));
            continue;
        }

        let (name, value) = line.split_once(' ').unwrap_or((line, ""));
        state.set_header(name, value);
    }

    if state.dirty {
        state.flush(String::new());
    }

    state.records
}

/// Render blame records back into porcelain, printing a commit's headers
/// only on its first appearance the way git does.
pub fn to_porcelain(records: &[Record]) -> String {
    let mut out = String::new();
    let mut printed: Vec<&str> = Vec::new();

    for record in records {
        let commit = record.get_str("commit").unwrap_or("");
        if !commit.is_empty() {
            let original = record.get_i64("original_line").unwrap_or(0);
            let final_line = record.get_i64("line_number").unwrap_or(0);
            out.push_str(&format!("{commit} {original} {final_line}\n"));

            if !printed.contains(&commit) {
                printed.push(commit);
                for (name, key) in BLAME_HEADERS {
                    match record.get_str(key) {
                        Some(value) if !value.is_empty() => {
                            out.push_str(&format!("{name} {value}\n"));
                        }
                        _ => {}
                    }
                }
                if record.get("boundary") == Some(&Value::Bool(true)) {
                    out.push_str("boundary\n");
                }
            }
        }

        out.push('\t');
        out.push_str(record.get_str("content").unwrap_or(""));
        out.push('\n');
    }

    out
}

fn parse_blocks(output: &str, fields: &'static [BlockField]) -> Vec<Record> {
    let Some(start) = fields.first() else {
        return Vec::new();
    };

    let empty_block = || {
        let mut record = Record::new();
        for field in fields {
            record.insert(field.key(), field.default_value());
        }
        record
    };

    let mut records = Vec::new();
    let mut current = empty_block();
    let mut dirty = false;

    for line in output.lines() {
        let line = line.trim_end();
        if line.is_empty() {
            if dirty {
                records.push(std::mem::replace(&mut current, empty_block()));
                dirty = false;
            }
            continue;
        }

        let (name, value) = line.split_once(' ').unwrap_or((line, ""));
        let Some(field) = fields.iter().find(|f| f.name() == name) else {
            continue;
        };

        if dirty && field.name() == start.name() {
            records.push(std::mem::replace(&mut current, empty_block()));
        }

        match field {
            BlockField::Text { key, .. } => current.insert(key, value),
            BlockField::Flag { key, .. } => current.insert(key, true),
        }
        dirty = true;
    }

    if dirty {
        records.push(current);
    }

    records
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    struct CommitInfo {
        sha: String,
        author: String,
        summary: String,
        boundary: bool,
    }

    fn commit_strategy() -> impl Strategy<Value = CommitInfo> {
        (
            "[0-9a-f]{40}",
            "[A-Za-z][A-Za-z ]{0,15}",
            "[A-Za-z0-9 ,.:()-]{0,30}",
            any::<bool>(),
        )
            .prop_map(|(sha, author, summary, boundary)| CommitInfo {
                sha,
                author,
                summary,
                boundary,
            })
    }

    fn blame_records() -> impl Strategy<Value = Vec<Record>> {
        prop::collection::vec(commit_strategy(), 1..4).prop_flat_map(|commits| {
            let count = commits.len();
            prop::collection::vec(
                (0..count, "[A-Za-z0-9 _.;(){}=\t-]{0,40}"),
                1..12,
            )
            .prop_map(move |lines| {
                lines
                    .into_iter()
                    .enumerate()
                    .map(|(i, (idx, content))| {
                        let commit = &commits[idx];
                        let line = i as i64 + 1;
                        let mut record = Record::new()
                            .with("line_number", line)
                            .with("original_line", line)
                            .with("commit", commit.sha.as_str());
                        for (_, key) in BLAME_HEADERS {
                            record.insert(key, "");
                        }
                        record.insert("author", commit.author.as_str());
                        record.insert("summary", commit.summary.as_str());
                        record.insert("boundary", commit.boundary);
                        record.insert("content", content);
                        record
                    })
                    .collect()
            })
        })
    }

    proptest! {
        #[test]
        fn prop_porcelain_round_trip(records in blame_records()) {
            let rendered = to_porcelain(&records);
            let reparsed = PorcelainParser::blame().parse(&rendered);
            prop_assert_eq!(records, reparsed);
        }

        #[test]
        fn prop_blame_parser_is_total(output in ".*") {
            let records = PorcelainParser::blame().parse(&output);
            for record in records {
                prop_assert!(record.get("content").is_some());
            }
        }

        #[test]
        fn prop_blocks_parser_is_total(output in "(worktree|HEAD|branch|bare|\n| |[a-z/])*") {
            let records = PorcelainParser::blocks(WORKTREE_FIELDS).parse(&output);
            for record in records {
                prop_assert_eq!(record.len(), WORKTREE_FIELDS.len());
            }
        }
    }
}
