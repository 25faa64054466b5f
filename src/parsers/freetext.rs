//! git log / git show in the default (medium) and fuller formats
//!
//! A small state machine walks the output: non-indented `Key: value` lines
//! are headers, indented lines form the message, and `diff --git` switches to
//! diff mode until the next entry starts. Annotated tag views print their
//! message without indentation, so for tags every body line is message.

use serde_json::Value;

use super::Record;

const HEADER_KEYS: &[(&str, &str)] = &[
    ("Merge", "merge"),
    ("Author", "author"),
    ("AuthorDate", "author_date"),
    ("Commit", "committer"),
    ("CommitDate", "commit_date"),
    ("Tagger", "tagger"),
    ("Date", "date"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Header,
    Body,
    Diff,
}

#[derive(Debug, Default)]
struct Entry {
    kind: &'static str,
    hash: String,
    tag: String,
    object: String,
    headers: Vec<(&'static str, String)>,
    message: Vec<String>,
    files: Vec<String>,
    diff: Vec<String>,
}

impl Entry {
    fn commit(hash: &str) -> Self {
        Self {
            kind: "commit",
            hash: hash.to_string(),
            ..Default::default()
        }
    }

    fn tag(name: &str) -> Self {
        Self {
            kind: "tag",
            tag: name.to_string(),
            ..Default::default()
        }
    }

    fn add_file(&mut self, path: &str) {
        let path = path.trim();
        if !path.is_empty() && !self.files.iter().any(|f| f == path) {
            self.files.push(path.to_string());
        }
    }

    fn into_record(self) -> Record {
        let mut record = Record::new()
            .with("kind", self.kind)
            .with("hash", self.hash)
            .with("tag", self.tag)
            .with("object", self.object);

        for (_, key) in HEADER_KEYS {
            let value = self
                .headers
                .iter()
                .rev()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.clone())
                .unwrap_or_default();
            record.insert(key, value);
        }

        let start = self.message.iter().position(|l| !l.trim().is_empty());
        let end = self.message.iter().rposition(|l| !l.trim().is_empty());
        let message = match (start, end) {
            (Some(start), Some(end)) => self.message[start..=end].join("\n"),
            _ => String::new(),
        };

        record.insert("message", message);
        record.insert(
            "files_changed",
            Value::Array(self.files.into_iter().map(Value::from).collect()),
        );
        record.insert("diff", self.diff.join("\n"));
        record
    }
}

struct LogParser {
    current: Option<Entry>,
    section: Section,
    records: Vec<Record>,
}

impl LogParser {
    fn new() -> Self {
        Self {
            current: None,
            section: Section::Header,
            records: Vec::new(),
        }
    }

    fn start(&mut self, entry: Entry) {
        self.finish_entry();
        self.current = Some(entry);
        self.section = Section::Header;
    }

    fn finish_entry(&mut self) {
        if let Some(entry) = self.current.take() {
            self.records.push(entry.into_record());
        }
    }

    fn feed(&mut self, line: &str) {
        if let Some(hash) = line
            .strip_prefix("commit ")
            .and_then(|rest| rest.split_whitespace().next())
            .filter(|hash| hash.chars().all(|c| c.is_ascii_hexdigit()))
        {
            self.start(Entry::commit(hash));
            return;
        }

        let in_tag_body = matches!(&self.current, Some(e) if e.kind == "tag")
            && self.section == Section::Body;
        if !in_tag_body {
            if let Some(name) = line.strip_prefix("tag ") {
                self.start(Entry::tag(name.trim()));
                return;
            }
        }

        let section = self.section;
        let Some(entry) = self.current.as_mut() else {
            return;
        };

        if let Some(rest) = line.strip_prefix("diff --git ") {
            self.section = Section::Diff;
            if let Some((_, b_path)) = rest.rsplit_once(" b/") {
                entry.add_file(b_path);
            }
            entry.diff.push(line.to_string());
            return;
        }

        match section {
            Section::Diff => entry.diff.push(line.to_string()),
            Section::Header => {
                if line.trim().is_empty() {
                    self.section = Section::Body;
                } else if let Some(body) = line.strip_prefix("    ") {
                    entry.message.push(body.to_string());
                    self.section = Section::Body;
                } else if let Some(object) = line.strip_prefix("object ") {
                    entry.object = object.trim().to_string();
                } else if let Some(tagger) = line.strip_prefix("tagger ") {
                    entry.headers.push(("tagger", tagger.trim().to_string()));
                } else if let Some((name, value)) = line.split_once(':') {
                    if let Some((_, key)) = HEADER_KEYS.iter().find(|(n, _)| *n == name) {
                        entry.headers.push((*key, value.trim().to_string()));
                    }
                }
            }
            Section::Body => {
                if let Some(body) = line.strip_prefix("    ") {
                    entry.message.push(body.to_string());
                } else if line.trim().is_empty() {
                    entry.message.push(String::new());
                } else if entry.kind == "tag" {
                    entry.message.push(line.to_string());
                } else {
                    collect_file_line(entry, line);
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Record> {
        self.finish_entry();
        self.records
    }
}

/// Non-message lines after a commit body: `--stat`, `--name-only`,
/// `--name-status` and `--numstat` listings.
fn collect_file_line(entry: &mut Entry, line: &str) {
    if line.contains(" changed,") || line.trim_end().ends_with(" changed") {
        return;
    }
    if line.starts_with(' ') {
        if let Some((path, _)) = line.split_once(" | ") {
            entry.add_file(path);
        }
        return;
    }
    match line.rsplit_once('\t') {
        Some((_, path)) => entry.add_file(path),
        None => entry.add_file(line),
    }
}

/// Parse detailed `git log` / `git show` output, one record per commit or tag
pub fn parse_commit_log(output: &str) -> Vec<Record> {
    let mut parser = LogParser::new();
    for line in output.lines() {
        parser.feed(line);
    }
    parser.finish()
}

/// Parse `git log --oneline`: `<hash> <message>` per line
pub fn parse_oneline_log(output: &str) -> Vec<Record> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| {
            let (hash, message) = line.split_once(' ').unwrap_or((line, ""));
            Record::new().with("hash", hash).with("message", message.trim())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
commit 1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b (HEAD -> main)
Merge: 1111111 2222222
Author: Ada Lovelace <ada@example.com>
Date:   Mon Jan 1 00:00:00 2024 +0000

    Merge branch 'feature'

    Second paragraph.

commit ffffffffffffffffffffffffffffffffffffffff
Author: Grace Hopper <grace@example.com>
Date:   Sun Dec 31 00:00:00 2023 +0000

    Initial commit
";

    #[test]
    fn test_parse_commit_log_entries() {
        let records = parse_commit_log(LOG);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("kind"), Some("commit"));
        assert_eq!(
            records[0].get_str("hash"),
            Some("1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b")
        );
        assert_eq!(records[0].get_str("merge"), Some("1111111 2222222"));
        assert_eq!(
            records[0].get_str("author"),
            Some("Ada Lovelace <ada@example.com>")
        );
        assert_eq!(
            records[0].get_str("date"),
            Some("Mon Jan 1 00:00:00 2024 +0000")
        );
        assert_eq!(
            records[0].get_str("message"),
            Some("Merge branch 'feature'\n\nSecond paragraph.")
        );
        assert_eq!(records[1].get_str("merge"), Some(""));
        assert_eq!(records[1].get_str("message"), Some("Initial commit"));
    }

    #[test]
    fn test_show_with_diff_collects_files() {
        let output = "\
commit 1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b
Author: Ada Lovelace <ada@example.com>
Date:   Mon Jan 1 00:00:00 2024 +0000

    Touch two files

diff --git a/src/lib.rs b/src/lib.rs
index 000..111 100644
--- a/src/lib.rs
+++ b/src/lib.rs
@@ -1 +1 @@
-old
+new
diff --git a/README.md b/README.md
new file mode 100644
";
        let records = parse_commit_log(output);

        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].get("files_changed"),
            Some(&serde_json::json!(["src/lib.rs", "README.md"]))
        );
        assert_eq!(records[0].get_str("message"), Some("Touch two files"));
        let diff = records[0].get_str("diff").unwrap();
        assert!(diff.starts_with("diff --git a/src/lib.rs"));
        assert!(diff.contains("+new"));
    }

    #[test]
    fn test_annotated_tag_view() {
        let output = "\
tag v1.0.0
Tagger: Ada Lovelace <ada@example.com>
Date:   Mon Jan 1 00:00:00 2024 +0000

Release 1.0.0
tag line inside message

commit 1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b
Author: Ada Lovelace <ada@example.com>
Date:   Mon Jan 1 00:00:00 2024 +0000

    Prepare release
";
        let records = parse_commit_log(output);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("kind"), Some("tag"));
        assert_eq!(records[0].get_str("tag"), Some("v1.0.0"));
        assert_eq!(
            records[0].get_str("tagger"),
            Some("Ada Lovelace <ada@example.com>")
        );
        assert_eq!(
            records[0].get_str("message"),
            Some("Release 1.0.0\ntag line inside message")
        );
        assert_eq!(records[1].get_str("kind"), Some("commit"));
    }

    #[test]
    fn test_stat_and_name_only_listings() {
        let output = "\
commit 1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b
Author: Ada Lovelace <ada@example.com>

    Stat view

 src/lib.rs | 2 +-
 1 file changed, 1 insertion(+), 1 deletion(-)

commit ffffffffffffffffffffffffffffffffffffffff
Author: Ada Lovelace <ada@example.com>

    Name only

docs/guide.md
M\tsrc/main.rs
";
        let records = parse_commit_log(output);

        assert_eq!(
            records[0].get("files_changed"),
            Some(&serde_json::json!(["src/lib.rs"]))
        );
        assert_eq!(
            records[1].get("files_changed"),
            Some(&serde_json::json!(["docs/guide.md", "src/main.rs"]))
        );
    }

    #[test]
    fn test_fuller_format_headers() {
        let output = "\
commit 1a2b3c4d5e6f7a8b9c0d1e2f3a4b5c6d7e8f9a0b
Author:     Ada Lovelace <ada@example.com>
AuthorDate: Mon Jan 1 00:00:00 2024 +0000
Commit:     Grace Hopper <grace@example.com>
CommitDate: Tue Jan 2 00:00:00 2024 +0000

    Fuller
";
        let records = parse_commit_log(output);
        assert_eq!(
            records[0].get_str("committer"),
            Some("Grace Hopper <grace@example.com>")
        );
        assert_eq!(
            records[0].get_str("commit_date"),
            Some("Tue Jan 2 00:00:00 2024 +0000")
        );
    }

    #[test]
    fn test_text_before_first_entry_is_ignored() {
        let records = parse_commit_log("warning: something\n\n");
        assert!(records.is_empty());
    }

    #[test]
    fn test_oneline_log() {
        let records = parse_oneline_log("1a2b3c4 Fix the thing\nffffff0 (tag: v1) Release\nabc\n");

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].get_str("hash"), Some("1a2b3c4"));
        assert_eq!(records[0].get_str("message"), Some("Fix the thing"));
        assert_eq!(records[1].get_str("message"), Some("(tag: v1) Release"));
        assert_eq!(records[2].get_str("message"), Some(""));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn prop_commit_log_key_set_is_stable(output in "(commit [0-9a-f]{7}\n|tag v1\n|Author: x\n|    msg\n|\n|diff --git a/x b/x\n|[ -~]{0,20}\n)*") {
            let records = parse_commit_log(&output);
            for record in &records {
                prop_assert_eq!(record.len(), 4 + HEADER_KEYS.len() + 3);
            }
        }
    }
}
