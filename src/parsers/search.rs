use serde_json::Value;

use super::Record;

/// Shape of `git grep` output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// `file:line:content` with `-n`, `file:content` without
    Matches { line_numbers: bool },
    /// `file:count` (`--count`)
    Count,
    /// `file` (`--name-only` / `-l`)
    NameOnly,
}

/// Parse search output into `{file, line, content, count}` records.
///
/// When searching a revision git prefixes every line with `<rev>:`; that
/// prefix is stripped when `revision` is given. In count mode a line whose
/// suffix is not an integer is parsed as a match line instead.
pub fn parse_search_output(output: &str, mode: SearchMode, revision: Option<&str>) -> Vec<Record> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter(|line| !line.starts_with("Binary file "))
        .map(|line| strip_revision(line, revision))
        .map(|line| match mode {
            SearchMode::NameOnly => entry(line.trim(), None, "", None),
            SearchMode::Count => parse_count_line(line),
            SearchMode::Matches { line_numbers } => parse_match_line(line, line_numbers),
        })
        .collect()
}

fn strip_revision<'a>(line: &'a str, revision: Option<&str>) -> &'a str {
    revision
        .filter(|rev| !rev.is_empty())
        .and_then(|rev| line.strip_prefix(rev))
        .and_then(|rest| rest.strip_prefix(':'))
        .unwrap_or(line)
}

fn entry(file: &str, line: Option<i64>, content: &str, count: Option<i64>) -> Record {
    Record::new()
        .with("file", file)
        .with("line", line)
        .with("content", content)
        .with("count", count)
}

fn parse_count_line(line: &str) -> Record {
    match line.rsplit_once(':') {
        Some((file, count)) => match count.trim().parse::<i64>() {
            Ok(count) => entry(file, None, "", Some(count)),
            Err(_) => parse_match_line(line, false),
        },
        None => parse_match_line(line, false),
    }
}

fn parse_match_line(line: &str, line_numbers: bool) -> Record {
    let Some((file, rest)) = line.split_once(':') else {
        return entry(line.trim(), None, "", None);
    };

    if line_numbers {
        if let Some((number, content)) = rest.split_once(':') {
            if let Ok(number) = number.parse::<i64>() {
                return entry(file, Some(number), content.trim_start(), None);
            }
        }
    }

    entry(file, None, rest.trim_start(), None)
}

/// Distinct files with at least one match, in first-seen order
pub fn files_with_matches(records: &[Record]) -> Vec<String> {
    let mut files: Vec<String> = Vec::new();
    for record in records {
        let matched = match record.get("count") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or(0) > 0,
            _ => true,
        };
        if !matched {
            continue;
        }
        if let Some(file) = record.get_str("file") {
            if !files.iter().any(|f| f == file) {
                files.push(file.to_string());
            }
        }
    }
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_mode_falls_back_to_matches() {
        let output = "a.txt: line one\na.txt: line two\nb.txt: line three\n";
        let records = parse_search_output(output, SearchMode::Count, None);

        assert_eq!(records.len(), 3);
        assert_eq!(files_with_matches(&records), vec!["a.txt", "b.txt"]);
        assert_eq!(records[0].get_str("content"), Some("line one"));
        assert_eq!(records[0].get("count"), Some(&Value::Null));
    }

    #[test]
    fn test_count_mode() {
        let records = parse_search_output("src/a.rs:3\nsrc/b.rs:0\n", SearchMode::Count, None);

        assert_eq!(records[0].get_str("file"), Some("src/a.rs"));
        assert_eq!(records[0].get_i64("count"), Some(3));
        assert_eq!(files_with_matches(&records), vec!["src/a.rs"]);
    }

    #[test]
    fn test_matches_with_line_numbers() {
        let output = "src/lib.rs:12:    let x = a::b;\nsrc/lib.rs:40:fn main() {}\n";
        let records = parse_search_output(output, SearchMode::Matches { line_numbers: true }, None);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_i64("line"), Some(12));
        assert_eq!(records[0].get_str("content"), Some("let x = a::b;"));
        assert_eq!(records[1].get_str("file"), Some("src/lib.rs"));
    }

    #[test]
    fn test_matches_without_line_numbers_keep_colons_in_content() {
        let records = parse_search_output(
            "README.md:see http://example.com\n",
            SearchMode::Matches { line_numbers: false },
            None,
        );
        assert_eq!(records[0].get_str("file"), Some("README.md"));
        assert_eq!(records[0].get_str("content"), Some("see http://example.com"));
        assert_eq!(records[0].get("line"), Some(&Value::Null));
    }

    #[test]
    fn test_missing_line_number_falls_back() {
        let records = parse_search_output(
            "notes.txt:todo: write docs\n",
            SearchMode::Matches { line_numbers: true },
            None,
        );
        assert_eq!(records[0].get("line"), Some(&Value::Null));
        assert_eq!(records[0].get_str("content"), Some("todo: write docs"));
    }

    #[test]
    fn test_revision_prefix_is_stripped() {
        let records = parse_search_output(
            "HEAD~1:src/lib.rs:5:needle\n",
            SearchMode::Matches { line_numbers: true },
            Some("HEAD~1"),
        );
        assert_eq!(records[0].get_str("file"), Some("src/lib.rs"));
        assert_eq!(records[0].get_i64("line"), Some(5));
    }

    #[test]
    fn test_name_only() {
        let records = parse_search_output("a.txt\nb.txt\n", SearchMode::NameOnly, None);
        assert_eq!(files_with_matches(&records), vec!["a.txt", "b.txt"]);
        assert_eq!(records[0].get_str("content"), Some(""));
    }
}

#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn mode_strategy() -> impl Strategy<Value = SearchMode> {
        prop_oneof![
            Just(SearchMode::Count),
            Just(SearchMode::NameOnly),
            any::<bool>().prop_map(|line_numbers| SearchMode::Matches { line_numbers }),
        ]
    }

    proptest! {
        #[test]
        fn prop_search_key_set_is_stable(output in ".*", mode in mode_strategy()) {
            for record in parse_search_output(&output, mode, None) {
                let mut keys: Vec<&str> = record.keys().collect();
                keys.sort_unstable();
                prop_assert_eq!(keys, vec!["content", "count", "file", "line"]);
            }
        }
    }
}
