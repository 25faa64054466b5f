use super::Record;

/// One record per non-empty line, field `value`
pub fn parse_lines(output: &str) -> Vec<Record> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| Record::new().with("value", line))
        .collect()
}

/// The `value` fields of a line list, in order
pub fn values(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get_str("value"))
        .map(str::to_string)
        .collect()
}

/// `git clean` reports (`Would remove x`, `Removing dir/`) as
/// `{path, kind}` where kind is `file` or `directory`
pub fn parse_removals(output: &str) -> Vec<Record> {
    output
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            line.strip_prefix("Would remove ")
                .or_else(|| line.strip_prefix("Removing "))
        })
        .map(|path| match path.strip_suffix('/') {
            Some(dir) => Record::new().with("path", dir).with("kind", "directory"),
            None => Record::new().with("path", path).with("kind", "file"),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lines_skips_blank_lines() {
        let records = parse_lines("a.txt\n\n  b.txt  \r\n");
        assert_eq!(values(&records), vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn test_parse_removals() {
        let output = "Would remove build/\nWould remove notes.txt\nwarning: ignored\n";
        let records = parse_removals(output);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get_str("path"), Some("build"));
        assert_eq!(records[0].get_str("kind"), Some("directory"));
        assert_eq!(records[1].get_str("kind"), Some("file"));
        assert_eq!(parse_removals("Removing a.o\n")[0].get_str("path"), Some("a.o"));
    }
}
