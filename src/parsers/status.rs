use super::Record;

/// Parse `git status --porcelain=v1 --branch` entries.
///
/// Each entry becomes `{path, index, worktree, orig_path}`; `##` branch
/// header lines are skipped. Renames (`R  old -> new`) keep the old path in
/// `orig_path`. Lines too short to carry a status code are ignored.
pub fn parse_status_output(output: &str) -> Vec<Record> {
    output
        .lines()
        .filter(|line| !line.starts_with("## "))
        .filter_map(parse_entry)
        .collect()
}

fn parse_entry(line: &str) -> Option<Record> {
    if line.len() < 4 || !line.is_char_boundary(2) || !line.is_char_boundary(3) {
        return None;
    }

    let mut codes = line[..2].chars();
    let index = codes.next()?.to_string();
    let worktree = codes.next()?.to_string();
    let rest = unquote(&line[3..]);

    let (path, orig_path) = match rest.split_once(" -> ") {
        Some((from, to)) => (unquote(to), from.to_string()),
        None => (rest, String::new()),
    };

    Some(
        Record::new()
            .with("path", path)
            .with("index", index)
            .with("worktree", worktree)
            .with("orig_path", orig_path),
    )
}

fn unquote(path: &str) -> String {
    path.strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
        .unwrap_or(path)
        .to_string()
}

/// Parse `git diff --name-status` lines into `{status, path, orig_path}`.
///
/// Fields are tab separated. Renames and copies (`R100\told\tnew`) carry
/// the source path in `orig_path` and the destination in `path`.
pub fn parse_name_status(output: &str) -> Vec<Record> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.split('\t');
            let status = fields.next()?.trim();
            let first = unquote(fields.next()?);
            let (path, orig_path) = match fields.next() {
                Some(second) => (unquote(second), first),
                None => (first, String::new()),
            };
            Some(
                Record::new()
                    .with("status", status)
                    .with("path", path)
                    .with("orig_path", orig_path),
            )
        })
        .collect()
}

/// Paths whose status marks them as unmerged
pub fn conflicted_paths(records: &[Record]) -> Vec<String> {
    records
        .iter()
        .filter(|r| {
            let x = r.get_str("index").unwrap_or("");
            let y = r.get_str("worktree").unwrap_or("");
            x == "U" || y == "U" || (x == "A" && y == "A") || (x == "D" && y == "D")
        })
        .filter_map(|r| r.get_str("path").map(str::to_string))
        .collect()
}
