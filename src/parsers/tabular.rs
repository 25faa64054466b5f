//! Column-aligned tables (`docker search`, `kubectl get`, `git remote -v`)
//!
//! When the header line is present its column titles give the character
//! offsets used to slice each row, which keeps multi-word cells intact.
//! Without a header rows are split on runs of whitespace and an optional
//! greedy column absorbs the surplus tokens.

use super::Record;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Column {
    /// Title as printed in the header line
    pub title: &'static str,
    /// Field name in the emitted record
    pub key: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSpec {
    pub columns: Vec<Column>,
    /// Column that takes the leftover tokens when splitting on whitespace
    pub greedy: Option<usize>,
}

impl TableSpec {
    pub fn new(columns: &[(&'static str, &'static str)]) -> Self {
        Self {
            columns: columns
                .iter()
                .map(|(title, key)| Column { title, key })
                .collect(),
            greedy: None,
        }
    }

    pub fn with_greedy(mut self, index: usize) -> Self {
        self.greedy = Some(index);
        self
    }

    /// Character offsets of each column when `line` is this table's header
    fn header_offsets(&self, line: &str) -> Option<Vec<usize>> {
        if !line.trim_start().starts_with(self.columns.first()?.title) {
            return None;
        }

        let mut offsets = Vec::with_capacity(self.columns.len());
        let mut search_from = 0;
        for column in &self.columns {
            let found = line[search_from..].find(column.title)? + search_from;
            offsets.push(line[..found].chars().count());
            search_from = found + column.title.len();
        }
        Some(offsets)
    }

    fn is_header(&self, line: &str) -> bool {
        self.header_offsets(line).is_some()
    }
}

/// `docker search` output: NAME DESCRIPTION STARS OFFICIAL [AUTOMATED]
pub fn docker_search_table() -> TableSpec {
    TableSpec::new(&[
        ("NAME", "name"),
        ("DESCRIPTION", "description"),
        ("STARS", "stars"),
        ("OFFICIAL", "official"),
    ])
    .with_greedy(1)
}

/// `kubectl get namespaces`
pub fn namespace_table() -> TableSpec {
    TableSpec::new(&[("NAME", "name"), ("STATUS", "status"), ("AGE", "age")])
}

/// `git remote -v`, which prints no header
pub fn remote_table() -> TableSpec {
    TableSpec::new(&[("NAME", "name"), ("URL", "url"), ("KIND", "kind")])
}

pub fn parse_table(output: &str, spec: &TableSpec) -> Vec<Record> {
    let mut offsets: Option<Vec<usize>> = None;
    let mut records = Vec::new();

    for line in output.lines() {
        if line.trim().is_empty() {
            continue;
        }

        if let Some(found) = spec.header_offsets(line) {
            offsets = Some(found);
            continue;
        }

        let cells = match &offsets {
            Some(offsets) => split_fixed(line, offsets),
            None => split_whitespace(line, spec),
        };
        records.push(build_record(spec, cells));
    }

    records
}

fn split_fixed(line: &str, offsets: &[usize]) -> Vec<String> {
    let chars: Vec<char> = line.chars().collect();
    offsets
        .iter()
        .enumerate()
        .map(|(i, &start)| {
            let end = offsets.get(i + 1).copied().unwrap_or(chars.len());
            if start >= chars.len() || start >= end {
                return String::new();
            }
            let end = end.min(chars.len());
            chars[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}

fn split_whitespace(line: &str, spec: &TableSpec) -> Vec<String> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let width = spec.columns.len();

    match spec.greedy {
        Some(greedy) if tokens.len() > width && greedy < width => {
            let trailing = width - greedy - 1;
            let tail_start = tokens.len() - trailing;
            let mut cells: Vec<String> = tokens[..greedy].iter().map(|t| t.to_string()).collect();
            cells.push(tokens[greedy..tail_start].join(" "));
            cells.extend(tokens[tail_start..].iter().map(|t| t.to_string()));
            cells
        }
        _ if tokens.len() > width && width > 0 => {
            // Surplus tokens belong to the last column.
            let mut cells: Vec<String> =
                tokens[..width - 1].iter().map(|t| t.to_string()).collect();
            cells.push(tokens[width - 1..].join(" "));
            cells
        }
        _ => tokens.iter().map(|t| t.to_string()).collect(),
    }
}

fn build_record(spec: &TableSpec, cells: Vec<String>) -> Record {
    let mut cells = cells.into_iter();
    let mut record = Record::new();
    for column in &spec.columns {
        record.insert(column.key, cells.next().unwrap_or_default());
    }
    record
}

/// True if `line` would be recognised as the header of `spec`
pub fn is_header_line(spec: &TableSpec, line: &str) -> bool {
    spec.is_header(line)
}
