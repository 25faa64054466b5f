use serde_json::Value;

use super::Record;

/// Parse newline-delimited JSON objects (`docker ps --format json`).
///
/// Each line stands alone; lines that are not JSON objects are skipped.
pub fn parse_json_lines(output: &str) -> Vec<Record> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| match serde_json::from_str::<Value>(line) {
            Ok(Value::Object(map)) => Some(Record::from(map)),
            Ok(other) => {
                tracing::debug!("Skipping non-object JSON line: {}", other);
                None
            }
            Err(e) => {
                tracing::debug!("Skipping unparseable JSON line ({}): {}", e, line);
                None
            }
        })
        .collect()
}

/// Parse a single JSON document (`docker inspect`, `kubectl get -o json`).
///
/// An array yields one record per object element. An object yields the
/// elements of `items_key` when that field is an array, otherwise the object
/// itself. Output that is not one document falls back to JSON lines.
pub fn parse_json_document(output: &str, items_key: Option<&str>) -> Vec<Record> {
    let trimmed = output.trim();
    if trimmed.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(Value::Array(items)) => objects(items),
        Ok(Value::Object(mut map)) => {
            let nested = items_key.and_then(|key| match map.remove(key) {
                Some(Value::Array(items)) => Some(items),
                Some(other) => {
                    map.insert(key.to_string(), other);
                    None
                }
                None => None,
            });
            match nested {
                Some(items) => objects(items),
                None => vec![Record::from(map)],
            }
        }
        Ok(_) => Vec::new(),
        Err(_) => parse_json_lines(output),
    }
}

fn objects(items: Vec<Value>) -> Vec<Record> {
    items
        .into_iter()
        .filter_map(|item| match item {
            Value::Object(map) => Some(Record::from(map)),
            _ => None,
        })
        .collect()
}
