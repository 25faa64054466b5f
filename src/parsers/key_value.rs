use super::Record;

/// Parse `key=value` lines (git config --list, openssl field dumps).
///
/// The key ends at the first `=`; the value keeps any later `=` signs.
/// Lines without a separator or with an empty key are ignored.
pub fn parse_key_values(output: &str) -> Vec<Record> {
    output
        .lines()
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let key = key.trim();
            if key.is_empty() {
                return None;
            }
            Some(Record::new().with("key", key).with("value", value.trim()))
        })
        .collect()
}

/// Last value recorded for `key`, matching git's "last one wins" lookup
pub fn lookup<'a>(records: &'a [Record], key: &str) -> Option<&'a str> {
    records
        .iter()
        .rev()
        .find(|r| r.get_str("key") == Some(key))
        .and_then(|r| r.get_str("value"))
}
