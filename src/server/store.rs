use std::collections::HashMap;

/// KeyValueStore is the materialized state machine: one value per key, mutated only
/// by the apply loop. An absent key reads as the empty string, which also makes
/// append-to-absent-key well defined.
pub(crate) struct KeyValueStore {
    data: HashMap<String, String>,
}

impl KeyValueStore {
    pub(crate) fn new() -> Self {
        KeyValueStore { data: HashMap::new() }
    }

    pub(crate) fn get(&self, key: &str) -> String {
        self.data.get(key).cloned().unwrap_or_default()
    }

    pub(crate) fn put(&mut self, key: String, value: String) {
        self.data.insert(key, value);
    }

    pub(crate) fn append(&mut self, key: String, value: &str) {
        self.data.entry(key).or_default().push_str(value);
    }

    pub(crate) fn entries(&self) -> impl Iterator<Item = (&String, &String)> {
        self.data.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_key_reads_as_empty_string() {
        let store = KeyValueStore::new();

        assert_eq!(store.get("nope"), "");
    }

    #[test]
    fn put_overwrites() {
        let mut store = KeyValueStore::new();
        store.put("k".into(), "1".into());
        store.put("k".into(), "2".into());

        assert_eq!(store.get("k"), "2");
    }

    #[test]
    fn append_concatenates_starting_from_empty() {
        let mut store = KeyValueStore::new();
        store.append("k".into(), "a");
        store.append("k".into(), "b");

        assert_eq!(store.get("k"), "ab");
    }
}
