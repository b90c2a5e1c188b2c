//! Vote tally for consensus sampling
//!
//! Accepted samples are grouped by a canonical key. Two samples that are
//! structurally equal always share a key, regardless of the field order a
//! generator happened to produce.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Canonical key for a sample: compact JSON with object keys sorted.
///
/// # Example
///
/// ```
/// use forge_domain::consensus::canonical_key;
/// use serde_json::json;
///
/// let a = canonical_key(&json!({"b": 1, "a": [true, null]})).unwrap();
/// let b = canonical_key(&json!({"a": [true, null], "b": 1})).unwrap();
/// assert_eq!(a, b);
/// assert_eq!(a, r#"{"a":[true,null],"b":1}"#);
/// ```
pub fn canonical_key<T: Serialize + ?Sized>(value: &T) -> Result<String, serde_json::Error> {
    let value = serde_json::to_value(value)?;
    serde_json::to_string(&sort_keys(value))
}

fn sort_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let sorted: BTreeMap<String, Value> =
                map.into_iter().map(|(k, v)| (k, sort_keys(v))).collect();
            Value::Object(sorted.into_iter().collect::<Map<String, Value>>())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(sort_keys).collect()),
        other => other,
    }
}

/// One distinct candidate value and its vote count
#[derive(Debug, Clone, PartialEq)]
pub struct TallyEntry<O> {
    pub key: String,
    pub count: usize,
    /// Representative sample (the most recently accepted one for this key)
    pub sample: O,
}

/// Running vote tally, ordered by when each key was first accepted
#[derive(Debug, Clone)]
pub struct VoteTally<O> {
    entries: Vec<TallyEntry<O>>,
}

impl<O> Default for VoteTally<O> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<O> VoteTally<O> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one vote for `key`, returning the key's new count.
    pub fn record(&mut self, key: String, sample: O) -> usize {
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(entry) => {
                entry.count += 1;
                entry.sample = sample;
                entry.count
            }
            None => {
                self.entries.push(TallyEntry {
                    key,
                    count: 1,
                    sample,
                });
                1
            }
        }
    }

    /// Snapshot of key → count, as carried by `vote_update` events
    pub fn counts(&self) -> BTreeMap<String, usize> {
        self.entries
            .iter()
            .map(|entry| (entry.key.clone(), entry.count))
            .collect()
    }

    pub fn get(&self, key: &str) -> Option<&TallyEntry<O>> {
        self.entries.iter().find(|entry| entry.key == key)
    }

    /// Leading entry and runner-up.
    ///
    /// Ties on count go to the key that was accepted first.
    pub fn leaders(&self) -> Leaders<'_, O> {
        let mut leading: Option<&TallyEntry<O>> = None;
        let mut runner_up: Option<&TallyEntry<O>> = None;

        for entry in &self.entries {
            match leading {
                None => leading = Some(entry),
                Some(current) if entry.count > current.count => {
                    runner_up = leading;
                    leading = Some(entry);
                }
                Some(_) => {
                    if runner_up.is_none_or(|r| entry.count > r.count) {
                        runner_up = Some(entry);
                    }
                }
            }
        }

        Leaders { leading, runner_up }
    }

    /// Total number of accepted votes across all keys
    pub fn total_votes(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    /// Number of distinct values
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the tally, yielding the leading representative sample.
    pub fn into_winner(self) -> Option<O> {
        let key = self.leaders().leading?.key.clone();
        self.entries
            .into_iter()
            .find(|entry| entry.key == key)
            .map(|entry| entry.sample)
    }
}

/// Front-runner and runner-up of a [`VoteTally`]
#[derive(Debug)]
pub struct Leaders<'a, O> {
    pub leading: Option<&'a TallyEntry<O>>,
    pub runner_up: Option<&'a TallyEntry<O>>,
}

impl<O> Leaders<'_, O> {
    /// Lead margin: leader count minus runner-up count (0 when the tally is empty)
    pub fn margin(&self) -> usize {
        let lead = self.leading.map_or(0, |entry| entry.count);
        let second = self.runner_up.map_or(0, |entry| entry.count);
        lead.saturating_sub(second)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tally_of(keys: &[&str]) -> VoteTally<String> {
        let mut tally = VoteTally::new();
        for key in keys {
            tally.record(key.to_string(), key.to_string());
        }
        tally
    }

    #[test]
    fn test_canonical_key_ignores_field_order() {
        let a = canonical_key(&json!({"x": 1, "y": {"b": 2, "a": 1}})).unwrap();
        let b = canonical_key(&json!({"y": {"a": 1, "b": 2}, "x": 1})).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_key_keeps_array_order() {
        let a = canonical_key(&json!([1, 2])).unwrap();
        let b = canonical_key(&json!([2, 1])).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_record_counts() {
        let mut tally = VoteTally::new();
        assert_eq!(tally.record("a".into(), 1), 1);
        assert_eq!(tally.record("b".into(), 2), 1);
        assert_eq!(tally.record("a".into(), 3), 2);

        assert_eq!(tally.len(), 2);
        assert_eq!(tally.total_votes(), 3);
        // Representative sample is replaced by the latest vote
        assert_eq!(tally.get("a").unwrap().sample, 3);

        let counts = tally.counts();
        assert_eq!(counts.get("a"), Some(&2));
        assert_eq!(counts.get("b"), Some(&1));
    }

    #[test]
    fn test_leaders_single_key() {
        let tally = tally_of(&["a", "a"]);
        let leaders = tally.leaders();
        assert_eq!(leaders.leading.unwrap().key, "a");
        assert!(leaders.runner_up.is_none());
        assert_eq!(leaders.margin(), 2);
    }

    #[test]
    fn test_leaders_tie_goes_to_first_accepted() {
        let tally = tally_of(&["a", "b", "b", "a"]);
        let leaders = tally.leaders();
        assert_eq!(leaders.leading.unwrap().key, "a");
        assert_eq!(leaders.runner_up.unwrap().key, "b");
        assert_eq!(leaders.margin(), 0);
    }

    #[test]
    fn test_leaders_runner_up_after_overtake() {
        let tally = tally_of(&["a", "b", "b", "c", "c", "c"]);
        let leaders = tally.leaders();
        assert_eq!(leaders.leading.unwrap().key, "c");
        assert_eq!(leaders.runner_up.unwrap().key, "b");
        assert_eq!(leaders.margin(), 1);
    }

    #[test]
    fn test_leaders_runner_up_found_after_leader() {
        let tally = tally_of(&["a", "a", "a", "b", "c", "c"]);
        let leaders = tally.leaders();
        assert_eq!(leaders.leading.unwrap().key, "a");
        assert_eq!(leaders.runner_up.unwrap().key, "c");
        assert_eq!(leaders.margin(), 1);
    }

    #[test]
    fn test_empty_tally() {
        let tally: VoteTally<String> = VoteTally::new();
        assert!(tally.is_empty());
        assert_eq!(tally.leaders().margin(), 0);
        assert!(tally.into_winner().is_none());
    }

    #[test]
    fn test_into_winner() {
        let tally = tally_of(&["x", "y", "y"]);
        assert_eq!(tally.into_winner(), Some("y".to_string()));
    }
}
