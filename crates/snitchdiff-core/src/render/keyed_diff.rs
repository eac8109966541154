//! Keyed reconciliation between two renders
//!
//! Independent of any drawing backend: given the previous and the next
//! ordered `(key, payload)` sequences, split keys into entering, persisting
//! and exiting sets.

use std::collections::HashMap;
use std::hash::Hash;

/// A key present in both renders
#[derive(Debug, Clone, PartialEq)]
pub struct Persisting<K, P> {
    pub key: K,
    pub old: P,
    pub new: P,
}

/// Result of [`keyed_diff`]; the three lists are disjoint by key
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedDiff<K, P> {
    /// In `new` only, in `new` order
    pub entering: Vec<(K, P)>,
    /// In both, in `new` order
    pub persisting: Vec<Persisting<K, P>>,
    /// In `old` only, in `old` order, with the last known payload
    pub exiting: Vec<(K, P)>,
}

impl<K, P> KeyedDiff<K, P> {
    pub fn is_unchanged(&self) -> bool {
        self.entering.is_empty() && self.exiting.is_empty()
    }
}

/// Reconcile two keyed sequences
///
/// Keys are expected to be unique within each sequence; for a repeated key
/// the last occurrence in `old` is the one matched.
pub fn keyed_diff<K, P>(old: &[(K, P)], new: &[(K, P)]) -> KeyedDiff<K, P>
where
    K: Eq + Hash + Clone,
    P: Clone,
{
    let old_by_key: HashMap<&K, &P> = old.iter().map(|(k, p)| (k, p)).collect();

    let mut entering = Vec::new();
    let mut persisting = Vec::new();
    for (key, payload) in new {
        match old_by_key.get(key) {
            Some(old_payload) => persisting.push(Persisting {
                key: key.clone(),
                old: (*old_payload).clone(),
                new: payload.clone(),
            }),
            None => entering.push((key.clone(), payload.clone())),
        }
    }

    let new_keys: HashMap<&K, ()> = new.iter().map(|(k, _)| (k, ())).collect();
    let exiting = old
        .iter()
        .filter(|(k, _)| !new_keys.contains_key(k))
        .cloned()
        .collect();

    KeyedDiff {
        entering,
        persisting,
        exiting,
    }
}
