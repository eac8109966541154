use std::ops::Range;

use crate::errors::{DiffError, Result};
use crate::model::{NodeMap, NodeRecord};

/// Flat array of detailed node records, filled page by page
///
/// Pre-sized to the declared node count when the structure arrives. Slots
/// stay empty until their page lands; every reader must tolerate that.
/// Single-writer: only the loader writes, and each slot exactly once.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    slots: Vec<Option<NodeRecord>>,
    filled: usize,
}

impl NodeStore {
    /// Create an empty store with no capacity
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with `capacity` empty slots
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
            filled: 0,
        }
    }

    /// Write a page of records starting at `offset`
    ///
    /// Returns the range of slots written. The store is untouched when an
    /// error is returned.
    ///
    /// # Errors
    ///
    /// Returns `PageOverflow` if the page runs past the capacity, or
    /// `SlotAlreadyFilled` if any target slot already holds a record.
    pub fn write_page(&mut self, offset: usize, records: Vec<NodeRecord>) -> Result<Range<usize>> {
        let end = offset
            .checked_add(records.len())
            .filter(|end| *end <= self.slots.len())
            .ok_or(DiffError::PageOverflow {
                offset,
                len: records.len(),
                capacity: self.slots.len(),
            })?;

        if let Some(index) = (offset..end).find(|i| self.slots[*i].is_some()) {
            return Err(DiffError::SlotAlreadyFilled { index });
        }

        for (slot, record) in self.slots[offset..end].iter_mut().zip(records) {
            *slot = Some(record);
        }
        self.filled += end - offset;

        Ok(offset..end)
    }

    /// Record at `index`, if its page has arrived
    pub fn get(&self, index: usize) -> Option<&NodeRecord> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Record for an entity, resolved through the node map
    pub fn lookup(&self, map: &NodeMap, entity_type: &str, entity_id: &str) -> Option<&NodeRecord> {
        self.get(map.index_of(entity_type, entity_id)?)
    }

    /// Number of filled slots
    pub fn filled(&self) -> usize {
        self.filled
    }

    /// Declared node count
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_complete(&self) -> bool {
        self.filled == self.slots.len()
    }

    /// Drop every record and the capacity
    pub fn clear(&mut self) {
        self.slots.clear();
        self.filled = 0;
    }
}
