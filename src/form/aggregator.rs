//! Accumulation of repeated part names.
//!
//! The first value under a name is stored as-is, the second turns the slot
//! into an ordered list, and every later value is appended to that list.
//! Names are kept verbatim; bracket syntax is only interpreted by the decoder.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry as Slot;

use super::entry::{AggregatedValue, Entry};

/// Raw part name to aggregated value, prior to bracket decoding.
pub type FlatMap = BTreeMap<String, AggregatedValue>;

#[derive(Debug, Default, Clone)]
pub struct EntryAggregator {
    entries: FlatMap,
    recorded: usize,
}

impl EntryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, value: impl Into<Entry>) {
        let value = value.into();
        self.recorded += 1;

        match self.entries.entry(name.into()) {
            Slot::Vacant(slot) => {
                slot.insert(AggregatedValue::Single(value));
            }
            Slot::Occupied(mut slot) => {
                let current = slot.get_mut();
                *current = match std::mem::replace(current, AggregatedValue::Many(Vec::new())) {
                    AggregatedValue::Single(previous) => {
                        AggregatedValue::Many(vec![previous, value])
                    }
                    AggregatedValue::Many(mut values) => {
                        values.push(value);
                        AggregatedValue::Many(values)
                    }
                };
            }
        }
    }

    pub fn snapshot(&self) -> &FlatMap {
        &self.entries
    }

    pub fn into_flat_map(self) -> FlatMap {
        self.entries
    }

    /// Number of distinct names.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of `record` calls, repeats included.
    pub fn entry_count(&self) -> usize {
        self.recorded
    }
}
