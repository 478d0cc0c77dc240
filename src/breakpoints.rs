//! Passive store for software breakpoints.
//!
//! The store only remembers breakpoints; patching and unpatching tracee
//! memory is the debugger core's job.

use std::collections::HashMap;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a breakpoint at {0:#x} already exists")]
pub struct DuplicateAddress(pub u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Breakpoint {
    /// Session-unique id, never reused.
    pub id: u32,
    pub address: u64,
    /// Instruction word observed at `address` before any trap was written.
    pub original_word: u64,
    /// Whether the trap byte is currently planted in the tracee.
    pub armed: bool,
}

/// Insertion-ordered breakpoint collection with an address index.
#[derive(Debug, Default)]
pub struct BreakpointStore {
    entries: Vec<Breakpoint>,
    by_address: HashMap<u64, usize>,
    next_id: u32,
}

impl BreakpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a breakpoint. Fails if one already exists at `address`.
    pub fn insert(&mut self, address: u64, original_word: u64) -> Result<u32, DuplicateAddress> {
        if self.by_address.contains_key(&address) {
            return Err(DuplicateAddress(address));
        }
        self.next_id += 1;
        let id = self.next_id;
        self.by_address.insert(address, self.entries.len());
        self.entries.push(Breakpoint {
            id,
            address,
            original_word,
            armed: true,
        });
        Ok(id)
    }

    /// Remove the breakpoint with `id`, returning it if it existed.
    pub fn remove(&mut self, id: u32) -> Option<Breakpoint> {
        let index = self.entries.iter().position(|bp| bp.id == id)?;
        let removed = self.entries.remove(index);
        self.reindex();
        Some(removed)
    }

    pub fn find_by_address(&self, address: u64) -> Option<&Breakpoint> {
        self.by_address
            .get(&address)
            .map(|&index| &self.entries[index])
    }

    /// Breakpoints in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Breakpoint> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Breakpoint> {
        self.entries.iter_mut()
    }

    fn reindex(&mut self) {
        self.by_address.clear();
        for (index, bp) in self.entries.iter().enumerate() {
            self.by_address.insert(bp.address, index);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn assigns_monotonic_ids() {
        let mut store = BreakpointStore::new();
        assert_eq!(store.insert(0x1000, 0xaa), Ok(1));
        assert_eq!(store.insert(0x2000, 0xbb), Ok(2));
        store.remove(2);
        // ids are never reused, even after a delete
        assert_eq!(store.insert(0x3000, 0xcc), Ok(3));
    }

    #[test]
    fn rejects_duplicate_addresses() {
        let mut store = BreakpointStore::new();
        store.insert(0x401120, 0xaa).unwrap();
        assert_eq!(store.insert(0x401120, 0xaa), Err(DuplicateAddress(0x401120)));
        assert_eq!(store.iter().count(), 1);
    }

    #[test]
    fn address_becomes_free_after_removal() {
        let mut store = BreakpointStore::new();
        let id = store.insert(0x1000, 0xaa).unwrap();
        assert!(store.find_by_address(0x1000).is_some());

        let removed = store.remove(id).unwrap();
        assert_eq!(removed.original_word, 0xaa);
        assert!(store.find_by_address(0x1000).is_none());
        assert!(store.insert(0x1000, 0xaa).is_ok());
    }

    #[test]
    fn remove_of_unknown_id_is_none() {
        let mut store = BreakpointStore::new();
        store.insert(0x1000, 0).unwrap();
        assert!(store.remove(42).is_none());
        assert_eq!(store.iter().count(), 1);
    }

    #[test]
    fn iterates_in_insertion_order() {
        let mut store = BreakpointStore::new();
        store.insert(0x3000, 0).unwrap();
        store.insert(0x1000, 0).unwrap();
        store.insert(0x2000, 0).unwrap();
        store.remove(2);

        let addresses: Vec<_> = store.iter().map(|bp| bp.address).collect();
        assert_eq!(addresses, [0x3000, 0x2000]);

        // the index stays consistent after the removal shifts entries
        assert_eq!(store.find_by_address(0x2000).unwrap().id, 3);
    }
}
