// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The client-side stash.

use crate::{bucket::Block, BlockIndex};

/// In-memory set of non-dummy blocks held between accesses, keyed by block
/// index with at most one entry per index.
///
/// Entries keep their insertion order; the eviction loop relies on that
/// order as its deterministic tie-break.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stash {
    blocks: Vec<Block>,
}

impl Stash {
    /// Returns an empty stash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reconstructs a stash from persisted blocks, preserving their order.
    pub fn from_blocks(blocks: Vec<Block>) -> Self {
        debug_assert!(blocks.iter().all(|block| !block.is_dummy()));
        Self { blocks }
    }

    /// Inserts `block`, replacing any existing entry with the same index in
    /// place. Block indices are unique system-wide, so a replacement can
    /// only ever rewrite the same logical block.
    pub fn insert(&mut self, block: Block) {
        debug_assert!(!block.is_dummy());
        match self
            .blocks
            .iter_mut()
            .find(|existing| existing.index == block.index)
        {
            Some(existing) => *existing = block,
            None => self.blocks.push(block),
        }
    }

    /// Looks up the block with index `index`.
    pub fn get(&self, index: BlockIndex) -> Option<&Block> {
        self.blocks.iter().find(|block| block.index == index)
    }

    /// Looks up the block with index `index` for update in place.
    pub fn get_mut(&mut self, index: BlockIndex) -> Option<&mut Block> {
        self.blocks.iter_mut().find(|block| block.index == index)
    }

    /// Removes the blocks with the given indices, returning them in stash
    /// order. Indices not present are ignored.
    pub fn take(&mut self, indices: &[BlockIndex]) -> Vec<Block> {
        let mut taken = Vec::with_capacity(indices.len());
        self.blocks.retain(|block| {
            if indices.contains(&block.index) {
                taken.push(block.clone());
                false
            } else {
                true
            }
        });
        taken
    }

    /// Iterates over the stashed blocks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter()
    }

    /// The persisted form: every stashed block in insertion order.
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Returns the number of stashed blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the stash holds no blocks.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_replaces_entries_with_the_same_index() {
        let mut stash = Stash::new();
        stash.insert(Block::new(1, b"old".to_vec()));
        stash.insert(Block::new(2, b"two".to_vec()));
        stash.insert(Block::new(1, b"new".to_vec()));

        assert_eq!(stash.len(), 2);
        assert_eq!(stash.get(1).unwrap().data, b"new");
        // Replacement keeps the original slot, not the tail.
        assert_eq!(stash.blocks()[0].index, 1);
    }

    #[test]
    fn take_preserves_stash_order() {
        let mut stash = Stash::new();
        for index in [4, 2, 9, 7] {
            stash.insert(Block::new(index, vec![index as u8]));
        }
        let taken = stash.take(&[7, 2]);
        let taken_indices: Vec<_> = taken.iter().map(|block| block.index).collect();
        assert_eq!(taken_indices, vec![2, 7]);

        let remaining: Vec<_> = stash.iter().map(|block| block.index).collect();
        assert_eq!(remaining, vec![4, 9]);
    }

    #[test]
    fn take_ignores_absent_indices() {
        let mut stash = Stash::new();
        stash.insert(Block::new(1, Vec::new()));
        let taken = stash.take(&[1, 5]);
        assert_eq!(taken.len(), 1);
        assert!(stash.is_empty());
    }

    #[test]
    fn get_mut_updates_in_place() {
        let mut stash = Stash::new();
        stash.insert(Block::new(3, b"before".to_vec()));
        stash.get_mut(3).unwrap().data = b"after".to_vec();
        assert_eq!(stash.get(3).unwrap().data, b"after");
        assert_eq!(stash.len(), 1);
    }
}
