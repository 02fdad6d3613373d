// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The client-held position map.

use crate::{tree, BlockIndex, LeafId, TreeHeight};
use rand::{CryptoRng, RngCore};

/// Total mapping from block index to the leaf currently assigned to that
/// block. Entries for never-written blocks still point at valid leaves, so
/// a read of a fresh block walks a real path like any other access.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PositionMap {
    positions: Vec<LeafId>,
}

impl PositionMap {
    /// Returns a map with every entry drawn uniformly i.i.d. from
    /// `[0, 2^L)`.
    pub fn new_random<R: RngCore + CryptoRng>(
        num_blocks: usize,
        height: TreeHeight,
        rng: &mut R,
    ) -> Self {
        let positions = (0..num_blocks)
            .map(|_| tree::random_leaf(height, rng))
            .collect();
        Self { positions }
    }

    /// Reconstructs a map from persisted entries.
    pub fn from_positions(positions: Vec<LeafId>) -> Self {
        Self { positions }
    }

    /// Returns the leaf currently assigned to `index`.
    pub fn position(&self, index: BlockIndex) -> LeafId {
        self.positions[index as usize]
    }

    /// Reassigns `index` to `leaf`.
    pub fn set_position(&mut self, index: BlockIndex, leaf: LeafId) {
        self.positions[index as usize] = leaf;
    }

    /// The persisted form: one entry per block index.
    pub fn positions(&self) -> &[LeafId] {
        &self.positions
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    /// Whether the map holds no entries.
    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn entries_start_within_leaf_range() {
        let mut rng = StdRng::seed_from_u64(0);
        let height = 4;
        let map = PositionMap::new_random(64, height, &mut rng);
        assert_eq!(map.len(), 64);
        for index in 0..64 {
            assert!(map.position(index) < tree::num_leaves(height));
        }
    }

    #[test]
    fn set_position_overwrites_only_its_entry() {
        let mut rng = StdRng::seed_from_u64(0);
        let mut map = PositionMap::new_random(8, 3, &mut rng);
        let before: Vec<_> = map.positions().to_vec();
        map.set_position(3, 7);
        assert_eq!(map.position(3), 7);
        for index in (0..8).filter(|&i| i != 3) {
            assert_eq!(map.position(index), before[index as usize]);
        }
    }

    #[test]
    fn persisted_form_round_trips() {
        let mut rng = StdRng::seed_from_u64(0);
        let map = PositionMap::new_random(16, 4, &mut rng);
        let restored = PositionMap::from_positions(map.positions().to_vec());
        assert_eq!(restored, map);
    }
}
