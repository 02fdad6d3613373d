// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Binary-tree layout and path calculus for the ORAM tree.
//!
//! The tree is a perfect binary tree of height `L` with `2^L` leaves and
//! `2^(L+1) - 1` nodes, numbered breadth-first: the root is node `0`, the
//! children of node `i` are `2i + 1` and `2i + 2`, and leaf `l` lives at node
//! `2^L - 1 + l`.

use crate::{LeafId, NodeId, TreeHeight};
use rand::{CryptoRng, Rng, RngCore};

/// The tallest tree whose node identifiers fit in a [`NodeId`].
pub const MAXIMUM_TREE_HEIGHT: TreeHeight = 62;

/// Returns the tree height `L = ceil(log2 max(N, 2))` for `num_blocks`
/// logical blocks.
pub fn tree_height(num_blocks: usize) -> TreeHeight {
    num_blocks.max(2).next_power_of_two().ilog2()
}

/// Returns the number of leaves, `2^L`.
pub fn num_leaves(height: TreeHeight) -> u64 {
    1u64 << height
}

/// Returns the number of nodes, `2^(L+1) - 1`.
pub fn num_nodes(height: TreeHeight) -> u64 {
    (1u64 << (height + 1)) - 1
}

/// Returns the node id of leaf `leaf`.
pub fn leaf_node_id(leaf: LeafId, height: TreeHeight) -> NodeId {
    debug_assert!(leaf < num_leaves(height));
    num_leaves(height) - 1 + leaf
}

/// Returns the node id of the ancestor of leaf `leaf` at `level` (`0` is the
/// root, `height` is the leaf itself).
pub fn node_on_path(leaf: LeafId, level: TreeHeight, height: TreeHeight) -> NodeId {
    debug_assert!(level <= height);
    // Shifting the 1-based leaf node index walks up the ancestor chain.
    ((leaf_node_id(leaf, height) + 1) >> (height - level)) - 1
}

/// Returns the ordered node ids from the root to leaf `leaf`, of length
/// `L + 1`. `path[0]` is always the root.
pub fn path_nodes(leaf: LeafId, height: TreeHeight) -> Vec<NodeId> {
    (0..=height)
        .map(|level| node_on_path(leaf, level, height))
        .collect()
}

/// Draws a leaf id uniformly from `[0, 2^L)`.
pub fn random_leaf<R: RngCore + CryptoRng>(height: TreeHeight, rng: &mut R) -> LeafId {
    rng.gen_range(0..num_leaves(height))
}
