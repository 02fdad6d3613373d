// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! A client-side oblivious storage engine implementing Path ORAM.
//!
//! The engine hides the access pattern of a client reading and writing
//! logical blocks from an untrusted remote store. An observer of the store,
//! who sees every read and write of every node of the ORAM tree, cannot
//! distinguish which logical block was accessed from a uniformly random
//! access pattern of the same length.
//!
//! The pieces are:
//! - [`path_oram::PathOram`], the Path ORAM client: position map, stash,
//!   tree-path read, greedy eviction, randomized remapping, and crash-safe
//!   persistence of client state.
//! - [`backend::Backend`], the storage abstraction, with in-memory,
//!   local-directory, and remote object-store implementations.
//! - [`bucket`], the fixed-capacity bucket codec, and [`crypto`], the
//!   optional authenticated encryption of bucket blobs.
//! - [`simulation::StashSizeSimulator`], an offline harness measuring the
//!   distribution of stash occupancy.

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

pub mod backend;
pub mod bucket;
pub mod crypto;
pub mod path_oram;
pub mod position_map;
pub mod simulation;
pub mod snapshot;
pub mod stash;
pub mod test_utils;
pub mod tree;

pub use backend::{ApiLog, Backend, BackendError, LogVerb};
pub use bucket::{Block, Bucket, CodecError, DUMMY_BLOCK_INDEX};
pub use crypto::{CryptoError, EncryptionEngine};
pub use path_oram::{OramConfig, PathOram, DEFAULT_BLOCKS_PER_BUCKET};
pub use simulation::StashSizeSimulator;

use thiserror::Error;

/// The numeric type used for logical block indices.
///
/// Valid indices lie in `[0, N)`; the sentinel [`DUMMY_BLOCK_INDEX`] (`-1`)
/// marks a dummy block.
pub type BlockIndex = i64;

/// The numeric type used for leaf identifiers, in `[0, 2^L)`.
pub type LeafId = u64;

/// The numeric type used for tree node identifiers, numbered breadth-first
/// with the root at `0`.
pub type NodeId = u64;

/// The numeric type used for the height of the ORAM tree.
pub type TreeHeight = u32;

/// The numeric type used for the number of blocks per bucket.
pub type BucketSize = usize;

/// The two kinds of logical operation the engine performs on a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    /// Read the block's current value.
    Read,
    /// Replace the block's value, returning the previous one.
    Write,
}

/// The error outcome of an engine operation.
///
/// Backend *read* failures never surface here; they are absorbed as dummy
/// buckets and reported through the returned [`ApiLog`] trail.
#[derive(Debug, Error)]
pub enum OramError {
    /// The caller asked for a block index outside `[0, N)`. State is
    /// unchanged.
    #[error("block index {index} out of range for capacity {capacity}")]
    AddressOutOfBounds {
        /// The offending index.
        index: BlockIndex,
        /// The engine's logical capacity `N`.
        capacity: usize,
    },

    /// The caller supplied a payload larger than the configured ceiling.
    /// State is unchanged.
    #[error("block payload of {size} bytes exceeds the {limit}-byte ceiling")]
    BlockTooLarge {
        /// The offending payload length.
        size: usize,
        /// The configured `max_block_size`.
        limit: usize,
    },

    /// The engine was constructed with unusable parameters.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(&'static str),

    /// A backend write failed. The access was aborted without persisting;
    /// the next access of the same block retries the same path.
    #[error(transparent)]
    Backend(#[from] BackendError),

    /// A bucket could not be serialized for writing. This indicates a
    /// programming error; the access is aborted without persisting.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// A bucket could not be encrypted for writing. The access is aborted
    /// without persisting.
    #[error(transparent)]
    Crypto(#[from] CryptoError),
}
