// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The Path ORAM access engine.
//!
//! Every access reads one complete root-to-leaf path, services the request
//! from the stash, greedily evicts the stash back onto the *same* path, and
//! persists the client state. The path belongs to the block's *previous*
//! position-map entry, which the previous access of that block drew
//! uniformly at random, so the backend observes a uniform path per access
//! regardless of which block was touched or whether it was read or written.

use crate::{
    backend::{ApiLog, Backend},
    bucket::{Block, Bucket},
    crypto::EncryptionEngine,
    position_map::PositionMap,
    snapshot::{self, Metadata, Snapshot},
    stash::Stash,
    tree, BlockIndex, BucketSize, LeafId, NodeId, Operation, OramError, TreeHeight,
};
use log::{debug, error, warn};
use rand::{CryptoRng, RngCore};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The parameter "Z" from the Path ORAM literature that sets the number of
/// blocks per bucket; typical values are 3 or 4. Here we adopt the more
/// conservative setting of 4.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// Default ceiling on the payload length of one block, in bytes.
pub const DEFAULT_MAX_BLOCK_SIZE: usize = 4096;

const DEFAULT_SNAPSHOT_PATH: &str = "stash.json";

/// Configuration of a [`PathOram`] engine. The backend itself is injected
/// into [`PathOram::new`].
#[derive(Clone, Debug)]
pub struct OramConfig {
    /// Logical capacity `N` in blocks; must be at least 1.
    pub num_blocks: usize,
    /// Blocks per tree node, `Z`.
    pub bucket_size: BucketSize,
    /// Ceiling on the payload length of one block.
    pub max_block_size: usize,
    /// Where the client-state snapshot is persisted.
    pub snapshot_path: PathBuf,
    /// Optional 32-byte key; enables authenticated encryption of buckets.
    pub encryption_key: Option<[u8; 32]>,
    /// When false, all snapshot I/O is skipped (simulator mode).
    pub persist: bool,
}

impl OramConfig {
    /// Returns the default configuration for `num_blocks` logical blocks.
    pub fn new(num_blocks: usize) -> Self {
        Self {
            num_blocks,
            bucket_size: DEFAULT_BLOCKS_PER_BUCKET,
            max_block_size: DEFAULT_MAX_BLOCK_SIZE,
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            encryption_key: None,
            persist: true,
        }
    }
}

/// A Path ORAM client over a pluggable backend.
///
/// The engine is single-access-at-a-time by construction: `access` takes
/// `&mut self` and is not reentrant. Callers needing concurrency must
/// serialize through a queue or mutex.
#[derive(Debug)]
pub struct PathOram<B: Backend, R: RngCore + CryptoRng> {
    backend: B,
    crypto: Option<EncryptionEngine>,
    position_map: PositionMap,
    stash: Stash,
    num_blocks: usize,
    bucket_size: BucketSize,
    max_block_size: usize,
    height: TreeHeight,
    snapshot_path: PathBuf,
    persist: bool,
    degraded: bool,
    rng: R,
}

impl<B: Backend, R: RngCore + CryptoRng> PathOram<B, R> {
    /// Creates an engine over `backend`, restoring persisted client state
    /// when a snapshot with matching metadata exists and starting fresh
    /// otherwise.
    pub fn new(config: OramConfig, backend: B, mut rng: R) -> Result<Self, OramError> {
        if config.num_blocks == 0 {
            return Err(OramError::InvalidConfiguration("num_blocks must be at least 1"));
        }
        if config.bucket_size == 0 {
            return Err(OramError::InvalidConfiguration("bucket_size must be at least 1"));
        }
        let height = tree::tree_height(config.num_blocks);
        if height > tree::MAXIMUM_TREE_HEIGHT {
            return Err(OramError::InvalidConfiguration("num_blocks exceeds the addressable tree"));
        }

        let metadata = Metadata {
            num_blocks: config.num_blocks,
            bucket_size: config.bucket_size,
            tree_height: height,
            num_leaves: tree::num_leaves(height),
        };

        let restored = if config.persist {
            snapshot::load(&config.snapshot_path, &metadata)
        } else {
            None
        };
        let (position_map, stash) = match restored {
            Some(snapshot) => (
                PositionMap::from_positions(snapshot.position_map),
                Stash::from_blocks(snapshot.stash_blocks),
            ),
            None => (
                PositionMap::new_random(config.num_blocks, height, &mut rng),
                Stash::new(),
            ),
        };

        debug!(
            "PathOram::new -- N = {}, Z = {}, L = {}",
            config.num_blocks, config.bucket_size, height
        );

        Ok(Self {
            backend,
            crypto: config.encryption_key.as_ref().map(EncryptionEngine::new),
            position_map,
            stash,
            num_blocks: config.num_blocks,
            bucket_size: config.bucket_size,
            max_block_size: config.max_block_size,
            height,
            snapshot_path: config.snapshot_path,
            persist: config.persist,
            degraded: false,
            rng,
        })
    }

    /// Performs one oblivious access.
    ///
    /// Returns the block's value *before* the access together with the trail
    /// of backend operations: a read returns the current value, a write
    /// returns the overwritten value (empty on first write). A read of a
    /// never-written block returns the empty byte sequence.
    pub fn access(
        &mut self,
        op: Operation,
        index: BlockIndex,
        new_data: Option<Vec<u8>>,
    ) -> Result<(Vec<u8>, Vec<ApiLog>), OramError> {
        if index < 0 || index as usize >= self.num_blocks {
            return Err(OramError::AddressOutOfBounds {
                index,
                capacity: self.num_blocks,
            });
        }
        if let Some(data) = &new_data {
            if data.len() > self.max_block_size {
                return Err(OramError::BlockTooLarge {
                    size: data.len(),
                    limit: self.max_block_size,
                });
            }
        }
        debug!("access {op:?} block {index}");

        // Remap. The old leaf drives both the path read and the path write
        // of this access; the fresh leaf takes effect on the next access.
        let leaf = self.position_map.position(index);
        let new_leaf = tree::random_leaf(self.height, &mut self.rng);
        self.position_map.set_position(index, new_leaf);

        let mut logs = Vec::new();

        // Read the complete path into the stash before any other mutation.
        let names: Vec<String> = tree::path_nodes(leaf, self.height)
            .iter()
            .map(|node| node.to_string())
            .collect();
        for (bytes, api_log) in self.backend.read_multiple(&names) {
            let name = api_log.name.clone();
            logs.push(api_log);
            let bucket = self.decode_bucket(&bytes, &name, &mut logs);
            for block in bucket.blocks {
                if !block.is_dummy() {
                    self.stash.insert(block);
                }
            }
        }

        // Service the request from the stash.
        let data_return = match self.stash.get_mut(index) {
            Some(block) => {
                let previous = block.data.clone();
                if op == Operation::Write {
                    block.data = new_data.unwrap_or_default();
                }
                previous
            }
            None => {
                if op == Operation::Write {
                    self.stash
                        .insert(Block::new(index, new_data.unwrap_or_default()));
                }
                Vec::new()
            }
        };

        // Evict greedily onto the same path, then commit it.
        let evicted = self.evict_along_path(leaf);
        match self.commit_path(&evicted) {
            Ok(write_logs) => logs.extend(write_logs),
            Err(err) => {
                // Put the evicted blocks back and point the block at its old
                // leaf, so the next access retries this path and recovers
                // everything still in the stash.
                for (_, bucket) in evicted {
                    for block in bucket.blocks {
                        if !block.is_dummy() {
                            self.stash.insert(block);
                        }
                    }
                }
                self.position_map.set_position(index, leaf);
                return Err(err);
            }
        }

        if self.persist {
            let record = Snapshot {
                position_map: self.position_map.positions().to_vec(),
                stash_blocks: self.stash.blocks().to_vec(),
                metadata: self.metadata(),
            };
            if let Err(err) = snapshot::save(&self.snapshot_path, &record) {
                error!(
                    "could not persist client state to {}: {err}",
                    self.snapshot_path.display()
                );
                self.degraded = true;
            }
        }

        Ok((data_return, logs))
    }

    /// Obliviously reads the value stored at `index`.
    pub fn read(&mut self, index: BlockIndex) -> Result<(Vec<u8>, Vec<ApiLog>), OramError> {
        self.access(Operation::Read, index, None)
    }

    /// Obliviously writes `data` into `index`, returning the previous value.
    pub fn write(
        &mut self,
        index: BlockIndex,
        data: Vec<u8>,
    ) -> Result<(Vec<u8>, Vec<ApiLog>), OramError> {
        self.access(Operation::Write, index, Some(data))
    }

    /// Greedy eviction over the `Z * (L+1)` slots of the path to `leaf`,
    /// filling levels from the leaf up to the root.
    ///
    /// At each level the stash is partitioned over a snapshot of its entries
    /// into blocks whose assigned path shares this level's node and the
    /// rest; the stash is only mutated after the partition is complete. When
    /// more than `Z` blocks are eligible, ties break by stash insertion
    /// order; the remainder stays eligible for shallower levels.
    fn evict_along_path(&mut self, leaf: LeafId) -> Vec<(NodeId, Bucket)> {
        let mut buckets = Vec::with_capacity(self.height as usize + 1);
        for level in (0..=self.height).rev() {
            let target = tree::node_on_path(leaf, level, self.height);
            let mut chosen = Vec::new();
            for block in self.stash.iter() {
                if chosen.len() == self.bucket_size {
                    break;
                }
                let assigned = self.position_map.position(block.index);
                if tree::node_on_path(assigned, level, self.height) == target {
                    chosen.push(block.index);
                }
            }
            let mut blocks = self.stash.take(&chosen);
            blocks.resize_with(self.bucket_size, Block::dummy);
            buckets.push((target, Bucket { blocks }));
        }
        buckets
    }

    /// Encodes, optionally encrypts, and writes one path's buckets.
    fn commit_path(&self, buckets: &[(NodeId, Bucket)]) -> Result<Vec<ApiLog>, OramError> {
        let mut objects = BTreeMap::new();
        for (node, bucket) in buckets {
            let plaintext = bucket.encode()?;
            let bytes = match &self.crypto {
                Some(crypto) => crypto.encrypt(&plaintext)?,
                None => plaintext,
            };
            objects.insert(node.to_string(), bytes);
        }
        Ok(self.backend.write_multiple(&objects)?)
    }

    /// Decrypts (if keyed) and decodes one node's blob, degrading to a
    /// dummy bucket on any failure.
    fn decode_bucket(&self, bytes: &[u8], name: &str, logs: &mut Vec<ApiLog>) -> Bucket {
        let plaintext = match &self.crypto {
            Some(crypto) => {
                if bytes.is_empty() {
                    return Bucket::dummy(self.bucket_size);
                }
                match crypto.decrypt(bytes) {
                    Ok(plaintext) => plaintext,
                    Err(err) => {
                        warn!("treating node {name} as empty: {err}");
                        logs.push(ApiLog::error(name, format!("decrypt-error: {err}")));
                        return Bucket::dummy(self.bucket_size);
                    }
                }
            }
            None => bytes.to_vec(),
        };
        Bucket::decode(&plaintext, self.bucket_size)
    }

    /// The identifying parameters of this engine.
    pub fn metadata(&self) -> Metadata {
        Metadata {
            num_blocks: self.num_blocks,
            bucket_size: self.bucket_size,
            tree_height: self.height,
            num_leaves: tree::num_leaves(self.height),
        }
    }

    /// Returns the logical capacity `N` in blocks.
    pub fn block_capacity(&self) -> usize {
        self.num_blocks
    }

    /// Returns the tree height `L`.
    pub fn height(&self) -> TreeHeight {
        self.height
    }

    /// Returns the number of leaves, `2^L`.
    pub fn num_leaves(&self) -> u64 {
        tree::num_leaves(self.height)
    }

    /// Returns the number of blocks currently held in the stash.
    pub fn stash_size(&self) -> usize {
        self.stash.len()
    }

    /// Whether a snapshot failed to persist; a restart after this point may
    /// observe an older state.
    pub fn is_degraded(&self) -> bool {
        self.degraded
    }

    /// The backend this engine stores its tree on.
    pub fn backend(&self) -> &B {
        &self.backend
    }
}
