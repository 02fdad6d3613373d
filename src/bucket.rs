// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Block and bucket structures and their on-backend codec.

use crate::{BlockIndex, BucketSize};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The sentinel block index marking a dummy block.
pub const DUMMY_BLOCK_INDEX: BlockIndex = -1;

/// Returned when a bucket cannot be serialized for writing.
#[derive(Debug, Error)]
#[error("bucket serialization failed: {0}")]
pub struct CodecError(#[from] serde_json::Error);

/// The atomic unit of client data: an opaque payload tagged with its logical
/// block index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    /// Logical block id in `[0, N)`, or [`DUMMY_BLOCK_INDEX`].
    pub index: BlockIndex,
    /// Opaque payload. Dummy blocks carry no data.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
}

impl Block {
    /// Instantiates a block holding `data` at logical index `index`.
    pub fn new(index: BlockIndex, data: Vec<u8>) -> Self {
        Self { index, data }
    }

    /// Returns a dummy block.
    pub fn dummy() -> Self {
        Self {
            index: DUMMY_BLOCK_INDEX,
            data: Vec::new(),
        }
    }

    /// Whether this block is the padding sentinel rather than client data.
    pub fn is_dummy(&self) -> bool {
        self.index == DUMMY_BLOCK_INDEX
    }
}

impl Default for Block {
    fn default() -> Self {
        Block::dummy()
    }
}

/// A fixed-capacity container of exactly `Z` blocks, persisted as one backend
/// object per tree node. Dummy blocks pad the remainder, so the backend
/// cannot tell how many real blocks a node holds.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// The blocks stored by this bucket, dummy-padded to the bucket size.
    pub blocks: Vec<Block>,
}

impl Bucket {
    /// Returns a bucket of `bucket_size` dummy blocks.
    pub fn dummy(bucket_size: BucketSize) -> Self {
        Self {
            blocks: vec![Block::dummy(); bucket_size],
        }
    }

    /// Serializes this bucket for the backend.
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Deserializes a backend blob into a bucket of exactly `bucket_size`
    /// blocks.
    ///
    /// Empty input decodes as all dummies: a node that was never written is
    /// indistinguishable from a cleared one. Malformed input likewise decodes
    /// as all dummies, with a warning; failing here would let the backend
    /// distinguish fresh nodes from stale ones by serving garbage.
    pub fn decode(bytes: &[u8], bucket_size: BucketSize) -> Self {
        if bytes.is_empty() {
            return Self::dummy(bucket_size);
        }
        match serde_json::from_slice::<Bucket>(bytes) {
            Ok(bucket) if bucket.blocks.len() == bucket_size => bucket,
            Ok(bucket) => {
                log::warn!(
                    "discarding bucket with {} blocks where {} were expected",
                    bucket.blocks.len(),
                    bucket_size
                );
                Self::dummy(bucket_size)
            }
            Err(err) => {
                log::warn!("discarding undecodable bucket: {err}");
                Self::dummy(bucket_size)
            }
        }
    }

    /// Iterates over the non-dummy blocks of this bucket.
    pub fn real_blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.iter().filter(|block| !block.is_dummy())
    }
}

mod base64_bytes {
    use base64::{engine::general_purpose::STANDARD, Engine as _};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_preserves_blocks() {
        let bucket = Bucket {
            blocks: vec![
                Block::new(3, b"hello".to_vec()),
                Block::new(7, vec![0, 159, 146, 150]),
                Block::dummy(),
                Block::dummy(),
            ],
        };
        let encoded = bucket.encode().unwrap();
        assert_eq!(Bucket::decode(&encoded, 4), bucket);
    }

    #[test]
    fn empty_input_decodes_as_dummies() {
        let bucket = Bucket::decode(&[], 4);
        assert_eq!(bucket, Bucket::dummy(4));
        assert_eq!(bucket.blocks.len(), 4);
    }

    #[test]
    fn malformed_input_decodes_as_dummies() {
        assert_eq!(Bucket::decode(b"not json at all", 4), Bucket::dummy(4));
        assert_eq!(Bucket::decode(&[0xff, 0x00, 0x17], 4), Bucket::dummy(4));
    }

    #[test]
    fn wrong_cardinality_decodes_as_dummies() {
        let short = Bucket {
            blocks: vec![Block::new(0, b"x".to_vec())],
        };
        let encoded = short.encode().unwrap();
        assert_eq!(Bucket::decode(&encoded, 4), Bucket::dummy(4));
    }

    #[test]
    fn real_blocks_skips_padding() {
        let bucket = Bucket {
            blocks: vec![
                Block::dummy(),
                Block::new(1, b"a".to_vec()),
                Block::dummy(),
                Block::new(2, b"b".to_vec()),
            ],
        };
        let indices: Vec<_> = bucket.real_blocks().map(|block| block.index).collect();
        assert_eq!(indices, vec![1, 2]);
    }

    #[test]
    fn dummy_blocks_carry_no_data() {
        assert!(Block::dummy().data.is_empty());
        assert!(Block::dummy().is_dummy());
        assert!(!Block::new(0, Vec::new()).is_dummy());
    }
}
