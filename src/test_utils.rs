// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains common test utilities for exercising the engine
//! against an in-memory backend.

use crate::{
    backend::MemoryBackend,
    path_oram::{OramConfig, PathOram},
    BlockIndex, BucketSize,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

/// Builds an engine over a fresh in-memory backend with persistence
/// disabled and a fixed RNG seed.
pub fn memory_engine(num_blocks: usize, bucket_size: BucketSize) -> PathOram<MemoryBackend, StdRng> {
    let mut config = OramConfig::new(num_blocks);
    config.bucket_size = bucket_size;
    config.persist = false;
    PathOram::new(config, MemoryBackend::new(), StdRng::seed_from_u64(0))
        .expect("valid test configuration")
}

/// Tests read-after-write on a workload of uniformly random reads and
/// writes, against a mirror array.
pub fn test_correctness_random_workload(num_blocks: usize, num_operations: u32) {
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = memory_engine(num_blocks, crate::DEFAULT_BLOCKS_PER_BUCKET);
    let mut mirror_array: Vec<Vec<u8>> = vec![Vec::new(); num_blocks];

    for _ in 0..num_operations {
        let index = rng.gen_range(0..num_blocks);
        let read_versus_write: bool = rng.gen();

        if read_versus_write {
            let (data, _) = oram.read(index as BlockIndex).expect("read failed");
            assert_eq!(data, mirror_array[index]);
        } else {
            let value: u64 = rng.gen();
            let data = value.to_le_bytes().to_vec();
            oram.write(index as BlockIndex, data.clone()).expect("write failed");
            mirror_array[index] = data;
        }
    }

    for index in 0..num_blocks {
        let (data, _) = oram.read(index as BlockIndex).expect("read failed");
        assert_eq!(data, mirror_array[index], "{index}");
    }
}

/// Tests read-after-write on repeated sequential passes over every block.
pub fn test_correctness_linear_workload(num_blocks: usize, num_passes: u32) {
    let mut rng = StdRng::seed_from_u64(0);

    let mut oram = memory_engine(num_blocks, crate::DEFAULT_BLOCKS_PER_BUCKET);
    let mut mirror_array: Vec<Vec<u8>> = vec![Vec::new(); num_blocks];

    for _ in 0..num_passes {
        for index in 0..num_blocks {
            let read_versus_write: bool = rng.gen();

            if read_versus_write {
                let (data, _) = oram.read(index as BlockIndex).expect("read failed");
                assert_eq!(data, mirror_array[index]);
            } else {
                let value: u64 = rng.gen();
                let data = value.to_le_bytes().to_vec();
                oram.write(index as BlockIndex, data.clone()).expect("write failed");
                mirror_array[index] = data;
            }
        }
    }

    for index in 0..num_blocks {
        let (data, _) = oram.read(index as BlockIndex).expect("read failed");
        assert_eq!(data, mirror_array[index], "{index}");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_correctness_random_workload_8_1000() {
        test_correctness_random_workload(8, 1000);
    }

    #[test]
    fn test_correctness_random_workload_64_1000() {
        test_correctness_random_workload(64, 1000);
    }

    #[test]
    fn test_correctness_random_workload_100_1000() {
        // A capacity that is not a power of two still rounds up to a full
        // tree.
        test_correctness_random_workload(100, 1000);
    }

    #[test]
    fn test_correctness_linear_workload_8_20() {
        test_correctness_linear_workload(8, 20);
    }

    #[test]
    fn test_correctness_linear_workload_64_10() {
        test_correctness_linear_workload(64, 10);
    }

    #[test]
    fn test_correctness_linear_workload_1_100() {
        test_correctness_linear_workload(1, 100);
    }
}
