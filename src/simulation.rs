// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Offline stash-occupancy simulator.
//!
//! Drives a long sequence of accesses against an in-memory backend — no
//! network, no persistence, no encryption — to isolate the distribution of
//! stash occupancy as a function of `(N, Z, access pattern)`.

use crate::{
    backend::MemoryBackend,
    path_oram::{OramConfig, PathOram},
    BlockIndex, BucketSize, Operation, OramError,
};
use log::{info, warn};
use rand::{rngs::StdRng, SeedableRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Number of populating writes performed before occupancy is recorded.
pub const DEFAULT_WARMUP_ACCESSES: usize = 3_000;

const DEFAULT_OUTPUT_DIR: &str = "simulations";

/// Returned when a simulation cannot run to completion.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The results file could not be written.
    #[error("simulation output failure: {0}")]
    Io(#[from] std::io::Error),

    /// The driven engine failed an access.
    #[error(transparent)]
    Oram(#[from] OramError),
}

/// Measures the stash-occupancy distribution of a Path ORAM instance.
///
/// After a write-only warm-up, every recorded access samples `|S|` into a
/// PMF; the run ends by writing the complementary cumulative distribution
/// (`CCDF[k]` = number of samples with occupancy `>= k`) as `k,count` lines.
#[derive(Clone, Debug)]
pub struct StashSizeSimulator {
    bucket_size: BucketSize,
    num_blocks: usize,
    num_accesses: usize,
    sim_number: usize,
    warmup_accesses: usize,
    output_dir: PathBuf,
}

impl StashSizeSimulator {
    /// Returns a simulator for an ORAM of `num_blocks` blocks with
    /// `bucket_size` blocks per node, recording `num_accesses` accesses into
    /// `simulation{sim_number}.txt`.
    pub fn new(
        bucket_size: BucketSize,
        num_blocks: usize,
        num_accesses: usize,
        sim_number: usize,
    ) -> Self {
        Self {
            bucket_size,
            num_blocks,
            num_accesses,
            sim_number,
            warmup_accesses: DEFAULT_WARMUP_ACCESSES,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
        }
    }

    /// Overrides the number of warm-up writes.
    pub fn with_warmup_accesses(mut self, warmup_accesses: usize) -> Self {
        self.warmup_accesses = warmup_accesses;
        self
    }

    /// Overrides where the results file is written.
    pub fn with_output_dir(mut self, output_dir: impl Into<PathBuf>) -> Self {
        self.output_dir = output_dir.into();
        self
    }

    fn sample_data(i: usize) -> Vec<u8> {
        format!("block_data_{i}").into_bytes()
    }

    /// Runs the simulation and returns the path of the results file.
    pub fn run(&self) -> Result<PathBuf, SimulationError> {
        let mut config = OramConfig::new(self.num_blocks);
        config.bucket_size = self.bucket_size;
        config.persist = false;
        let mut oram = PathOram::new(config, MemoryBackend::new(), StdRng::from_entropy())?;

        info!(
            "warming up the stash with {} writes over {} blocks",
            self.warmup_accesses, self.num_blocks
        );
        for i in 0..self.warmup_accesses {
            let index = (i % self.num_blocks) as BlockIndex;
            oram.access(Operation::Write, index, Some(Self::sample_data(i)))?;
        }

        // pmf[k] counts accesses that left exactly k blocks in the stash.
        let mut pmf = vec![0u64; self.num_blocks + 1];
        for i in 0..self.num_accesses {
            let index = (i % self.num_blocks) as BlockIndex;
            oram.access(Operation::Read, index, None)?;

            let occupancy = oram.stash_size();
            match pmf.get_mut(occupancy) {
                Some(count) => *count += 1,
                None => warn!("stash occupancy {occupancy} exceeds the recording range"),
            }
            if (i + 1) % 1_000 == 0 {
                info!(
                    "recorded {} / {} accesses, stash size {}",
                    i + 1,
                    self.num_accesses,
                    occupancy
                );
            }
        }

        // CCDF[k] = sum of pmf[j] for j >= k, computed back to front.
        let mut ccdf = vec![0u64; pmf.len()];
        ccdf[pmf.len() - 1] = pmf[pmf.len() - 1];
        for k in (0..pmf.len() - 1).rev() {
            ccdf[k] = pmf[k] + ccdf[k + 1];
        }

        self.write_results(&ccdf)
    }

    fn write_results(&self, ccdf: &[u64]) -> Result<PathBuf, SimulationError> {
        fs::create_dir_all(&self.output_dir)?;
        let path = self.output_dir.join(format!("simulation{}.txt", self.sim_number));
        info!("writing results to {}", path.display());

        let mut writer = BufWriter::new(File::create(&path)?);
        for (occupancy, count) in ccdf.iter().enumerate() {
            // The tail of the distribution is all zeroes; stop at the first.
            if *count == 0 && occupancy > 0 {
                break;
            }
            writeln!(writer, "{occupancy},{count}")?;
        }
        writer.flush()?;
        Ok(path)
    }

    /// The directory results are written into.
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }
}
