// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! This module contains benchmarks for the oblivious storage engine over
//! the in-memory backend.

extern crate criterion;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use oram_store::test_utils::memory_engine;
use oram_store::{BlockIndex, DEFAULT_BLOCKS_PER_BUCKET};
use rand::{rngs::StdRng, Rng, SeedableRng};

const CAPACITIES_TO_BENCHMARK: [usize; 2] = [64, 256];

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    for capacity in CAPACITIES_TO_BENCHMARK {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |bencher, &capacity| {
                let mut oram = memory_engine(capacity, DEFAULT_BLOCKS_PER_BUCKET);
                let mut rng = StdRng::seed_from_u64(0);
                for index in 0..capacity {
                    oram.write(index as BlockIndex, index.to_le_bytes().to_vec())
                        .expect("populating write failed");
                }
                bencher.iter(|| {
                    let index = rng.gen_range(0..capacity) as BlockIndex;
                    oram.read(index).expect("read failed")
                });
            },
        );
    }
    group.finish();
}

fn benchmark_write(c: &mut Criterion) {
    let mut group = c.benchmark_group("write");
    for capacity in CAPACITIES_TO_BENCHMARK {
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            &capacity,
            |bencher, &capacity| {
                let mut oram = memory_engine(capacity, DEFAULT_BLOCKS_PER_BUCKET);
                let mut rng = StdRng::seed_from_u64(0);
                bencher.iter(|| {
                    let index = rng.gen_range(0..capacity) as BlockIndex;
                    let value: u64 = rng.gen();
                    oram.write(index, value.to_le_bytes().to_vec())
                        .expect("write failed")
                });
            },
        );
    }
    group.finish();
}

criterion_group!(benches, benchmark_read, benchmark_write);
criterion_main!(benches);
