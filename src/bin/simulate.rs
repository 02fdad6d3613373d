// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Driver for the stash-size simulator.
//!
//! Usage: `simulate [num_blocks] [bucket_size] [num_accesses] [sim_number]`.

use oram_store::StashSizeSimulator;
use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

fn parse_or(argument: Option<String>, default: usize) -> usize {
    argument.and_then(|value| value.parse().ok()).unwrap_or(default)
}

fn main() {
    TermLogger::init(
        LevelFilter::Info,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("logger initialization failed");

    let mut arguments = std::env::args().skip(1);
    let num_blocks = parse_or(arguments.next(), 1 << 16);
    let bucket_size = parse_or(arguments.next(), 4);
    let num_accesses = parse_or(arguments.next(), 5_000);
    let sim_number = parse_or(arguments.next(), 1);

    let simulator = StashSizeSimulator::new(bucket_size, num_blocks, num_accesses, sim_number);
    match simulator.run() {
        Ok(path) => println!("results written to {}", path.display()),
        Err(err) => {
            eprintln!("simulation failed: {err}");
            std::process::exit(1);
        }
    }
}
