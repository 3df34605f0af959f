// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 itsakeyfut
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Cache simulator throughput

use archcalc::core::cache::{CacheConfig, CacheSimulator, MappingPolicy};
use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;

/// Strided trace that cycles through more blocks than an 8-way set holds
fn trace() -> Vec<u64> {
    (0..4096u64).map(|i| (i * 0x1040) & 0xFFFF_FFFF).collect()
}

fn bench_reference(c: &mut Criterion) {
    let addresses = trace();

    for (name, policy) in [
        ("set_associative_8way", MappingPolicy::SetAssociative),
        ("direct_mapped", MappingPolicy::DirectMapped),
    ] {
        let config = CacheConfig::from_capacity(32, 32, 64, 8, policy).unwrap();
        c.bench_function(name, |b| {
            b.iter(|| {
                let mut sim = CacheSimulator::with_config(config).unwrap();
                for &address in &addresses {
                    black_box(sim.reference(black_box(address)).unwrap());
                }
                sim.summary()
            })
        });
    }
}

fn bench_decode(c: &mut Criterion) {
    let config = CacheConfig::from_capacity(32, 64, 64, 4, MappingPolicy::SetAssociative).unwrap();
    let sim = CacheSimulator::with_config(config).unwrap();
    let addresses = trace();

    c.bench_function("decode", |b| {
        b.iter(|| {
            for &address in &addresses {
                black_box(sim.decode(black_box(address)).unwrap());
            }
        })
    });
}

criterion_group!(benches, bench_reference, bench_decode);
criterion_main!(benches);
