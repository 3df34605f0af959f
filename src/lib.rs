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

//! archcalc: computer-architecture teaching calculators
//!
//! This crate provides the arithmetic behind a set of classroom
//! calculators, independent of any user interface.
//!
//! # Architecture
//!
//! - [`core`]: Calculator cores (pure bit arithmetic, no I/O)
//! - [`config`]: TOML session defaults
//!
//! # Example
//!
//! ```
//! use archcalc::core::cache::{CacheConfig, CacheSimulator, MappingPolicy};
//!
//! let config = CacheConfig::from_capacity(32, 64, 64, 4, MappingPolicy::SetAssociative)?;
//! let mut sim = CacheSimulator::with_config(config)?;
//!
//! let record = sim.reference_str("0x0100004")?;
//! assert!(!record.hit);
//! assert!(sim.reference_str("0x0100008")?.hit); // same block
//! # Ok::<(), archcalc::CalcError>(())
//! ```
//!
//! # Modules
//!
//! - [`core::cache`]: Cache address decomposition and tag-state simulation
//! - [`core::heap`]: Allocator block header encoding
//! - [`core::translate`]: Virtual address / TLB breakdown
//! - [`core::convert`]: Decimal, binary and hex conversion with two's complement
//! - [`core::address`]: Explicit-radix numeric parsing
//!
//! # Error Handling
//!
//! Each calculator returns its own error enum from [`core::error`]; all of
//! them convert into [`CalcError`], and [`Result<T>`] is an alias for
//! `Result<T, CalcError>`.

pub mod config;
pub mod core;

// Re-export commonly used types
pub use core::error::{CalcError, Result};
