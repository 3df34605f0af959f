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

//! Cache address decomposition and tag-state simulation
//!
//! A cache configuration splits every address into three fields:
//!
//! ```text
//! [address_bits-1 : offset+index]  Tag          - identifies the block
//! [offset+index-1 : offset]        Set index    - selects the set
//! [offset-1 : 0]                   Block offset - selects a byte in the block
//! ```
//!
//! [`CacheConfig`] validates a geometry and derives the field widths
//! ([`DerivedBits`]). [`CacheSimulator`] then replays a stream of
//! addresses against per-set tag histories and classifies each one as a
//! hit or a miss.
//!
//! # Example
//!
//! ```
//! use archcalc::core::cache::{CacheConfig, CacheSimulator, MappingPolicy};
//!
//! let mut sim = CacheSimulator::new();
//! let bits = sim
//!     .configure(CacheConfig {
//!         address_bits: 8,
//!         block_size_bytes: 4,
//!         num_sets: 4,
//!         associativity: 2,
//!         policy: MappingPolicy::SetAssociative,
//!     })
//!     .unwrap();
//! assert_eq!((bits.offset_bits, bits.index_bits, bits.tag_bits), (2, 2, 4));
//!
//! let first = sim.reference(0x1B).unwrap();
//! assert_eq!((first.tag, first.set_index, first.block_offset), (0x1, 0x2, 0x3));
//! assert!(!first.hit);
//! assert!(sim.reference(0x1B).unwrap().hit);
//! ```

mod engine;
mod set;

pub use engine::{CacheSimulator, SimulationRecord, SimulationSummary};
pub use set::CacheSet;

use super::address::low_mask;
use super::error::ConfigError;
use serde::{Deserialize, Serialize};

/// How blocks are placed into sets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MappingPolicy {
    /// One tag per set; a new tag replaces whatever the set held
    DirectMapped,
    /// `associativity` tags per set with least-recently-referenced eviction
    SetAssociative,
}

/// Cache geometry supplied by the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Width of an address in bits (1-64)
    pub address_bits: u32,
    /// Bytes per block, must be a power of two
    pub block_size_bytes: u64,
    /// Number of sets, must be a power of two
    pub num_sets: u64,
    /// Tag slots per set (ignored for direct-mapped caches, but must be >= 1)
    pub associativity: u32,
    /// Placement policy
    pub policy: MappingPolicy,
}

/// Field widths derived from a valid [`CacheConfig`]
///
/// `offset_bits + index_bits + tag_bits == address_bits` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivedBits {
    pub offset_bits: u32,
    pub index_bits: u32,
    pub tag_bits: u32,
}

/// Tag, set index and block offset of a single address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressFields {
    pub tag: u64,
    pub set_index: u64,
    pub block_offset: u64,
}

/// Block and set counts of a configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheGeometry {
    /// Total capacity in bytes (blocks x block size)
    pub capacity_bytes: u64,
    /// Total number of block frames
    pub total_blocks: u64,
    /// Number of sets
    pub total_sets: u64,
}

fn require_nonzero(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        Err(ConfigError::InvalidInput {
            field,
            reason: "must be greater than zero".to_string(),
        })
    } else {
        Ok(())
    }
}

fn require_power_of_two(field: &'static str, value: u64) -> Result<u32, ConfigError> {
    if value.is_power_of_two() {
        Ok(value.trailing_zeros())
    } else {
        Err(ConfigError::NotPowerOfTwo { field, value })
    }
}

pub(crate) fn require_address_width(field: &'static str, bits: u32) -> Result<(), ConfigError> {
    if bits == 0 || bits > 64 {
        Err(ConfigError::InvalidInput {
            field,
            reason: format!("must be between 1 and 64 bits (got {})", bits),
        })
    } else {
        Ok(())
    }
}

impl CacheConfig {
    /// Build a configuration from total capacity instead of a set count
    ///
    /// `num_sets = cache_size_kb * 1024 / (ways * block_size_bytes)` where
    /// `ways` is `associativity` for set-associative caches and 1 for
    /// direct-mapped ones. The result still has to pass [`validate`].
    ///
    /// [`validate`]: CacheConfig::validate
    ///
    /// # Example
    ///
    /// ```
    /// use archcalc::core::cache::{CacheConfig, MappingPolicy};
    ///
    /// let config =
    ///     CacheConfig::from_capacity(32, 64, 64, 4, MappingPolicy::SetAssociative).unwrap();
    /// assert_eq!(config.num_sets, 256);
    /// ```
    pub fn from_capacity(
        address_bits: u32,
        cache_size_kb: u64,
        block_size_bytes: u64,
        associativity: u32,
        policy: MappingPolicy,
    ) -> Result<Self, ConfigError> {
        require_nonzero("cache size", cache_size_kb)?;
        require_nonzero("block size", block_size_bytes)?;
        require_nonzero("associativity", associativity as u64)?;

        let ways = match policy {
            MappingPolicy::DirectMapped => 1,
            MappingPolicy::SetAssociative => associativity as u64,
        };

        let capacity = cache_size_kb
            .checked_mul(1024)
            .ok_or_else(|| ConfigError::InvalidInput {
                field: "cache size",
                reason: format!("{} KB overflows a 64-bit byte count", cache_size_kb),
            })?;
        let set_bytes = ways
            .checked_mul(block_size_bytes)
            .ok_or_else(|| ConfigError::InvalidInput {
                field: "block size",
                reason: "ways x block size overflows".to_string(),
            })?;

        if capacity < set_bytes || capacity % set_bytes != 0 {
            return Err(ConfigError::InvalidInput {
                field: "cache size",
                reason: format!(
                    "{} bytes does not divide into whole sets of {} bytes",
                    capacity, set_bytes
                ),
            });
        }

        Ok(Self {
            address_bits,
            block_size_bytes,
            num_sets: capacity / set_bytes,
            associativity,
            policy,
        })
    }

    /// Check every invariant and derive the field widths
    ///
    /// # Errors
    ///
    /// - [`ConfigError::InvalidInput`] for zero fields or an address width outside 1-64
    /// - [`ConfigError::NotPowerOfTwo`] for the block size or set count
    /// - [`ConfigError::NegativeTagBits`] when index and offset need more bits than the address has
    pub fn validate(&self) -> Result<DerivedBits, ConfigError> {
        require_address_width("address bits", self.address_bits)?;
        require_nonzero("block size", self.block_size_bytes)?;
        require_nonzero("number of sets", self.num_sets)?;
        require_nonzero("associativity", self.associativity as u64)?;

        let offset_bits = require_power_of_two("block size", self.block_size_bytes)?;
        let index_bits = require_power_of_two("number of sets", self.num_sets)?;

        let tag_bits = self
            .address_bits
            .checked_sub(offset_bits + index_bits)
            .ok_or(ConfigError::NegativeTagBits {
                address_bits: self.address_bits,
                index_bits,
                offset_bits,
            })?;

        Ok(DerivedBits {
            offset_bits,
            index_bits,
            tag_bits,
        })
    }

    /// Tag slots held by each set under this configuration's policy
    #[inline]
    pub fn ways(&self) -> usize {
        match self.policy {
            MappingPolicy::DirectMapped => 1,
            MappingPolicy::SetAssociative => self.associativity as usize,
        }
    }

    /// Block and set counts
    pub fn geometry(&self) -> CacheGeometry {
        let total_blocks = self.num_sets.saturating_mul(self.ways() as u64);
        CacheGeometry {
            capacity_bytes: total_blocks.saturating_mul(self.block_size_bytes),
            total_blocks,
            total_sets: self.num_sets,
        }
    }
}

impl DerivedBits {
    /// Total address width covered by the three fields
    #[inline]
    pub fn address_bits(&self) -> u32 {
        self.offset_bits + self.index_bits + self.tag_bits
    }

    /// Split `address` into tag, set index and block offset
    ///
    /// Bits above the address width are ignored; range checking is the
    /// caller's job.
    #[inline]
    pub fn split(&self, address: u64) -> AddressFields {
        let tag_shift = self.offset_bits + self.index_bits;
        AddressFields {
            block_offset: address & low_mask(self.offset_bits),
            set_index: address.checked_shr(self.offset_bits).unwrap_or(0) & low_mask(self.index_bits),
            tag: address.checked_shr(tag_shift).unwrap_or(0) & low_mask(self.tag_bits),
        }
    }

    /// Reassemble an address from its fields
    #[inline]
    pub fn join(&self, fields: &AddressFields) -> u64 {
        let tag_shift = self.offset_bits + self.index_bits;
        let tag = (fields.tag & low_mask(self.tag_bits))
            .checked_shl(tag_shift)
            .unwrap_or(0);
        let index = (fields.set_index & low_mask(self.index_bits))
            .checked_shl(self.offset_bits)
            .unwrap_or(0);
        tag | index | (fields.block_offset & low_mask(self.offset_bits))
    }
}
