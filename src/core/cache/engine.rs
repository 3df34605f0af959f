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

//! Cache simulation engine
//!
//! Replays address references against per-set tag histories.
//!
//! # Replacement
//!
//! - **Set-associative**: a referenced tag is moved (or appended) to the
//!   most-recent end of its set; when the set holds more than
//!   `associativity` tags the oldest are dropped.
//! - **Direct-mapped**: the referenced tag replaces the set's contents.
//!
//! Sets are independent. Tags are compared by decoded value, so two
//! different addresses in the same block always hit each other.

use super::set::CacheSet;
use super::{AddressFields, CacheConfig, DerivedBits, MappingPolicy};
use crate::core::address::{self, low_mask};
use crate::core::error::{ConfigError, DecodeError, ParseError};
use serde::Serialize;
use std::collections::BTreeMap;

/// Outcome of one simulated reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationRecord {
    /// Address as referenced
    pub raw_address: u64,
    pub tag: u64,
    pub set_index: u64,
    pub block_offset: u64,
    /// Whether the tag was resident before this reference
    pub hit: bool,
    /// Tags resident in the set after this reference, most recent first
    pub tag_state: Vec<u64>,
}

impl SimulationRecord {
    /// Decoded fields of the referenced address
    pub fn fields(&self) -> AddressFields {
        AddressFields {
            tag: self.tag,
            set_index: self.set_index,
            block_offset: self.block_offset,
        }
    }

    /// `"hit"` or `"miss"`
    pub fn outcome(&self) -> &'static str {
        if self.hit {
            "hit"
        } else {
            "miss"
        }
    }

    /// Tag state as comma-separated hex, most recent first
    pub fn tag_state_hex(&self) -> String {
        self.tag_state
            .iter()
            .map(|t| format!("0x{:x}", t))
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Hit and miss totals over the simulation log
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SimulationSummary {
    pub references: usize,
    pub hits: usize,
    pub misses: usize,
}

impl SimulationSummary {
    /// Fraction of references that hit, 0.0 for an empty log
    pub fn hit_rate(&self) -> f64 {
        if self.references == 0 {
            0.0
        } else {
            self.hits as f64 / self.references as f64
        }
    }
}

/// Active configuration with its derived widths
#[derive(Debug, Clone, Copy)]
struct Active {
    config: CacheConfig,
    bits: DerivedBits,
}

/// Cache tag-state simulator
///
/// Starts unconfigured; [`decode`](Self::decode) and
/// [`reference`](Self::reference) fail with [`DecodeError::NotConfigured`]
/// until [`configure`](Self::configure) succeeds.
///
/// Every mutating operation takes `&mut self`, so a simulator shared
/// between threads must be wrapped in a lock by the caller.
///
/// # Performance Characteristics
///
/// - **Decode**: O(1) - Shifts and masks only
/// - **Reference**: O(log S + W) - Set lookup in the map, then a scan of at most W tags
/// - **Reset**: O(S + R) - Drops every set and record
///
/// S is the number of sets touched so far, W the associativity and R the
/// number of logged references. Sets that were never referenced cost nothing.
#[derive(Debug, Default)]
pub struct CacheSimulator {
    active: Option<Active>,
    /// Sets created lazily on first reference, keyed by set index
    sets: BTreeMap<u64, CacheSet>,
    /// Append-only reference log
    records: Vec<SimulationRecord>,
}

impl CacheSimulator {
    /// Create an unconfigured simulator
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a simulator and configure it in one step
    pub fn with_config(config: CacheConfig) -> Result<Self, ConfigError> {
        let mut sim = Self::new();
        sim.configure(config)?;
        Ok(sim)
    }

    /// Install a new configuration
    ///
    /// Always discards every set and the simulation log. On failure the
    /// simulator is left unconfigured.
    pub fn configure(&mut self, config: CacheConfig) -> Result<DerivedBits, ConfigError> {
        self.sets.clear();
        self.records.clear();
        self.active = None;

        let bits = config.validate().map_err(|e| {
            log::warn!("Rejected cache configuration {:?}: {}", config, e);
            e
        })?;

        log::debug!(
            "Cache configured: {} address bits, offset={} index={} tag={}, {:?} x{}",
            config.address_bits,
            bits.offset_bits,
            bits.index_bits,
            bits.tag_bits,
            config.policy,
            config.ways()
        );

        self.active = Some(Active { config, bits });
        Ok(bits)
    }

    /// Clear all sets and the log, keeping the configuration
    pub fn reset(&mut self) {
        self.sets.clear();
        self.records.clear();
        log::debug!("Cache state reset");
    }

    /// Whether a configuration is installed
    #[inline]
    pub fn is_configured(&self) -> bool {
        self.active.is_some()
    }

    /// Installed configuration
    pub fn config(&self) -> Option<&CacheConfig> {
        self.active.as_ref().map(|a| &a.config)
    }

    /// Field widths of the installed configuration
    pub fn derived_bits(&self) -> Option<DerivedBits> {
        self.active.map(|a| a.bits)
    }

    fn active(&self) -> Result<&Active, DecodeError> {
        self.active.as_ref().ok_or(DecodeError::NotConfigured)
    }

    /// Split `address` into tag, set index and block offset
    ///
    /// # Errors
    ///
    /// - [`DecodeError::NotConfigured`] before a successful `configure`
    /// - [`DecodeError::MalformedAddress`] if `address` needs more than
    ///   `address_bits` bits
    pub fn decode(&self, address: u64) -> Result<AddressFields, DecodeError> {
        let active = self.active()?;
        if address > low_mask(active.config.address_bits) {
            return Err(ParseError::OutOfRange {
                input: format!("0x{:x}", address),
                bits: active.config.address_bits,
            }
            .into());
        }
        Ok(active.bits.split(address))
    }

    /// Reference `address`, classify it and update its set
    ///
    /// The returned record is also appended to [`records`](Self::records).
    ///
    /// # Example
    ///
    /// ```
    /// use archcalc::core::cache::{CacheConfig, CacheSimulator, MappingPolicy};
    ///
    /// let mut sim = CacheSimulator::with_config(CacheConfig {
    ///     address_bits: 8,
    ///     block_size_bytes: 4,
    ///     num_sets: 4,
    ///     associativity: 2,
    ///     policy: MappingPolicy::SetAssociative,
    /// })
    /// .unwrap();
    ///
    /// let first = sim.reference(0x1B).unwrap();
    /// assert!(!first.hit);
    /// assert_eq!((first.tag, first.set_index, first.block_offset), (0x1, 0x2, 0x3));
    ///
    /// // Same block, different offset
    /// assert!(sim.reference(0x18).unwrap().hit);
    ///
    /// // A second tag in set 2 becomes the most recent
    /// let second = sim.reference(0x28).unwrap();
    /// assert_eq!(second.tag_state, vec![0x2, 0x1]);
    /// ```
    pub fn reference(&mut self, address: u64) -> Result<SimulationRecord, DecodeError> {
        let fields = self.decode(address)?;
        let active = *self.active()?;

        let set = self.sets.entry(fields.set_index).or_default();
        let hit = set.contains(fields.tag);

        match active.config.policy {
            MappingPolicy::SetAssociative => {
                for evicted in set.promote(fields.tag, active.config.ways()) {
                    log::trace!("Set 0x{:x}: evicted tag 0x{:x}", fields.set_index, evicted);
                }
            }
            MappingPolicy::DirectMapped => {
                if let Some(evicted) = set.replace(fields.tag) {
                    log::trace!("Set 0x{:x}: replaced tag 0x{:x}", fields.set_index, evicted);
                }
            }
        }

        let record = SimulationRecord {
            raw_address: address,
            tag: fields.tag,
            set_index: fields.set_index,
            block_offset: fields.block_offset,
            hit,
            tag_state: set.recent_first(),
        };

        log::trace!(
            "0x{:x}: tag=0x{:x} set=0x{:x} offset=0x{:x} {}",
            address,
            fields.tag,
            fields.set_index,
            fields.block_offset,
            record.outcome()
        );

        self.records.push(record.clone());
        Ok(record)
    }

    /// Parse `text` as hexadecimal (optional `0x` prefix) and reference it
    pub fn reference_str(&mut self, text: &str) -> Result<SimulationRecord, DecodeError> {
        let bits = self.active()?.config.address_bits;
        let address = address::parse_hex(text, bits)?;
        self.reference(address)
    }

    /// Reference each address in order
    ///
    /// Stops at the first failure; records produced before it stay in the log.
    pub fn reference_all<I>(&mut self, addresses: I) -> Result<Vec<SimulationRecord>, DecodeError>
    where
        I: IntoIterator<Item = u64>,
    {
        addresses
            .into_iter()
            .map(|address| self.reference(address))
            .collect()
    }

    /// Tags resident in `set_index`, most recent first
    ///
    /// Empty for a set that has never been referenced.
    pub fn current_tag_state(&self, set_index: u64) -> Vec<u64> {
        self.sets
            .get(&set_index)
            .map(CacheSet::recent_first)
            .unwrap_or_default()
    }

    /// All sets referenced so far, in set-index order
    pub fn sets(&self) -> impl Iterator<Item = (u64, &CacheSet)> {
        self.sets.iter().map(|(&index, set)| (index, set))
    }

    /// Simulation log, oldest first
    pub fn records(&self) -> &[SimulationRecord] {
        &self.records
    }

    /// Hit and miss totals over the log
    pub fn summary(&self) -> SimulationSummary {
        let hits = self.records.iter().filter(|r| r.hit).count();
        SimulationSummary {
            references: self.records.len(),
            hits,
            misses: self.records.len() - hits,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 8-bit addresses, 4-byte blocks, 4 sets: offset=2, index=2, tag=4
    fn example_config(associativity: u32, policy: MappingPolicy) -> CacheConfig {
        CacheConfig {
            address_bits: 8,
            block_size_bytes: 4,
            num_sets: 4,
            associativity,
            policy,
        }
    }

    /// Single-set cache where the address is `tag << 2`
    fn single_set(associativity: u32, policy: MappingPolicy) -> CacheSimulator {
        CacheSimulator::with_config(CacheConfig {
            address_bits: 16,
            block_size_bytes: 4,
            num_sets: 1,
            associativity,
            policy,
        })
        .unwrap()
    }

    fn addr(tag: u64) -> u64 {
        tag << 2
    }

    #[test]
    fn test_unconfigured_rejects_decode_and_reference() {
        let mut sim = CacheSimulator::new();
        assert!(!sim.is_configured());
        assert_eq!(sim.decode(0x1B), Err(DecodeError::NotConfigured));
        assert_eq!(sim.reference(0x1B), Err(DecodeError::NotConfigured));
        assert_eq!(sim.reference_str("0x1B"), Err(DecodeError::NotConfigured));
        assert!(sim.records().is_empty());
    }

    #[test]
    fn test_configure_returns_derived_bits() {
        let mut sim = CacheSimulator::new();
        let bits = sim
            .configure(example_config(2, MappingPolicy::SetAssociative))
            .unwrap();
        assert_eq!(
            bits,
            DerivedBits {
                offset_bits: 2,
                index_bits: 2,
                tag_bits: 4
            }
        );
        assert!(sim.is_configured());
        assert_eq!(sim.derived_bits(), Some(bits));
    }

    #[test]
    fn test_failed_configure_leaves_simulator_unconfigured() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        sim.reference(0x1B).unwrap();

        let mut bad = example_config(2, MappingPolicy::SetAssociative);
        bad.block_size_bytes = 6;
        assert!(matches!(
            sim.configure(bad),
            Err(ConfigError::NotPowerOfTwo { value: 6, .. })
        ));

        assert!(!sim.is_configured());
        assert!(sim.records().is_empty());
        assert_eq!(sim.decode(0x1B), Err(DecodeError::NotConfigured));
    }

    #[test]
    fn test_decode_example_address() {
        let sim = CacheSimulator::with_config(example_config(1, MappingPolicy::DirectMapped)).unwrap();
        assert_eq!(
            sim.decode(0x1B),
            Ok(AddressFields {
                tag: 0x1,
                set_index: 0x2,
                block_offset: 0x3
            })
        );
    }

    #[test]
    fn test_decode_rejects_address_wider_than_config() {
        let sim = CacheSimulator::with_config(example_config(1, MappingPolicy::DirectMapped)).unwrap();
        assert!(matches!(
            sim.decode(0x100),
            Err(DecodeError::MalformedAddress(ParseError::OutOfRange { bits: 8, .. }))
        ));
    }

    #[test]
    fn test_reference_str_parses_hex() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        let record = sim.reference_str("0x1b").unwrap();
        assert_eq!(record.raw_address, 0x1B);
        assert!(sim.reference_str("1B").unwrap().hit);

        assert!(matches!(
            sim.reference_str("0xZZ"),
            Err(DecodeError::MalformedAddress(ParseError::InvalidDigit { .. }))
        ));
        assert!(matches!(
            sim.reference_str("0x1FF"),
            Err(DecodeError::MalformedAddress(ParseError::OutOfRange { .. }))
        ));
        assert_eq!(sim.records().len(), 2);
    }

    #[test]
    fn test_miss_then_hit() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        let first = sim.reference(0x1B).unwrap();
        let second = sim.reference(0x1B).unwrap();
        assert!(!first.hit);
        assert!(second.hit);
        assert_eq!(second.tag_state, vec![0x1]);
    }

    #[test]
    fn test_same_block_different_offset_hits() {
        let mut sim = CacheSimulator::with_config(example_config(1, MappingPolicy::DirectMapped)).unwrap();
        assert!(!sim.reference(0x18).unwrap().hit);
        // Same tag and set, different byte offset
        assert!(sim.reference(0x1B).unwrap().hit);
    }

    #[test]
    fn test_lru_eviction_two_way() {
        let mut sim = single_set(2, MappingPolicy::SetAssociative);

        assert!(!sim.reference(addr(0xA)).unwrap().hit);
        assert!(!sim.reference(addr(0xB)).unwrap().hit);
        let third = sim.reference(addr(0xC)).unwrap();
        assert!(!third.hit);
        assert_eq!(third.tag_state, vec![0xC, 0xB]);

        // 0xA was evicted, 0xB is still resident
        assert!(!sim.reference(addr(0xA)).unwrap().hit);
        assert!(sim.reference(addr(0xC)).unwrap().hit);
    }

    #[test]
    fn test_lru_eviction_then_hit_on_survivor() {
        let mut sim = single_set(2, MappingPolicy::SetAssociative);
        for tag in [0xA, 0xB, 0xC] {
            sim.reference(addr(tag)).unwrap();
        }
        assert!(sim.reference(addr(0xB)).unwrap().hit);
        assert!(!sim.reference(addr(0xA)).unwrap().hit);
    }

    #[test]
    fn test_hit_repromotes_recency() {
        let mut sim = single_set(2, MappingPolicy::SetAssociative);
        sim.reference(addr(0xA)).unwrap();
        sim.reference(addr(0xB)).unwrap();

        // Touch 0xA so 0xB becomes the oldest
        let touch = sim.reference(addr(0xA)).unwrap();
        assert!(touch.hit);
        assert_eq!(touch.tag_state, vec![0xA, 0xB]);

        sim.reference(addr(0xC)).unwrap();
        assert_eq!(sim.current_tag_state(0), vec![0xC, 0xA]);
        assert!(!sim.reference(addr(0xB)).unwrap().hit);
    }

    #[test]
    fn test_direct_mapped_overwrite() {
        let mut sim = single_set(1, MappingPolicy::DirectMapped);
        assert!(!sim.reference(addr(0x1)).unwrap().hit);
        let second = sim.reference(addr(0x2)).unwrap();
        assert!(!second.hit);
        assert_eq!(second.tag_state, vec![0x2]);
        assert!(!sim.reference(addr(0x1)).unwrap().hit);
    }

    #[test]
    fn test_direct_mapped_ignores_associativity() {
        let mut sim = single_set(8, MappingPolicy::DirectMapped);
        sim.reference(addr(0x1)).unwrap();
        sim.reference(addr(0x2)).unwrap();
        assert_eq!(sim.current_tag_state(0), vec![0x2]);
        assert!(!sim.reference(addr(0x1)).unwrap().hit);
    }

    #[test]
    fn test_sets_are_independent() {
        let mut sim = CacheSimulator::with_config(example_config(1, MappingPolicy::SetAssociative)).unwrap();
        // Same tag 0x1, sets 0 and 1
        assert!(!sim.reference(0x10).unwrap().hit);
        assert!(!sim.reference(0x14).unwrap().hit);
        // Different tag in set 0 evicts only set 0
        assert!(!sim.reference(0x20).unwrap().hit);
        assert!(sim.reference(0x14).unwrap().hit);

        assert_eq!(sim.current_tag_state(0), vec![0x2]);
        assert_eq!(sim.current_tag_state(1), vec![0x1]);
        assert_eq!(sim.current_tag_state(3), Vec::<u64>::new());
        assert_eq!(sim.sets().count(), 2);
    }

    #[test]
    fn test_reset_is_idempotent_and_keeps_config() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        sim.reference(0x1B).unwrap();

        sim.reset();
        assert!(sim.records().is_empty());
        assert_eq!(sim.sets().count(), 0);

        sim.reset();
        assert!(sim.records().is_empty());
        assert_eq!(sim.sets().count(), 0);
        assert!(sim.is_configured());

        // Previously resident tag misses again
        assert!(!sim.reference(0x1B).unwrap().hit);
    }

    #[test]
    fn test_reconfigure_discards_state() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        sim.reference(0x1B).unwrap();
        sim.reference(0x1B).unwrap();

        sim.configure(example_config(4, MappingPolicy::SetAssociative))
            .unwrap();
        assert!(sim.records().is_empty());
        assert!(sim.current_tag_state(2).is_empty());
        assert!(!sim.reference(0x1B).unwrap().hit);
    }

    #[test]
    fn test_records_log_and_summary() {
        let mut sim = single_set(2, MappingPolicy::SetAssociative);
        let records = sim
            .reference_all([addr(0xA), addr(0xA), addr(0xB), addr(0xA)])
            .unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(sim.records(), records.as_slice());

        let summary = sim.summary();
        assert_eq!(summary.references, 4);
        assert_eq!(summary.hits, 2);
        assert_eq!(summary.misses, 2);
        assert!((summary.hit_rate() - 0.5).abs() < f64::EPSILON);
        assert_eq!(CacheSimulator::new().summary().hit_rate(), 0.0);
    }

    #[test]
    fn test_reference_all_stops_at_first_error() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        let result = sim.reference_all([0x10, 0x1000, 0x14]);
        assert!(matches!(result, Err(DecodeError::MalformedAddress(_))));
        assert_eq!(sim.records().len(), 1);
    }

    #[test]
    fn test_record_formatting() {
        let mut sim = single_set(4, MappingPolicy::SetAssociative);
        sim.reference(addr(0xA)).unwrap();
        let record = sim.reference(addr(0x1F)).unwrap();
        assert_eq!(record.outcome(), "miss");
        assert_eq!(record.tag_state_hex(), "0x1f,0xa");
        assert_eq!(record.fields().tag, 0x1F);
    }

    #[test]
    fn test_record_serializes_to_json() {
        let mut sim = CacheSimulator::with_config(example_config(2, MappingPolicy::SetAssociative)).unwrap();
        let record = sim.reference(0x1B).unwrap();
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["tag"], 1);
        assert_eq!(json["set_index"], 2);
        assert_eq!(json["block_offset"], 3);
        assert_eq!(json["hit"], false);
        assert_eq!(json["tag_state"], serde_json::json!([1]));
    }
}
