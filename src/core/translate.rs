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

//! Virtual address breakdown for a set-associative TLB
//!
//! ```text
//! Virtual address:  [        VPN         | page offset ]
//! VPN:              [ TLB tag | TLB index ]
//! ```
//!
//! # Example
//!
//! ```
//! use archcalc::core::address::Radix;
//! use archcalc::core::translate::TlbConfig;
//!
//! let config = TlbConfig {
//!     virtual_address_width: 12,
//!     page_size: 32,
//!     tlb_sets: 4,
//!     tlb_ways: 4,
//! };
//! let t = config.translate_str("101101101101", Radix::Binary).unwrap();
//! assert_eq!((t.vpn, t.tlb_index, t.tlb_tag, t.offset), (91, 3, 0x16, 13));
//! ```

use super::address::{self, low_mask, Radix};
use super::cache::require_address_width;
use super::error::{ConfigError, ParseError, TranslateError};
use serde::{Deserialize, Serialize};

/// Virtual memory and TLB geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlbConfig {
    /// Virtual address width in bits (1-64)
    pub virtual_address_width: u32,
    /// Page size in bytes, power of two
    pub page_size: u64,
    /// Number of TLB sets, power of two
    pub tlb_sets: u64,
    /// Entries per TLB set
    pub tlb_ways: u32,
}

/// Field widths derived from a [`TlbConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TlbGeometry {
    pub offset_bits: u32,
    pub index_bits: u32,
    pub vpn_bits: u32,
    pub tag_bits: u32,
}

/// Breakdown of one virtual address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Translation {
    pub address: u64,
    /// Virtual page number
    pub vpn: u64,
    pub tlb_index: u64,
    pub tlb_tag: u64,
    /// Byte offset within the page
    pub offset: u64,
}

impl TlbConfig {
    /// Validate and derive field widths
    pub fn geometry(&self) -> Result<TlbGeometry, ConfigError> {
        require_address_width("virtual address width", self.virtual_address_width)?;

        for (field, value) in [("page size", self.page_size), ("TLB sets", self.tlb_sets)] {
            if value == 0 {
                return Err(ConfigError::InvalidInput {
                    field,
                    reason: "must be greater than zero".to_string(),
                });
            }
            if !value.is_power_of_two() {
                return Err(ConfigError::NotPowerOfTwo { field, value });
            }
        }
        if self.tlb_ways == 0 {
            return Err(ConfigError::InvalidInput {
                field: "TLB ways",
                reason: "must be greater than zero".to_string(),
            });
        }

        let offset_bits = self.page_size.trailing_zeros();
        let index_bits = self.tlb_sets.trailing_zeros();
        let tag_bits = self
            .virtual_address_width
            .checked_sub(offset_bits + index_bits)
            .ok_or(ConfigError::NegativeTagBits {
                address_bits: self.virtual_address_width,
                index_bits,
                offset_bits,
            })?;

        Ok(TlbGeometry {
            offset_bits,
            index_bits,
            vpn_bits: index_bits + tag_bits,
            tag_bits,
        })
    }

    /// Total TLB entries
    pub fn entries(&self) -> u64 {
        self.tlb_sets.saturating_mul(self.tlb_ways as u64)
    }

    /// Break `address` into VPN, TLB index, TLB tag and page offset
    ///
    /// # Errors
    ///
    /// - [`TranslateError::Config`] if the geometry is invalid
    /// - [`TranslateError::Address`] if `address` does not fit the address width
    pub fn translate(&self, address: u64) -> Result<Translation, TranslateError> {
        let geometry = self.geometry()?;
        if address > low_mask(self.virtual_address_width) {
            return Err(ParseError::OutOfRange {
                input: format!("0x{:x}", address),
                bits: self.virtual_address_width,
            }
            .into());
        }

        let vpn = address.checked_shr(geometry.offset_bits).unwrap_or(0);
        Ok(Translation {
            address,
            vpn,
            tlb_index: vpn & low_mask(geometry.index_bits),
            tlb_tag: vpn.checked_shr(geometry.index_bits).unwrap_or(0),
            offset: address & low_mask(geometry.offset_bits),
        })
    }

    /// Parse `text` in `radix` and translate it
    pub fn translate_str(&self, text: &str, radix: Radix) -> Result<Translation, TranslateError> {
        self.geometry()?;
        let address = address::parse(text, radix, self.virtual_address_width)?;
        self.translate(address)
    }
}
