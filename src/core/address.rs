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

//! Explicit-radix numeric parsing
//!
//! Every calculator takes numbers as text typed by a student. The radix is
//! always declared by the caller; nothing here guesses it from the input,
//! and invalid text is an error rather than zero.
//!
//! # Example
//!
//! ```
//! use archcalc::core::address::{parse, Radix};
//!
//! assert_eq!(parse("0x1B", Radix::Hex, 8), Ok(0x1B));
//! assert_eq!(parse("1B", Radix::Hex, 8), Ok(0x1B));
//! assert!(parse("0x100", Radix::Hex, 8).is_err()); // needs 9 bits
//! ```

use super::error::ParseError;
use serde::{Deserialize, Serialize};

/// Number base for textual input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Radix {
    /// Base 2, optional `0b`/`0B` prefix
    Binary,
    /// Base 10, no prefix
    Decimal,
    /// Base 16, optional `0x`/`0X` prefix
    Hex,
}

impl Radix {
    /// Numeric base
    #[inline]
    pub const fn base(self) -> u32 {
        match self {
            Radix::Binary => 2,
            Radix::Decimal => 10,
            Radix::Hex => 16,
        }
    }

    fn strip_prefix(self, text: &str) -> &str {
        let prefixes: &[&str] = match self {
            Radix::Binary => &["0b", "0B"],
            Radix::Decimal => &[],
            Radix::Hex => &["0x", "0X"],
        };
        prefixes
            .iter()
            .find_map(|p| text.strip_prefix(*p))
            .unwrap_or(text)
    }
}

/// Mask with the low `bits` bits set
///
/// Saturates at 64 bits so that full-width masks do not overflow the shift.
#[inline(always)]
pub const fn low_mask(bits: u32) -> u64 {
    if bits >= 64 {
        u64::MAX
    } else {
        (1u64 << bits) - 1
    }
}

/// Parse `text` in `radix` and require the value to fit in `bits` bits
///
/// Surrounding whitespace is ignored. Signs are not accepted; signed
/// decimal input is handled by [`crate::core::convert`].
///
/// # Errors
///
/// - [`ParseError::Empty`] if nothing remains after the prefix
/// - [`ParseError::InvalidDigit`] for the first digit outside the radix
/// - [`ParseError::OutOfRange`] if the value needs more than `bits` bits
pub fn parse(text: &str, radix: Radix, bits: u32) -> Result<u64, ParseError> {
    let trimmed = text.trim();
    let digits = radix.strip_prefix(trimmed);
    if digits.is_empty() {
        return Err(ParseError::Empty);
    }

    if let Some(digit) = digits.chars().find(|c| !c.is_digit(radix.base())) {
        return Err(ParseError::InvalidDigit {
            input: trimmed.to_string(),
            digit,
            radix: radix.base(),
        });
    }

    let out_of_range = || ParseError::OutOfRange {
        input: trimmed.to_string(),
        bits,
    };

    // Only digits remain, so the only possible failure is overflow
    let value = u64::from_str_radix(digits, radix.base()).map_err(|_| out_of_range())?;
    if value > low_mask(bits) {
        return Err(out_of_range());
    }
    Ok(value)
}

/// Shorthand for [`parse`] with [`Radix::Hex`]
pub fn parse_hex(text: &str, bits: u32) -> Result<u64, ParseError> {
    parse(text, Radix::Hex, bits)
}

/// Render `value` as `bits` zero-padded binary digits
pub fn bit_string(value: u64, bits: u32) -> String {
    format!("{:0width$b}", value & low_mask(bits), width = bits as usize)
}
