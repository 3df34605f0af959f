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

//! Decimal / binary / hexadecimal conversion of 32-bit words
//!
//! A [`Word`] is a 32-bit pattern plus the interpretation used when it is
//! shown as decimal. Binary and hex always show the raw pattern.
//!
//! # Example
//!
//! ```
//! use archcalc::core::convert::{Interpretation, Word};
//!
//! let word = Word::from_decimal("-1", Interpretation::TwosComplement).unwrap();
//! assert_eq!(word.hex(), "FFFFFFFF");
//!
//! let word = Word::from_hex("FFFFFFFF", Interpretation::Unsigned).unwrap();
//! assert_eq!(word.decimal(), 4294967295);
//! ```

use super::address::{self, bit_string, Radix};
use super::error::ParseError;
use serde::{Deserialize, Serialize};

/// Word width used by the converter
pub const WORD_BITS: u32 = 32;

/// How a bit pattern maps to a decimal value
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Interpretation {
    #[default]
    Unsigned,
    /// Bit 31 carries weight -2^31
    TwosComplement,
}

/// A 32-bit pattern with its decimal interpretation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Word {
    bits: u32,
    interpretation: Interpretation,
}

impl Word {
    pub fn from_bits(bits: u32, interpretation: Interpretation) -> Self {
        Self {
            bits,
            interpretation,
        }
    }

    /// Parse decimal text
    ///
    /// Unsigned accepts `0..=4294967295`. Two's complement accepts an
    /// optional leading `-` and the range `-2147483648..=2147483647`.
    pub fn from_decimal(text: &str, interpretation: Interpretation) -> Result<Self, ParseError> {
        let trimmed = text.trim();
        let bits = match interpretation {
            Interpretation::Unsigned => address::parse(trimmed, Radix::Decimal, WORD_BITS)? as u32,
            Interpretation::TwosComplement => {
                let (negative, digits) = match trimmed.strip_prefix('-') {
                    Some(rest) => (true, rest),
                    None => (false, trimmed),
                };
                // The sign must touch the digits
                if let Some(space) = digits.chars().next().filter(|c| c.is_whitespace()) {
                    return Err(ParseError::InvalidDigit {
                        input: trimmed.to_string(),
                        digit: space,
                        radix: Radix::Decimal.base(),
                    });
                }
                let magnitude = address::parse(digits, Radix::Decimal, WORD_BITS)? as i64;
                let value = if negative { -magnitude } else { magnitude };
                let value = i32::try_from(value).map_err(|_| ParseError::OutOfRange {
                    input: trimmed.to_string(),
                    bits: WORD_BITS,
                })?;
                value as u32
            }
        };
        Ok(Self::from_bits(bits, interpretation))
    }

    /// Parse up to 32 binary digits (optional `0b` prefix)
    pub fn from_binary(text: &str, interpretation: Interpretation) -> Result<Self, ParseError> {
        let bits = address::parse(text, Radix::Binary, WORD_BITS)? as u32;
        Ok(Self::from_bits(bits, interpretation))
    }

    /// Parse up to 8 hex digits (optional `0x` prefix)
    pub fn from_hex(text: &str, interpretation: Interpretation) -> Result<Self, ParseError> {
        let bits = address::parse(text, Radix::Hex, WORD_BITS)? as u32;
        Ok(Self::from_bits(bits, interpretation))
    }

    /// Parse text in any radix
    pub fn parse(text: &str, radix: Radix, interpretation: Interpretation) -> Result<Self, ParseError> {
        match radix {
            Radix::Binary => Self::from_binary(text, interpretation),
            Radix::Decimal => Self::from_decimal(text, interpretation),
            Radix::Hex => Self::from_hex(text, interpretation),
        }
    }

    /// Raw bit pattern
    #[inline]
    pub fn bits(&self) -> u32 {
        self.bits
    }

    #[inline]
    pub fn interpretation(&self) -> Interpretation {
        self.interpretation
    }

    /// Same bits under another interpretation
    pub fn reinterpret(self, interpretation: Interpretation) -> Self {
        Self::from_bits(self.bits, interpretation)
    }

    /// Decimal value under the word's interpretation
    pub fn decimal(&self) -> i64 {
        match self.interpretation {
            Interpretation::Unsigned => self.bits as i64,
            Interpretation::TwosComplement => self.bits as i32 as i64,
        }
    }

    /// All 32 binary digits
    pub fn binary(&self) -> String {
        bit_string(self.bits as u64, WORD_BITS)
    }

    /// Uppercase hex without padding or prefix
    pub fn hex(&self) -> String {
        format!("{:X}", self.bits)
    }
}
