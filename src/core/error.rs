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

//! Error types for all calculators
//!
//! Each calculator has its own error enum so callers can match on exactly
//! the failures that operation can produce. [`CalcError`] wraps all of them
//! for code (such as the CLI) that drives several calculators at once.

use thiserror::Error;

/// Rejected cache or TLB configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A field that must be an exact power of two is not
    #[error("{field} must be a power of two (got {value})")]
    NotPowerOfTwo {
        /// Name of the offending field
        field: &'static str,
        /// Value that was supplied
        value: u64,
    },

    /// Index and offset bits together exceed the address width
    #[error(
        "address width of {address_bits} bits cannot hold {index_bits} index bits \
         and {offset_bits} offset bits"
    )]
    NegativeTagBits {
        address_bits: u32,
        index_bits: u32,
        offset_bits: u32,
    },

    /// Zero, out-of-range or otherwise unusable field
    #[error("invalid {field}: {reason}")]
    InvalidInput {
        field: &'static str,
        reason: String,
    },
}

/// Failure to decode or reference an address
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// `decode`/`reference` called before a successful `configure`
    #[error("cache is not configured")]
    NotConfigured,

    /// Address text is unparseable or the value does not fit the address width
    #[error("malformed address: {0}")]
    MalformedAddress(#[from] ParseError),
}

/// Failure to parse numeric text in a declared radix
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    /// Nothing left after trimming whitespace and the radix prefix
    #[error("empty input")]
    Empty,

    /// Character outside the radix's digit set
    #[error("'{digit}' is not a valid base-{radix} digit in \"{input}\"")]
    InvalidDigit {
        input: String,
        digit: char,
        radix: u32,
    },

    /// Value does not fit in the permitted bit width
    #[error("\"{input}\" does not fit in {bits} bits")]
    OutOfRange { input: String, bits: u32 },
}

/// Invalid heap block header operation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HeaderError {
    /// Block size has bits set in the low three (flag) bits
    #[error("block size {0} is not a multiple of 8")]
    Misaligned(u64),

    /// Block is smaller than its own header and footer
    #[error("block size {0} is smaller than the 8-byte header and footer")]
    TooSmall(u64),

    /// Payload so large the rounded block size overflows
    #[error("payload of {0} bytes is too large for a 64-bit block size")]
    TooLarge(u64),

    /// Row width that does not divide into whole bytes
    #[error("bits per row must be a positive multiple of 8 (got {0})")]
    InvalidRowWidth(u32),
}

/// Failure in virtual address translation
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid virtual address: {0}")]
    Address(#[from] ParseError),
}

/// Umbrella error for callers that drive several calculators
#[derive(Debug, Error)]
pub enum CalcError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Header(#[from] HeaderError),

    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// Configuration file could not be read, parsed or written
    #[error("config file error: {0}")]
    ConfigFile(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used across the crate
pub type Result<T> = std::result::Result<T, CalcError>;
