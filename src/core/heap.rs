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

//! Heap block headers for an implicit free-list allocator
//!
//! Blocks are 8-byte aligned, so the low three bits of a size are always
//! zero and are reused as status flags:
//!
//! ```text
//! [63:3] Block size (multiple of 8, includes header and footer)
//! [2]    Unused
//! [1]    Previous block allocated
//! [0]    This block allocated
//! ```
//!
//! A block carries a 4-byte header and a 4-byte footer, so a request of
//! `n` payload bytes needs `n + 8` rounded up to the next multiple of 8.
//!
//! # Example
//!
//! ```
//! use archcalc::core::heap::{block_size_for_payload, BlockHeader, HeaderFlags};
//!
//! let size = block_size_for_payload(24).unwrap();
//! assert_eq!(size, 32);
//!
//! let header = BlockHeader::new(size, HeaderFlags::ALLOCATED | HeaderFlags::PREV_ALLOCATED).unwrap();
//! assert_eq!(header.encode(), 0x23);
//! assert_eq!(BlockHeader::decode(0x23), header);
//! ```

use super::error::HeaderError;
use bitflags::bitflags;

/// Bytes taken by the header plus footer
pub const OVERHEAD: u64 = 8;

/// Block alignment
pub const ALIGNMENT: u64 = 8;

const FLAG_MASK: u64 = ALIGNMENT - 1;

bitflags! {
    /// Status bits stored in the low bits of a header word
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u64 {
        /// This block is in use
        const ALLOCATED = 0b01;
        /// The block immediately before this one is in use
        const PREV_ALLOCATED = 0b10;
    }
}

/// Decoded header word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    size: u64,
    flags: HeaderFlags,
}

impl BlockHeader {
    /// Create a header for a block of `size` bytes
    ///
    /// # Errors
    ///
    /// [`HeaderError::Misaligned`] if `size` is not a multiple of 8.
    pub fn new(size: u64, flags: HeaderFlags) -> Result<Self, HeaderError> {
        if size & FLAG_MASK != 0 {
            return Err(HeaderError::Misaligned(size));
        }
        Ok(Self { size, flags })
    }

    /// Decode a header word
    ///
    /// Never fails: the size is the word with its low three bits cleared and
    /// the unused bit 2 is ignored.
    pub fn decode(word: u64) -> Self {
        Self {
            size: word & !FLAG_MASK,
            flags: HeaderFlags::from_bits_truncate(word),
        }
    }

    /// Header word: size with the flag bits or'ed in
    #[inline]
    pub fn encode(&self) -> u64 {
        self.size | self.flags.bits()
    }

    /// Block size in bytes, header and footer included
    #[inline]
    pub fn size(&self) -> u64 {
        self.size
    }

    #[inline]
    pub fn flags(&self) -> HeaderFlags {
        self.flags
    }

    #[inline]
    pub fn is_allocated(&self) -> bool {
        self.flags.contains(HeaderFlags::ALLOCATED)
    }

    #[inline]
    pub fn is_prev_allocated(&self) -> bool {
        self.flags.contains(HeaderFlags::PREV_ALLOCATED)
    }

    /// Payload bytes available to the caller of `malloc`
    pub fn payload_size(&self) -> Result<u64, HeaderError> {
        payload_for_block(self.size)
    }

    /// Number of rows the block spans when memory is drawn `bits_per_row` wide
    ///
    /// # Errors
    ///
    /// [`HeaderError::InvalidRowWidth`] unless `bits_per_row` is a positive
    /// multiple of 8.
    pub fn rows(&self, bits_per_row: u32) -> Result<u64, HeaderError> {
        if bits_per_row == 0 || bits_per_row % 8 != 0 {
            return Err(HeaderError::InvalidRowWidth(bits_per_row));
        }
        let bytes_per_row = (bits_per_row / 8) as u64;
        Ok(self.size.div_ceil(bytes_per_row))
    }
}

/// Block size needed to satisfy a `malloc(payload)` request
///
/// # Errors
///
/// [`HeaderError::TooLarge`] if the rounded block size does not fit in 64 bits.
pub fn block_size_for_payload(payload: u64) -> Result<u64, HeaderError> {
    payload
        .checked_add(OVERHEAD + FLAG_MASK)
        .map(|n| n & !FLAG_MASK)
        .ok_or(HeaderError::TooLarge(payload))
}

/// Largest payload a block of `block_size` bytes can hold
///
/// # Errors
///
/// [`HeaderError::TooSmall`] if the block cannot even hold its header and footer.
pub fn payload_for_block(block_size: u64) -> Result<u64, HeaderError> {
    block_size
        .checked_sub(OVERHEAD)
        .ok_or(HeaderError::TooSmall(block_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_block_size_for_payload_rounds_up() {
        assert_eq!(block_size_for_payload(0), Ok(8));
        assert_eq!(block_size_for_payload(1), Ok(16));
        assert_eq!(block_size_for_payload(8), Ok(16));
        assert_eq!(block_size_for_payload(9), Ok(24));
        assert_eq!(block_size_for_payload(24), Ok(32));
        assert_eq!(block_size_for_payload(25), Ok(40));
        assert_eq!(
            block_size_for_payload(u64::MAX - 4),
            Err(HeaderError::TooLarge(u64::MAX - 4))
        );
    }

    #[test]
    fn test_payload_for_block() {
        assert_eq!(payload_for_block(32), Ok(24));
        assert_eq!(payload_for_block(8), Ok(0));
        assert_eq!(payload_for_block(4), Err(HeaderError::TooSmall(4)));
    }

    #[test]
    fn test_encode_flags() {
        let free = BlockHeader::new(32, HeaderFlags::empty()).unwrap();
        assert_eq!(free.encode(), 0x20);

        let allocated = BlockHeader::new(32, HeaderFlags::ALLOCATED).unwrap();
        assert_eq!(allocated.encode(), 0x21);

        let prev = BlockHeader::new(32, HeaderFlags::PREV_ALLOCATED).unwrap();
        assert_eq!(prev.encode(), 0x22);

        let both = BlockHeader::new(32, HeaderFlags::all()).unwrap();
        assert_eq!(both.encode(), 0x23);
    }

    #[test]
    fn test_new_rejects_misaligned_size() {
        assert_eq!(
            BlockHeader::new(30, HeaderFlags::empty()),
            Err(HeaderError::Misaligned(30))
        );
    }

    #[test]
    fn test_decode() {
        let header = BlockHeader::decode(0x23);
        assert_eq!(header.size(), 32);
        assert!(header.is_allocated());
        assert!(header.is_prev_allocated());
        assert_eq!(header.payload_size(), Ok(24));

        let header = BlockHeader::decode(0x1000);
        assert_eq!(header.size(), 0x1000);
        assert!(!header.is_allocated());
        assert!(!header.is_prev_allocated());
    }

    #[test]
    fn test_decode_ignores_unused_bit() {
        let header = BlockHeader::decode(0x25);
        assert_eq!(header.size(), 32);
        assert_eq!(header.flags(), HeaderFlags::ALLOCATED);
        assert_eq!(header.encode(), 0x21);
    }

    #[test]
    fn test_rows() {
        let header = BlockHeader::decode(0x20);
        assert_eq!(header.rows(32), Ok(8));
        assert_eq!(header.rows(64), Ok(4));
        assert_eq!(header.rows(24), Ok(11));

        assert_eq!(header.rows(0), Err(HeaderError::InvalidRowWidth(0)));
        assert_eq!(header.rows(12), Err(HeaderError::InvalidRowWidth(12)));
    }
}
