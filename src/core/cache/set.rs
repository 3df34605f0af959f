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

//! Tag history of a single cache set

use std::collections::VecDeque;

/// Tags resident in one set, ordered by recency
///
/// The front holds the least recently referenced tag and the back the most
/// recent one. Recency is maintained purely by reference order; there is
/// no separate access counter.
///
/// # Performance Characteristics
///
/// - **Contains**: O(W) - Linear scan, W is at most the associativity
/// - **Promote**: O(W) - Scan, remove, push back, drain the front
/// - **Replace**: O(1) - The set never holds more than one tag afterwards
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheSet {
    tags: VecDeque<u64>,
}

impl CacheSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `tag` is resident
    #[inline]
    pub fn contains(&self, tag: u64) -> bool {
        self.tags.contains(&tag)
    }

    /// Number of resident tags
    #[inline]
    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Whether the set holds no tags
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    /// Move `tag` to the most-recent position, evicting from the front
    /// until at most `ways` tags remain
    ///
    /// Returns the evicted tags, oldest first.
    ///
    /// # Example
    ///
    /// ```
    /// use archcalc::core::cache::CacheSet;
    ///
    /// let mut set = CacheSet::new();
    /// set.promote(0xA, 2);
    /// set.promote(0xB, 2);
    ///
    /// // Touching 0xA again makes 0xB the oldest
    /// set.promote(0xA, 2);
    /// assert_eq!(set.promote(0xC, 2), vec![0xB]);
    /// assert_eq!(set.recent_first(), vec![0xC, 0xA]);
    /// ```
    pub fn promote(&mut self, tag: u64, ways: usize) -> Vec<u64> {
        if let Some(pos) = self.tags.iter().position(|&t| t == tag) {
            self.tags.remove(pos);
        }
        self.tags.push_back(tag);

        let excess = self.tags.len().saturating_sub(ways);
        self.tags.drain(..excess).collect()
    }

    /// Make `tag` the only resident tag
    ///
    /// Returns the previous tag if it differed from `tag`.
    ///
    /// # Example
    ///
    /// ```
    /// use archcalc::core::cache::CacheSet;
    ///
    /// let mut set = CacheSet::new();
    /// assert_eq!(set.replace(0xA), None);
    /// assert_eq!(set.replace(0xA), None);
    /// assert_eq!(set.replace(0xB), Some(0xA));
    /// assert_eq!(set.recent_first(), vec![0xB]);
    /// ```
    pub fn replace(&mut self, tag: u64) -> Option<u64> {
        let previous = self.tags.back().copied().filter(|&t| t != tag);
        self.tags.clear();
        self.tags.push_back(tag);
        previous
    }

    /// Resident tags, most recently referenced first
    pub fn recent_first(&self) -> Vec<u64> {
        self.tags.iter().rev().copied().collect()
    }

    /// Resident tags, least recently referenced first
    pub fn iter(&self) -> impl Iterator<Item = &u64> {
        self.tags.iter()
    }
}
