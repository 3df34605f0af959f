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

//! Session defaults loaded from a TOML file
//!
//! Every section is optional; missing keys fall back to the values the
//! calculators start with.
//!
//! ```toml
//! [cache]
//! address_bits = 32
//! cache_size_kb = 64
//! block_size_bytes = 64
//! associativity = 4
//! policy = "set-associative"
//!
//! [tlb]
//! virtual_address_width = 12
//! page_size = 32
//! tlb_sets = 4
//! tlb_ways = 4
//! address_radix = "binary"
//!
//! [heap]
//! bits_per_row = 32
//!
//! [convert]
//! interpretation = "unsigned"
//! ```

use crate::core::address::Radix;
use crate::core::cache::{CacheConfig, MappingPolicy};
use crate::core::convert::Interpretation;
use crate::core::error::{CalcError, ConfigError, Result};
use crate::core::translate::TlbConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variable naming the config file
pub const CONFIG_ENV: &str = "ARCHCALC_CONFIG";

/// Config file used when [`CONFIG_ENV`] is unset
pub const DEFAULT_CONFIG_PATH: &str = "archcalc.toml";

/// Cache calculator defaults, expressed by capacity like the calculator form
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheDefaults {
    pub address_bits: u32,
    pub cache_size_kb: u64,
    pub block_size_bytes: u64,
    pub associativity: u32,
    pub policy: MappingPolicy,
}

impl Default for CacheDefaults {
    fn default() -> Self {
        Self {
            address_bits: 32,
            cache_size_kb: 64,
            block_size_bytes: 64,
            associativity: 4,
            policy: MappingPolicy::SetAssociative,
        }
    }
}

impl CacheDefaults {
    /// Resolve the capacity form into a [`CacheConfig`]
    pub fn cache_config(&self) -> std::result::Result<CacheConfig, ConfigError> {
        CacheConfig::from_capacity(
            self.address_bits,
            self.cache_size_kb,
            self.block_size_bytes,
            self.associativity,
            self.policy,
        )
    }
}

/// Address translation defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TlbDefaults {
    pub virtual_address_width: u32,
    pub page_size: u64,
    pub tlb_sets: u64,
    pub tlb_ways: u32,
    /// Radix virtual addresses are typed in
    pub address_radix: Radix,
}

impl Default for TlbDefaults {
    fn default() -> Self {
        Self {
            virtual_address_width: 12,
            page_size: 32,
            tlb_sets: 4,
            tlb_ways: 4,
            address_radix: Radix::Binary,
        }
    }
}

impl TlbDefaults {
    pub fn tlb_config(&self) -> TlbConfig {
        TlbConfig {
            virtual_address_width: self.virtual_address_width,
            page_size: self.page_size,
            tlb_sets: self.tlb_sets,
            tlb_ways: self.tlb_ways,
        }
    }
}

/// Heap diagram defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeapDefaults {
    pub bits_per_row: u32,
}

impl Default for HeapDefaults {
    fn default() -> Self {
        Self { bits_per_row: 32 }
    }
}

/// Number converter defaults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertDefaults {
    pub interpretation: Interpretation,
}

/// Configuration that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalcConfig {
    pub cache: CacheDefaults,
    pub tlb: TlbDefaults,
    pub heap: HeapDefaults,
    pub convert: ConvertDefaults,
}

impl CalcConfig {
    /// Create default configuration
    pub fn default_config() -> Self {
        Self::default()
    }

    /// Load configuration from TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            CalcError::ConfigFile(format!("failed to read {}: {}", path.display(), e))
        })?;
        toml::from_str(&contents).map_err(|e| {
            CalcError::ConfigFile(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Load configuration, falling back to defaults if the file is unusable
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            log::info!("Using default config ({})", e);
            Self::default_config()
        })
    }

    /// Save configuration to TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| CalcError::ConfigFile(format!("failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Config path from [`CONFIG_ENV`], or [`DEFAULT_CONFIG_PATH`]
    pub fn path_from_env() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_resolves() {
        let config = CalcConfig::default_config();
        let cache = config.cache.cache_config().unwrap();
        assert_eq!(cache.num_sets, 256);
        assert!(cache.validate().is_ok());
        assert!(config.tlb.tlb_config().geometry().is_ok());
        assert_eq!(config.heap.bits_per_row, 32);
        assert_eq!(config.convert.interpretation, Interpretation::Unsigned);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("archcalc.toml");

        let mut config = CalcConfig::default_config();
        config.cache.policy = MappingPolicy::DirectMapped;
        config.tlb.address_radix = Radix::Hex;
        config.convert.interpretation = Interpretation::TwosComplement;
        config.save(&path).unwrap();

        let loaded = CalcConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nassociativity = 8\n\n[tlb]\npage_size = 4096").unwrap();

        let config = CalcConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.associativity, 8);
        assert_eq!(config.cache.address_bits, 32);
        assert_eq!(config.tlb.page_size, 4096);
        assert_eq!(config.tlb.tlb_sets, 4);
        assert_eq!(config.heap, HeapDefaults::default());
    }

    #[test]
    fn test_policy_names() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\npolicy = \"direct-mapped\"").unwrap();
        let config = CalcConfig::load(file.path()).unwrap();
        assert_eq!(config.cache.policy, MappingPolicy::DirectMapped);
    }

    #[test]
    fn test_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.toml");
        assert!(matches!(
            CalcConfig::load(&missing),
            Err(CalcError::ConfigFile(_))
        ));
        assert_eq!(
            CalcConfig::load_or_default(&missing),
            CalcConfig::default_config()
        );

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[cache]\nassociativity = \"four\"").unwrap();
        assert!(matches!(
            CalcConfig::load(file.path()),
            Err(CalcError::ConfigFile(_))
        ));
    }
}
