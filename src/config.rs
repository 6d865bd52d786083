//! Ledger configuration: fee schedule, enabled features and engine limits.
//!
//! Loaded from an optional TOML file and overridden by `LEDGER_`-prefixed
//! environment variables (nested keys separated by `__`, e.g.
//! `LEDGER_FEES__BASE_FEE=12`).

use std::collections::BTreeSet;

use config::{Config, ConfigError};
use serde::{Deserialize, Serialize};

use crate::ledger::{LedgerInfo, Rules};

/// Amendment-style switches that change transaction semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    /// Allow crossing issued/issued offers through two native-asset books.
    AutoBridge,
    /// Report an unfillable fill-or-kill as `tecKILLED` instead of success.
    KilledResult,
}

/// Fees and reserves, all in drops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    #[serde(default = "default_base_fee")]
    pub base_fee: u64,
    #[serde(default = "default_reserve_base")]
    pub reserve_base: u64,
    #[serde(default = "default_reserve_increment")]
    pub reserve_increment: u64,
}

fn default_base_fee() -> u64 {
    10
}

fn default_reserve_base() -> u64 {
    10_000_000
}

fn default_reserve_increment() -> u64 {
    2_000_000
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: default_base_fee(),
            reserve_base: default_reserve_base(),
            reserve_increment: default_reserve_increment(),
        }
    }
}

impl FeeSchedule {
    /// Minimum native balance for an account owning `owner_count` objects.
    pub fn account_reserve(&self, owner_count: u32) -> u64 {
        self.reserve_base
            .saturating_add(self.reserve_increment.saturating_mul(owner_count as u64))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub fees: FeeSchedule,
    #[serde(default = "default_features")]
    pub features: Vec<Feature>,
    /// Offers a single transaction may examine across all books
    #[serde(default = "default_max_offers_stepped")]
    pub max_offers_stepped: u32,
}

fn default_features() -> Vec<Feature> {
    vec![Feature::AutoBridge, Feature::KilledResult]
}

fn default_max_offers_stepped() -> u32 {
    1000
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            fees: FeeSchedule::default(),
            features: default_features(),
            max_offers_stepped: default_max_offers_stepped(),
        }
    }
}

impl LedgerConfig {
    /// Load from `ledger.toml` (if present) and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("ledger.toml")
    }

    pub fn load_from(path: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("LEDGER").separator("__"))
            .build()?;
        settings.try_deserialize()
    }

    pub fn rules(&self) -> Rules {
        Rules::new(self.features.iter().copied().collect::<BTreeSet<_>>())
    }

    /// Header for a ledger opened with this configuration.
    pub fn ledger_info(&self, seq: u32, parent_close_time: u32) -> LedgerInfo {
        LedgerInfo {
            seq,
            parent_close_time,
            fees: self.fees,
            rules: self.rules(),
            max_offers_stepped: self.max_offers_stepped,
        }
    }
}
