//! Economy constants and engine configuration.
//!
//! The constants are fixed for the lifetime of an engine. A replay must use
//! the same set that produced the log.

use serde::{Deserialize, Serialize};

/// Tunable economy rates and costs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EconomyConstants {
    /// Gold debited per hired worker.
    pub hire_cost: u64,
    /// Gold debited per unit of food bought.
    pub food_price: u64,
    /// Upgrade gold cost is `upgrade_gold_per_level * (castle_level + 1)`.
    pub upgrade_gold_per_level: u64,
    /// Upgrade wood requirement is `upgrade_wood_per_level * (castle_level + 1)`.
    pub upgrade_wood_per_level: u64,
    pub gold_per_miner: u64,
    pub food_per_farmer: u64,
    pub wood_per_lumberjack: u64,
    /// Flat gold credited when an upgrade completes.
    pub upgrade_completion_bonus: u64,
    /// Gold credited per castle level during the taxes phase.
    pub tax_rate: u64,
}

impl Default for EconomyConstants {
    fn default() -> Self {
        Self {
            hire_cost: 5,
            food_price: 1,
            upgrade_gold_per_level: 10,
            upgrade_wood_per_level: 20,
            gold_per_miner: 1,
            food_per_farmer: 2,
            wood_per_lumberjack: 1,
            upgrade_completion_bonus: 5,
            tax_rate: 1,
        }
    }
}

impl EconomyConstants {
    /// Gold needed to start the upgrade out of `castle_level`.
    pub fn upgrade_gold_cost(&self, castle_level: u32) -> u64 {
        self.upgrade_gold_per_level
            .saturating_mul(castle_level as u64 + 1)
    }

    /// Wood the upgrade out of `castle_level` consumes before completing.
    pub fn upgrade_wood_cost(&self, castle_level: u32) -> u64 {
        self.upgrade_wood_per_level
            .saturating_mul(castle_level as u64 + 1)
    }
}

/// Engine construction options.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub constants: EconomyConstants,
    /// Number of drained actions the queue retains as history. 0 disables it.
    pub history_limit: usize,
}

impl EngineConfig {
    pub fn with_constants(constants: EconomyConstants) -> Self {
        Self {
            constants,
            ..Self::default()
        }
    }
}
