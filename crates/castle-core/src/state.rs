//! The authoritative castle state and its fixed starting point.
//!
//! Pure data. All mutation happens inside the tick resolver.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Jobs
// ---------------------------------------------------------------------------

/// Allocation of the workforce across the four job types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Jobs {
    pub miners: u32,
    pub farmers: u32,
    pub lumberjacks: u32,
    pub builders: u32,
}

impl Jobs {
    pub fn new(miners: u32, farmers: u32, lumberjacks: u32, builders: u32) -> Self {
        Self {
            miners,
            farmers,
            lumberjacks,
            builders,
        }
    }

    /// Total number of assigned workers. Widened so four `u32::MAX` counts
    /// cannot overflow.
    pub fn total(&self) -> u64 {
        self.miners as u64 + self.farmers as u64 + self.lumberjacks as u64 + self.builders as u64
    }

    /// Remove up to `count` assignments, taking from builders first, then
    /// lumberjacks, farmers and miners. Returns how many were removed.
    pub fn shrink(&mut self, count: u32) -> u32 {
        let mut remaining = count;
        for slot in [
            &mut self.builders,
            &mut self.lumberjacks,
            &mut self.farmers,
            &mut self.miners,
        ] {
            if remaining == 0 {
                break;
            }
            let taken = (*slot).min(remaining);
            *slot -= taken;
            remaining -= taken;
        }
        count - remaining
    }
}

// ---------------------------------------------------------------------------
// Upgrade
// ---------------------------------------------------------------------------

/// An in-progress castle upgrade. At most one exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Upgrade {
    /// Level the castle reaches when this upgrade completes.
    pub target_level: u32,
    /// Wood delivered by builders so far.
    pub progress: u64,
    /// Wood needed to complete. Always > 0.
    pub wood_required: u64,
}

impl Upgrade {
    pub fn is_complete(&self) -> bool {
        self.progress >= self.wood_required
    }
}

// ---------------------------------------------------------------------------
// CastleState
// ---------------------------------------------------------------------------

/// Complete economy snapshot.
///
/// `jobs.total() == workers` holds at the end of every resolved tick.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CastleState {
    pub turn: u64,
    pub gold: u64,
    pub food: u64,
    pub wood: u64,
    pub workers: u32,
    pub castle_level: u32,
    pub jobs: Jobs,
    pub upgrade: Option<Upgrade>,
}

/// Starting gold.
pub const INITIAL_GOLD: u64 = 20;
/// Starting food.
pub const INITIAL_FOOD: u64 = 10;
/// Starting wood.
pub const INITIAL_WOOD: u64 = 0;
/// Starting workforce.
pub const INITIAL_WORKERS: u32 = 4;
/// Starting castle level.
pub const INITIAL_CASTLE_LEVEL: u32 = 1;

impl CastleState {
    /// The fixed starting state every run and every replay begins from:
    /// turn 0, 20 gold, 10 food, no wood, 4 workers (1 miner, 2 farmers,
    /// 1 lumberjack), castle level 1, no upgrade.
    pub fn initial() -> Self {
        Self {
            turn: 0,
            gold: INITIAL_GOLD,
            food: INITIAL_FOOD,
            wood: INITIAL_WOOD,
            workers: INITIAL_WORKERS,
            castle_level: INITIAL_CASTLE_LEVEL,
            jobs: Jobs::new(1, 2, 1, 0),
            upgrade: None,
        }
    }

    pub fn has_active_upgrade(&self) -> bool {
        self.upgrade.is_some()
    }
}

impl Default for CastleState {
    fn default() -> Self {
        Self::initial()
    }
}
