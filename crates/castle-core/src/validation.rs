//! Structural invariant checks and state comparison.
//!
//! [`check_invariants`] is run by the engine after every tick. [`diff_states`]
//! backs replay verification by naming exactly which fields diverged.

use crate::state::CastleState;

/// A state that no sequence of valid ticks can produce.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("turn {turn}: jobs sum to {assigned} but the workforce is {workers}")]
    JobSum {
        turn: u64,
        assigned: u64,
        workers: u32,
    },
    #[error("turn {turn}: upgrade targets level {target_level} from level {castle_level}")]
    UpgradeTarget {
        turn: u64,
        target_level: u32,
        castle_level: u32,
    },
    #[error("turn {turn}: upgrade requires no wood")]
    UpgradeWithoutCost { turn: u64 },
    #[error("turn {turn}: upgrade in progress above the highest level {castle_level}")]
    UpgradeBeyondMaxLevel { turn: u64, castle_level: u32 },
}

/// Check every structural invariant. Returns the first violation.
pub fn check_invariants(state: &CastleState) -> Result<(), InvariantViolation> {
    let assigned = state.jobs.total();
    if assigned != state.workers as u64 {
        return Err(InvariantViolation::JobSum {
            turn: state.turn,
            assigned,
            workers: state.workers,
        });
    }
    if let Some(up) = &state.upgrade {
        let Some(next_level) = state.castle_level.checked_add(1) else {
            return Err(InvariantViolation::UpgradeBeyondMaxLevel {
                turn: state.turn,
                castle_level: state.castle_level,
            });
        };
        if up.target_level != next_level {
            return Err(InvariantViolation::UpgradeTarget {
                turn: state.turn,
                target_level: up.target_level,
                castle_level: state.castle_level,
            });
        }
        if up.wood_required == 0 {
            return Err(InvariantViolation::UpgradeWithoutCost { turn: state.turn });
        }
    }
    Ok(())
}

/// A single field that differs between two states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDiff {
    pub field: &'static str,
    pub expected: String,
    pub actual: String,
}

/// Field-level comparison of two states.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateDiff {
    pub fields: Vec<FieldDiff>,
}

impl StateDiff {
    pub fn is_identical(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Compare `expected` against `actual` field by field.
pub fn diff_states(expected: &CastleState, actual: &CastleState) -> StateDiff {
    let mut diff = StateDiff::default();
    let mut cmp = |field: &'static str, a: String, b: String| {
        if a != b {
            diff.fields.push(FieldDiff {
                field,
                expected: a,
                actual: b,
            });
        }
    };
    cmp("turn", expected.turn.to_string(), actual.turn.to_string());
    cmp("gold", expected.gold.to_string(), actual.gold.to_string());
    cmp("food", expected.food.to_string(), actual.food.to_string());
    cmp("wood", expected.wood.to_string(), actual.wood.to_string());
    cmp("workers", expected.workers.to_string(), actual.workers.to_string());
    cmp(
        "castle_level",
        expected.castle_level.to_string(),
        actual.castle_level.to_string(),
    );
    cmp("jobs", format!("{:?}", expected.jobs), format!("{:?}", actual.jobs));
    cmp(
        "upgrade",
        format!("{:?}", expected.upgrade),
        format!("{:?}", actual.upgrade),
    );
    diff
}
