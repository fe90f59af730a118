//! The tick resolver: one deterministic state transition per call.
//!
//! # Phases
//!
//! [`resolve_tick`] runs, in order:
//! 1. **Turn** -- increment the turn counter; every later phase sees the new turn.
//! 2. **Apply** -- stable-sort the drained actions by priority class and
//!    re-validate each one against the live state before applying it.
//!    Job allocation is reconciled with the workforce afterwards.
//! 3. **Production** -- miners, farmers and lumberjacks yield gold, food, wood.
//! 4. **Construction** -- builders feed wood into the active upgrade.
//! 5. **Upkeep** -- every worker eats one food; shortages cost workers.
//! 6. **Taxes** -- gold per castle level.
//! 7. **Finalize** -- report any resource floor that had to be applied.
//!
//! The function is pure over its arguments: no clock, no randomness, no
//! shared state.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::action::{Action, ActionKind, QueuedAction};
use crate::economy::EconomyConstants;
use crate::state::{CastleState, Upgrade};

// ---------------------------------------------------------------------------
// Rejections
// ---------------------------------------------------------------------------

/// Why a queued action failed apply-time validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
pub enum RejectReason {
    #[error("need {need} gold, have {have}")]
    InsufficientGold { need: u64, have: u64 },
    #[error("jobs sum to {assigned} but the workforce is {workers}")]
    JobSumMismatch { assigned: u64, workers: u32 },
    #[error("cannot fire {requested} workers, only {available} employed")]
    InsufficientWorkers { requested: u32, available: u32 },
    #[error("an upgrade to level {target_level} is already in progress")]
    UpgradeInProgress { target_level: u32 },
    #[error("hiring {requested} would exceed the workforce limit (currently {workers})")]
    WorkforceLimit { requested: u32, workers: u32 },
    #[error("castle level {level} is the highest level")]
    MaxLevel { level: u32 },
}

/// A queued action that was discarded during the apply phase.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{} rejected: {reason}", .action.kind())]
pub struct Rejection {
    pub action: QueuedAction,
    pub reason: RejectReason,
}

impl Rejection {
    pub fn kind(&self) -> ActionKind {
        self.action.kind()
    }
}

// ---------------------------------------------------------------------------
// Outcome types
// ---------------------------------------------------------------------------

/// The three stockpiled resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Resource {
    Gold,
    Food,
    Wood,
}

/// A debit that exceeded the stockpile and was floored at zero.
///
/// Apply-time validation makes this unreachable; a non-empty list means a
/// validation bug.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClampRecord {
    pub resource: Resource,
    pub shortfall: u64,
}

/// How the job allocation was brought back in line with the workforce
/// after the apply phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobReconciliation {
    /// Assignments removed (builders first) because the workforce shrank.
    Removed(u32),
    /// Unassigned workers placed on farms.
    AssignedToFarmers(u32),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Production {
    pub gold: u64,
    pub food: u64,
    pub wood: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Construction {
    pub wood_used: u64,
    /// Level reached if the upgrade completed this tick.
    pub completed_level: Option<u32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Upkeep {
    pub food_eaten: u64,
    pub shortage: u64,
    pub workers_lost: u32,
}

/// Everything one call to [`resolve_tick`] did.
#[derive(Debug, Clone, Default)]
pub struct TickOutcome {
    /// The turn this tick resolved (already written into the state).
    pub turn: u64,
    /// Accepted actions, in application order.
    pub applied: Vec<QueuedAction>,
    pub rejected: Vec<Rejection>,
    pub reconciliation: Option<JobReconciliation>,
    pub production: Production,
    pub construction: Construction,
    pub upkeep: Upkeep,
    pub taxes: u64,
    pub clamps: Vec<ClampRecord>,
    /// Per-phase timing (profiling feature only).
    #[cfg(feature = "profiling")]
    pub profile: crate::profiling::TickProfile,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

/// Advance `state` by exactly one tick, consuming `actions`.
pub fn resolve_tick(
    state: &mut CastleState,
    actions: Vec<QueuedAction>,
    constants: &EconomyConstants,
) -> TickOutcome {
    #[cfg(feature = "profiling")]
    let tick_start = std::time::Instant::now();

    state.turn += 1;
    let mut outcome = TickOutcome {
        turn: state.turn,
        ..TickOutcome::default()
    };

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    phase_apply(state, actions, constants, &mut outcome);
    #[cfg(feature = "profiling")]
    let apply_dur = phase_start.elapsed();

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    outcome.production = phase_production(state, constants);
    #[cfg(feature = "profiling")]
    let production_dur = phase_start.elapsed();

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    outcome.construction = phase_construction(state, constants, &mut outcome.clamps);
    #[cfg(feature = "profiling")]
    let construction_dur = phase_start.elapsed();

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    outcome.upkeep = phase_upkeep(state);
    #[cfg(feature = "profiling")]
    let upkeep_dur = phase_start.elapsed();

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    outcome.taxes = phase_taxes(state, constants);
    #[cfg(feature = "profiling")]
    let taxes_dur = phase_start.elapsed();

    #[cfg(feature = "profiling")]
    let phase_start = std::time::Instant::now();
    phase_finalize(&outcome);
    #[cfg(feature = "profiling")]
    {
        outcome.profile = crate::profiling::TickProfile {
            apply: apply_dur,
            production: production_dur,
            construction: construction_dur,
            upkeep: upkeep_dur,
            taxes: taxes_dur,
            finalize: phase_start.elapsed(),
            total: tick_start.elapsed(),
            turn: outcome.turn,
        };
    }

    outcome
}

// ---------------------------------------------------------------------------
// Phase: apply queued actions
// ---------------------------------------------------------------------------

fn phase_apply(
    state: &mut CastleState,
    mut actions: Vec<QueuedAction>,
    constants: &EconomyConstants,
    outcome: &mut TickOutcome,
) {
    // Stable: submission order breaks ties within a priority class.
    actions.sort_by_key(|a| a.kind().priority());

    for queued in actions {
        match apply_action(state, &queued.action, constants, &mut outcome.clamps) {
            Ok(()) => {
                debug!(turn = state.turn, kind = %queued.kind(), "action applied");
                outcome.applied.push(queued);
            }
            Err(reason) => {
                warn!(turn = state.turn, kind = %queued.kind(), %reason, "action rejected");
                outcome.rejected.push(Rejection {
                    action: queued,
                    reason,
                });
            }
        }
    }

    outcome.reconciliation = reconcile_jobs(state);
    if let Some(reconciliation) = outcome.reconciliation {
        debug!(turn = state.turn, ?reconciliation, "job allocation reconciled");
    }
}

/// Validate one action against the live state and apply it.
fn apply_action(
    state: &mut CastleState,
    action: &Action,
    constants: &EconomyConstants,
    clamps: &mut Vec<ClampRecord>,
) -> Result<(), RejectReason> {
    match *action {
        Action::AssignJobs(jobs) => {
            if jobs.total() != state.workers as u64 {
                return Err(RejectReason::JobSumMismatch {
                    assigned: jobs.total(),
                    workers: state.workers,
                });
            }
            state.jobs = jobs;
        }
        Action::Hire { count } => {
            let cost = constants.hire_cost.saturating_mul(count as u64);
            require_gold(state, cost)?;
            let workers = state
                .workers
                .checked_add(count)
                .ok_or(RejectReason::WorkforceLimit {
                    requested: count,
                    workers: state.workers,
                })?;
            debit(&mut state.gold, cost, Resource::Gold, clamps);
            state.workers = workers;
        }
        Action::Fire { count } => {
            if state.workers < count {
                return Err(RejectReason::InsufficientWorkers {
                    requested: count,
                    available: state.workers,
                });
            }
            state.workers -= count;
        }
        Action::BuyFood { amount } => {
            let cost = constants.food_price.saturating_mul(amount as u64);
            require_gold(state, cost)?;
            debit(&mut state.gold, cost, Resource::Gold, clamps);
            state.food = state.food.saturating_add(amount as u64);
        }
        Action::StartUpgrade => {
            if let Some(active) = state.upgrade {
                return Err(RejectReason::UpgradeInProgress {
                    target_level: active.target_level,
                });
            }
            let target_level = state
                .castle_level
                .checked_add(1)
                .ok_or(RejectReason::MaxLevel {
                    level: state.castle_level,
                })?;
            let cost = constants.upgrade_gold_cost(state.castle_level);
            require_gold(state, cost)?;
            debit(&mut state.gold, cost, Resource::Gold, clamps);
            state.upgrade = Some(Upgrade {
                target_level,
                progress: 0,
                wood_required: constants.upgrade_wood_cost(state.castle_level).max(1),
            });
        }
    }
    Ok(())
}

fn require_gold(state: &CastleState, need: u64) -> Result<(), RejectReason> {
    if state.gold < need {
        return Err(RejectReason::InsufficientGold {
            need,
            have: state.gold,
        });
    }
    Ok(())
}

/// Subtract `amount`, flooring at zero. A floor that triggers is recorded.
fn debit(value: &mut u64, amount: u64, resource: Resource, clamps: &mut Vec<ClampRecord>) {
    match value.checked_sub(amount) {
        Some(rest) => *value = rest,
        None => {
            clamps.push(ClampRecord {
                resource,
                shortfall: amount - *value,
            });
            *value = 0;
        }
    }
}

/// Bring `jobs.total()` back to `workers` after Hire/Fire without a
/// matching AssignJobs.
fn reconcile_jobs(state: &mut CastleState) -> Option<JobReconciliation> {
    let assigned = state.jobs.total();
    let workers = state.workers as u64;
    if assigned > workers {
        let excess = u32::try_from(assigned - workers).unwrap_or(u32::MAX);
        Some(JobReconciliation::Removed(state.jobs.shrink(excess)))
    } else if assigned < workers {
        // Bounded by `workers`, so this fits in u32.
        let idle = (workers - assigned) as u32;
        state.jobs.farmers += idle;
        Some(JobReconciliation::AssignedToFarmers(idle))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Phase: production
// ---------------------------------------------------------------------------

fn phase_production(state: &mut CastleState, constants: &EconomyConstants) -> Production {
    let produced = Production {
        gold: (state.jobs.miners as u64).saturating_mul(constants.gold_per_miner),
        food: (state.jobs.farmers as u64).saturating_mul(constants.food_per_farmer),
        wood: (state.jobs.lumberjacks as u64).saturating_mul(constants.wood_per_lumberjack),
    };
    state.gold = state.gold.saturating_add(produced.gold);
    state.food = state.food.saturating_add(produced.food);
    state.wood = state.wood.saturating_add(produced.wood);
    debug!(turn = state.turn, ?produced, "production");
    produced
}

// ---------------------------------------------------------------------------
// Phase: construction
// ---------------------------------------------------------------------------

fn phase_construction(
    state: &mut CastleState,
    constants: &EconomyConstants,
    clamps: &mut Vec<ClampRecord>,
) -> Construction {
    let Some(mut upgrade) = state.upgrade else {
        return Construction::default();
    };

    // One wood per builder while wood lasts; idle builders cost nothing.
    let wood_used = (state.jobs.builders as u64).min(state.wood);
    debit(&mut state.wood, wood_used, Resource::Wood, clamps);
    upgrade.progress = upgrade.progress.saturating_add(wood_used);

    let mut result = Construction {
        wood_used,
        completed_level: None,
    };

    if upgrade.is_complete() {
        state.castle_level = upgrade.target_level;
        state.upgrade = None;
        state.gold = state.gold.saturating_add(constants.upgrade_completion_bonus);
        result.completed_level = Some(state.castle_level);
        debug!(turn = state.turn, level = state.castle_level, "upgrade completed");
    } else {
        state.upgrade = Some(upgrade);
        debug!(
            turn = state.turn,
            wood_used,
            progress = upgrade.progress,
            required = upgrade.wood_required,
            "construction"
        );
    }

    result
}

// ---------------------------------------------------------------------------
// Phase: upkeep
// ---------------------------------------------------------------------------

fn phase_upkeep(state: &mut CastleState) -> Upkeep {
    let eaten = state.workers as u64;
    if state.food >= eaten {
        state.food -= eaten;
        return Upkeep {
            food_eaten: eaten,
            shortage: 0,
            workers_lost: 0,
        };
    }

    let shortage = eaten - state.food;
    let food_eaten = state.food;
    state.food = 0;
    // shortage <= workers, so the loss fits in u32.
    let workers_lost = (shortage.div_ceil(2) as u32).min(state.workers);
    state.workers -= workers_lost;

    let assigned = state.jobs.total();
    if assigned > state.workers as u64 {
        let excess = u32::try_from(assigned - state.workers as u64).unwrap_or(u32::MAX);
        state.jobs.shrink(excess);
    }

    warn!(
        turn = state.turn,
        shortage,
        workers_lost,
        workers = state.workers,
        "food shortage"
    );

    Upkeep {
        food_eaten,
        shortage,
        workers_lost,
    }
}

// ---------------------------------------------------------------------------
// Phase: taxes
// ---------------------------------------------------------------------------

fn phase_taxes(state: &mut CastleState, constants: &EconomyConstants) -> u64 {
    let taxes = constants.tax_rate.saturating_mul(state.castle_level as u64);
    state.gold = state.gold.saturating_add(taxes);
    taxes
}

// ---------------------------------------------------------------------------
// Phase: finalize
// ---------------------------------------------------------------------------

fn phase_finalize(outcome: &TickOutcome) {
    for clamp in &outcome.clamps {
        error!(
            turn = outcome.turn,
            resource = ?clamp.resource,
            shortfall = clamp.shortfall,
            "resource floored at zero; apply-time validation let a debit through"
        );
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Jobs;

    fn state_with(workers: u32, jobs: Jobs) -> CastleState {
        CastleState {
            turn: 0,
            gold: 100,
            food: 100,
            wood: 0,
            workers,
            castle_level: 0,
            jobs,
            upgrade: None,
        }
    }

    fn resolve(state: &mut CastleState, actions: Vec<Action>) -> TickOutcome {
        let queued = actions.into_iter().map(QueuedAction::from).collect();
        resolve_tick(state, queued, &EconomyConstants::default())
    }

    // -----------------------------------------------------------------------
    // Turn counter
    // -----------------------------------------------------------------------

    #[test]
    fn turn_increments_before_phases() {
        let mut state = CastleState::initial();
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(state.turn, 1);
        assert_eq!(outcome.turn, 1);
    }

    // -----------------------------------------------------------------------
    // Apply phase
    // -----------------------------------------------------------------------

    #[test]
    fn assign_jobs_after_hire_in_either_order() {
        for hire_first in [true, false] {
            let mut state = state_with(4, Jobs::new(1, 1, 1, 1));
            let assign = Action::AssignJobs(Jobs::new(2, 2, 1, 1));
            let hire = Action::Hire { count: 2 };
            let actions = if hire_first {
                vec![hire, assign]
            } else {
                vec![assign, hire]
            };
            let outcome = resolve(&mut state, actions);
            assert!(outcome.rejected.is_empty(), "{:?}", outcome.rejected);
            assert_eq!(outcome.applied.len(), 2);
            assert_eq!(outcome.applied[0].kind(), ActionKind::Hire);
            assert_eq!(state.workers, 6);
            assert_eq!(state.jobs.total(), 6);
            assert!(outcome.reconciliation.is_none());
        }
    }

    #[test]
    fn assign_jobs_with_wrong_sum_is_rejected_whole() {
        let mut state = state_with(4, Jobs::new(1, 1, 1, 1));
        let outcome = resolve(&mut state, vec![Action::AssignJobs(Jobs::new(5, 0, 0, 0))]);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::JobSumMismatch {
                assigned: 5,
                workers: 4
            }
        );
        assert_eq!(state.jobs, Jobs::new(1, 1, 1, 1));
    }

    #[test]
    fn hire_debits_gold_and_joins_this_tick() {
        let mut state = state_with(0, Jobs::default());
        state.gold = 10;
        state.food = 10;
        let outcome = resolve(&mut state, vec![Action::Hire { count: 2 }]);
        assert!(outcome.rejected.is_empty());
        // New hires are reconciled onto farms and eat this tick.
        assert_eq!(state.workers, 2);
        assert_eq!(state.jobs, Jobs::new(0, 2, 0, 0));
        assert_eq!(outcome.upkeep.food_eaten, 2);
        assert_eq!(state.gold, 0);
    }

    #[test]
    fn earlier_hire_can_exhaust_gold_for_later_hire() {
        let mut state = state_with(0, Jobs::default());
        state.gold = 7;
        let outcome = resolve(
            &mut state,
            vec![Action::Hire { count: 1 }, Action::Hire { count: 1 }],
        );
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::InsufficientGold { need: 5, have: 2 }
        );
    }

    #[test]
    fn fire_more_than_workforce_is_rejected() {
        let mut state = state_with(2, Jobs::new(1, 1, 0, 0));
        let outcome = resolve(&mut state, vec![Action::Fire { count: 3 }]);
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::InsufficientWorkers {
                requested: 3,
                available: 2
            }
        );
        assert_eq!(state.workers, 2);
    }

    #[test]
    fn fire_without_assign_shrinks_jobs_builders_first() {
        let mut state = state_with(4, Jobs::new(1, 1, 1, 1));
        let outcome = resolve(&mut state, vec![Action::Fire { count: 2 }]);
        assert_eq!(outcome.reconciliation, Some(JobReconciliation::Removed(2)));
        assert_eq!(state.jobs, Jobs::new(1, 1, 0, 0));
    }

    #[test]
    fn fire_then_assign_same_tick_validates_post_fire() {
        let mut state = state_with(4, Jobs::new(1, 1, 1, 1));
        let outcome = resolve(
            &mut state,
            vec![
                Action::AssignJobs(Jobs::new(0, 3, 0, 0)),
                Action::Fire { count: 1 },
            ],
        );
        assert!(outcome.rejected.is_empty());
        assert_eq!(state.jobs, Jobs::new(0, 3, 0, 0));
    }

    #[test]
    fn buy_food_feeds_this_ticks_upkeep() {
        let mut state = state_with(4, Jobs::new(4, 0, 0, 0));
        state.food = 0;
        state.gold = 4;
        let outcome = resolve(&mut state, vec![Action::BuyFood { amount: 4 }]);
        assert!(outcome.rejected.is_empty());
        assert_eq!(outcome.upkeep.shortage, 0);
        assert_eq!(state.food, 0);
        assert_eq!(state.workers, 4);
    }

    #[test]
    fn start_upgrade_debits_before_buy_food() {
        let mut state = state_with(1, Jobs::new(1, 0, 0, 0));
        state.gold = 12;
        let outcome = resolve(
            &mut state,
            vec![Action::BuyFood { amount: 5 }, Action::StartUpgrade],
        );
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(outcome.applied[0].kind(), ActionKind::StartUpgrade);
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::InsufficientGold { need: 5, have: 2 }
        );
        let upgrade = state.upgrade.expect("upgrade active");
        assert_eq!(upgrade.target_level, 1);
        assert_eq!(upgrade.wood_required, 20);
    }

    #[test]
    fn start_upgrade_with_too_little_gold_cites_quantities() {
        let mut state = state_with(1, Jobs::new(1, 0, 0, 0));
        state.gold = 5;
        let outcome = resolve(
            &mut state,
            vec![Action::StartUpgrade, Action::BuyFood { amount: 1 }],
        );
        assert_eq!(outcome.rejected.len(), 1);
        let rejection = &outcome.rejected[0];
        assert_eq!(rejection.kind(), ActionKind::StartUpgrade);
        assert_eq!(
            rejection.reason,
            RejectReason::InsufficientGold { need: 10, have: 5 }
        );
        assert_eq!(rejection.to_string(), "start_upgrade rejected: need 10 gold, have 5");
        // BuyFood still applied.
        assert_eq!(outcome.applied.len(), 1);
        assert!(state.upgrade.is_none());
    }

    #[test]
    fn second_start_upgrade_is_rejected() {
        let mut state = state_with(1, Jobs::new(1, 0, 0, 0));
        state.gold = 1000;
        let outcome = resolve(&mut state, vec![Action::StartUpgrade, Action::StartUpgrade]);
        assert_eq!(outcome.applied.len(), 1);
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::UpgradeInProgress { target_level: 1 }
        );
    }

    #[test]
    fn hire_overflowing_workforce_is_rejected() {
        let mut state = state_with(u32::MAX, Jobs::new(u32::MAX, 0, 0, 0));
        state.gold = u64::MAX;
        state.food = u64::MAX;
        let outcome = resolve(&mut state, vec![Action::Hire { count: 1 }]);
        assert!(matches!(
            outcome.rejected[0].reason,
            RejectReason::WorkforceLimit { .. }
        ));
    }

    #[test]
    fn start_upgrade_at_highest_level_is_rejected() {
        let mut state = state_with(1, Jobs::new(1, 0, 0, 0));
        state.castle_level = u32::MAX;
        state.gold = u64::MAX;
        let outcome = resolve(&mut state, vec![Action::StartUpgrade]);
        assert!(outcome.applied.is_empty());
        assert_eq!(
            outcome.rejected[0].reason,
            RejectReason::MaxLevel { level: u32::MAX }
        );
        assert!(state.upgrade.is_none());
        assert_eq!(state.gold, u64::MAX);
        assert_eq!(state.castle_level, u32::MAX);
    }

    // -----------------------------------------------------------------------
    // Production
    // -----------------------------------------------------------------------

    #[test]
    fn production_uses_job_counts() {
        let mut state = state_with(6, Jobs::new(1, 2, 3, 0));
        state.food = 6;
        let gold_before = state.gold;
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(
            outcome.production,
            Production {
                gold: 1,
                food: 4,
                wood: 3
            }
        );
        assert_eq!(state.gold, gold_before + 1);
        assert_eq!(state.wood, 3);
        assert_eq!(state.food, 4);
    }

    // -----------------------------------------------------------------------
    // Construction
    // -----------------------------------------------------------------------

    #[test]
    fn stalled_builders_are_a_noop() {
        let mut state = state_with(3, Jobs::new(0, 0, 0, 3));
        state.upgrade = Some(Upgrade {
            target_level: 1,
            progress: 4,
            wood_required: 20,
        });
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(outcome.construction.wood_used, 0);
        assert_eq!(state.upgrade.unwrap().progress, 4);
        assert!(outcome.clamps.is_empty());
    }

    #[test]
    fn builders_beyond_wood_do_nothing() {
        let mut state = state_with(5, Jobs::new(0, 0, 0, 5));
        state.wood = 2;
        state.upgrade = Some(Upgrade {
            target_level: 1,
            progress: 0,
            wood_required: 20,
        });
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(outcome.construction.wood_used, 2);
        assert_eq!(state.wood, 0);
        assert_eq!(state.upgrade.unwrap().progress, 2);
    }

    #[test]
    fn upgrade_completes_at_threshold() {
        let mut state = state_with(2, Jobs::new(0, 0, 0, 2));
        state.wood = 10;
        state.upgrade = Some(Upgrade {
            target_level: 1,
            progress: 18,
            wood_required: 20,
        });
        let gold_before = state.gold;
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(outcome.construction.completed_level, Some(1));
        assert_eq!(state.castle_level, 1);
        assert!(state.upgrade.is_none());
        // Completion bonus plus one level of tax.
        assert_eq!(state.gold, gold_before + 5 + 1);
        assert_eq!(state.wood, 8);
    }

    #[test]
    fn no_construction_without_upgrade() {
        let mut state = state_with(2, Jobs::new(0, 0, 0, 2));
        state.wood = 10;
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(outcome.construction, Construction::default());
        assert_eq!(state.wood, 10);
    }

    // -----------------------------------------------------------------------
    // Upkeep
    // -----------------------------------------------------------------------

    #[test]
    fn exact_food_means_no_loss() {
        let mut state = state_with(4, Jobs::new(4, 0, 0, 0));
        state.food = 4;
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(state.food, 0);
        assert_eq!(state.workers, 4);
        assert_eq!(outcome.upkeep.shortage, 0);
    }

    #[test]
    fn shortage_of_one_loses_one_worker() {
        let mut state = state_with(4, Jobs::new(1, 0, 1, 2));
        state.food = 3;
        let outcome = resolve(&mut state, vec![]);
        assert_eq!(outcome.upkeep.shortage, 1);
        assert_eq!(outcome.upkeep.workers_lost, 1);
        assert_eq!(state.workers, 3);
        assert_eq!(state.food, 0);
        assert_eq!(state.jobs, Jobs::new(1, 0, 1, 1));
    }

    #[test]
    fn shortage_rounds_up_and_trims_jobs_in_order() {
        let mut state = state_with(6, Jobs::new(2, 0, 3, 1));
        state.food = 1;
        let outcome = resolve(&mut state, vec![]);
        // shortage 5 -> ceil(5/2) = 3 lost: 1 builder, 2 lumberjacks.
        assert_eq!(outcome.upkeep.workers_lost, 3);
        assert_eq!(state.workers, 3);
        assert_eq!(state.jobs, Jobs::new(2, 0, 1, 0));
    }

    // -----------------------------------------------------------------------
    // Taxes
    // -----------------------------------------------------------------------

    #[test]
    fn taxes_follow_upkeep_and_use_level_only() {
        let mut state = state_with(4, Jobs::new(4, 0, 0, 0));
        state.castle_level = 1;
        state.gold = 0;
        state.food = 0;
        let outcome = resolve(&mut state, vec![Action::BuyFood { amount: 1 }]);
        // BuyFood is resolved before taxes exist, so it cannot spend them.
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.upkeep.shortage, 4);
        assert_eq!(state.workers, 2);
        assert_eq!(outcome.taxes, 1);
        // 4 miners produced 4 gold, then 1 tax.
        assert_eq!(state.gold, 5);
    }
}
