//! Shared test helpers for integration tests and benchmarks.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]` so these helpers
//! are available in unit tests, integration tests, and benchmarks (via the
//! `test-utils` feature).

use crate::action::Action;
use crate::economy::EngineConfig;
use crate::engine::{Engine, TickReport};
use crate::log::MemorySink;
use crate::state::{CastleState, Jobs};

// ===========================================================================
// Action constructors
// ===========================================================================

pub fn hire(count: u32) -> Action {
    Action::Hire { count }
}

pub fn fire(count: u32) -> Action {
    Action::Fire { count }
}

pub fn buy_food(amount: u32) -> Action {
    Action::BuyFood { amount }
}

pub fn assign(miners: u32, farmers: u32, lumberjacks: u32, builders: u32) -> Action {
    Action::AssignJobs(Jobs::new(miners, farmers, lumberjacks, builders))
}

pub fn start_upgrade() -> Action {
    Action::StartUpgrade
}

// ===========================================================================
// State and engine builders
// ===========================================================================

/// A consistent state at turn 0 with the given stockpiles. The workforce is
/// the sum of `jobs`.
pub fn state_with(gold: u64, food: u64, wood: u64, jobs: Jobs) -> CastleState {
    let workers = u32::try_from(jobs.total()).expect("job total fits in u32");
    CastleState {
        gold,
        food,
        wood,
        workers,
        jobs,
        ..CastleState::initial()
    }
}

/// An engine resuming from `state` with default constants.
pub fn engine_with(state: CastleState) -> Engine {
    Engine::with_state(state, EngineConfig::default()).expect("test state must be consistent")
}

/// A default engine with an attached memory sink.
pub fn recorded_engine() -> (Engine, MemorySink) {
    let sink = MemorySink::new();
    let engine = Engine::default().with_sink(sink.clone());
    (engine, sink)
}

// ===========================================================================
// Scripted runs
// ===========================================================================

/// Run one tick per batch, enqueueing the batch's actions first.
pub fn run_script(engine: &mut Engine, script: &[Vec<Action>]) -> Vec<TickReport> {
    script
        .iter()
        .map(|batch| {
            for action in batch {
                engine.enqueue(*action).expect("typed actions are always admitted");
            }
            engine.advance()
        })
        .collect()
}

/// A fixed scenario touching every action kind. The upgrade starts on the
/// third tick; the second `start_upgrade` is rejected as already in progress.
pub fn growth_script() -> Vec<Vec<Action>> {
    vec![
        vec![hire(1), assign(2, 2, 1, 0)],
        vec![],
        vec![start_upgrade()],
        vec![assign(1, 2, 1, 1), buy_food(2)],
        vec![],
        vec![fire(1)],
        vec![buy_food(5)],
        vec![start_upgrade()],
        vec![hire(1)],
        vec![],
    ]
}
