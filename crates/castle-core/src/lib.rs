//! Castle Core -- a deterministic, turn-based resource economy for a single
//! castle.
//!
//! Actions are submitted between ticks and resolved together at the next
//! tick boundary. Given the same starting state, the same constants and the
//! same queued actions, a tick always produces the same result.
//!
//! # Tick Pipeline
//!
//! Each call to [`engine::Engine::advance`] resolves one tick:
//!
//! 1. **Turn** -- The turn counter increments.
//! 2. **Apply** -- Queued actions run in priority order (hire/fire, job
//!    assignment, upgrade, food purchase), each re-validated against the
//!    live state. Rejected actions change nothing.
//! 3. **Production** -- Miners, farmers and lumberjacks yield gold, food, wood.
//! 4. **Construction** -- Builders spend wood on the active upgrade.
//! 5. **Upkeep** -- Workers eat; a shortage costs workers.
//! 6. **Taxes** -- Gold per castle level.
//! 7. **Finalize** -- Invariant checks, then the per-tick log records.
//!
//! # Key Types
//!
//! - [`engine::Engine`] -- Owns the state and queue, drives ticks.
//! - [`state::CastleState`] -- Stockpiles, workforce, jobs, upgrade.
//! - [`action::Action`] -- The closed set of commands.
//! - [`resolver::resolve_tick`] -- The pure state transition.
//! - [`log::LogSink`] -- Receiver of applied-actions and state records.
//! - [`replay`] -- Rebuilds and verifies states from a log.
//! - [`scheduler::SharedEngine`] / [`scheduler::AutoTicker`] -- Concurrent
//!   submission and periodic ticking.
//! - [`serialize`] -- Versioned binary snapshots via bitcode.

pub mod action;
pub mod action_queue;
#[cfg(feature = "data-loader")]
pub mod data_loader;
pub mod economy;
pub mod engine;
pub mod hash;
pub mod log;
pub mod profiling;
pub mod replay;
pub mod resolver;
pub mod scheduler;
pub mod serialize;
pub mod state;
pub mod validation;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use action::{Action, ActionKind, ActionRequest, AdmissionError, QueuedAction};
pub use economy::{EconomyConstants, EngineConfig};
pub use engine::{Engine, EngineError, TickReport};
pub use state::{CastleState, Jobs, Upgrade};
