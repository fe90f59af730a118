//! The castle engine: owns the state and the pending queue, and drives one
//! tick per [`Engine::advance`] call.
//!
//! # Architecture
//!
//! The `Engine` owns:
//! - A [`CastleState`] (the authoritative economy)
//! - An [`ActionQueue`] of admitted actions awaiting the next tick
//! - The [`EconomyConstants`] every tick resolves against
//! - Zero or more [`LogSink`]s that receive the per-tick records
//!
//! # Tick boundary
//!
//! `advance()` drains the queue, hands the drained actions to
//! [`resolve_tick`], checks the structural invariants of the result, and
//! only then emits the applied-actions record followed by the state record.
//! Actions enqueued while a tick is running (through a
//! [`SharedEngine`](crate::scheduler::SharedEngine)) wait for the next one.

use tracing::{debug, error, info, warn};

use crate::action::{ActionRequest, AdmissionError, QueuedAction};
use crate::action_queue::{ActionQueue, Admission};
use crate::economy::{EconomyConstants, EngineConfig};
use crate::log::{AppliedActionsRecord, LogRecord, LogSink, LoggedAction, StateRecord};
use crate::resolver::{Rejection, TickOutcome, resolve_tick};
use crate::state::CastleState;
use crate::validation::{InvariantViolation, check_invariants};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by the engine and its shared handle.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Admission(#[from] AdmissionError),
    #[error("initial state is inconsistent: {0}")]
    InvalidState(#[from] InvariantViolation),
    #[error("engine lock poisoned by a panicking tick")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// Tick report
// ---------------------------------------------------------------------------

/// What one call to [`Engine::advance`] produced.
#[derive(Debug, Clone)]
pub struct TickReport {
    /// Full resolver outcome, including per-phase amounts.
    pub outcome: TickOutcome,
    /// Hash of the post-tick state.
    pub state_hash: u64,
    /// Number of sink writes that failed during this tick.
    pub sink_failures: usize,
}

impl TickReport {
    pub fn turn(&self) -> u64 {
        self.outcome.turn
    }

    pub fn applied(&self) -> &[QueuedAction] {
        &self.outcome.applied
    }

    pub fn rejected(&self) -> &[Rejection] {
        &self.outcome.rejected
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    pub(crate) state: CastleState,
    pub(crate) queue: ActionQueue,
    pub(crate) config: EngineConfig,
    sinks: Vec<Box<dyn LogSink>>,
    /// Hash of `state` as of the last tick boundary.
    pub(crate) last_state_hash: u64,
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine")
            .field("state", &self.state)
            .field("pending", &self.queue.pending_count())
            .field("sinks", &self.sinks.len())
            .field("last_state_hash", &self.last_state_hash)
            .finish()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl Engine {
    /// Create an engine at the fixed initial state.
    pub fn new(config: EngineConfig) -> Self {
        let state = CastleState::initial();
        Self::from_parts(state, config)
    }

    /// Create an engine that resumes from an arbitrary state. The state must
    /// satisfy every structural invariant.
    pub fn with_state(state: CastleState, config: EngineConfig) -> Result<Self, EngineError> {
        check_invariants(&state)?;
        Ok(Self::from_parts(state, config))
    }

    pub(crate) fn from_parts(state: CastleState, config: EngineConfig) -> Self {
        let last_state_hash = state.state_hash();
        Self {
            queue: ActionQueue::with_max_history(config.history_limit),
            state,
            config,
            sinks: Vec::new(),
            last_state_hash,
        }
    }

    /// Attach a log sink. Records are delivered to sinks in attach order.
    pub fn add_sink(&mut self, sink: impl LogSink + 'static) {
        self.sinks.push(Box::new(sink));
    }

    /// Builder form of [`add_sink`](Self::add_sink).
    pub fn with_sink(mut self, sink: impl LogSink + 'static) -> Self {
        self.add_sink(sink);
        self
    }

    // -- Submission --

    /// Queue an already-typed action for the next tick.
    ///
    /// Typed actions are syntactically valid by construction, so this never
    /// fails; the `Result` keeps the signature aligned with [`submit`](Self::submit).
    pub fn enqueue(
        &mut self,
        action: impl Into<QueuedAction>,
    ) -> Result<Admission, AdmissionError> {
        let action = action.into();
        let applies_at_turn = self.state.turn + 1;
        debug!(kind = %action.kind(), applies_at_turn, "action admitted");
        let position = self.queue.push(action);
        Ok(Admission {
            applies_at_turn,
            position,
        })
    }

    /// Admit an untyped request. Malformed requests are rejected here and
    /// never reach the queue.
    pub fn submit(&mut self, request: ActionRequest) -> Result<Admission, AdmissionError> {
        match request.into_queued() {
            Ok(queued) => self.enqueue(queued),
            Err(err) => {
                warn!(error = %err, "action refused at admission");
                Err(err)
            }
        }
    }

    // -- Ticking --

    /// Resolve exactly one tick.
    pub fn advance(&mut self) -> TickReport {
        let next_turn = self.state.turn + 1;
        let actions = self.queue.drain(next_turn);
        let outcome = resolve_tick(&mut self.state, actions, &self.config.constants);

        let invariants = check_invariants(&self.state);
        if let Err(violation) = &invariants {
            error!(%violation, "state invariant violated after tick");
        }
        debug_assert!(invariants.is_ok(), "{invariants:?}");
        debug_assert!(outcome.clamps.is_empty(), "{:?}", outcome.clamps);

        self.last_state_hash = self.state.state_hash();
        let sink_failures = self.emit_records(&outcome);

        info!(
            turn = outcome.turn,
            applied = outcome.applied.len(),
            rejected = outcome.rejected.len(),
            gold = self.state.gold,
            food = self.state.food,
            wood = self.state.wood,
            workers = self.state.workers,
            castle_level = self.state.castle_level,
            "tick resolved"
        );

        TickReport {
            outcome,
            state_hash: self.last_state_hash,
            sink_failures,
        }
    }

    /// Resolve `ticks` ticks back to back. Actions queued before the call
    /// all apply in the first of them.
    pub fn advance_by(&mut self, ticks: u64) -> Vec<TickReport> {
        (0..ticks).map(|_| self.advance()).collect()
    }

    fn emit_records(&mut self, outcome: &TickOutcome) -> usize {
        if self.sinks.is_empty() {
            return 0;
        }
        let records = [
            LogRecord::Actions(AppliedActionsRecord {
                turn: outcome.turn,
                actions: outcome.applied.iter().map(LoggedAction::from).collect(),
            }),
            LogRecord::State(StateRecord {
                turn: outcome.turn,
                state: self.state.clone(),
            }),
        ];
        let mut failures = 0;
        for record in &records {
            for sink in &mut self.sinks {
                if let Err(err) = sink.record(record) {
                    warn!(turn = outcome.turn, error = %err, "log sink failed");
                    failures += 1;
                }
            }
        }
        failures
    }

    // -- Queries --

    /// A copy of the current state. Never a live reference.
    pub fn state(&self) -> CastleState {
        self.state.clone()
    }

    pub fn turn(&self) -> u64 {
        self.state.turn
    }

    /// Hash of the state at the last tick boundary.
    pub fn state_hash(&self) -> u64 {
        self.last_state_hash
    }

    pub fn pending(&self) -> &[QueuedAction] {
        self.queue.pending()
    }

    pub fn pending_count(&self) -> usize {
        self.queue.pending_count()
    }

    /// Drained actions retained for debugging, as `(turn, action)`.
    pub fn history(&self) -> &[(u64, QueuedAction)] {
        self.queue.history()
    }

    pub fn constants(&self) -> &EconomyConstants {
        &self.config.constants
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

// ===========================================================================
// Tests
// ===========================================================================
