//! Replay of applied-actions logs and verification against logged states.
//!
//! Replaying only the applied-actions records from the starting state must
//! reproduce every state record bit for bit. Each logged action is re-run
//! through the same admission check and resolver the engine uses; an
//! action that the log claims was accepted but is rejected on replay means
//! the log and the constants do not belong together.

use std::io::BufRead;

use tracing::{debug, warn};

use crate::action::{ActionKind, AdmissionError, QueuedAction};
use crate::economy::EconomyConstants;
use crate::log::{AppliedActionsRecord, LogError, LogRecord, read_jsonl};
use crate::resolver::{RejectReason, resolve_tick};
use crate::state::CastleState;
use crate::validation::{StateDiff, diff_states};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ReplayError {
    #[error("log record for turn {found} out of sequence, expected turn {expected}")]
    TurnGap { expected: u64, found: u64 },
    #[error("turn {turn}: logged action could not be re-admitted: {source}")]
    Admission {
        turn: u64,
        #[source]
        source: AdmissionError,
    },
    #[error("turn {turn}: logged {kind} was rejected on replay: {reason}")]
    Rejected {
        turn: u64,
        kind: ActionKind,
        reason: RejectReason,
    },
    #[error(transparent)]
    Log(#[from] LogError),
}

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// Where a replayed state first disagreed with the logged one.
#[derive(Debug, Clone)]
pub struct ReplayMismatch {
    pub turn: u64,
    pub expected_hash: u64,
    pub actual_hash: u64,
    pub diff: StateDiff,
}

/// The result of verifying a log.
#[derive(Debug, Clone)]
pub struct ReplayResult {
    /// Number of applied-actions records re-run.
    pub ticks_replayed: u64,
    /// Number of state records compared.
    pub states_checked: u64,
    /// Whether every state record matched.
    pub is_verified: bool,
    /// First mismatch encountered (if any).
    pub first_mismatch: Option<ReplayMismatch>,
    /// State after the last replayed tick.
    pub final_state: CastleState,
}

// ---------------------------------------------------------------------------
// Replay execution
// ---------------------------------------------------------------------------

/// Re-run one applied-actions record against `state`.
fn replay_record(
    state: &mut CastleState,
    record: &AppliedActionsRecord,
    constants: &EconomyConstants,
) -> Result<(), ReplayError> {
    let expected = state.turn + 1;
    if record.turn != expected {
        return Err(ReplayError::TurnGap {
            expected,
            found: record.turn,
        });
    }
    let actions = record
        .actions
        .iter()
        .map(|logged| logged.to_queued())
        .collect::<Result<Vec<QueuedAction>, _>>()
        .map_err(|source| ReplayError::Admission {
            turn: record.turn,
            source,
        })?;

    let outcome = resolve_tick(state, actions, constants);
    if let Some(rejection) = outcome.rejected.into_iter().next() {
        return Err(ReplayError::Rejected {
            turn: record.turn,
            kind: rejection.kind(),
            reason: rejection.reason,
        });
    }
    Ok(())
}

/// Replay applied-actions records from the initial state. Returns the state
/// after each record, in order.
pub fn replay_actions(
    records: &[AppliedActionsRecord],
    constants: &EconomyConstants,
) -> Result<Vec<CastleState>, ReplayError> {
    replay_actions_from(CastleState::initial(), records, constants)
}

/// Replay applied-actions records from an arbitrary starting state.
pub fn replay_actions_from(
    start: CastleState,
    records: &[AppliedActionsRecord],
    constants: &EconomyConstants,
) -> Result<Vec<CastleState>, ReplayError> {
    let mut state = start;
    let mut states = Vec::with_capacity(records.len());
    for record in records {
        replay_record(&mut state, record, constants)?;
        states.push(state.clone());
    }
    Ok(states)
}

/// Replay a full log from the initial state, comparing every state record
/// with the replayed state of the same turn.
pub fn verify_log(
    records: &[LogRecord],
    constants: &EconomyConstants,
) -> Result<ReplayResult, ReplayError> {
    verify_log_from(CastleState::initial(), records, constants)
}

/// [`verify_log`] from an arbitrary starting state.
pub fn verify_log_from(
    start: CastleState,
    records: &[LogRecord],
    constants: &EconomyConstants,
) -> Result<ReplayResult, ReplayError> {
    let mut state = start;
    let mut ticks_replayed = 0;
    let mut states_checked = 0;
    let mut first_mismatch: Option<ReplayMismatch> = None;

    for record in records {
        match record {
            LogRecord::Actions(actions) => {
                replay_record(&mut state, actions, constants)?;
                ticks_replayed += 1;
            }
            LogRecord::State(logged) => {
                if logged.turn != state.turn {
                    return Err(ReplayError::TurnGap {
                        expected: state.turn,
                        found: logged.turn,
                    });
                }
                states_checked += 1;
                let diff = diff_states(&logged.state, &state);
                if !diff.is_identical() && first_mismatch.is_none() {
                    warn!(turn = logged.turn, fields = diff.fields.len(), "replay diverged");
                    first_mismatch = Some(ReplayMismatch {
                        turn: logged.turn,
                        expected_hash: logged.state.state_hash(),
                        actual_hash: state.state_hash(),
                        diff,
                    });
                }
            }
        }
    }

    debug!(ticks_replayed, states_checked, "log verified");
    Ok(ReplayResult {
        ticks_replayed,
        states_checked,
        is_verified: first_mismatch.is_none(),
        first_mismatch,
        final_state: state,
    })
}

/// Read a JSON-lines log and verify it from the initial state.
pub fn verify_jsonl(
    reader: impl BufRead,
    constants: &EconomyConstants,
) -> Result<ReplayResult, ReplayError> {
    let records = read_jsonl(reader)?;
    verify_log(&records, constants)
}

// ===========================================================================
// Tests
// ===========================================================================
