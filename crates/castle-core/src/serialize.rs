//! Binary snapshots of a running engine.
//!
//! A snapshot holds the castle state, the pending queue and the economy
//! constants, prefixed by a versioned header. Encoding is `bitcode`.
//! Log sinks and queue history are not part of a snapshot; attach sinks
//! again after restoring.

use serde::{Deserialize, Serialize};

use crate::action::QueuedAction;
use crate::economy::{EconomyConstants, EngineConfig};
use crate::engine::Engine;
use crate::state::CastleState;
use crate::validation::{InvariantViolation, check_invariants};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic number identifying a castle engine snapshot.
pub const SNAPSHOT_MAGIC: u32 = 0xCA57_0001;

/// Current format version. Increment when breaking the wire format.
pub const FORMAT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SerializeError {
    #[error("bitcode encoding failed: {0}")]
    Encode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum DeserializeError {
    #[error("invalid magic number: expected 0x{:08X}, got 0x{:08X}", SNAPSHOT_MAGIC, .0)]
    InvalidMagic(u32),
    #[error("unsupported format version: expected {}, got {}", FORMAT_VERSION, .0)]
    UnsupportedVersion(u32),
    #[error("snapshot from future version {0} (this build supports up to {FORMAT_VERSION})")]
    FutureVersion(u32),
    #[error("bitcode decoding failed: {0}")]
    Decode(String),
    #[error("header says turn {header} but the state is at turn {state}")]
    TurnMismatch { header: u64, state: u64 },
    #[error("snapshot state is inconsistent: {0}")]
    InvalidState(#[from] InvariantViolation),
}

// ---------------------------------------------------------------------------
// Snapshot header
// ---------------------------------------------------------------------------

/// Header prepended to every snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub magic: u32,
    pub version: u32,
    /// Turn of the state at the time the snapshot was taken.
    pub turn: u64,
}

impl SnapshotHeader {
    pub fn new(turn: u64) -> Self {
        Self {
            magic: SNAPSHOT_MAGIC,
            version: FORMAT_VERSION,
            turn,
        }
    }

    pub fn validate(&self) -> Result<(), DeserializeError> {
        if self.magic != SNAPSHOT_MAGIC {
            return Err(DeserializeError::InvalidMagic(self.magic));
        }
        if self.version > FORMAT_VERSION {
            return Err(DeserializeError::FutureVersion(self.version));
        }
        if self.version < FORMAT_VERSION {
            return Err(DeserializeError::UnsupportedVersion(self.version));
        }
        Ok(())
    }
}

/// Decode a snapshot and return only its header.
pub fn read_snapshot_header(data: &[u8]) -> Result<SnapshotHeader, DeserializeError> {
    // bitcode has no partial decode.
    let snapshot: EngineSnapshot =
        bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
    Ok(snapshot.header)
}

#[derive(Debug, Serialize, Deserialize)]
struct EngineSnapshot {
    header: SnapshotHeader,
    state: CastleState,
    pending: Vec<QueuedAction>,
    constants: EconomyConstants,
    history_limit: u64,
}

// ---------------------------------------------------------------------------
// Engine serialization
// ---------------------------------------------------------------------------

impl Engine {
    /// Serialize the engine to a binary blob.
    pub fn serialize(&self) -> Result<Vec<u8>, SerializeError> {
        let snapshot = EngineSnapshot {
            header: SnapshotHeader::new(self.state.turn),
            state: self.state.clone(),
            pending: self.queue.pending().to_vec(),
            constants: self.config.constants.clone(),
            history_limit: self.config.history_limit as u64,
        };
        bitcode::serialize(&snapshot).map_err(|e| SerializeError::Encode(e.to_string()))
    }

    /// Restore an engine from a binary blob.
    ///
    /// The header is validated before anything else; a version mismatch is
    /// an error, never a panic. The restored state must pass the same
    /// invariant checks a tick does.
    pub fn deserialize(data: &[u8]) -> Result<Self, DeserializeError> {
        let snapshot: EngineSnapshot =
            bitcode::deserialize(data).map_err(|e| DeserializeError::Decode(e.to_string()))?;
        snapshot.header.validate()?;
        if snapshot.header.turn != snapshot.state.turn {
            return Err(DeserializeError::TurnMismatch {
                header: snapshot.header.turn,
                state: snapshot.state.turn,
            });
        }
        check_invariants(&snapshot.state)?;

        let config = EngineConfig {
            constants: snapshot.constants,
            history_limit: usize::try_from(snapshot.history_limit).unwrap_or(usize::MAX),
        };
        let mut engine = Engine::from_parts(snapshot.state, config);
        for action in snapshot.pending {
            engine.queue.push(action);
        }
        Ok(engine)
    }
}
