//! Per-tick log records and the sinks that receive them.
//!
//! Every resolved tick emits, in order:
//! 1. an [`AppliedActionsRecord`] listing the accepted actions in
//!    application order, then
//! 2. a [`StateRecord`] with the full post-tick state.
//!
//! Rejected actions are never logged here; they go back to the caller in the
//! tick report. Replaying only the applied-actions records from the initial
//! state reproduces every state record (see [`crate::replay`]).
//!
//! Sinks are passive: a failing sink is reported by the engine and never
//! aborts a tick.

use std::io::{BufRead, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::action::{ActionKind, ActionRequest, AdmissionError, QueuedAction};
use crate::state::CastleState;

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

/// One accepted action as it appears in the log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggedAction {
    pub kind: ActionKind,
    pub params: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitter_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl LoggedAction {
    /// Rebuild the queued action this entry was logged from.
    pub fn to_queued(&self) -> Result<QueuedAction, AdmissionError> {
        ActionRequest {
            kind: self.kind.as_str().to_string(),
            params: self.params.clone(),
            submitter_id: self.submitter_id.clone(),
            correlation_id: self.correlation_id.clone(),
        }
        .into_queued()
    }
}

impl From<&QueuedAction> for LoggedAction {
    fn from(queued: &QueuedAction) -> Self {
        Self {
            kind: queued.kind(),
            params: queued.action.params(),
            submitter_id: queued.provenance.submitter_id.clone(),
            correlation_id: queued.provenance.correlation_id.clone(),
        }
    }
}

/// Accepted actions of one tick, in application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedActionsRecord {
    pub turn: u64,
    pub actions: Vec<LoggedAction>,
}

/// Full state at the end of one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateRecord {
    pub turn: u64,
    pub state: CastleState,
}

/// A single log line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "record", rename_all = "snake_case")]
pub enum LogRecord {
    Actions(AppliedActionsRecord),
    State(StateRecord),
}

impl LogRecord {
    pub fn turn(&self) -> u64 {
        match self {
            LogRecord::Actions(r) => r.turn,
            LogRecord::State(r) => r.turn,
        }
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("log I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("log line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("log encoding failed: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("log sink poisoned")]
    Poisoned,
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Receiver of per-tick log records.
pub trait LogSink: Send {
    fn record(&mut self, record: &LogRecord) -> Result<(), LogError>;
}

/// In-memory sink. Clones share one buffer, so a test can keep a handle
/// while the engine owns another.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of everything recorded so far.
    pub fn records(&self) -> Vec<LogRecord> {
        match self.records.lock() {
            Ok(records) => records.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// The applied-actions records, in order.
    pub fn action_records(&self) -> Vec<AppliedActionsRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                LogRecord::Actions(a) => Some(a),
                LogRecord::State(_) => None,
            })
            .collect()
    }

    /// The state records, in order.
    pub fn state_records(&self) -> Vec<StateRecord> {
        self.records()
            .into_iter()
            .filter_map(|r| match r {
                LogRecord::State(s) => Some(s),
                LogRecord::Actions(_) => None,
            })
            .collect()
    }
}

impl LogSink for MemorySink {
    fn record(&mut self, record: &LogRecord) -> Result<(), LogError> {
        self.records
            .lock()
            .map_err(|_| LogError::Poisoned)?
            .push(record.clone());
        Ok(())
    }
}

/// Writes one JSON object per line and flushes after each record.
#[derive(Debug)]
pub struct JsonlSink<W: Write + Send> {
    writer: W,
}

impl<W: Write + Send> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> LogSink for JsonlSink<W> {
    fn record(&mut self, record: &LogRecord) -> Result<(), LogError> {
        serde_json::to_writer(&mut self.writer, record).map_err(LogError::Encode)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a JSON-lines log back. Blank lines are skipped.
pub fn read_jsonl(reader: impl BufRead) -> Result<Vec<LogRecord>, LogError> {
    let mut records = Vec::new();
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|source| LogError::Json {
            line: index + 1,
            source,
        })?;
        records.push(record);
    }
    Ok(records)
}

// ===========================================================================
// Tests
// ===========================================================================
