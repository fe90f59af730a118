//! Thread-safe engine handle and a periodic tick driver.
//!
//! [`SharedEngine`] serializes every operation through one mutex, so a tick
//! observes either all or none of a concurrent `enqueue`. A second lock is
//! held for the whole of a tick and is what `try_advance` tests, so a
//! submitter holding the engine briefly never causes a skip.
//!
//! [`AutoTicker`] advances a shared engine on a fixed period from a
//! background thread. If a tick is still in flight when a period elapses,
//! that tick is skipped; ticks never overlap and never queue up behind each
//! other.

use std::sync::{Arc, Mutex, MutexGuard, TryLockError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender, bounded, select, tick};
use tracing::{debug, error, info};

use crate::action::{ActionRequest, QueuedAction};
use crate::action_queue::Admission;
use crate::engine::{Engine, EngineError, TickReport};
use crate::state::CastleState;

// ---------------------------------------------------------------------------
// SharedEngine
// ---------------------------------------------------------------------------

/// Cloneable handle to one engine. All clones see the same state.
///
/// Lock order is `ticking` then `inner`.
#[derive(Debug, Clone)]
pub struct SharedEngine {
    inner: Arc<Mutex<Engine>>,
    ticking: Arc<Mutex<()>>,
}

impl SharedEngine {
    pub fn new(engine: Engine) -> Self {
        Self {
            inner: Arc::new(Mutex::new(engine)),
            ticking: Arc::new(Mutex::new(())),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Engine>, EngineError> {
        self.inner.lock().map_err(|_| EngineError::Poisoned)
    }

    pub fn enqueue(&self, action: impl Into<QueuedAction>) -> Result<Admission, EngineError> {
        Ok(self.lock()?.enqueue(action)?)
    }

    pub fn submit(&self, request: ActionRequest) -> Result<Admission, EngineError> {
        Ok(self.lock()?.submit(request)?)
    }

    /// Block until any running tick and any other holder are done, then
    /// resolve one tick.
    pub fn advance(&self) -> Result<TickReport, EngineError> {
        let _ticking = self.ticking.lock().map_err(|_| EngineError::Poisoned)?;
        Ok(self.lock()?.advance())
    }

    /// Resolve one tick unless another tick is in flight. `Ok(None)` means
    /// a tick was already running and nothing happened.
    ///
    /// Non-tick holders of the engine (submitters, readers) are waited for.
    pub fn try_advance(&self) -> Result<Option<TickReport>, EngineError> {
        let _ticking = match self.ticking.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => return Ok(None),
            Err(TryLockError::Poisoned(_)) => return Err(EngineError::Poisoned),
        };
        Ok(Some(self.lock()?.advance()))
    }

    /// A copy of the current state.
    pub fn state(&self) -> Result<CastleState, EngineError> {
        Ok(self.lock()?.state())
    }

    /// Run `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut Engine) -> R) -> Result<R, EngineError> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }
}

// ---------------------------------------------------------------------------
// AutoTicker
// ---------------------------------------------------------------------------

/// Counters returned when an [`AutoTicker`] stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickerStats {
    pub ticks: u64,
    pub skipped: u64,
}

/// Background thread advancing a [`SharedEngine`] every `period`.
///
/// Dropping the ticker stops it and waits for the thread to exit.
#[derive(Debug)]
pub struct AutoTicker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<TickerStats>>,
}

impl AutoTicker {
    pub fn start(engine: SharedEngine, period: Duration) -> std::io::Result<Self> {
        let (stop_tx, stop_rx) = bounded(1);
        let handle = thread::Builder::new()
            .name("castle-ticker".into())
            .spawn(move || run_ticker(engine, period, stop_rx))?;
        info!(?period, "auto ticker started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop ticking. A tick already in progress runs to completion first.
    pub fn stop(mut self) -> TickerStats {
        self.shutdown()
    }

    fn shutdown(&mut self) -> TickerStats {
        if let Some(stop_tx) = self.stop_tx.take() {
            // A full channel or a finished thread both mean stop is underway.
            let _ = stop_tx.try_send(());
        }
        let Some(handle) = self.handle.take() else {
            return TickerStats::default();
        };
        match handle.join() {
            Ok(stats) => {
                info!(ticks = stats.ticks, skipped = stats.skipped, "auto ticker stopped");
                stats
            }
            Err(_) => {
                error!("auto ticker thread panicked");
                TickerStats::default()
            }
        }
    }
}

impl Drop for AutoTicker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_ticker(engine: SharedEngine, period: Duration, stop_rx: Receiver<()>) -> TickerStats {
    let ticker = tick(period);
    let mut stats = TickerStats::default();
    loop {
        select! {
            recv(stop_rx) -> _ => break,
            recv(ticker) -> _ => match engine.try_advance() {
                Ok(Some(_)) => stats.ticks += 1,
                Ok(None) => {
                    stats.skipped += 1;
                    debug!("previous tick still running; tick skipped");
                }
                Err(err) => {
                    error!(error = %err, "auto ticker halted");
                    break;
                }
            },
        }
    }
    stats
}

// ===========================================================================
// Tests
// ===========================================================================
