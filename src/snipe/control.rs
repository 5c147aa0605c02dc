//! Scan phase machine and lane signalling
//!
//! `Idle -> Running <-> Paused -> {Completed | Stopped}`. The authoritative
//! phase lives in the session; [`ScanControl`] broadcasts every change so lanes
//! can sleep while paused instead of polling.

use tokio::sync::watch;

use crate::error::{Result, SniperError};
use crate::types::ScanPhase;

/// Input to the phase machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Launch,
    Pause,
    Resume,
    Stop,
    /// Generator drained and every drawn batch recorded
    Exhausted,
}

impl std::fmt::Display for ControlEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlEvent::Launch => write!(f, "launch"),
            ControlEvent::Pause => write!(f, "pause"),
            ControlEvent::Resume => write!(f, "resume"),
            ControlEvent::Stop => write!(f, "stop"),
            ControlEvent::Exhausted => write!(f, "exhausted"),
        }
    }
}

impl ScanPhase {
    /// Apply `event`, returning the next phase or a state conflict
    pub fn apply(self, event: ControlEvent) -> Result<ScanPhase> {
        use ControlEvent::*;
        use ScanPhase::*;

        match (self, event) {
            (Idle, Launch) => Ok(Running),
            (Running, Pause) => Ok(Paused),
            (Paused, Resume) => Ok(Running),
            (Running | Paused, Stop) => Ok(Stopped),
            // In-flight batches may finish while paused
            (Running | Paused, Exhausted) => Ok(Completed),
            (Running | Paused, Launch) => Err(SniperError::state_conflict(
                "A scan is already in progress.",
            )),
            (phase, event) => Err(SniperError::state_conflict(format!(
                "Cannot {} a scan that is {}",
                event, phase
            ))),
        }
    }
}

/// Broadcasts phase changes to lanes and observers
#[derive(Debug)]
pub struct ScanControl {
    tx: watch::Sender<ScanPhase>,
}

impl ScanControl {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(ScanPhase::Idle);
        Self { tx }
    }

    pub fn publish(&self, phase: ScanPhase) {
        let previous = self.tx.send_replace(phase);
        if previous != phase {
            tracing::info!(from = %previous, to = %phase, "Scan phase changed");
        }
    }

    pub fn phase(&self) -> ScanPhase {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> PhaseWatcher {
        PhaseWatcher {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for ScanControl {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of [`ScanControl`]
#[derive(Debug, Clone)]
pub struct PhaseWatcher {
    rx: watch::Receiver<ScanPhase>,
}

impl PhaseWatcher {
    pub fn current(&self) -> ScanPhase {
        *self.rx.borrow()
    }

    /// Wait while paused. Returns `true` once running, `false` if the scan ended.
    pub async fn wait_runnable(&mut self) -> bool {
        loop {
            let phase = *self.rx.borrow_and_update();
            match phase {
                ScanPhase::Running => return true,
                ScanPhase::Paused | ScanPhase::Idle => {
                    if self.rx.changed().await.is_err() {
                        return false;
                    }
                }
                ScanPhase::Completed | ScanPhase::Stopped => return false,
            }
        }
    }

    /// Wait for a terminal phase
    pub async fn wait_terminal(&mut self) -> ScanPhase {
        loop {
            let phase = *self.rx.borrow_and_update();
            if phase.is_terminal() {
                return phase;
            }
            if self.rx.changed().await.is_err() {
                return *self.rx.borrow();
            }
        }
    }
}
