//! Capture lifecycle state machine
//!
//! `Idle -> Starting -> Active -> Stopping -> Idle`, with one extra edge
//! for device hot-swap: `Active -> Starting -> Active` without ever
//! visiting `Idle`. A failed start returns to whatever phase it was
//! entered from, so a failed hot-swap leaves the session observably
//! active.

use serde::Serialize;
use thiserror::Error;

/// Capture lifecycle phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CapturePhase {
    /// No session exists
    Idle,
    /// A session is being constructed
    Starting,
    /// A session is running
    Active,
    /// The session is being torn down
    Stopping,
}

impl CapturePhase {
    /// Phase name for logs
    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Starting => "Starting",
            Self::Active => "Active",
            Self::Stopping => "Stopping",
        }
    }
}

/// Lifecycle errors
#[derive(Error, Debug)]
pub enum LifecycleError {
    /// The requested transition is not part of the state machine
    #[error("invalid capture transition: {from} -> {to}")]
    InvalidTransition {
        from: &'static str,
        to: &'static str,
    },
}

/// Validated capture lifecycle
#[derive(Debug)]
pub struct CaptureLifecycle {
    phase: CapturePhase,
    /// Phase to restore when a start fails
    resume_phase: CapturePhase,
}

impl CaptureLifecycle {
    pub fn new() -> Self {
        Self {
            phase: CapturePhase::Idle,
            resume_phase: CapturePhase::Idle,
        }
    }

    pub fn phase(&self) -> CapturePhase {
        self.phase
    }

    /// Whether observers should see the capture as active
    ///
    /// True while `Active`, and also while `Starting` a hot-swap away from
    /// an active session; the switch must never look like a stop.
    pub fn is_active(&self) -> bool {
        match self.phase {
            CapturePhase::Active => true,
            CapturePhase::Starting => self.resume_phase == CapturePhase::Active,
            _ => false,
        }
    }

    /// Attempt a transition
    pub fn transition(&mut self, to: CapturePhase) -> Result<(), LifecycleError> {
        if !Self::is_valid(self.phase, to) {
            return Err(LifecycleError::InvalidTransition {
                from: self.phase.name(),
                to: to.name(),
            });
        }

        if to == CapturePhase::Starting {
            self.resume_phase = self.phase;
        }
        self.phase = to;
        Ok(())
    }

    /// Abandon a start, restoring the phase it was entered from
    ///
    /// Returns the restored phase. Outside of `Starting` this is a no-op.
    pub fn fail_start(&mut self) -> CapturePhase {
        if self.phase == CapturePhase::Starting {
            self.phase = self.resume_phase;
        }
        self.phase
    }

    fn is_valid(from: CapturePhase, to: CapturePhase) -> bool {
        use CapturePhase::*;

        matches!(
            (from, to),
            // Cold start
            (Idle, Starting)
            // Start completed
            | (Starting, Active)
            // Device hot-swap while running
            | (Active, Starting)
            // Orderly shutdown
            | (Active, Stopping)
            | (Stopping, Idle)
        )
    }
}

impl Default for CaptureLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
