//! Process-wide readiness gate

use crate::error::{Error, Result};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// Service readiness, consulted on every download request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    /// Startup checks still running
    Starting,
    /// Accepting downloads
    Ready,
    /// Shutdown began; no new downloads
    Draining,
}

impl Readiness {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Readiness::Starting,
            1 => Readiness::Ready,
            _ => Readiness::Draining,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            Readiness::Starting => 0,
            Readiness::Ready => 1,
            Readiness::Draining => 2,
        }
    }

    /// Whether downloads are accepted in this state
    pub fn is_ready(self) -> bool {
        self == Readiness::Ready
    }

    /// Status string reported by the health endpoint
    pub fn as_str(self) -> &'static str {
        match self {
            Readiness::Starting => "starting",
            Readiness::Ready => "ok",
            Readiness::Draining => "draining",
        }
    }
}

/// Gate moving one way: `Starting` → `Ready` → `Draining`
///
/// Cloning shares the underlying state.
#[derive(Debug, Clone)]
pub struct ReadinessGate {
    state: Arc<AtomicU8>,
}

impl Default for ReadinessGate {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadinessGate {
    /// New gate in the `Starting` state
    pub fn new() -> Self {
        Self {
            state: Arc::new(AtomicU8::new(Readiness::Starting.as_u8())),
        }
    }

    /// Current state
    pub fn current(&self) -> Readiness {
        Readiness::from_u8(self.state.load(Ordering::SeqCst))
    }

    /// Open the gate; has no effect once draining has begun
    pub fn mark_ready(&self) -> bool {
        self.state
            .compare_exchange(
                Readiness::Starting.as_u8(),
                Readiness::Ready.as_u8(),
                Ordering::SeqCst,
                Ordering::SeqCst,
            )
            .is_ok()
    }

    /// Close the gate for good
    pub fn begin_drain(&self) {
        self.state
            .store(Readiness::Draining.as_u8(), Ordering::SeqCst);
    }

    /// Fail unless downloads are currently accepted
    pub fn check(&self) -> Result<()> {
        match self.current() {
            Readiness::Ready => Ok(()),
            Readiness::Starting => Err(Error::NotReady),
            Readiness::Draining => Err(Error::ShuttingDown),
        }
    }
}
