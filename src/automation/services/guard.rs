//! In-process guards against duplicate driver activation.

use std::collections::HashSet;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::automation::domain::DriverKind;

/// Records which drivers have run their page-load activation in one page
/// context.
///
/// Create one per page context and share it between that context's drivers;
/// a fresh context starts with a fresh guard.
#[derive(Debug, Default)]
pub struct InitGuard {
    claimed: Mutex<HashSet<DriverKind>>,
}

impl InitGuard {
    /// Creates an unclaimed guard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims page-load activation for `kind`. Returns `false` when it was
    /// already claimed.
    pub fn try_claim(&self, kind: DriverKind) -> bool {
        self.claimed
            .lock()
            .map(|mut claimed| claimed.insert(kind))
            .unwrap_or(false)
    }

    /// Returns `true` once `kind` has claimed activation.
    #[must_use]
    pub fn is_claimed(&self, kind: DriverKind) -> bool {
        self.claimed
            .lock()
            .map(|claimed| claimed.contains(&kind))
            .unwrap_or(true)
    }
}

/// Allows at most one activation of a driver to run at a time.
#[derive(Debug, Default)]
pub struct SingleFlight {
    running: AtomicBool,
}

impl SingleFlight {
    /// Creates an idle guard.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            running: AtomicBool::new(false),
        }
    }

    /// Enters the flight, or returns `None` when one is already running.
    #[must_use]
    pub fn try_acquire(&self) -> Option<FlightPermit<'_>> {
        self.running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| FlightPermit { flight: self })
    }

    /// Returns `true` while a permit is outstanding.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }
}

/// Proof of a running flight; leaving scope ends it.
#[derive(Debug)]
pub struct FlightPermit<'a> {
    flight: &'a SingleFlight,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        self.flight.running.store(false, Ordering::Release);
    }
}
