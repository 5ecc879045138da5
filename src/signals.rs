use std::sync::atomic::{AtomicBool, Ordering};

// ============================================================================
// Focus & Connectivity Signals
// ============================================================================
//
// The retryer only ever reads these. Whoever owns the real source of truth
// (window focus, a reachability check, an app lifecycle hook) implements the
// trait and calls `Retryer::resume` when the state becomes valid again.
//
// ============================================================================

/// Answers "is the consumer currently active/visible?"
pub trait FocusSignal: Send + Sync {
    fn is_active(&self) -> bool;
}

/// Answers "is the network currently reachable?"
pub trait ConnectivitySignal: Send + Sync {
    fn is_reachable(&self) -> bool;
}

/// Focus provider for headless hosts: always active
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysActive;

impl FocusSignal for AlwaysActive {
    fn is_active(&self) -> bool {
        true
    }
}

/// Connectivity provider that never reports an outage
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysReachable;

impl ConnectivitySignal for AlwaysReachable {
    fn is_reachable(&self) -> bool {
        true
    }
}

/// A pushed on/off signal. Usable as either provider.
#[derive(Debug)]
pub struct SignalSwitch {
    on: AtomicBool,
}

impl SignalSwitch {
    pub fn new(on: bool) -> Self {
        Self {
            on: AtomicBool::new(on),
        }
    }

    pub fn set(&self, on: bool) {
        let previous = self.on.swap(on, Ordering::SeqCst);
        if previous != on {
            tracing::debug!(on, "signal switched");
        }
    }

    pub fn get(&self) -> bool {
        self.on.load(Ordering::SeqCst)
    }
}

impl Default for SignalSwitch {
    fn default() -> Self {
        Self::new(true)
    }
}

impl FocusSignal for SignalSwitch {
    fn is_active(&self) -> bool {
        self.get()
    }
}

impl ConnectivitySignal for SignalSwitch {
    fn is_reachable(&self) -> bool {
        self.get()
    }
}
