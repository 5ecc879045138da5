use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::signals::{AlwaysActive, AlwaysReachable, ConnectivitySignal, FocusSignal};

/// Whether the connectivity signal gates attempts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Pause while the network is unreachable
    #[default]
    Online,
    /// Ignore connectivity
    Always,
}

/// Pause gate: attempts may proceed iff the consumer is focused and, in
/// `Online` mode, the network is reachable.
#[derive(Clone)]
pub struct PauseGate {
    focus: Arc<dyn FocusSignal>,
    connectivity: Arc<dyn ConnectivitySignal>,
    mode: ExecutionMode,
}

impl PauseGate {
    pub fn new(
        focus: Arc<dyn FocusSignal>,
        connectivity: Arc<dyn ConnectivitySignal>,
        mode: ExecutionMode,
    ) -> Self {
        Self {
            focus,
            connectivity,
            mode,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn is_permitted(&self) -> bool {
        self.focus.is_active()
            && (self.mode == ExecutionMode::Always || self.connectivity.is_reachable())
    }
}

impl Default for PauseGate {
    fn default() -> Self {
        Self::new(
            Arc::new(AlwaysActive),
            Arc::new(AlwaysReachable),
            ExecutionMode::default(),
        )
    }
}

impl std::fmt::Debug for PauseGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PauseGate")
            .field("mode", &self.mode)
            .field("permitted", &self.is_permitted())
            .finish()
    }
}
