//! Orchestrator configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the orchestrator's tick sweeps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Evaluate inactivity thresholds during stop sweeps.
    pub inactivity_enabled: bool,

    /// Default look-ahead window for the stop-preview query, in minutes.
    pub default_preview_window_minutes: i64,

    /// Upper bound on candidates examined per sweep per tick. `None` means
    /// unbounded.
    pub sweep_candidate_cap: Option<usize>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            inactivity_enabled: true,
            default_preview_window_minutes: 15,
            sweep_candidate_cap: None,
        }
    }
}

impl OrchestratorConfig {
    /// Relaxed configuration for development setups: small sweeps, no
    /// inactivity stops while iterating.
    pub fn development() -> Self {
        Self {
            inactivity_enabled: false,
            default_preview_window_minutes: 60,
            sweep_candidate_cap: Some(100),
        }
    }
}
