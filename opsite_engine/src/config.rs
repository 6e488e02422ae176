//! Replay Configuration
//!
//! Everything a caller can tune about a replay pass. Deserializable so the
//! runtime can embed it in its config file.

use serde::{Deserialize, Serialize};

/// Proximity below which the two newest wiki revisions count as a
/// conflict. A heuristic, not a causal-history check.
pub const DEFAULT_CONFLICT_WINDOW_MS: i64 = 60_000;

/// Which entities a replay pass may project.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    /// Only published, public entities.
    #[default]
    #[serde(alias = "public_only")]
    Public,
    /// Everything except archived entities.
    #[serde(alias = "include_drafts")]
    Drafts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    pub mode: AccessMode,
    pub conflict_window_ms: i64,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            mode: AccessMode::Public,
            conflict_window_ms: DEFAULT_CONFLICT_WINDOW_MS,
        }
    }
}

impl ReplayConfig {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn with_drafts() -> Self {
        Self {
            mode: AccessMode::Drafts,
            ..Self::default()
        }
    }
}
