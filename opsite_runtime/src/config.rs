//! Runtime configuration, loaded from TOML.
//!
//! ```toml
//! log_path = "data/ops.log"
//! snapshot_dir = "data/snapshots"
//! overrides_path = "data/overrides.json"
//!
//! [replay]
//! mode = "drafts"
//! conflict_window_ms = 30000
//! ```
//!
//! Every key is optional; an empty file yields the defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use opsite_engine::{MetaOverride, ReplayConfig};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RuntimeResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub log_path: PathBuf,
    pub snapshot_dir: PathBuf,
    /// JSON object of side-channel metadata keyed by entity root.
    pub overrides_path: Option<PathBuf>,
    pub replay: ReplayConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from("data/ops.log"),
            snapshot_dir: PathBuf::from("data/snapshots"),
            overrides_path: None,
            replay: ReplayConfig::default(),
        }
    }
}

impl RuntimeConfig {
    pub fn load(path: &Path) -> RuntimeResult<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)?;
        debug!(path = %path.display(), ?config, "loaded config");
        Ok(config)
    }

    /// Side-channel overrides, or an empty map when none are configured.
    pub fn load_overrides(&self) -> RuntimeResult<BTreeMap<String, MetaOverride>> {
        match &self.overrides_path {
            Some(path) => {
                let text = fs::read_to_string(path)?;
                Ok(serde_json::from_str(&text)?)
            }
            None => Ok(BTreeMap::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsite_engine::AccessMode;

    #[test]
    fn test_empty_toml_is_default() {
        let cfg: RuntimeConfig = toml::from_str("").unwrap();
        assert_eq!(cfg, RuntimeConfig::default());
    }

    #[test]
    fn test_replay_table() {
        let cfg: RuntimeConfig = toml::from_str(
            "log_path = \"x.log\"\n[replay]\nmode = \"include_drafts\"\nconflict_window_ms = 5\n",
        )
        .unwrap();
        assert_eq!(cfg.log_path, PathBuf::from("x.log"));
        assert_eq!(cfg.replay.mode, AccessMode::Drafts);
        assert_eq!(cfg.replay.conflict_window_ms, 5);
        assert_eq!(cfg.snapshot_dir, PathBuf::from("data/snapshots"));
    }
}
