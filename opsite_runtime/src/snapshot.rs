//! Snapshot layer: deterministic site-build snapshots.
//!
//! Snapshots contain canonical JSON + hash for verification.
//! No wall-clock timestamps in snapshot content.
//!
//! If a snapshot hash doesn't match replay, rebuild from the log.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use opsite_engine::hashing::canonical_serialize;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::error::RuntimeResult;
use crate::replay::SiteBuild;

/// Snapshot on-disk format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Number of log operations the build was replayed from.
    pub op_count: u64,
    /// Canonical JSON of the build (UTF-8).
    pub canonical_json: String,
    /// SHA-256 of the canonical JSON.
    pub hash: String,
    /// Engine version at snapshot time.
    pub engine_version: u32,
}

fn snapshot_path(dir: &Path, op_count: u64) -> PathBuf {
    dir.join(format!("snapshot_{:06}.json", op_count))
}

/// Save a deterministic snapshot of a site build.
pub fn save_snapshot(dir: &Path, op_count: u64, build: &SiteBuild) -> RuntimeResult<PathBuf> {
    fs::create_dir_all(dir)?;

    let canonical_json = String::from_utf8(canonical_serialize(&build.content()))
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let snap = Snapshot {
        op_count,
        canonical_json,
        hash: build.hash.clone(),
        engine_version: opsite_engine::ENGINE_VERSION,
    };

    let path = snapshot_path(dir, op_count);
    let content = serde_json::to_string(&snap)?;
    let mut file = File::create(&path)?;
    file.write_all(content.as_bytes())?;
    file.sync_all()?;

    info!(path = %path.display(), op_count, hash = %snap.hash, "snapshot written");
    Ok(path)
}

/// Load the snapshot taken at `op_count`, if any.
pub fn load_snapshot(dir: &Path, op_count: u64) -> RuntimeResult<Option<Snapshot>> {
    let path = snapshot_path(dir, op_count);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(Some(serde_json::from_str(&content)?))
}

/// Load the snapshot with the highest op count in a directory.
pub fn load_latest_snapshot(dir: &Path) -> RuntimeResult<Option<Snapshot>> {
    if !dir.exists() {
        return Ok(None);
    }

    let mut best: Option<u64> = None;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let count = name
            .to_string_lossy()
            .strip_prefix("snapshot_")
            .and_then(|s| s.strip_suffix(".json"))
            .and_then(|s| s.parse::<u64>().ok());
        if let Some(count) = count {
            best = Some(best.map_or(count, |b| b.max(count)));
        }
    }

    match best {
        Some(count) => load_snapshot(dir, count),
        None => Ok(None),
    }
}

/// True if the stored hash matches the canonical JSON content.
pub fn verify_snapshot_hash(snap: &Snapshot) -> bool {
    let digest = Sha256::digest(snap.canonical_json.as_bytes());
    let computed: String = digest.iter().map(|b| format!("{:02x}", b)).collect();
    computed == snap.hash
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsite_engine::hashing::canonical_hash;
    use serde_json::json;

    fn snapshot_of(content: &serde_json::Value) -> Snapshot {
        Snapshot {
            op_count: 1,
            canonical_json: content.to_string(),
            hash: canonical_hash(content),
            engine_version: opsite_engine::ENGINE_VERSION,
        }
    }

    #[test]
    fn test_hash_is_single_sha256_of_content() {
        let snap = snapshot_of(&json!({"index": {"entries": []}}));
        assert!(verify_snapshot_hash(&snap));
    }

    #[test]
    fn test_edited_content_fails() {
        let mut snap = snapshot_of(&json!({"title": "Handbook"}));
        snap.canonical_json = snap.canonical_json.replace("Handbook", "Guide");
        assert!(!verify_snapshot_hash(&snap));
    }
}
