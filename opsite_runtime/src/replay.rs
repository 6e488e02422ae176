//! Site rebuild: every entity plus the index from one op log.
//!
//! Delegates all projection logic to the engine. Grouping by root only
//! narrows each entity's input; order inside a group is log order.

use std::collections::BTreeMap;

use opsite_engine::events::ChildType;
use opsite_engine::hashing::canonical_hash;
use opsite_engine::invariants::{validate_index, validate_projection};
use opsite_engine::{
    replay_entity, EngineError, MetaOverride, Operation, Projection, ReplayConfig, Replayer, RootRef,
    SiteIndex,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{RuntimeError, RuntimeResult};

/// Result of replaying a whole log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteBuild {
    /// Keyed by entity root. Entities hidden by the access filter are absent.
    pub projections: BTreeMap<String, Projection>,
    pub index: SiteIndex,
    /// Canonical hash of `projections` and `index` together.
    pub hash: String,
}

/// The hashed part of a build, borrowed for canonical serialization.
#[derive(Serialize)]
pub(crate) struct BuildContent<'a> {
    pub projections: &'a BTreeMap<String, Projection>,
    pub index: &'a SiteIndex,
}

impl SiteBuild {
    pub(crate) fn content(&self) -> BuildContent<'_> {
        BuildContent {
            projections: &self.projections,
            index: &self.index,
        }
    }
}

/// Partition a log into per-entity streams and the index stream.
pub fn partition(ops: &[Operation]) -> (BTreeMap<RootRef, Vec<Operation>>, Vec<Operation>) {
    let mut entities: BTreeMap<RootRef, Vec<Operation>> = BTreeMap::new();
    let mut index = Vec::new();
    for op in ops {
        if op.target.child_kind() == Some(ChildType::Index) {
            index.push(op.clone());
        } else {
            entities
                .entry(op.target.root.clone())
                .or_default()
                .push(op.clone());
        }
    }
    (entities, index)
}

/// Replay every entity and the index.
pub fn rebuild_site(
    ops: &[Operation],
    overrides: &BTreeMap<String, MetaOverride>,
    config: &ReplayConfig,
) -> SiteBuild {
    let replayer = Replayer::new(config.clone());
    let (entities, index_ops) = partition(ops);

    let mut projections = BTreeMap::new();
    for (root, events) in &entities {
        let id = root.id();
        match replayer.replay(root, events, overrides.get(&id)) {
            Some(projection) => {
                projections.insert(id, projection);
            }
            None => debug!(entity = %root, "not projected in this pass"),
        }
    }
    let index = replayer.replay_index(&index_ops);
    let hash = canonical_hash(&BuildContent {
        projections: &projections,
        index: &index,
    });

    info!(
        ops = ops.len(),
        entities = entities.len(),
        projected = projections.len(),
        indexed = index.entries.len(),
        mode = ?replayer.config().mode,
        hash = %hash,
        "site rebuilt"
    );
    SiteBuild {
        projections,
        index,
        hash,
    }
}

/// Rebuild and return only the canonical hash.
pub fn rebuild_hash(
    ops: &[Operation],
    overrides: &BTreeMap<String, MetaOverride>,
    config: &ReplayConfig,
) -> String {
    rebuild_site(ops, overrides, config).hash
}

/// Replay a single entity addressed by its textual root.
pub fn replay_one(
    root: &str,
    ops: &[Operation],
    overrides: &BTreeMap<String, MetaOverride>,
    config: &ReplayConfig,
) -> RuntimeResult<Option<Projection>> {
    let root_ref = RootRef::parse(root).ok_or_else(|| EngineError::InvalidRoot(root.to_string()))?;
    Ok(replay_entity(&root_ref, ops, overrides.get(root), config))
}

/// Run every projection and index validator over a build.
pub fn validate_build(build: &SiteBuild) -> RuntimeResult<()> {
    for (id, projection) in &build.projections {
        validate_projection(projection).map_err(|source| RuntimeError::Invariant {
            entity: id.clone(),
            source,
        })?;
    }
    validate_index(&build.index).map_err(|source| RuntimeError::Invariant {
        entity: "index".to_string(),
        source,
    })
}
