//! Experiment Replay
//!
//! Lab-notebook entries: INSERT creates, ALTER patches `data`, NULLIFY
//! tombstones. Tombstoned entries are dropped from the projection
//! entirely; downstream consumers never see them.

use std::collections::BTreeMap;

use tracing::trace;

use crate::domain::{ContentMeta, ExperimentEntry, ProjectedExperiment};
use crate::events::{ChildType, OpKind, Operand, Operation};
use crate::patch::apply_patch;

pub(crate) fn fold_experiment(meta: ContentMeta, events: &[&Operation]) -> ProjectedExperiment {
    let mut entries: BTreeMap<String, ExperimentEntry> = BTreeMap::new();

    for ev in events {
        let Some(id) = ev.target.child_id(ChildType::Entry) else {
            continue;
        };
        match (ev.op, &ev.operand) {
            (OpKind::Insert, Operand::InsertEntry(p)) => {
                entries.insert(
                    id.to_string(),
                    ExperimentEntry {
                        id: id.to_string(),
                        kind: p.kind,
                        data: p.data.clone(),
                        timestamp: ev.ctx.ts.clone(),
                        deleted: false,
                        ts_ms: ev.ctx.ts_ms,
                    },
                );
            }
            (OpKind::Alter, Operand::Alter(p)) => {
                if let Some(entry) = entries.get_mut(id).filter(|e| !e.deleted) {
                    entry.data = apply_patch(&entry.data, &p.patch);
                }
            }
            (OpKind::Nullify, _) => {
                if let Some(entry) = entries.get_mut(id) {
                    entry.deleted = true;
                }
            }
            _ => trace!(event = %ev.event_id, op = %ev.op, "no entry effect"),
        }
    }

    let mut live: Vec<ExperimentEntry> = entries.into_values().filter(|e| !e.deleted).collect();
    live.sort_by(|a, b| a.ts_ms.cmp(&b.ts_ms).then_with(|| a.id.cmp(&b.id)));

    ProjectedExperiment {
        meta,
        entries: live,
    }
}
