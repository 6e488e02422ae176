//! Revision Replay (wiki and blog)
//!
//! Revisions are immutable: INSERT creates one, NULLIFY hides it, and
//! nothing patches an existing revision. The newest surviving revision is
//! current. Only wiki runs conflict detection.

use std::collections::BTreeMap;

use tracing::trace;

use crate::conflict::detect_conflict;
use crate::domain::{ContentMeta, ProjectedBlog, ProjectedWiki, Revision};
use crate::events::{ChildType, OpKind, Operand, Operation};

struct Slot {
    revision: Revision,
    deleted: bool,
}

/// Surviving revisions sorted ascending by `(timestamp, id)`.
pub(crate) fn collect_revisions(events: &[&Operation]) -> Vec<Revision> {
    let mut slots: BTreeMap<String, Slot> = BTreeMap::new();

    for ev in events {
        let Some(id) = ev.target.child_id(ChildType::Rev) else {
            continue;
        };
        match (ev.op, &ev.operand) {
            (OpKind::Insert, Operand::InsertRevision(p)) => {
                slots.insert(
                    id.to_string(),
                    Slot {
                        revision: Revision {
                            id: id.to_string(),
                            format: p.format.clone(),
                            body: p.body.clone(),
                            summary: p.summary.clone(),
                            timestamp: ev.ctx.ts.clone(),
                            agent: ev.ctx.agent.clone(),
                            ts_ms: ev.ctx.ts_ms,
                        },
                        deleted: false,
                    },
                );
            }
            (OpKind::Nullify, _) => {
                if let Some(slot) = slots.get_mut(id) {
                    slot.deleted = true;
                }
            }
            _ => trace!(event = %ev.event_id, op = %ev.op, "no revision effect"),
        }
    }

    let mut revisions: Vec<Revision> = slots
        .into_values()
        .filter(|s| !s.deleted)
        .map(|s| s.revision)
        .collect();
    revisions.sort_by(|a, b| a.ts_ms.cmp(&b.ts_ms).then_with(|| a.id.cmp(&b.id)));
    revisions
}

pub(crate) fn fold_wiki(meta: ContentMeta, events: &[&Operation], window_ms: i64) -> ProjectedWiki {
    let revisions = collect_revisions(events);
    let conflict = detect_conflict(events, &revisions, window_ms);
    let current = revisions.last().cloned();
    ProjectedWiki {
        meta,
        current_revision: current.as_ref().map(|r| r.id.clone()),
        current,
        revisions,
        has_conflict: conflict.has_conflict,
        conflict_candidates: conflict.candidates,
    }
}

pub(crate) fn fold_blog(meta: ContentMeta, events: &[&Operation]) -> ProjectedBlog {
    let revisions = collect_revisions(events);
    let current = revisions.last().cloned();
    ProjectedBlog {
        meta,
        current_revision: current.as_ref().map(|r| r.id.clone()),
        current,
        revisions,
    }
}
