//! Site Index Replay
//!
//! Folds the `index` child stream into the global catalog. INSERT and
//! DESCRIBE both replace the whole row; NULLIFY archives an existing row.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{IndexEntry, SiteIndex, Status, Visibility};
use crate::events::{ChildType, IndexUpsert, OpKind, Operand, Operation, RootRef};

/// Replay an index-scoped stream. Records addressing any other child kind
/// are ignored.
pub fn replay_index(events: &[Operation]) -> SiteIndex {
    let mut entries: BTreeMap<String, IndexEntry> = BTreeMap::new();
    let mut slug_map: BTreeMap<String, String> = BTreeMap::new();
    let mut built_at: Option<(i64, &str)> = None;

    for ev in events {
        let Some(id) = ev.target.child_id(ChildType::Index) else {
            continue;
        };
        match (ev.op, &ev.operand) {
            (OpKind::Insert | OpKind::Describe, Operand::UpsertIndex(u)) => {
                let Some(entry) = build_entry(id, u) else {
                    debug!(event = %ev.event_id, id, "index row without a content type; skipped");
                    continue;
                };
                if let Some(old) = entries.get(id) {
                    if old.slug != entry.slug && slug_map.get(&old.slug).map(String::as_str) == Some(id) {
                        slug_map.remove(&old.slug);
                    }
                }
                slug_map.insert(entry.slug.clone(), id.to_string());
                entries.insert(id.to_string(), entry);
            }
            (OpKind::Nullify, _) => match entries.get_mut(id) {
                Some(entry) => entry.status = Status::Archived,
                None => continue,
            },
            _ => continue,
        }
        if built_at.map_or(true, |(ms, _)| ev.ctx.ts_ms >= ms) {
            built_at = Some((ev.ctx.ts_ms, ev.ctx.ts.as_str()));
        }
    }

    let entries: Vec<IndexEntry> = entries.into_values().collect();
    let nav = entries.iter().filter(|e| e.is_navigable()).cloned().collect();
    SiteIndex {
        entries,
        nav,
        slug_map,
        built_at: built_at.map(|(_, ts)| ts.to_string()),
    }
}

/// Full row from an upsert; gaps are filled from the entity id.
fn build_entry(id: &str, u: &IndexUpsert) -> Option<IndexEntry> {
    let root = RootRef::parse(id);
    let content_type = u
        .content_type
        .or_else(|| root.as_ref().map(|r| r.kind.content_type()))?;
    let slug = u
        .slug
        .clone()
        .or_else(|| root.as_ref().map(|r| r.slug.clone()))
        .unwrap_or_else(|| id.to_string());
    Some(IndexEntry {
        id: id.to_string(),
        title: u.title.clone().unwrap_or_else(|| slug.clone()),
        slug,
        content_type,
        status: u.status.unwrap_or(Status::Draft),
        visibility: u.visibility.unwrap_or(Visibility::Private),
        tags: u.tags.clone(),
    })
}
