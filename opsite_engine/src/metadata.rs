//! Metadata Extraction
//!
//! Default record from the root address, then two override sources merged
//! field by field in timestamp order: the out-of-band snapshot and
//! root-level DESCRIBE operations.

use tracing::trace;

use crate::domain::{ContentMeta, MetaOverride, MetaPatch, Status, Visibility};
use crate::events::{parse_timestamp_ms, OpKind, Operand, Operation, RootRef};

/// Metadata for an entity nobody has described yet: draft and private.
pub fn default_meta(root: &RootRef) -> ContentMeta {
    ContentMeta {
        id: root.id(),
        content_type: root.kind.content_type(),
        slug: root.slug.clone(),
        title: root.slug.clone(),
        status: Status::Draft,
        tags: Vec::new(),
        visibility: Visibility::Private,
        updated_at: None,
    }
}

struct Update<'a> {
    ts_ms: i64,
    ts: Option<&'a str>,
    patch: &'a MetaPatch,
}

/// Fold all metadata sources for `root`. Later timestamps win; on equal
/// timestamps the override is applied first and DESCRIBEs keep log order.
pub fn extract_meta(
    root: &RootRef,
    events: &[&Operation],
    external: Option<&MetaOverride>,
) -> ContentMeta {
    let mut updates: Vec<Update<'_>> = Vec::new();

    if let Some(ov) = external {
        // An unparsable `updated_at` counts as undated.
        let dated = ov
            .updated_at
            .as_deref()
            .and_then(|ts| parse_timestamp_ms(ts).map(|ms| (ms, ts)));
        updates.push(Update {
            ts_ms: dated.map_or(i64::MIN, |(ms, _)| ms),
            ts: dated.map(|(_, ts)| ts),
            patch: &ov.patch,
        });
    }

    for ev in events {
        if ev.target.child.is_some() || ev.target.root != *root {
            continue;
        }
        if let (OpKind::Describe | OpKind::Insert, Operand::Describe(patch)) = (ev.op, &ev.operand)
        {
            updates.push(Update {
                ts_ms: ev.ctx.ts_ms,
                ts: Some(ev.ctx.ts.as_str()),
                patch,
            });
        }
    }

    // Stable: ties keep push order.
    updates.sort_by_key(|u| u.ts_ms);

    let mut meta = default_meta(root);
    for update in &updates {
        meta.merge(update.patch);
        if let Some(ts) = update.ts {
            meta.updated_at = Some(ts.to_string());
        }
    }
    trace!(entity = %meta.id, status = ?meta.status, "metadata extracted");
    meta
}
