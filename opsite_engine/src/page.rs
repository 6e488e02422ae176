//! Page Replay
//!
//! Folds `block` child events into a block set, then derives the rendered
//! order. Deleted blocks stay in the set and never appear in the order.

use std::collections::BTreeMap;

use tracing::trace;

use crate::domain::{Block, ContentMeta, HistoryEntry, ProjectedPage};
use crate::events::{AlterPayload, BlockInsert, ChildType, OpKind, Operand, Operation};
use crate::ordering::reconstruct_order;
use crate::patch::apply_patch;

// ---------------------------------------------------------------------------
// Fold
// ---------------------------------------------------------------------------

pub(crate) fn fold_page(meta: ContentMeta, events: &[&Operation]) -> ProjectedPage {
    let mut blocks: BTreeMap<String, Block> = BTreeMap::new();
    let mut history = Vec::with_capacity(events.len());

    for ev in events {
        history.push(HistoryEntry {
            event_id: ev.event_id.clone(),
            op: ev.op,
            target: ev.target.to_string(),
            timestamp: ev.ctx.ts.clone(),
            agent: ev.ctx.agent.clone(),
        });

        let Some(id) = ev.target.child_id(ChildType::Block) else {
            continue;
        };
        match (ev.op, &ev.operand) {
            (OpKind::Insert, Operand::InsertBlock(p)) => apply_insert(&mut blocks, id, p, ev),
            (OpKind::Alter, Operand::Alter(p)) => apply_alter(&mut blocks, id, p, ev),
            (OpKind::Nullify, _) => apply_nullify(&mut blocks, id, ev),
            _ => trace!(event = %ev.event_id, op = %ev.op, "no page effect"),
        }
    }

    // BTreeMap iteration: ties on a predecessor resolve to the greatest id.
    let block_order = reconstruct_order(
        blocks
            .values()
            .filter(|b| !b.deleted)
            .map(|b| (b.id.as_str(), b.after.as_deref())),
    );

    ProjectedPage {
        meta,
        blocks,
        block_order,
        history,
    }
}

// ---------------------------------------------------------------------------
// Handlers (private)
// ---------------------------------------------------------------------------

/// Overwrites any previous record under the same id, tombstone included.
fn apply_insert(blocks: &mut BTreeMap<String, Block>, id: &str, p: &BlockInsert, ev: &Operation) {
    blocks.insert(
        id.to_string(),
        Block {
            id: id.to_string(),
            block_type: p.block_type.clone(),
            data: p.data.clone(),
            after: p.after.clone(),
            deleted: false,
            last_event: ev.event_id.clone(),
        },
    );
}

fn apply_alter(
    blocks: &mut BTreeMap<String, Block>,
    id: &str,
    p: &AlterPayload,
    ev: &Operation,
) {
    let Some(block) = blocks.get_mut(id).filter(|b| !b.deleted) else {
        return;
    };
    block.data = apply_patch(&block.data, &p.patch);
    if let Some(after) = &p.after {
        block.after = after.clone();
    }
    block.last_event = ev.event_id.clone();
}

fn apply_nullify(blocks: &mut BTreeMap<String, Block>, id: &str, ev: &Operation) {
    if let Some(block) = blocks.get_mut(id).filter(|b| !b.deleted) {
        block.deleted = true;
        block.last_event = ev.event_id.clone();
    }
}
