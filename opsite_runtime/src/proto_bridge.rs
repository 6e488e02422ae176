//! Proto <-> Kernel conversion bridge.
//!
//! Decoding goes back through the kernel's own record validation, so a
//! frame the kernel would reject is skipped exactly like a bad JSON record.

use opsite_engine::events::{OpKind, Operation};
use serde_json::{json, Value};

use crate::proto_types::{ProtoCtx, ProtoOpCode, ProtoOperation};

fn op_code(op: OpKind) -> ProtoOpCode {
    match op {
        OpKind::Insert => ProtoOpCode::Insert,
        OpKind::Describe => ProtoOpCode::Describe,
        OpKind::Alter => ProtoOpCode::Alter,
        OpKind::Segment => ProtoOpCode::Segment,
        OpKind::Connect => ProtoOpCode::Connect,
        OpKind::Synthesize => ProtoOpCode::Synthesize,
        OpKind::Superpose => ProtoOpCode::Superpose,
        OpKind::Recombine => ProtoOpCode::Recombine,
        OpKind::Nullify => ProtoOpCode::Nullify,
    }
}

fn op_kind(code: ProtoOpCode) -> Option<OpKind> {
    match code {
        ProtoOpCode::Unspecified => None,
        ProtoOpCode::Insert => Some(OpKind::Insert),
        ProtoOpCode::Describe => Some(OpKind::Describe),
        ProtoOpCode::Alter => Some(OpKind::Alter),
        ProtoOpCode::Segment => Some(OpKind::Segment),
        ProtoOpCode::Connect => Some(OpKind::Connect),
        ProtoOpCode::Synthesize => Some(OpKind::Synthesize),
        ProtoOpCode::Superpose => Some(OpKind::Superpose),
        ProtoOpCode::Recombine => Some(OpKind::Recombine),
        ProtoOpCode::Nullify => Some(OpKind::Nullify),
    }
}

/// Convert a kernel operation to its log frame.
pub fn op_to_proto(op: &Operation) -> ProtoOperation {
    ProtoOperation {
        event_id: op.event_id.clone(),
        op: op_code(op.op) as i32,
        target: op.target.to_string(),
        operand_json: op.operand.to_value().to_string(),
        ctx: Some(ProtoCtx {
            agent: op.ctx.agent.clone(),
            ts: op.ctx.ts.clone(),
            key: op.ctx.key.clone(),
            parent: op.ctx.parent.clone(),
            role: op.ctx.role.clone(),
        }),
    }
}

/// Convert a log frame back to a kernel operation. `None` for frames the
/// kernel would not accept.
pub fn proto_to_op(proto: &ProtoOperation, position: usize) -> Option<Operation> {
    let kind = op_kind(ProtoOpCode::try_from(proto.op).ok()?)?;
    let ctx = proto.ctx.as_ref()?;
    let operand: Value = serde_json::from_str(&proto.operand_json).ok()?;

    let mut ctx_value = json!({"agent": ctx.agent, "ts": ctx.ts});
    for (name, field) in [("key", &ctx.key), ("parent", &ctx.parent), ("role", &ctx.role)] {
        if let Some(v) = field {
            ctx_value[name] = json!(v);
        }
    }

    let record = json!({
        "id": proto.event_id,
        "op": kind.as_str(),
        "target": proto.target,
        "operand": operand,
        "ctx": ctx_value,
    });
    Operation::from_value(&record, position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsite_engine::parse_log;

    #[test]
    fn test_frame_round_trip_preserves_operation() {
        let ops = parse_log(&[json!({
            "id": "$1",
            "op": "ALTER",
            "target": "page:home/block:b1",
            "operand": {"patch": [{"op": "add", "path": "/x", "value": 1}], "after": null},
            "ctx": {"agent": "@a", "ts": "2024-01-01T00:00:00Z", "role": "editor"},
        })]);
        let back = proto_to_op(&op_to_proto(&ops[0]), 0).unwrap();
        assert_eq!(back, ops[0]);
    }

    #[test]
    fn test_unspecified_op_is_rejected() {
        let ops = parse_log(&[json!({
            "op": "NULLIFY",
            "target": "page:home/block:b1",
            "operand": {},
            "ctx": {"agent": "@a", "ts": "2024-01-01T00:00:00Z"},
        })]);
        let mut frame = op_to_proto(&ops[0]);
        frame.op = ProtoOpCode::Unspecified as i32;
        assert!(proto_to_op(&frame, 0).is_none());
        frame.op = 42;
        assert!(proto_to_op(&frame, 0).is_none());
    }
}
