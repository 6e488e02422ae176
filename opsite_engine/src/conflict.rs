//! Conflict Detection (wiki only)
//!
//! Heuristic: the two newest revisions landing closer together than the
//! configured window are flagged, unless any SYNTHESIZE exists in the
//! entity's history. This is timestamp proximity, not a causal or
//! version-vector check; replacing it changes observable output.

use serde::{Deserialize, Serialize};

use crate::domain::Revision;
use crate::events::{OpKind, Operation};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictReport {
    pub has_conflict: bool,
    /// Older revision first.
    pub candidates: Vec<String>,
}

/// `revisions` must already be sorted ascending by timestamp.
pub fn detect_conflict(
    events: &[&Operation],
    revisions: &[Revision],
    window_ms: i64,
) -> ConflictReport {
    if events.iter().any(|ev| ev.op == OpKind::Synthesize) {
        return ConflictReport::default();
    }
    let [.., older, newer] = revisions else {
        return ConflictReport::default();
    };
    if (newer.ts_ms - older.ts_ms).abs() < window_ms {
        ConflictReport {
            has_conflict: true,
            candidates: vec![older.id.clone(), newer.id.clone()],
        }
    } else {
        ConflictReport::default()
    }
}
