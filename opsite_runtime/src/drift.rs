//! Drift detection: determinism verification and index comparison.

use std::collections::{BTreeMap, BTreeSet};

use opsite_engine::{IndexEntry, MetaOverride, Operation, ReplayConfig, SiteIndex, Status};

use crate::error::{RuntimeError, RuntimeResult};
use crate::replay;

/// Replay the same log twice and require identical hashes.
/// Returns the agreed hash.
pub fn verify_determinism(
    ops: &[Operation],
    overrides: &BTreeMap<String, MetaOverride>,
    config: &ReplayConfig,
) -> RuntimeResult<String> {
    let first = replay::rebuild_hash(ops, overrides, config);
    let second = replay::rebuild_hash(ops, overrides, config);
    if first != second {
        return Err(RuntimeError::Nondeterministic { first, second });
    }
    Ok(first)
}

/// Catalog changes between two site indexes. All lists are sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexDrift {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub published: Vec<String>,
    pub unpublished: Vec<String>,
    pub archived: Vec<String>,
}

impl IndexDrift {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.published.is_empty()
            && self.unpublished.is_empty()
            && self.archived.is_empty()
    }
}

pub fn compare_indexes(before: &SiteIndex, after: &SiteIndex) -> IndexDrift {
    let a: BTreeMap<&str, &IndexEntry> = before.entries.iter().map(|e| (e.id.as_str(), e)).collect();
    let b: BTreeMap<&str, &IndexEntry> = after.entries.iter().map(|e| (e.id.as_str(), e)).collect();
    let ids_a: BTreeSet<&str> = a.keys().copied().collect();
    let ids_b: BTreeSet<&str> = b.keys().copied().collect();

    let mut drift = IndexDrift {
        added: ids_b.difference(&ids_a).map(|s| s.to_string()).collect(),
        removed: ids_a.difference(&ids_b).map(|s| s.to_string()).collect(),
        ..IndexDrift::default()
    };

    // Status transitions in entries present in both
    for id in ids_a.intersection(&ids_b) {
        let (was, is) = (a[id].status, b[id].status);
        if was == is {
            continue;
        }
        match is {
            Status::Published => drift.published.push(id.to_string()),
            Status::Archived => drift.archived.push(id.to_string()),
            Status::Draft if was == Status::Published => drift.unpublished.push(id.to_string()),
            Status::Draft => {}
        }
    }
    drift
}

#[cfg(test)]
mod tests {
    use super::*;
    use opsite_engine::{ContentType, Visibility};

    fn entry(id: &str, status: Status) -> IndexEntry {
        IndexEntry {
            id: id.to_string(),
            slug: id.to_string(),
            title: id.to_string(),
            content_type: ContentType::Page,
            status,
            visibility: Visibility::Public,
            tags: Vec::new(),
        }
    }

    fn index(entries: Vec<IndexEntry>) -> SiteIndex {
        SiteIndex {
            entries,
            ..SiteIndex::default()
        }
    }

    #[test]
    fn test_identical_indexes_have_no_drift() {
        let i = index(vec![entry("page:a", Status::Published)]);
        assert!(compare_indexes(&i, &i).is_empty());
    }

    #[test]
    fn test_status_transitions() {
        let before = index(vec![
            entry("page:a", Status::Draft),
            entry("page:b", Status::Published),
            entry("page:c", Status::Published),
            entry("page:gone", Status::Draft),
        ]);
        let after = index(vec![
            entry("page:a", Status::Published),
            entry("page:b", Status::Draft),
            entry("page:c", Status::Archived),
            entry("page:new", Status::Draft),
        ]);
        let drift = compare_indexes(&before, &after);
        assert_eq!(drift.added, vec!["page:new"]);
        assert_eq!(drift.removed, vec!["page:gone"]);
        assert_eq!(drift.published, vec!["page:a"]);
        assert_eq!(drift.unpublished, vec!["page:b"]);
        assert_eq!(drift.archived, vec!["page:c"]);
    }
}
