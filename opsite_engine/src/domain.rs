//! Projection Types
//!
//! Pure data. Everything here is produced by replay and never read back
//! as a source of truth. Field names are a stable schema shared with the
//! renderer and the search-index builder.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::events::OpKind;

// ── Enumerations ───────────────────────────────────────────────────

/// Content shape of an entity, inferred from its root-type prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Page,
    Wiki,
    Blog,
    Experiment,
}

/// Publication lifecycle of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}

/// Kind of a lab-notebook entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Note,
    Dataset,
    Result,
    Chart,
    Link,
    Decision,
}

// ── Metadata ───────────────────────────────────────────────────────

/// Partial metadata update carried by DESCRIBE operations.
///
/// Absent fields leave the current value untouched (shallow merge).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
}

/// Out-of-band metadata snapshot supplied next to an entity's event list.
///
/// `updated_at` places it on the same timeline as DESCRIBE operations; an
/// override without one is applied before every DESCRIBE.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaOverride {
    #[serde(flatten)]
    pub patch: MetaPatch,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentMeta {
    pub id: String,
    pub content_type: ContentType,
    pub slug: String,
    pub title: String,
    pub status: Status,
    pub tags: Vec<String>,
    pub visibility: Visibility,
    pub updated_at: Option<String>,
}

impl ContentMeta {
    /// Field-level overwrite with every field present in `patch`.
    pub fn merge(&mut self, patch: &MetaPatch) {
        if let Some(slug) = &patch.slug {
            self.slug = slug.clone();
        }
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(tags) = &patch.tags {
            self.tags = tags.clone();
        }
        if let Some(visibility) = patch.visibility {
            self.visibility = visibility;
        }
    }
}

// ── Child records ──────────────────────────────────────────────────

/// A page content unit, positioned by its `after` pointer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    pub data: Map<String, Value>,
    pub after: Option<String>,
    pub deleted: bool,
    pub last_event: String,
}

/// Immutable wiki/blog revision. A new edit is always a new revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: String,
    pub format: String,
    pub body: String,
    pub summary: String,
    pub timestamp: String,
    pub agent: String,
    #[serde(skip)]
    pub(crate) ts_ms: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentEntry {
    pub id: String,
    pub kind: EntryKind,
    pub data: Map<String, Value>,
    pub timestamp: String,
    pub deleted: bool,
    #[serde(skip)]
    pub(crate) ts_ms: i64,
}

/// One audit line per event seen while replaying a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub event_id: String,
    pub op: OpKind,
    pub target: String,
    pub timestamp: String,
    pub agent: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub id: String,
    pub slug: String,
    pub title: String,
    pub content_type: ContentType,
    pub status: Status,
    pub visibility: Visibility,
    pub tags: Vec<String>,
}

impl IndexEntry {
    /// Eligible for public navigation.
    pub fn is_navigable(&self) -> bool {
        self.status == Status::Published && self.visibility == Visibility::Public
    }
}

// ── Projections ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedPage {
    pub meta: ContentMeta,
    /// Every block ever inserted, tombstones included.
    pub blocks: BTreeMap<String, Block>,
    /// Rendered order; never contains a deleted block.
    pub block_order: Vec<String>,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedWiki {
    pub meta: ContentMeta,
    pub revisions: Vec<Revision>,
    pub current_revision: Option<String>,
    pub current: Option<Revision>,
    pub has_conflict: bool,
    pub conflict_candidates: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedBlog {
    pub meta: ContentMeta,
    pub revisions: Vec<Revision>,
    pub current_revision: Option<String>,
    pub current: Option<Revision>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectedExperiment {
    pub meta: ContentMeta,
    /// Live entries only; tombstones are never exposed.
    pub entries: Vec<ExperimentEntry>,
}

/// Any entity projection, tagged by `content_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "content_type", rename_all = "lowercase")]
pub enum Projection {
    Page(ProjectedPage),
    Wiki(ProjectedWiki),
    Blog(ProjectedBlog),
    Experiment(ProjectedExperiment),
}

impl Projection {
    pub fn meta(&self) -> &ContentMeta {
        match self {
            Projection::Page(p) => &p.meta,
            Projection::Wiki(w) => &w.meta,
            Projection::Blog(b) => &b.meta,
            Projection::Experiment(e) => &e.meta,
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.meta().content_type
    }
}

/// Global catalog of every entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteIndex {
    /// Sorted by entity id.
    pub entries: Vec<IndexEntry>,
    pub nav: Vec<IndexEntry>,
    pub slug_map: BTreeMap<String, String>,
    pub built_at: Option<String>,
}
