//! Op Model
//!
//! Operations are pure data: an operator, a target address, a typed
//! operand and provenance. They contain ZERO replay logic.
//!
//! Parsing is total. A record that does not fit the vocabulary yields
//! `None` and is skipped by the caller; replay never fails on data.

use std::fmt;

use chrono::{DateTime, NaiveDateTime};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::domain::{ContentType, EntryKind, MetaPatch, Status, Visibility};

// ── Operators ──────────────────────────────────────────────────────

/// The nine canonical operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OpKind {
    Insert,
    Describe,
    Alter,
    Segment,
    Connect,
    Synthesize,
    Superpose,
    Recombine,
    Nullify,
}

impl OpKind {
    pub const ALL: [OpKind; 9] = [
        OpKind::Insert,
        OpKind::Describe,
        OpKind::Alter,
        OpKind::Segment,
        OpKind::Connect,
        OpKind::Synthesize,
        OpKind::Superpose,
        OpKind::Recombine,
        OpKind::Nullify,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OpKind::Insert => "INSERT",
            OpKind::Describe => "DESCRIBE",
            OpKind::Alter => "ALTER",
            OpKind::Segment => "SEGMENT",
            OpKind::Connect => "CONNECT",
            OpKind::Synthesize => "SYNTHESIZE",
            OpKind::Superpose => "SUPERPOSE",
            OpKind::Recombine => "RECOMBINE",
            OpKind::Nullify => "NULLIFY",
        }
    }

    pub fn parse(symbol: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == symbol)
    }
}

impl fmt::Display for OpKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Target addresses ───────────────────────────────────────────────
//
//   target    := root ("/" child)?
//   root      := rootType ":" rootSlug
//   child     := childType ":" childId
//   rootType  := "page" | "blog" | "wiki" | "exp"
//   childType := "block" | "rev" | "entry" | "index"

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RootType {
    Page,
    Blog,
    Wiki,
    Exp,
}

impl RootType {
    pub fn as_str(self) -> &'static str {
        match self {
            RootType::Page => "page",
            RootType::Blog => "blog",
            RootType::Wiki => "wiki",
            RootType::Exp => "exp",
        }
    }

    pub fn parse(prefix: &str) -> Option<Self> {
        match prefix {
            "page" => Some(RootType::Page),
            "blog" => Some(RootType::Blog),
            "wiki" => Some(RootType::Wiki),
            "exp" => Some(RootType::Exp),
            _ => None,
        }
    }

    pub fn content_type(self) -> ContentType {
        match self {
            RootType::Page => ContentType::Page,
            RootType::Blog => ContentType::Blog,
            RootType::Wiki => ContentType::Wiki,
            RootType::Exp => ContentType::Experiment,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChildType {
    Block,
    Rev,
    Entry,
    Index,
}

impl ChildType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChildType::Block => "block",
            ChildType::Rev => "rev",
            ChildType::Entry => "entry",
            ChildType::Index => "index",
        }
    }

    pub fn parse(prefix: &str) -> Option<Self> {
        match prefix {
            "block" => Some(ChildType::Block),
            "rev" => Some(ChildType::Rev),
            "entry" => Some(ChildType::Entry),
            "index" => Some(ChildType::Index),
            _ => None,
        }
    }
}

/// Entity address, e.g. `wiki:operators`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RootRef {
    pub kind: RootType,
    pub slug: String,
}

impl RootRef {
    pub fn new(kind: RootType, slug: impl Into<String>) -> Self {
        Self {
            kind,
            slug: slug.into(),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let (prefix, slug) = s.split_once(':')?;
        if slug.is_empty() || slug.contains('/') {
            return None;
        }
        Some(Self::new(RootType::parse(prefix)?, slug))
    }

    /// Entity id as used in metadata and the site index.
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for RootRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.slug)
    }
}

/// Sub-record address, e.g. `block:b1` or `index:wiki:x`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChildRef {
    pub kind: ChildType,
    pub id: String,
}

impl fmt::Display for ChildRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target {
    pub root: RootRef,
    pub child: Option<ChildRef>,
}

impl Target {
    /// Split on the first `/`, then each half on its first `:`.
    /// Child ids may themselves contain `:` (index rows carry entity ids).
    pub fn parse(s: &str) -> Option<Self> {
        let (root_part, child_part) = match s.split_once('/') {
            Some((root, child)) => (root, Some(child)),
            None => (s, None),
        };
        let root = RootRef::parse(root_part)?;
        let child = match child_part {
            Some(c) => {
                let (prefix, id) = c.split_once(':')?;
                if id.is_empty() {
                    return None;
                }
                Some(ChildRef {
                    kind: ChildType::parse(prefix)?,
                    id: id.to_string(),
                })
            }
            None => None,
        };
        Some(Self { root, child })
    }

    /// Child id if this target addresses a child of the given kind.
    pub fn child_id(&self, kind: ChildType) -> Option<&str> {
        self.child
            .as_ref()
            .filter(|c| c.kind == kind)
            .map(|c| c.id.as_str())
    }

    pub fn child_kind(&self) -> Option<ChildType> {
        self.child.as_ref().map(|c| c.kind)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.child {
            Some(child) => write!(f, "{}/{}", self.root, child),
            None => write!(f, "{}", self.root),
        }
    }
}

// ── Provenance ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ctx {
    pub agent: String,
    /// ISO-8601 timestamp exactly as supplied.
    pub ts: String,
    #[serde(skip)]
    pub ts_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

impl Ctx {
    pub fn from_value(v: &Value) -> Option<Self> {
        let agent = v.get("agent")?.as_str()?.to_string();
        let ts = v.get("ts")?.as_str()?.to_string();
        let ts_ms = parse_timestamp_ms(&ts)?;
        Some(Self {
            agent,
            ts,
            ts_ms,
            key: opt_str(v, "key"),
            parent: opt_str(v, "parent"),
            role: opt_str(v, "role"),
        })
    }
}

/// Milliseconds since the Unix epoch for an RFC 3339 timestamp. A timestamp
/// without an offset is read as UTC.
pub fn parse_timestamp_ms(ts: &str) -> Option<i64> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return Some(dt.timestamp_millis());
    }
    NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc().timestamp_millis())
}

fn opt_str(v: &Value, key: &str) -> Option<String> {
    v.get(key).and_then(Value::as_str).map(str::to_string)
}

// ── Operand payloads ───────────────────────────────────────────────

fn default_block_type() -> String {
    "paragraph".to_string()
}

fn default_format() -> String {
    "markdown".to_string()
}

/// Distinguishes an absent field (`None`) from an explicit `null`
/// (`Some(None)`).
fn present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockInsert {
    #[serde(rename = "type", default = "default_block_type")]
    pub block_type: String,
    #[serde(default)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub after: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionInsert {
    #[serde(default = "default_format")]
    pub format: String,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryInsert {
    pub kind: EntryKind,
    #[serde(default)]
    pub data: Map<String, Value>,
}

/// Full replacement record for a site-index row. Missing fields are
/// derived from the row id when the entry is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexUpsert {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<ContentType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<Visibility>,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchKind {
    Add,
    Replace,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatchOp {
    pub op: PatchKind,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlterPayload {
    #[serde(default)]
    pub patch: Vec<PatchOp>,
    /// `Some(None)` moves a block to the head of the page.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub after: Option<Option<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NullifyPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Explicit merge of concurrent revisions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynthesizePayload {
    #[serde(default)]
    pub resolves: Vec<String>,
}

/// Operand, typed by operator and child kind at parse time.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Operand {
    InsertBlock(BlockInsert),
    InsertRevision(RevisionInsert),
    InsertEntry(EntryInsert),
    UpsertIndex(IndexUpsert),
    Describe(MetaPatch),
    Alter(AlterPayload),
    Nullify(NullifyPayload),
    Synthesize(SynthesizePayload),
    /// SEGMENT, CONNECT, SUPERPOSE and RECOMBINE: carried, never interpreted.
    Opaque(Value),
}

impl Operand {
    fn parse(op: OpKind, child: Option<ChildType>, raw: &Value) -> Option<Self> {
        let raw = if raw.is_null() {
            Value::Object(Map::new())
        } else {
            raw.clone()
        };
        let operand = match (op, child) {
            (OpKind::Insert, Some(ChildType::Block)) => {
                Operand::InsertBlock(serde_json::from_value(raw).ok()?)
            }
            (OpKind::Insert, Some(ChildType::Rev)) => {
                Operand::InsertRevision(serde_json::from_value(raw).ok()?)
            }
            (OpKind::Insert, Some(ChildType::Entry)) => {
                Operand::InsertEntry(serde_json::from_value(raw).ok()?)
            }
            (OpKind::Insert | OpKind::Describe, Some(ChildType::Index)) => {
                Operand::UpsertIndex(serde_json::from_value(raw).ok()?)
            }
            // A root-level INSERT creates the entity with initial metadata.
            (OpKind::Insert, None) | (OpKind::Describe, _) => {
                Operand::Describe(serde_json::from_value(raw).ok()?)
            }
            (OpKind::Alter, _) => Operand::Alter(serde_json::from_value(raw).ok()?),
            (OpKind::Nullify, _) => Operand::Nullify(serde_json::from_value(raw).ok()?),
            (OpKind::Synthesize, _) => {
                Operand::Synthesize(serde_json::from_value(raw).ok()?)
            }
            (OpKind::Segment | OpKind::Connect | OpKind::Superpose | OpKind::Recombine, _) => {
                Operand::Opaque(raw)
            }
        };
        Some(operand)
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

// ── Operation ──────────────────────────────────────────────────────

/// One canonical log record: `op(target, operand, ctx)`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operation {
    pub event_id: String,
    pub op: OpKind,
    pub target: Target,
    pub operand: Operand,
    pub ctx: Ctx,
}

impl Operation {
    /// Validate and type a raw record. `position` is used for the fallback
    /// event id when the record carries neither an id nor an idempotency key.
    pub fn from_value(v: &Value, position: usize) -> Option<Self> {
        let op = OpKind::parse(v.get("op")?.as_str()?)?;
        let target = Target::parse(v.get("target")?.as_str()?)?;
        let operand = Operand::parse(op, target.child_kind(), v.get("operand")?)?;
        let ctx = Ctx::from_value(v.get("ctx")?)?;
        let event_id = opt_str(v, "id")
            .or_else(|| opt_str(v, "event_id"))
            .or_else(|| ctx.key.clone())
            .unwrap_or_else(|| format!("evt-{}", position));
        Some(Self {
            event_id,
            op,
            target,
            operand,
            ctx,
        })
    }

    /// Canonical wire record.
    pub fn to_value(&self) -> Value {
        json!({
            "id": self.event_id,
            "op": self.op.as_str(),
            "target": self.target.to_string(),
            "operand": self.operand.to_value(),
            "ctx": self.ctx,
        })
    }
}

/// Parse an ordered list of raw records, skipping every malformed one.
/// Order is preserved; nothing is re-sorted.
pub fn parse_log(records: &[Value]) -> Vec<Operation> {
    records
        .iter()
        .enumerate()
        .filter_map(|(position, record)| {
            let parsed = Operation::from_value(record, position);
            if parsed.is_none() {
                debug!(position, "skipping malformed operation record");
            }
            parsed
        })
        .collect()
}
