//! Hand-written protobuf types for the on-disk op log.
//!
//! Uses prost derive macros for encode/decode without prost-build.
//! Field numbers are frozen; add new fields with new tags only.

use prost::Message;

// ── Operator ───────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum ProtoOpCode {
    Unspecified = 0,
    Insert = 1,
    Describe = 2,
    Alter = 3,
    Segment = 4,
    Connect = 5,
    Synthesize = 6,
    Superpose = 7,
    Recombine = 8,
    Nullify = 9,
}

// ── Provenance ─────────────────────────────────────────────────

#[derive(Clone, PartialEq, Message)]
pub struct ProtoCtx {
    #[prost(string, tag = "1")]
    pub agent: String,
    #[prost(string, tag = "2")]
    pub ts: String,
    #[prost(string, optional, tag = "3")]
    pub key: Option<String>,
    #[prost(string, optional, tag = "4")]
    pub parent: Option<String>,
    #[prost(string, optional, tag = "5")]
    pub role: Option<String>,
}

// ── Operation ──────────────────────────────────────────────────

/// One log frame. The operand travels as canonical JSON text since its
/// shape depends on operator and target.
#[derive(Clone, PartialEq, Message)]
pub struct ProtoOperation {
    #[prost(string, tag = "1")]
    pub event_id: String,
    #[prost(enumeration = "ProtoOpCode", tag = "2")]
    pub op: i32,
    #[prost(string, tag = "3")]
    pub target: String,
    #[prost(string, tag = "4")]
    pub operand_json: String,
    #[prost(message, optional, tag = "5")]
    pub ctx: Option<ProtoCtx>,
}
