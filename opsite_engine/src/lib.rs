#![forbid(unsafe_code)]

//! Opsite Engine
//!
//! Pure replay kernel: turns an ordered operation log into projected
//! pages, wikis, blogs, experiments and the site index. No I/O, no
//! persistence, no retries.

/// Bumped whenever replay output changes for the same input.
pub const ENGINE_VERSION: u32 = 1;

pub mod access;
pub mod config;
pub mod conflict;
pub mod domain;
pub mod engine;
pub mod error;
pub mod events;
pub mod experiment;
pub mod hashing;
pub mod invariants;
pub mod metadata;
pub mod ordering;
pub mod page;
pub mod patch;
pub mod revisions;
pub mod site_index;

pub use config::{AccessMode, ReplayConfig, DEFAULT_CONFLICT_WINDOW_MS};
pub use domain::{
    Block, ContentMeta, ContentType, EntryKind, ExperimentEntry, HistoryEntry, IndexEntry,
    MetaOverride, MetaPatch, ProjectedBlog, ProjectedExperiment, ProjectedPage, ProjectedWiki,
    Projection, Revision, SiteIndex, Status, Visibility,
};
pub use engine::{replay_entity, Replayer};
pub use error::{EngineError, EngineResult, InvariantViolation};
pub use events::{parse_log, OpKind, Operand, Operation, RootRef, RootType, Target};
