//! Engine error types.
//!
//! Data problems never surface here; malformed records are skipped during
//! replay. These are caller precondition violations and projection
//! invariant failures.

use thiserror::Error;

use crate::events::RootType;

pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    /// A kind-specific replayer was handed a root of another kind.
    #[error("replayer for `{expected}` roots called with `{root}`")]
    RootKindMismatch { expected: &'static str, root: String },

    #[error("invalid entity root {0:?}: expected `page|blog|wiki|exp:<slug>`")]
    InvalidRoot(String),
}

impl EngineError {
    pub(crate) fn mismatch(expected: RootType, root: impl ToString) -> Self {
        EngineError::RootKindMismatch {
            expected: expected.as_str(),
            root: root.to_string(),
        }
    }
}

/// A projection that breaks one of its structural guarantees.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvariantViolation {
    #[error("block_order references unknown block {0:?}")]
    OrderedBlockMissing(String),

    #[error("block_order references deleted block {0:?}")]
    OrderedBlockDeleted(String),

    #[error("block {0:?} appears more than once in block_order")]
    DuplicateOrderedBlock(String),

    #[error("revisions of {entity} are not sorted by timestamp at {revision:?}")]
    RevisionsUnsorted { entity: String, revision: String },

    #[error("current_revision of {entity} is {found:?}, expected {expected:?}")]
    CurrentRevisionMismatch {
        entity: String,
        expected: Option<String>,
        found: Option<String>,
    },

    #[error("conflict candidate {0:?} is not a known revision")]
    ConflictCandidateMissing(String),

    #[error("conflict candidates listed for {0} without has_conflict")]
    CandidatesWithoutConflict(String),

    #[error("deleted experiment entry {0:?} is exposed")]
    DeletedEntryExposed(String),

    #[error("nav entry {0:?} is not in entries")]
    NavEntryMissing(String),

    #[error("nav entry {0:?} is not published and public")]
    NavEntryNotNavigable(String),

    #[error("slug {slug:?} maps to unknown entry {id:?}")]
    DanglingSlug { slug: String, id: String },
}
