//! Runtime error types.

use std::io;

use opsite_engine::{EngineError, InvariantViolation};
use thiserror::Error;

pub type RuntimeResult<T> = Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("protobuf decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid frame length {0} in op log")]
    InvalidFrame(usize),

    /// The engine trusts log order; the store refuses to break it.
    #[error("out-of-order append: {ts} is earlier than last appended {last}")]
    OutOfOrder { ts: String, last: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("invariant violation in {entity}: {source}")]
    Invariant {
        entity: String,
        #[source]
        source: InvariantViolation,
    },

    #[error("determinism failure: run 1 = {first}, run 2 = {second}")]
    Nondeterministic { first: String, second: String },

    #[error("logging init failed: {0}")]
    Logging(String),
}
