#![forbid(unsafe_code)]

//! Opsite Runtime
//!
//! Wraps the pure replay engine with an append-only op log, whole-site
//! rebuild, snapshots, drift detection and the `opsite` CLI.
//!
//! No projection logic lives here; all of it is delegated to the engine.

pub mod config;
pub mod drift;
pub mod error;
pub mod event_store;
pub mod logging;
pub mod proto_bridge;
pub mod proto_types;
pub mod replay;
pub mod snapshot;

pub use config::RuntimeConfig;
pub use error::{RuntimeError, RuntimeResult};
pub use event_store::EventStore;
pub use replay::{rebuild_hash, rebuild_site, SiteBuild};
