//! `crediflow-observability` — process-level logging setup.
//!
//! The domain and infra crates emit `tracing` events; the embedding
//! process calls [`init`] once at startup to route them somewhere useful.

pub mod logging;

pub use logging::{init, init_with_filter};
