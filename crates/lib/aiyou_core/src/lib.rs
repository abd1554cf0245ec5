//! # aiyou_core
//!
//! Core domain logic for AIYou: the token lifecycle and permission engine,
//! the retrieval/ingestion gateway and the CRAG orchestration pipeline.

pub mod auth;
pub mod crag;
pub mod embedding;
pub mod llm;
pub mod migrate;
pub mod retrieval;
pub mod tools;

/// Returns the crate version.
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
