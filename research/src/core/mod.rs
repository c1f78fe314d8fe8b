//! Pure logic of the research loop.
//!
//! Nothing here performs I/O: run state, decisions, query cleanup, source
//! partitioning and output projection all work on in-memory values.

pub mod decision;
pub mod output;
pub mod policy;
pub mod query;
pub mod run_state;
pub mod sources;
pub mod types;
