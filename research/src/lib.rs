//! Iterative research of software component lifecycle dates.
//!
//! For each component the crate searches the web, extracts the active
//! (general availability) and end-of-support dates with a language model,
//! and re-searches until confidence is adequate or the iteration cap is hit.
//!
//! - **[`core`]**: Pure, deterministic logic (run state, decision, projection).
//!   No I/O, fully testable in isolation.
//! - **[`io`]**: Side-effecting operations (HTTP collaborators, prompts,
//!   config, files). Collaborators sit behind traits so tests can script them.
//!
//! Orchestration modules ([`steps`], [`session`], [`batch`]) coordinate core
//! logic with I/O to implement the CLI commands.

pub mod batch;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod session;
pub mod steps;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod trace;
