//! cmdgate
//!
//! HTTP gateway that runs pre-installed executables on behalf of remote
//! callers and returns their stdout, stderr and exit code as JSON.
//!
//! - `engine::validate` resolves an alias or path and rejects bad requests
//!   before anything is spawned.
//! - `engine::execute` runs the child with a fixed timeout and captures its
//!   output.
//! - `runtime` is the axum surface that maps outcomes to status codes.

pub mod checks;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod execution_id;
pub mod metrics;
pub mod runtime;
pub mod sinks;
