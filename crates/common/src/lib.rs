//! Repsense Common Utilities
//!
//! Shared infrastructure for all Repsense crates:
//! - Error types and result aliases
//! - Injectable clocks for the wall-clock driven state machines
//! - Tracing/logging initialization
//! - Configuration loading
//! - The persisted results summary file
//! - Lookup of external programs

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;
pub mod process;
pub mod results;

pub use clock::*;
pub use config::*;
pub use error::*;
