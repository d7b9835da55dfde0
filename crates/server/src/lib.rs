//! Repsense Server — HTTP surface for the tracking pipeline
//!
//! Exposes batch video analysis and live per-frame tracking over HTTP with
//! axum. CPU-bound work runs on tokio's blocking pool; live sessions are kept
//! in a [`repsense_core::SessionStore`].

pub mod cors;
pub mod error;
pub mod forms;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::{router, LiveResponse};
pub use server::{serve, serve_on, spawn_idle_sweeper};
pub use state::{AppState, ServerSettings};
