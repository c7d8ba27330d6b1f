//! Waypost API Library
//!
//! A small axum service that embeds the waypost reporter: demo error routes,
//! panic recovery, and a runtime verbosity switch.

pub mod handlers;
pub mod setup;
pub mod state;
mod telemetry;

pub use state::AppState;
