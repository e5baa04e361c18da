//! Orchestrator Facade (C7, spec §4.7, §6): the axum HTTP surface that
//! wires the other ten crates into one long-running service.

mod error;
pub mod http;
mod session_actor;
pub mod state;
#[cfg(test)]
mod tests;

pub use error::ApiError;
pub use http::create_router;
pub use state::{build_http_collaborators, AppState, CleanupOutcome, SessionTasks};
