//! Transport Gateway client (C1, spec §4.1).
//!
//! The WebRTC room service itself is out of scope (spec §1) — this crate
//! only speaks the thin control-plane contract the orchestrator needs:
//! create/destroy a room, send app messages into it, and subscribe to its
//! participant/message events. [`HttpTransportClient`] implements that
//! contract against a JSON HTTP gateway; [`mock::InMemoryTransport`] backs
//! tests and local development without a real gateway running.

mod http;
pub mod mock;

pub use http::{HttpTransportClient, HttpTransportConfig};
