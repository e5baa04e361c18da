//! Capability traits for the orchestrator's external collaborators.
//!
//! # Trait Hierarchy
//!
//! ```text
//! Transport:
//!   - Transport: room lifecycle + typed app messages + event subscription
//!
//! Speech:
//!   - Transcriber: audio frames -> finalized utterances
//!
//! Language Models:
//!   - LanguageModel: tool-calling chat completion
//!
//! Retrieval:
//!   - ClipSearch: text query -> ranked clip candidates
//! ```
//!
//! Each trait is intentionally small — a handful of operations with
//! explicit error variants — so that swapping a mock for a real backend is
//! a configuration concern, not a code fork (spec §9 design notes).

mod clipsearch;
mod llm;
mod transcriber;
mod transport;

pub use clipsearch::ClipSearch;
pub use llm::{Completion, LanguageModel, Message, Role};
pub use transcriber::Transcriber;
pub use transport::{Recipient, Transport, TransportEvent};
