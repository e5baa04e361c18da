//! Core types and capability traits for the session orchestrator.
//!
//! This crate is the shared vocabulary between every other crate in the
//! workspace: the data model of §3 (Session, Utterance, ToolCall, Clip
//! Candidate, Play Command, Status Observation), the error taxonomy of §7,
//! and the small capability traits (`Transport`, `Transcriber`,
//! `LanguageModel`, `ClipSearch`) that let the rest of the system depend on
//! interfaces rather than concrete backends.

pub mod audio;
pub mod clip;
pub mod command;
pub mod error;
pub mod observation;
pub mod session;
pub mod tool_call;
pub mod traits;
pub mod utterance;

pub use audio::{AudioFrame, SampleRate};
pub use clip::ClipCandidate;
pub use command::{PlayCommand, PlaybackCommandPayload};
pub use error::{Error, Result};
pub use observation::{ObservationKind, StatusObservation};
pub use session::{EdgePids, EdgeRole, Session, SessionSnapshot, SessionState};
pub use tool_call::{PlayClipArgs, SearchClipsArgs, ToolCall, ToolResult};
pub use traits::{ClipSearch, Completion, LanguageModel, Message, Recipient, Role, Transcriber, Transport, TransportEvent};
pub use utterance::Utterance;
