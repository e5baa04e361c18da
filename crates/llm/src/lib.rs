//! Tool-calling language model client (collaborator to C4, spec §4.4).

mod http;

pub use http::{HttpLanguageModel, HttpLlmConfig};
