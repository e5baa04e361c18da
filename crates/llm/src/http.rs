use std::time::Duration;

use async_trait::async_trait;
use orchestrator_core::{
    Completion, Error, LanguageModel, Message, PlayClipArgs, Result, Role, SearchClipsArgs,
    ToolCall, ToolResult,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone)]
pub struct HttpLlmConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model_id: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub request_timeout: Duration,
    pub max_retries: u32,
    pub initial_backoff: Duration,
}

impl Default for HttpLlmConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434/v1/chat/completions".to_string(),
            api_key: String::new(),
            model_id: "default-model".to_string(),
            max_tokens: 512,
            temperature: 0.2,
            request_timeout: Duration::from_secs(30),
            max_retries: 2,
            initial_backoff: Duration::from_millis(300),
        }
    }
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        let role = match message.role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        };
        WireMessage { role, content: message.content.clone(), tool_call_id: None }
    }
}

#[derive(Serialize)]
struct ToolFunctionDef {
    name: &'static str,
    description: &'static str,
    parameters: serde_json::Value,
}

#[derive(Serialize)]
struct ToolDef {
    #[serde(rename = "type")]
    kind: &'static str,
    function: ToolFunctionDef,
}

fn tool_definitions() -> Vec<ToolDef> {
    vec![
        ToolDef {
            kind: "function",
            function: ToolFunctionDef {
                name: "search_clips",
                description: "Search the clip library for short video clips matching a text description",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {"type": "string"},
                        "top_k": {"type": "integer", "minimum": 1, "maximum": 20},
                    },
                    "required": ["query", "top_k"],
                }),
            },
        },
        ToolDef {
            kind: "function",
            function: ToolFunctionDef {
                name: "play_clip",
                description: "Command the edge player to play a segment of a previously found clip",
                parameters: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "clip_id": {"type": "string"},
                        "start_seconds": {"type": "number", "minimum": 0},
                        "end_seconds": {"type": "number"},
                    },
                    "required": ["clip_id", "start_seconds", "end_seconds"],
                }),
            },
        },
    ]
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<WireMessage>,
    tools: Vec<ToolDef>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunctionCall,
}

#[derive(Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

fn parse_tool_call(wire: WireToolCall) -> Result<ToolCall> {
    match wire.function.name.as_str() {
        "search_clips" => {
            let args: SearchClipsArgs = serde_json::from_str(&wire.function.arguments)
                .map_err(|e| Error::InvalidToolCall(format!("search_clips arguments: {e}")))?;
            Ok(ToolCall::SearchClips { call_id: wire.id, args })
        }
        "play_clip" => {
            let args: PlayClipArgs = serde_json::from_str(&wire.function.arguments)
                .map_err(|e| Error::InvalidToolCall(format!("play_clip arguments: {e}")))?;
            Ok(ToolCall::PlayClip { call_id: wire.id, args })
        }
        other => Err(Error::InvalidToolCall(format!("unknown tool: {other}"))),
    }
}

fn tool_result_message(result: &ToolResult) -> WireMessage {
    let (call_id, content) = match result {
        ToolResult::SearchClips { call_id, results, reason } => {
            let body = serde_json::json!({ "results": results, "reason": reason });
            (call_id.clone(), body.to_string())
        }
        ToolResult::PlayClip { call_id, ok, error, command_seq } => {
            let body = serde_json::json!({ "ok": ok, "error": error, "command_seq": command_seq });
            (call_id.clone(), body.to_string())
        }
    };
    WireMessage { role: "tool", content, tool_call_id: Some(call_id) }
}

/// OpenAI-compatible tool-calling chat completion client (spec §4.4).
///
/// Retries transient failures with exponential backoff; a timeout or
/// exhausted retry budget surfaces as `Error::LlmFailed`, which the pipeline
/// treats as ending the current turn.
pub struct HttpLanguageModel {
    client: reqwest::Client,
    config: HttpLlmConfig,
}

impl HttpLanguageModel {
    pub fn new(config: HttpLlmConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| Error::Internal(format!("building llm http client: {e}")))?;
        Ok(Self { client, config })
    }

    async fn complete_once(&self, request: &ChatRequest) -> Result<Completion> {
        let mut builder = self.client.post(&self.config.endpoint).json(request);
        if !self.config.api_key.is_empty() {
            builder = builder.bearer_auth(&self.config.api_key);
        }

        let response = builder.send().await.map_err(|e| Error::LlmFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::LlmFailed(format!("backend returned {}", response.status())));
        }

        let body: ChatResponse = response.json().await.map_err(|e| Error::LlmFailed(e.to_string()))?;
        let message = body
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::LlmFailed("empty choices array".into()))?
            .message;

        let tool_calls =
            message.tool_calls.into_iter().map(parse_tool_call).collect::<Result<Vec<_>>>()?;

        Ok(Completion { reasoning: message.content, tool_calls })
    }
}

#[async_trait]
impl LanguageModel for HttpLanguageModel {
    async fn complete(&self, history: &[Message], prior_results: &[ToolResult]) -> Result<Completion> {
        let mut messages: Vec<WireMessage> = history.iter().map(WireMessage::from).collect();
        messages.extend(prior_results.iter().map(tool_result_message));

        let request = ChatRequest {
            model: self.config.model_id.clone(),
            messages,
            tools: tool_definitions(),
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let mut backoff = self.config.initial_backoff;
        let mut last_err = None;

        for attempt in 1..=self.config.max_retries.max(1) {
            match self.complete_once(&request).await {
                Ok(completion) => return Ok(completion),
                Err(e) => {
                    tracing::warn!(attempt, error = %e, "llm completion failed, retrying");
                    last_err = Some(e);
                    if attempt < self.config.max_retries.max(1) {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::LlmFailed("exhausted retries".into())))
    }

    fn model_id(&self) -> &str {
        &self.config.model_id
    }
}
