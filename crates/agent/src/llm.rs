//! Chat-completion client for OpenAI-compatible endpoints.
//!
//! The dialogue engine only sees the `LlmClient` trait; `OpenAiChatClient`
//! speaks the `/chat/completions` protocol (OpenAI and Ollama both serve it)
//! with function tools enabled on the first pass of a turn.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use washline_core::config::LlmConfig;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

/// One tool invocation the model asked for, with its arguments already
/// decoded from the wire's JSON-string encoding.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: Some(content.into()), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: Some(content.into()), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: Some(content.into()),
            tool_calls: Vec::new(),
            tool_call_id: None,
        }
    }

    /// The assistant turn that requested the given tool calls, echoed back
    /// into the context so tool results can reference it.
    pub fn assistant_tool_calls(tool_calls: Vec<ToolCallRequest>) -> Self {
        Self { role: Role::Assistant, content: None, tool_calls, tool_call_id: None }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, result: &Value) -> Self {
        Self {
            role: Role::Tool,
            content: Some(result.to_string()),
            tool_calls: Vec::new(),
            tool_call_id: Some(tool_call_id.into()),
        }
    }
}

/// Declaration of one callable tool, in JSON-schema form.
#[derive(Clone, Debug, PartialEq)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    /// Empty means no tools are offered (the reply pass of a turn).
    pub tools: Vec<ToolSpec>,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Completion {
    pub content: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("model transport failure: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("model api error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("model response decode failure: {0}")]
    Decode(String),
    #[error("model returned no choices")]
    EmptyResponse,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError>;
}

pub struct OpenAiChatClient {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl OpenAiChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            http,
            base_url: config.resolved_base_url(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiChatClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        let body = encode_request(&self.model, &request);

        let mut http_request =
            self.http.post(format!("{}/chat/completions", self.base_url)).json(&body);
        if let Some(api_key) = &self.api_key {
            http_request = http_request.bearer_auth(api_key.expose_secret());
        }

        let response = http_request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(LlmError::Api { status: status.as_u16(), message });
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|error| LlmError::Decode(format!("invalid completion payload: {error}")))?;
        decode_completion(wire)
    }
}

fn encode_request(model: &str, request: &CompletionRequest) -> Value {
    let messages: Vec<WireMessage> = request.messages.iter().map(encode_message).collect();

    let mut body = serde_json::json!({
        "model": model,
        "messages": messages,
        "temperature": request.temperature,
        "max_tokens": request.max_tokens,
    });

    if !request.tools.is_empty() {
        let tools: Vec<Value> = request
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    },
                })
            })
            .collect();
        body["tools"] = Value::Array(tools);
        body["tool_choice"] = Value::String("auto".to_string());
    }

    body
}

fn encode_message(message: &ChatMessage) -> WireMessage {
    let tool_calls = if message.tool_calls.is_empty() {
        None
    } else {
        Some(
            message
                .tool_calls
                .iter()
                .map(|call| WireToolCall {
                    id: call.id.clone(),
                    kind: "function".to_string(),
                    function: WireFunctionCall {
                        name: call.name.clone(),
                        arguments: call.arguments.to_string(),
                    },
                })
                .collect(),
        )
    };

    WireMessage {
        role: message.role.as_str(),
        content: message.content.clone(),
        tool_calls,
        tool_call_id: message.tool_call_id.clone(),
    }
}

fn decode_completion(wire: WireResponse) -> Result<Completion, LlmError> {
    let choice = wire.choices.into_iter().next().ok_or(LlmError::EmptyResponse)?;

    let mut tool_calls = Vec::with_capacity(choice.message.tool_calls.len());
    for call in choice.message.tool_calls {
        let arguments: Value = serde_json::from_str(&call.function.arguments).map_err(|error| {
            LlmError::Decode(format!(
                "tool call `{}` carried invalid argument json: {error}",
                call.function.name
            ))
        })?;
        tool_calls.push(ToolCallRequest { id: call.id, name: call.function.name, arguments });
    }

    Ok(Completion { content: choice.message.content, tool_calls })
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<WireToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireToolCall {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    function: WireFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct WireFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Debug, Deserialize)]
struct WireResponseMessage {
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

/// Test double that replays a fixed script of completions and records every
/// request it receives.
#[cfg(test)]
pub(crate) struct ScriptedLlmClient {
    script: std::sync::Mutex<std::collections::VecDeque<Result<Completion, LlmError>>>,
    requests: std::sync::Mutex<Vec<CompletionRequest>>,
}

#[cfg(test)]
impl ScriptedLlmClient {
    pub(crate) fn new(script: Vec<Result<Completion, LlmError>>) -> Self {
        Self {
            script: std::sync::Mutex::new(script.into_iter().collect()),
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn recorded_requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[cfg(test)]
#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, request: CompletionRequest) -> Result<Completion, LlmError> {
        self.requests.lock().expect("requests lock").push(request);
        self.script
            .lock()
            .expect("script lock")
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        decode_completion, encode_request, ChatMessage, Completion, CompletionRequest,
        ToolCallRequest, ToolSpec, WireResponse,
    };

    fn request_with_tools() -> CompletionRequest {
        CompletionRequest {
            messages: vec![
                ChatMessage::system("be helpful"),
                ChatMessage::user("book me a pickup"),
            ],
            tools: vec![ToolSpec {
                name: "lookup_customer".to_string(),
                description: "look up a customer".to_string(),
                parameters: json!({"type": "object", "properties": {"phone": {"type": "string"}}}),
            }],
            temperature: 0.7,
            max_tokens: 150,
        }
    }

    #[test]
    fn tool_enabled_request_declares_tools_and_auto_choice() {
        let body = encode_request("gpt-4o-mini", &request_with_tools());
        assert_eq!(body["tool_choice"], "auto");
        assert_eq!(body["tools"][0]["function"]["name"], "lookup_customer");
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["max_tokens"], 150);
    }

    #[test]
    fn reply_pass_request_omits_tool_fields() {
        let mut request = request_with_tools();
        request.tools.clear();
        let body = encode_request("gpt-4o-mini", &request);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn assistant_echo_serializes_arguments_as_json_string() {
        let mut request = request_with_tools();
        request.messages.push(ChatMessage::assistant_tool_calls(vec![ToolCallRequest {
            id: "call_1".to_string(),
            name: "lookup_customer".to_string(),
            arguments: json!({"phone": "+14165550100"}),
        }]));
        request.messages.push(ChatMessage::tool_result("call_1", &json!({"exists": false})));

        let body = encode_request("gpt-4o-mini", &request);
        let call = &body["messages"][2]["tool_calls"][0];
        assert_eq!(call["type"], "function");
        assert_eq!(call["function"]["arguments"], r#"{"phone":"+14165550100"}"#);
        assert_eq!(body["messages"][3]["tool_call_id"], "call_1");
    }

    #[test]
    fn decodes_tool_call_response() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {
                            "name": "list_services",
                            "arguments": "{\"service_type\":\"express\"}"
                        }
                    }]
                }
            }]
        }))
        .expect("wire decode");

        let completion = decode_completion(wire).expect("decode");
        assert_eq!(completion.content, None);
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].name, "list_services");
        assert_eq!(completion.tool_calls[0].arguments["service_type"], "express");
    }

    #[test]
    fn invalid_argument_json_is_a_decode_error() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_9",
                        "type": "function",
                        "function": {"name": "list_services", "arguments": "{not json"}
                    }]
                }
            }]
        }))
        .expect("wire decode");

        assert!(decode_completion(wire).is_err());
    }

    #[test]
    fn text_response_decodes_to_content() {
        let wire: WireResponse = serde_json::from_value(json!({
            "choices": [{"message": {"content": "Hey! Need a pickup?"}}]
        }))
        .expect("wire decode");

        let completion = decode_completion(wire).expect("decode");
        assert_eq!(
            completion,
            Completion {
                content: Some("Hey! Need a pickup?".to_string()),
                tool_calls: Vec::new()
            }
        );
    }
}
