//! Chat-completion wire types.

use serde::{Deserialize, Serialize};

use crate::endpoint::EndpointKind;
use crate::error::{ChatError, ChatResult};

pub const TEMPERATURE: f64 = 0.2;
pub const MAX_TOKENS: u32 = 256;

/// One message in the outbound `messages` list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage<'a> {
    pub role: &'static str,
    pub content: &'a str,
}

/// Outbound request body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatPayload<'a> {
    /// Only set for generic model endpoints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: Vec<ChatMessage<'a>>,
    pub temperature: f64,
    pub max_tokens: u32,
}

/// Builds the single-turn payload for `message`.
pub fn build_payload<'a>(
    kind: EndpointKind,
    deployment_name: &'a str,
    message: &'a str,
) -> ChatPayload<'a> {
    let model = match kind {
        EndpointKind::Generic => Some(deployment_name.trim()),
        EndpointKind::DeploymentScoped => None,
    };
    ChatPayload {
        model,
        messages: vec![ChatMessage {
            role: "user",
            content: message,
        }],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
    }
}

#[derive(Debug, Default, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Option<Vec<CompletionChoice>>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionChoice {
    #[serde(default)]
    message: Option<CompletionMessage>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Extracts `choices[0].message.content` from a success body.
///
/// A missing or `null` field at any level yields an empty string. A body
/// that is not a JSON object of the expected shape is a [`ChatError::Parse`].
pub fn parse_reply(body: &str) -> ChatResult<String> {
    let reply: CompletionReply = serde_json::from_str(body)
        .map_err(|e| ChatError::Parse(format!("chat completion body is not valid JSON: {e}")))?;

    Ok(reply
        .choices
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|c| c.message)
        .and_then(|m| m.content)
        .unwrap_or_default())
}
