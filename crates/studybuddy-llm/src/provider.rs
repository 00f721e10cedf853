use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::LlmError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Token accounting reported by the backend, passed through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
    /// Provider-specific breakdowns such as `prompt_tokens_details`.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl std::fmt::Display for Usage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "prompt={} completion={} total={}",
            self.prompt_tokens, self.completion_tokens, self.total_tokens
        )
    }
}

/// A single chat completion: the assistant text plus whatever usage the backend reported.
#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub text: String,
    pub usage: Option<Usage>,
}

/// A chat-completion backend selected once at construction time.
pub trait ModelBackend: Send + Sync {
    /// Send messages to the model and return its completion.
    ///
    /// Implementations make exactly one request; retrying is the caller's decision.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend rejects the request, is unreachable, or
    /// replies with a body that cannot be parsed.
    fn complete(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<Completion, LlmError>> + Send;

    fn name(&self) -> &str;

    fn model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn message_user_constructor() {
        let msg = Message::user("hi");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
    }

    #[test]
    fn usage_missing_fields_default_to_zero() {
        let usage: Usage = serde_json::from_str(r#"{"prompt_tokens":12}"#).unwrap();
        assert_eq!(usage.prompt_tokens, 12);
        assert_eq!(usage.completion_tokens, 0);
        assert_eq!(usage.total_tokens, 0);
    }

    #[test]
    fn usage_display() {
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            ..Usage::default()
        };
        assert_eq!(usage.to_string(), "prompt=10 completion=5 total=15");
    }

    #[test]
    fn usage_keeps_provider_details() {
        let usage: Usage = serde_json::from_str(
            r#"{"prompt_tokens":12,"completion_tokens":3,"total_tokens":15,
                "prompt_tokens_details":{"cached_tokens":8},
                "completion_tokens_details":{"reasoning_tokens":0}}"#,
        )
        .unwrap();
        assert_eq!(usage.total_tokens, 15);
        assert_eq!(usage.extra["prompt_tokens_details"]["cached_tokens"], 8);
        assert!(usage.extra.contains_key("completion_tokens_details"));

        let back = serde_json::to_value(&usage).unwrap();
        assert_eq!(back["prompt_tokens_details"]["cached_tokens"], 8);
        assert_eq!(back["prompt_tokens"], 12);
    }
}
