use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use snafu::Snafu;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim().trim_end_matches('/').to_string(),
        }
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    pub fn health_url(&self) -> String {
        format!("{}/", self.base_url)
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BACKEND_URL)
    }
}

/// Body of one `POST /chat` round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub emotion: String,
}

impl ChatRequest {
    pub fn new(message: impl Into<String>, emotion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            emotion: emotion.into(),
        }
    }
}

/// Decoded chat response.
///
/// `reply` is `None` when the body parsed as JSON but carried no usable
/// `reply` string (missing, empty, or another JSON type).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ChatReply {
    pub status: u16,
    pub reply: Option<String>,
}

impl ChatReply {
    pub fn from_json(status: u16, payload: &Value) -> Self {
        let reply = payload
            .get("reply")
            .and_then(Value::as_str)
            .filter(|reply| !reply.is_empty())
            .map(str::to_string);

        Self { status, reply }
    }

    pub fn with_reply(reply: impl Into<String>) -> Self {
        Self {
            status: 200,
            reply: Some(reply.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: u16,
    pub message: Option<String>,
}

pub type BackendResult<T> = Result<T, BackendError>;

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum BackendError {
    #[snafu(display("backend url '{base_url}' must start with http:// or https://"))]
    InvalidBaseUrl {
        stage: &'static str,
        base_url: String,
    },
    #[snafu(display("failed to build http client on `{stage}`, {source}"))]
    BuildClient {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("request to {url} failed on `{stage}`, {source}"))]
    SendRequest {
        stage: &'static str,
        url: String,
        source: reqwest::Error,
    },
    #[snafu(display("failed to read response body on `{stage}`, {source}"))]
    ReadBody {
        stage: &'static str,
        source: reqwest::Error,
    },
    #[snafu(display("backend returned a non-JSON body with status {status}: {source}"))]
    DecodeBody {
        stage: &'static str,
        status: u16,
        source: serde_json::Error,
    },
    #[snafu(display("backend health check returned status {status}: {body}"))]
    UnhealthyStatus {
        stage: &'static str,
        status: u16,
        body: String,
    },
}

/// Opaque chat endpoint consumed by the chat session.
pub trait ChatBackend: Send + Sync {
    fn name(&self) -> &str;
    fn send_chat<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<ChatReply>>;
    fn health<'a>(&'a self) -> BoxFuture<'a, BackendResult<HealthStatus>>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn config_strips_trailing_slashes() {
        let config = BackendConfig::new(" http://localhost:8001/ ");
        assert_eq!(config.chat_url(), "http://localhost:8001/chat");
        assert_eq!(config.health_url(), "http://localhost:8001/");
    }

    #[test]
    fn reply_is_read_only_from_non_empty_strings() {
        assert_eq!(
            ChatReply::from_json(200, &json!({ "reply": "hi!" })).reply,
            Some("hi!".to_string())
        );
        assert_eq!(ChatReply::from_json(200, &json!({ "reply": "" })).reply, None);
        assert_eq!(ChatReply::from_json(200, &json!({ "reply": 42 })).reply, None);
        assert_eq!(ChatReply::from_json(500, &json!({ "error": "boom" })).reply, None);
        assert_eq!(ChatReply::from_json(200, &json!(null)).reply, None);
    }

    #[test]
    fn request_serializes_to_wire_shape() {
        let request = ChatRequest::new("hello", "happy");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "message": "hello", "emotion": "happy" })
        );
    }
}
