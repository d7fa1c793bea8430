use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;
use snafu::{ResultExt, ensure};

use super::client::{
    BackendConfig, BackendResult, BuildClientSnafu, ChatBackend, ChatReply, ChatRequest,
    DecodeBodySnafu, HealthStatus, InvalidBaseUrlSnafu, ReadBodySnafu, SendRequestSnafu,
    UnhealthyStatusSnafu,
};

pub struct HttpChatBackend {
    config: BackendConfig,
    client: reqwest::Client,
}

impl HttpChatBackend {
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        ensure!(
            config.base_url.starts_with("http://") || config.base_url.starts_with("https://"),
            InvalidBaseUrlSnafu {
                stage: "http-backend-new",
                base_url: config.base_url.clone(),
            }
        );

        // No request deadline: a round trip runs until it succeeds or fails.
        let client = reqwest::Client::builder().build().context(BuildClientSnafu {
            stage: "build-client",
        })?;

        Ok(Self { config, client })
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    async fn post_chat(&self, request: ChatRequest) -> BackendResult<ChatReply> {
        let url = self.config.chat_url();
        let response = self
            .client
            .post(url.as_str())
            .json(&request)
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-chat-request",
                url: url.clone(),
            })?;

        let status = response.status();
        let body = response.text().await.context(ReadBodySnafu {
            stage: "read-chat-response",
        })?;

        // The status code is informational only; any JSON body counts as an answer.
        let payload: Value = serde_json::from_str(&body).context(DecodeBodySnafu {
            stage: "decode-chat-response",
            status: status.as_u16(),
        })?;

        if !status.is_success() {
            tracing::warn!(
                status = status.as_u16(),
                body = %body,
                "chat backend answered with a non-success status"
            );
        }

        Ok(ChatReply::from_json(status.as_u16(), &payload))
    }

    async fn get_health(&self) -> BackendResult<HealthStatus> {
        let url = self.config.health_url();
        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .context(SendRequestSnafu {
                stage: "send-health-request",
                url: url.clone(),
            })?;

        let status = response.status();
        let body = response.text().await.context(ReadBodySnafu {
            stage: "read-health-response",
        })?;

        if !status.is_success() {
            return UnhealthyStatusSnafu {
                stage: "health-http-status",
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        let message = serde_json::from_str::<Value>(&body)
            .ok()
            .and_then(|payload| {
                payload
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
            });

        Ok(HealthStatus {
            status: status.as_u16(),
            message,
        })
    }
}

impl ChatBackend for HttpChatBackend {
    fn name(&self) -> &str {
        "http"
    }

    fn send_chat<'a>(&'a self, request: ChatRequest) -> BoxFuture<'a, BackendResult<ChatReply>> {
        self.post_chat(request).boxed()
    }

    fn health<'a>(&'a self) -> BoxFuture<'a, BackendResult<HealthStatus>> {
        self.get_health().boxed()
    }
}
