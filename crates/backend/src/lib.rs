use std::sync::Arc;

mod client;
mod http;

pub use client::{
    BackendConfig, BackendError, BackendResult, ChatBackend, ChatReply, ChatRequest,
    DEFAULT_BACKEND_URL, HealthStatus,
};
pub use http::HttpChatBackend;

pub fn create_backend(config: BackendConfig) -> BackendResult<Arc<dyn ChatBackend>> {
    Ok(Arc::new(HttpChatBackend::new(config)?))
}
