use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("API error: {0}")]
    Api(String),
    #[error("Authentication error: {0}")]
    Auth(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// What the caller asks the model to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatFormat {
    Json,
    Text,
}

/// A remote chat service that can address several models by id.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Send one system + user exchange to `model` and return the raw reply text.
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_payload: &str,
        format: ChatFormat,
    ) -> Result<String, ProviderError>;

    fn name(&self) -> &str;
}
