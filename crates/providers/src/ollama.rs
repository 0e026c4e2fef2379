//! Ollama chat adapter (`/api/chat`), used against ollama.com or a local daemon.

use crate::http::{build_client, status_error};
use crate::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_OLLAMA_HOST: &str = "https://ollama.com";

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaMessage {
    #[serde(default)]
    content: String,
}

pub struct OllamaProvider {
    client: Client,
    host: String,
    api_key: Option<String>,
}

impl OllamaProvider {
    pub fn new(host: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            host,
            api_key,
        }
    }

    fn chat_url(&self) -> String {
        format!("{}/api/chat", self.host.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OllamaProvider {
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_payload: &str,
        format: ChatFormat,
    ) -> Result<String, ProviderError> {
        let messages = [Message::system(system_prompt), Message::user(user_payload)];

        let mut body = json!({
            "model": model,
            "messages": messages,
            "stream": false,
        });
        if format == ChatFormat::Json {
            body["format"] = json!("json");
        }

        let url = self.chat_url();
        debug!(url = %url, model, api_key_present = self.api_key.is_some(), "ollama chat");

        let mut request = self.client.post(&url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text, self.api_key.is_some()));
        }

        let parsed: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        Ok(parsed.message.content)
    }

    fn name(&self) -> &str {
        "Ollama"
    }
}
