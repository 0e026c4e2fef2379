use crate::http::{build_client, status_error};
use crate::traits::*;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::time::Duration;

pub struct OpenAICompatibleProvider {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAICompatibleProvider {
    pub fn new(base_url: String, api_key: Option<String>, timeout: Duration) -> Self {
        Self {
            client: build_client(timeout),
            base_url,
            api_key,
        }
    }
}

#[async_trait]
impl ChatModel for OpenAICompatibleProvider {
    async fn chat(
        &self,
        model: &str,
        system_prompt: &str,
        user_payload: &str,
        format: ChatFormat,
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let messages = [Message::system(system_prompt), Message::user(user_payload)];
        let mut body = json!({
            "model": model,
            "messages": messages,
            "temperature": 0.2,
        });

        if format == ChatFormat::Json {
            body["response_format"] = json!({"type": "json_object"});
        }

        let mut request = self.client.post(&url).json(&body);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::Http(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text, self.api_key.is_some()));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let choice = json["choices"]
            .get(0)
            .ok_or_else(|| ProviderError::Parse("No choices in response".to_string()))?;

        choice["message"]["content"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| ProviderError::Parse("Response message has no content".to_string()))
    }

    fn name(&self) -> &str {
        "OpenAI Compatible"
    }
}
