use async_trait::async_trait;
use serde::Serialize;

use crate::config::VendorConfig;
use crate::error::{AppError, Result};
use crate::http::{upstream_message, CLIENT};
use crate::llm::{Completion, CompletionBackend, CompletionOptions, LlmProvider, Message};

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

pub struct OpenAiClient {
    config: VendorConfig,
}

impl OpenAiClient {
    pub fn new(config: VendorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CompletionBackend for OpenAiClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<Completion> {
        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let body = ChatRequest {
            model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
        };

        let res = CLIENT
            .post(format!("{}/v1/chat/completions", self.config.base_url))
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::provider("OpenAI", None, e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| AppError::provider("OpenAI", Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::provider("OpenAI", Some(status.as_u16()), upstream_message(&text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AppError::provider("OpenAI", None, format!("Invalid JSON from LLM: {}", e)))?;
        let reply = json["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| AppError::provider("OpenAI", None, "Invalid response format from LLM"))?
            .to_string();

        Ok(Completion {
            content: reply,
            provider: LlmProvider::OpenAi,
            model: json["model"].as_str().unwrap_or(model).to_string(),
        })
    }
}
