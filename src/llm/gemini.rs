use async_trait::async_trait;
use serde::Serialize;

use crate::config::VendorConfig;
use crate::error::{AppError, Result};
use crate::http::{upstream_message, CLIENT};
use crate::llm::{Completion, CompletionBackend, CompletionOptions, LlmProvider, Message, Role};

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    max_output_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<SystemInstruction<'a>>,
    generation_config: GenerationConfig,
}

impl<'a> GenerateRequest<'a> {
    /// Gemini takes system prompts out of band and calls the assistant `model`.
    fn new(messages: &'a [Message], options: &CompletionOptions) -> Self {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for message in messages {
            let part = Part { text: &message.content };
            match message.role {
                Role::System => system.push(part),
                Role::User => contents.push(Content { role: "user", parts: vec![part] }),
                Role::Assistant => contents.push(Content { role: "model", parts: vec![part] }),
            }
        }

        Self {
            contents,
            system_instruction: (!system.is_empty()).then(|| SystemInstruction { parts: system }),
            generation_config: GenerationConfig {
                max_output_tokens: options.max_tokens,
                temperature: options.temperature,
            },
        }
    }
}

pub struct GeminiClient {
    config: VendorConfig,
}

impl GeminiClient {
    pub fn new(config: VendorConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CompletionBackend for GeminiClient {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<Completion> {
        let model = options.model.as_deref().unwrap_or(&self.config.model);
        let body = GenerateRequest::new(messages, options);

        let res = CLIENT
            .post(format!("{}/v1beta/models/{}:generateContent", self.config.base_url, model))
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::provider("Gemini", None, e.to_string()))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|e| AppError::provider("Gemini", Some(status.as_u16()), e.to_string()))?;
        if !status.is_success() {
            return Err(AppError::provider("Gemini", Some(status.as_u16()), upstream_message(&text)));
        }

        let json: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AppError::provider("Gemini", None, format!("Invalid JSON from LLM: {}", e)))?;
        let parts = json["candidates"][0]["content"]["parts"]
            .as_array()
            .ok_or_else(|| AppError::provider("Gemini", None, "Invalid response format from LLM"))?;
        let reply: String = parts.iter().filter_map(|part| part["text"].as_str()).collect();

        Ok(Completion {
            content: reply,
            provider: LlmProvider::Gemini,
            model: model.to_string(),
        })
    }
}
