//! LLM vendor selection and completion dispatch.

pub mod gemini;
pub mod openai;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use crate::config::Config;
use crate::error::{AppError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Gemini,
}

impl LlmProvider {
    pub fn as_str(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "openai",
            LlmProvider::Gemini => "gemini",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            LlmProvider::OpenAi => "OpenAI",
            LlmProvider::Gemini => "Gemini",
        }
    }
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LlmProvider {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(LlmProvider::OpenAi),
            "gemini" => Ok(LlmProvider::Gemini),
            _ => Err(AppError::InvalidProvider(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Clone, Debug, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}

#[derive(Clone, Debug)]
pub struct CompletionOptions {
    /// Vendor default when `None`.
    pub model: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 1000,
            temperature: 0.7,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Completion {
    pub content: String,
    pub provider: LlmProvider,
    pub model: String,
}

#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, messages: &[Message], options: &CompletionOptions) -> Result<Completion>;
}

/// The vendor choice shared by every request, plus a backend for each vendor
/// that has credentials.
pub struct ProviderSelector {
    current: RwLock<LlmProvider>,
    openai: Option<Arc<dyn CompletionBackend>>,
    gemini: Option<Arc<dyn CompletionBackend>>,
}

impl ProviderSelector {
    pub fn new(
        initial: LlmProvider,
        openai: Option<Arc<dyn CompletionBackend>>,
        gemini: Option<Arc<dyn CompletionBackend>>,
    ) -> Self {
        Self {
            current: RwLock::new(initial),
            openai,
            gemini,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        let openai = config
            .openai
            .clone()
            .map(|vendor| Arc::new(openai::OpenAiClient::new(vendor)) as Arc<dyn CompletionBackend>);
        let gemini = config
            .gemini
            .clone()
            .map(|vendor| Arc::new(gemini::GeminiClient::new(vendor)) as Arc<dyn CompletionBackend>);

        Self::new(config.default_provider, openai, gemini)
    }

    pub fn current(&self) -> LlmProvider {
        *self.current.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Switch the active vendor. An unknown name leaves the current choice untouched.
    pub fn set(&self, name: &str) -> Result<LlmProvider> {
        let provider = name.parse::<LlmProvider>()?;
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        if *current != provider {
            tracing::info!(from = %*current, to = %provider, "Switching AI provider");
        }
        *current = provider;
        Ok(provider)
    }

    pub fn is_configured(&self, provider: LlmProvider) -> bool {
        self.backend(provider).is_some()
    }

    /// Which vendors have credentials, keyed by wire name.
    pub fn availability(&self) -> BTreeMap<&'static str, bool> {
        [LlmProvider::OpenAi, LlmProvider::Gemini]
            .into_iter()
            .map(|provider| (provider.as_str(), self.is_configured(provider)))
            .collect()
    }

    /// Runs against the vendor active when the call starts; a concurrent
    /// switch only affects later calls.
    pub async fn generate_completion(
        &self,
        messages: &[Message],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        let provider = self.current();
        let backend = self
            .backend(provider)
            .ok_or(AppError::ProviderNotConfigured(provider.display_name()))?;

        let started = Instant::now();
        let completion = backend.complete(messages, options).await?;
        tracing::debug!(
            provider = %provider,
            model = %completion.model,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Completion finished"
        );
        Ok(completion)
    }

    fn backend(&self, provider: LlmProvider) -> Option<&Arc<dyn CompletionBackend>> {
        match provider {
            LlmProvider::OpenAi => self.openai.as_ref(),
            LlmProvider::Gemini => self.gemini.as_ref(),
        }
    }
}
