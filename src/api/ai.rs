use axum::extract::State;
use axum::response::IntoResponse;

use crate::AppState;
use crate::api::extract::{require_text, JsonBody};
use crate::api::models::{
    LeadRequest, LeadResponse, NarrativeRequest, NarrativeResponse, ProviderChanged, ProviderStatus,
    SetProviderRequest,
};
use crate::api::response;
use crate::error::{AppError, Result};
use crate::llm::{Completion, CompletionOptions, Message};
use crate::prompts::{self, DEFAULT_LEAD_STYLE, DEFAULT_NARRATIVE_OPTION};

pub async fn get_provider(State(state): State<AppState>) -> impl IntoResponse {
    response::success(ProviderStatus {
        provider: state.providers.current(),
        available: state.providers.availability(),
    })
}

pub async fn set_provider(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<SetProviderRequest>,
) -> Result<impl IntoResponse> {
    let name = req.provider.ok_or(AppError::MissingField("provider"))?;
    let provider = state.providers.set(&name)?;
    let configured = state.providers.is_configured(provider);
    if !configured {
        tracing::warn!(provider = %provider, "Selected AI provider has no credentials");
    }

    Ok(response::success(ProviderChanged {
        provider,
        configured,
        message: format!("AI provider set to {}", provider.display_name()),
    }))
}

pub async fn generate_lead(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<LeadRequest>,
) -> Result<impl IntoResponse> {
    let article_text = require_text("articleText", req.article_text.as_deref())?;
    let style = non_blank(req.style).unwrap_or_else(|| DEFAULT_LEAD_STYLE.to_string());

    let messages = prompts::lead_messages(article_text, &style);
    let options = CompletionOptions {
        max_tokens: 300,
        temperature: 0.7,
        ..Default::default()
    };
    let (lead, completion) = complete(&state, &messages, &options).await?;

    Ok(response::success(LeadResponse {
        lead,
        provider: completion.provider,
        model: completion.model,
        style,
    }))
}

pub async fn generate_narrative(
    State(state): State<AppState>,
    JsonBody(req): JsonBody<NarrativeRequest>,
) -> Result<impl IntoResponse> {
    let final_story = require_text("finalStory", req.final_story.as_deref())?;
    let narrative_option = non_blank(req.narrative_option).unwrap_or_else(|| DEFAULT_NARRATIVE_OPTION.to_string());

    let messages = prompts::narrative_messages(final_story, &narrative_option);
    let options = CompletionOptions {
        max_tokens: 2000,
        temperature: 0.8,
        ..Default::default()
    };
    let (story, completion) = complete(&state, &messages, &options).await?;

    Ok(response::success(NarrativeResponse {
        story,
        provider: completion.provider,
        model: completion.model,
        narrative_option,
    }))
}

/// Run the completion and clean the reply; an empty reply is a provider failure.
async fn complete(state: &AppState, messages: &[Message], options: &CompletionOptions) -> Result<(String, Completion)> {
    let completion = state.providers.generate_completion(messages, options).await?;
    let text = prompts::clean_reply(&completion.content);
    if text.is_empty() {
        return Err(AppError::provider(
            completion.provider.display_name(),
            None,
            "Empty response from LLM",
        ));
    }
    Ok((text, completion))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
