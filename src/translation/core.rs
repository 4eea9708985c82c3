/*!
 * Core translation client implementation.
 *
 * This module contains the `TranslationClient`, which performs one model call
 * per text unit and turns whatever the endpoint answered into a normalized
 * `UnitResult`, plus the token usage statistics shared with the batch layer.
 */

use anyhow::Result;
use log::{debug, error, warn};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::errors::ProviderError;
use crate::providers::openai::{looks_like_html, OpenAI};
use crate::providers::{ChatRequest, Provider, RawResponse};
use crate::subtitle_processor::Cue;
use super::prompts::PromptPolicy;

/// What a call does to a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Original text into the target language
    Translate,
    /// Touch-up of the existing translation
    Fix,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Translate => f.write_str("translate"),
            Mode::Fix => f.write_str("fix"),
        }
    }
}

impl FromStr for Mode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "translate" => Ok(Mode::Translate),
            "fix" => Ok(Mode::Fix),
            _ => Err(anyhow::anyhow!("Invalid mode: {}", s)),
        }
    }
}

/// Token usage statistics for tracking API consumption
#[derive(Debug, Clone)]
pub struct TokenUsageStats {
    /// Number of prompt tokens
    pub prompt_tokens: u64,

    /// Number of completion tokens
    pub completion_tokens: u64,

    /// Total number of tokens
    pub total_tokens: u64,

    /// Start time of token tracking
    pub start_time: Instant,

    /// Model name
    pub model: String,
}

impl Default for TokenUsageStats {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenUsageStats {
    /// Create a new empty token usage stats instance
    pub fn new() -> Self {
        Self::with_model(String::new())
    }

    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            prompt_tokens: 0,
            completion_tokens: 0,
            total_tokens: 0,
            start_time: Instant::now(),
            model: model.into(),
        }
    }

    /// Add token usage numbers
    pub fn add(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens += prompt_tokens;
        self.completion_tokens += completion_tokens;
        self.total_tokens += prompt_tokens + completion_tokens;
    }

    /// Calculate tokens per minute rate
    pub fn tokens_per_minute(&self) -> f64 {
        let minutes = self.start_time.elapsed().as_secs_f64() / 60.0;
        if minutes > 0.0 {
            self.total_tokens as f64 / minutes
        } else {
            0.0
        }
    }

    /// Generate a summary of token usage
    pub fn summary(&self) -> String {
        format!(
            "Token usage ({}): prompt {} | completion {} | total {} | {:.1} tokens/min",
            if self.model.is_empty() { "unknown model" } else { &self.model },
            self.prompt_tokens,
            self.completion_tokens,
            self.total_tokens,
            self.tokens_per_minute()
        )
    }
}

/// Outcome of one successful call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitResult {
    /// Trimmed model output
    pub text: String,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// How the text must be stored; `Translate` for a literal fallback in fix mode
    pub applied_mode: Mode,
}

/// Connection and language settings of a client
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub api_key: String,
    /// Base URL override, `None` for the public endpoint
    pub base_url: Option<String>,
    pub model: String,
    pub target_lang: String,
    /// Deadline for a single call
    pub timeout: Duration,
}

impl ClientSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_key: config.api_key.trim().to_string(),
            base_url: config.effective_base_url(),
            model: config.model.clone(),
            target_lang: config.target_lang.clone(),
            timeout: Duration::from_secs(config.timeout_secs.max(1)),
        }
    }
}

/// Turn any of the accepted response shapes into `(text, prompt_tokens, completion_tokens)`
pub fn normalize_response(response: RawResponse) -> Result<(String, u64, u64), ProviderError> {
    match response {
        RawResponse::Structured(completion) => {
            let choice = completion
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))?;
            let content = choice.message.content.unwrap_or_default();
            let usage = completion.usage.unwrap_or_default();
            Ok((content.trim().to_string(), usage.prompt_tokens, usage.completion_tokens))
        }
        RawResponse::Mapping(value) => {
            let choice = value
                .get("choices")
                .and_then(Value::as_array)
                .and_then(|choices| choices.first())
                .ok_or_else(|| ProviderError::ParseError("response contained no choices".to_string()))?;

            let content = match choice.get("message") {
                Some(Value::Object(message)) => message.get("content").and_then(Value::as_str).unwrap_or(""),
                Some(Value::String(message)) => message.as_str(),
                _ => "",
            };

            let usage = value.get("usage");
            let count = |key: &str| usage.and_then(|u| u.get(key)).and_then(Value::as_u64).unwrap_or(0);

            Ok((content.trim().to_string(), count("prompt_tokens"), count("completion_tokens")))
        }
        RawResponse::Text(text) => {
            let text = text.trim();
            if looks_like_html(text) {
                return Err(ProviderError::MisconfiguredEndpoint);
            }
            Ok((text.to_string(), 0, 0))
        }
    }
}

/// Performs single-unit calls against the model service
#[derive(Debug, Clone)]
pub struct TranslationClient {
    provider: Arc<dyn Provider>,
    settings: ClientSettings,
    policy: PromptPolicy,
}

impl TranslationClient {
    /// Client for the OpenAI-compatible endpoint described by `config`
    pub fn from_config(config: &Config) -> Self {
        let settings = ClientSettings::from_config(config);
        let provider = OpenAI::new(
            settings.api_key.clone(),
            settings.base_url.clone().unwrap_or_default(),
            settings.timeout,
        );
        Self::with_provider(Arc::new(provider), settings, PromptPolicy::from_config(config))
    }

    /// Client over any provider
    pub fn with_provider(provider: Arc<dyn Provider>, settings: ClientSettings, policy: PromptPolicy) -> Self {
        Self {
            provider,
            settings,
            policy,
        }
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    pub fn policy(&self) -> &PromptPolicy {
        &self.policy
    }

    /// Translate or fix one text unit
    ///
    /// In fix mode a text containing a refusal marker is translated literally
    /// instead, and the result reports `applied_mode == Mode::Translate`.
    pub async fn translate_unit(&self, source_text: &str, mode: Mode) -> Result<UnitResult, ProviderError> {
        match mode {
            Mode::Fix if self.policy.is_refusal(source_text) => self.literal_translate(source_text).await,
            Mode::Fix => self.call(self.policy.fix_prompt().to_string(), source_text, Mode::Fix).await,
            Mode::Translate => {
                let prompt = self.policy.translate_prompt(&self.settings.target_lang);
                self.call(prompt, source_text, Mode::Translate).await
            }
        }
    }

    /// Translate or fix one cue, choosing its source text for the mode
    ///
    /// The literal fallback re-translates the cue's original text, since the
    /// refused translation carries nothing worth keeping.
    pub async fn translate_cue(&self, cue: &Cue, mode: Mode) -> Result<UnitResult, ProviderError> {
        let source = cue.source_text(mode);
        if mode == Mode::Fix && self.policy.is_refusal(source) {
            debug!("Cue {} carries a refusal marker, re-translating literally", cue.index);
            return self.literal_translate(&cue.original).await;
        }
        self.translate_unit(source, mode).await
    }

    async fn literal_translate(&self, text: &str) -> Result<UnitResult, ProviderError> {
        let prompt = self.policy.literal_translate_prompt(&self.settings.target_lang);
        self.call(prompt, text, Mode::Translate).await
    }

    async fn call(&self, system_prompt: String, text: &str, applied_mode: Mode) -> Result<UnitResult, ProviderError> {
        let request = ChatRequest::new(self.settings.model.clone())
            .add_message("system", system_prompt)
            .add_message("user", text);

        let start_time = Instant::now();
        let response = match tokio::time::timeout(self.settings.timeout, self.provider.complete(request)).await {
            Ok(result) => result?,
            Err(_) => {
                warn!("Call timed out after {:?}", self.settings.timeout);
                return Err(ProviderError::Timeout { secs: self.settings.timeout.as_secs() });
            }
        };

        let (text, prompt_tokens, completion_tokens) = normalize_response(response).inspect_err(|e| {
            error!("Failed to interpret API response: {}", e);
        })?;
        debug!(
            "Call finished in {:?} ({} prompt / {} completion tokens)",
            start_time.elapsed(),
            prompt_tokens,
            completion_tokens
        );

        Ok(UnitResult {
            text,
            prompt_tokens,
            completion_tokens,
            applied_mode,
        })
    }

    /// Issue a tiny translate call to check endpoint, key and model
    pub async fn test_connection(&self) -> Result<String, ProviderError> {
        let result = self.translate_unit("Hello.", Mode::Translate).await;
        self.close().await;
        result.map(|r| r.text)
    }

    /// Release the provider's pooled connection
    pub async fn close(&self) {
        self.provider.close().await;
    }
}
