//! Generic client for OpenAI compatible APIs
//!
//! [`GenericOpenAI`] implements [`kbingest_core::SimplePrompt`] with chat completions and
//! [`kbingest_core::EmbeddingModel`] with embeddings, for any [`async_openai`] configuration.
//! The Gemini client is this client with a Gemini configuration.

use std::{sync::Arc, time::Duration};

use async_openai::error::OpenAIError;
use derive_builder::Builder;
use kbingest_core::errors::LanguageModelError;

mod embed;
mod simple_prompt;

pub use async_openai::config::OpenAIConfig;

/// Generic client for `OpenAI` compatible APIs.
///
/// The underlying client never retries requests by itself. Rate limits are reported as
/// [`LanguageModelError::RateLimited`] so callers decide whether to wait and retry.
///
/// # Example
///
/// ```no_run
/// # use kbingest_integrations::openai::{GenericOpenAI, OpenAIConfig};
/// let client: GenericOpenAI<OpenAIConfig> = GenericOpenAI::builder()
///     .default_embed_model("text-embedding-3-small")
///     .default_prompt_model("gpt-4o-mini")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Builder, Clone)]
#[builder(setter(into, strip_option))]
pub struct GenericOpenAI<C: async_openai::config::Config + Default = OpenAIConfig> {
    #[builder(
        default = "Arc::new(async_openai::Client::with_config(C::default()).with_backoff(single_attempt()))",
        setter(custom)
    )]
    client: Arc<async_openai::Client<C>>,

    /// Default models for embedding and prompting.
    #[builder(default)]
    pub(crate) default_options: Options,
}

/// Models used by a [`GenericOpenAI`] client.
#[derive(Debug, Clone, Default, Builder)]
#[builder(setter(into, strip_option))]
pub struct Options {
    #[builder(default)]
    pub embed_model: Option<String>,
    #[builder(default)]
    pub prompt_model: Option<String>,
}

impl Options {
    pub fn builder() -> OptionsBuilder {
        OptionsBuilder::default()
    }
}

impl<C: async_openai::config::Config + Default + Clone> GenericOpenAI<C> {
    pub fn builder() -> GenericOpenAIBuilder<C> {
        GenericOpenAIBuilder::default()
    }
}

impl<C: async_openai::config::Config + Default + Clone> GenericOpenAIBuilder<C> {
    /// Sets the `async_openai` client, for instance to use a custom configuration.
    ///
    /// Its retry policy is replaced so that requests are attempted once.
    pub fn client(&mut self, client: async_openai::Client<C>) -> &mut Self {
        self.client = Some(Arc::new(client.with_backoff(single_attempt())));
        self
    }

    /// Builds the `async_openai` client from a configuration.
    pub fn config(&mut self, config: C) -> &mut Self {
        self.client(async_openai::Client::with_config(config))
    }

    pub fn default_embed_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.default_options
            .get_or_insert_with(Options::default)
            .embed_model = Some(model.into());
        self
    }

    pub fn default_prompt_model(&mut self, model: impl Into<String>) -> &mut Self {
        self.default_options
            .get_or_insert_with(Options::default)
            .prompt_model = Some(model.into());
        self
    }
}

/// A backoff policy that gives up on the first failure.
fn single_attempt() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

const RATE_LIMIT_MARKERS: &[&str] = &["rate limit", "rate_limit", "resource has been exhausted"];

fn mentions_rate_limit(text: &str) -> bool {
    let text = text.to_lowercase();
    RATE_LIMIT_MARKERS.iter().any(|marker| text.contains(marker))
}

pub fn openai_error_to_language_model_error(e: OpenAIError) -> LanguageModelError {
    match e {
        OpenAIError::ApiError(api_error) => {
            let error_type = api_error.r#type.clone().unwrap_or_default();

            if api_error.code.as_deref() == Some("context_length_exceeded") {
                LanguageModelError::ContextLengthExceeded(OpenAIError::ApiError(api_error).into())
            } else if error_type == "insufficient_quota" {
                tracing::error!("OpenAI API quota exhausted: {:?}", api_error);
                LanguageModelError::PermanentError(OpenAIError::ApiError(api_error).into())
            } else if mentions_rate_limit(&error_type) || mentions_rate_limit(&api_error.message)
            {
                LanguageModelError::RateLimited(OpenAIError::ApiError(api_error).into())
            } else {
                tracing::error!("OpenAI API Error: {:?}", api_error);
                LanguageModelError::PermanentError(OpenAIError::ApiError(api_error).into())
            }
        }
        OpenAIError::Reqwest(e) => {
            if let Some(status) = e.status() {
                // A 429 is a rate limit unless it is about the quota, which waiting does not fix
                if status.as_u16() == 429 && !e.to_string().contains("quota") {
                    LanguageModelError::RateLimited(e.into())
                } else if status.is_server_error() {
                    tracing::warn!("OpenAI API Server Error: {:?}", e);
                    LanguageModelError::TransientError(e.into())
                } else {
                    tracing::error!("OpenAI API Client Error: {:?}", e);
                    LanguageModelError::PermanentError(e.into())
                }
            } else {
                tracing::error!("Unexpected OpenAI Reqwest Error: {:?}", e);
                LanguageModelError::TransientError(e.into())
            }
        }
        OpenAIError::JSONDeserialize(e) => {
            tracing::error!("OpenAI response could not be deserialized: {:?}", e);
            LanguageModelError::TransientError(e.into())
        }
        other => {
            tracing::error!("OpenAI Error: {:?}", other);
            LanguageModelError::PermanentError(other.into())
        }
    }
}
