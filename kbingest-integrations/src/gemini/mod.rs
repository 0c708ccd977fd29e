//! Gemini through its `OpenAI` compatible endpoint.
//!
//! The same client tags chunks with keywords and embeds them.

use crate::openai;

pub use self::config::GeminiConfig;

mod config;

/// Model used to generate keywords.
pub const DEFAULT_PROMPT_MODEL: &str = "gemini-2.5-flash";
/// Model used to embed chunks.
pub const DEFAULT_EMBED_MODEL: &str = "text-embedding-004";

/// A Gemini client implementing [`kbingest_core::SimplePrompt`] and
/// [`kbingest_core::EmbeddingModel`].
///
/// By default the api key is read from `GEMINI_API_KEY` or `GOOGLE_API_KEY`. Models always
/// need to be set, either through the builder or with [`Gemini::with_default_models`].
///
/// Under the hood it uses [`async_openai`] with the Gemini `OpenAI` mapping.
pub type Gemini = openai::GenericOpenAI<GeminiConfig>;
pub type GeminiBuilder = openai::GenericOpenAIBuilder<GeminiConfig>;
pub type GeminiBuilderError = openai::GenericOpenAIBuilderError;
pub use openai::{Options, OptionsBuilder, OptionsBuilderError};

impl GeminiBuilder {
    /// Uses [`DEFAULT_PROMPT_MODEL`] and [`DEFAULT_EMBED_MODEL`].
    pub fn with_default_models(&mut self) -> &mut Self {
        self.default_prompt_model(DEFAULT_PROMPT_MODEL)
            .default_embed_model(DEFAULT_EMBED_MODEL)
    }

    /// Authenticates with the given api key against the default Gemini endpoint.
    pub fn api_key(&mut self, api_key: impl Into<String>) -> &mut Self {
        self.config(GeminiConfig::default().with_api_key(api_key))
    }
}
