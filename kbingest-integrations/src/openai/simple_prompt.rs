//! Implements [`SimplePrompt`] for [`GenericOpenAI`] with a single user message chat completion.
use async_openai::types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs};
use async_trait::async_trait;
use kbingest_core::{
    SimplePrompt, errors::LanguageModelError, prompt::Prompt, util::debug_long_utf8,
};

use super::{GenericOpenAI, openai_error_to_language_model_error};

#[async_trait]
impl<C: async_openai::config::Config + Default + Sync + Send + std::fmt::Debug + 'static>
    SimplePrompt for GenericOpenAI<C>
{
    /// Sends the rendered prompt and returns the content of the first choice.
    ///
    /// # Errors
    ///
    /// - No prompt model is configured
    /// - The request fails, see [`openai_error_to_language_model_error`]
    /// - The response has no content
    #[tracing::instrument(skip_all, err)]
    async fn prompt(&self, prompt: Prompt) -> Result<String, LanguageModelError> {
        let model = self
            .default_options
            .prompt_model
            .as_ref()
            .ok_or_else(|| LanguageModelError::PermanentError("Model not set".into()))?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(model)
            .messages(vec![
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt.render()?)
                    .build()
                    .map_err(LanguageModelError::permanent)?
                    .into(),
            ])
            .build()
            .map_err(LanguageModelError::permanent)?;

        tracing::trace!(
            model = &model,
            messages = debug_long_utf8(
                serde_json::to_string_pretty(&request.messages.last())
                    .map_err(LanguageModelError::permanent)?,
                100
            ),
            "[SimplePrompt] Request to openai"
        );

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(openai_error_to_language_model_error)?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                LanguageModelError::PermanentError("Expected content in response".into())
            })
    }
}
