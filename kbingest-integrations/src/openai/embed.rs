use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;
use kbingest_core::{EmbeddingModel, Embeddings, errors::LanguageModelError};

use super::{GenericOpenAI, openai_error_to_language_model_error};

#[async_trait]
impl<C: async_openai::config::Config + Default + Sync + Send + std::fmt::Debug> EmbeddingModel
    for GenericOpenAI<C>
{
    /// Embeds the input in a single request, returning the vectors in input order.
    #[tracing::instrument(skip_all, err)]
    async fn embed(&self, input: Vec<String>) -> Result<Embeddings, LanguageModelError> {
        let model = self
            .default_options
            .embed_model
            .as_ref()
            .ok_or(LanguageModelError::PermanentError("Model not set".into()))?;

        let request = CreateEmbeddingRequestArgs::default()
            .model(model)
            .input(&input)
            .build()
            .map_err(LanguageModelError::permanent)?;

        tracing::debug!(
            num_chunks = input.len(),
            model = &model,
            "[Embed] Request to openai"
        );
        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(openai_error_to_language_model_error)?;

        tracing::debug!(
            num_embeddings = response.data.len(),
            "[Embed] Response openai"
        );

        let mut data = response.data;
        data.sort_by_key(|embedding| embedding.index);

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::OpenAIConfig;
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, Request, Respond, ResponseTemplate,
        matchers::{method, path},
    };

    fn client(uri: &str) -> GenericOpenAI<OpenAIConfig> {
        GenericOpenAI::builder()
            .config(OpenAIConfig::new().with_api_base(uri))
            .default_embed_model("text-embedding-004")
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_embed_returns_error_when_model_missing() {
        let openai: GenericOpenAI<OpenAIConfig> = GenericOpenAI::builder().build().unwrap();
        let err = openai.embed(vec!["text".into()]).await.unwrap_err();
        assert!(matches!(err, LanguageModelError::PermanentError(_)));
    }

    #[test_log::test(tokio::test)]
    async fn test_embed_success_in_input_order() {
        let mock_server = MockServer::start().await;

        struct ValidateEmbeddingRequest;

        impl Respond for ValidateEmbeddingRequest {
            fn respond(&self, request: &Request) -> ResponseTemplate {
                let body: serde_json::Value = serde_json::from_slice(&request.body).unwrap();
                assert_eq!(body["model"], "text-embedding-004");
                assert_eq!(body["input"], json!(["Hello", "World"]));
                ResponseTemplate::new(200).set_body_json(json!({
                    "data": [
                        {"embedding": [0.3, 0.4], "index": 1, "object": "embedding"},
                        {"embedding": [0.1, 0.2], "index": 0, "object": "embedding"}
                    ],
                    "model": "text-embedding-004",
                    "object": "list",
                    "usage": {"prompt_tokens": 4, "total_tokens": 4}
                }))
            }
        }

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ValidateEmbeddingRequest)
            .expect(1)
            .mount(&mock_server)
            .await;

        let embeddings = client(&mock_server.uri())
            .embed(vec!["Hello".into(), "World".into()])
            .await
            .unwrap();

        assert_eq!(embeddings, vec![vec![0.1_f32, 0.2], vec![0.3_f32, 0.4]]);
    }

    #[test_log::test(tokio::test)]
    async fn test_server_errors_are_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/embeddings"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let result = client(&mock_server.uri())
            .embed(vec!["Hello".into()])
            .await;

        assert!(result.is_err());
    }
}
