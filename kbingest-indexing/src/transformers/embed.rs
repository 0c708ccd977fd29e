//! Embed a chunk with an embedding model
use std::sync::Arc;

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use kbingest_core::{EmbeddingModel, Transformer, indexing::Node};

/// Embeds the text of a node, one request per node.
///
/// Failures are not retried; they fail the node (and with it the rest of the file).
#[derive(Clone)]
pub struct Embed {
    model: Arc<dyn EmbeddingModel>,
}

impl std::fmt::Debug for Embed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embed")
            .field("model", &self.model.name())
            .finish()
    }
}

impl Embed {
    pub fn new(model: impl EmbeddingModel + 'static) -> Self {
        Self {
            model: Arc::new(model),
        }
    }
}

#[async_trait]
impl Transformer for Embed {
    #[tracing::instrument(skip_all, name = "transformers.embed")]
    async fn transform_node(&self, mut node: Node) -> Result<Node> {
        let embeddings = self
            .model
            .embed(vec![node.chunk.clone()])
            .await
            .context("Failed to embed chunk")?;

        let vector = embeddings
            .into_iter()
            .next()
            .filter(|vector| !vector.is_empty())
            .context("Embedding model returned no vector")?;

        tracing::info!(dimensions = vector.len(), "Generated embedding");
        node.vector = Some(vector);

        Ok(node)
    }
}

#[cfg(test)]
mod tests {
    use kbingest_core::{MockEmbeddingModel, errors::LanguageModelError};
    use mockall::predicate::eq;

    use super::*;

    #[tokio::test]
    async fn test_embeds_the_chunk() {
        let mut model = MockEmbeddingModel::new();
        model
            .expect_embed()
            .with(eq(vec!["Deposits must be protected.".to_string()]))
            .times(1)
            .returning(|_| Ok(vec![vec![0.1_f32, 0.2, 0.3]]));

        let node = Embed::new(model)
            .transform_node(Node::new("Deposits must be protected."))
            .await
            .unwrap();

        assert_eq!(node.vector, Some(vec![0.1_f32, 0.2, 0.3]));
    }

    #[tokio::test]
    async fn test_model_errors_fail_the_node() {
        let mut model = MockEmbeddingModel::new();
        model
            .expect_embed()
            .times(1)
            .returning(|_| Err(LanguageModelError::permanent("quota exhausted")));

        let err = Embed::new(model)
            .transform_node(Node::new("text"))
            .await
            .unwrap_err();

        assert!(format!("{err:#}").contains("quota exhausted"));
    }

    #[tokio::test]
    async fn test_empty_response_is_an_error() {
        let mut model = MockEmbeddingModel::new();
        model.expect_embed().returning(|_| Ok(vec![]));

        let err = Embed::new(model)
            .transform_node(Node::new("text"))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Embedding model returned no vector");
    }
}
