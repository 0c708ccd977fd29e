//! Inserts one row per node into the configured table.
use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use kbingest_core::{
    Persist,
    indexing::{DocumentRow, Node},
};
use secrecy::ExposeSecret as _;

use super::Supabase;

#[async_trait]
impl Persist for Supabase {
    /// Checks the project url can be used to build the endpoint.
    #[tracing::instrument(skip_all)]
    async fn setup(&self) -> Result<()> {
        reqwest::Url::parse(&self.endpoint())
            .with_context(|| format!("Invalid Supabase url '{}'", self.url))?;
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(table = %self.table))]
    async fn store(&self, node: Node) -> Result<Node> {
        let row = DocumentRow::try_from(&node)?;
        let key = self.key.expose_secret();

        let response = self
            .client
            .post(self.endpoint())
            .header("apikey", key)
            .bearer_auth(key)
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await
            .context("Failed to reach Supabase")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Supabase insert failed with status {status}: {body}");
        }

        tracing::info!("Uploaded to Supabase");
        Ok(node)
    }

    fn name(&self) -> &'static str {
        "Supabase"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kbingest_core::indexing::{KEYWORDS, PRIORITY_DATE, SOURCE_URL};
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn supabase(uri: &str) -> Supabase {
        Supabase::builder().url(uri).key("service-key").build().unwrap()
    }

    fn embedded_node() -> Node {
        Node::builder()
            .chunk("Deposits must be protected within 30 days.")
            .vector(vec![0.5_f32, -0.25])
            .with_metadata_value(SOURCE_URL, "http://x")
            .with_metadata_value(PRIORITY_DATE, "2023-01-05")
            .with_metadata_value(KEYWORDS, json!(["deposit", "protection"]))
            .build()
            .unwrap()
    }

    #[test_log::test(tokio::test)]
    async fn test_store_posts_row_with_auth_headers() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/documents"))
            .and(header("apikey", "service-key"))
            .and(header("authorization", "Bearer service-key"))
            .and(header("prefer", "return=minimal"))
            .and(body_json(json!({
                "content": "Deposits must be protected within 30 days.",
                "embedding": [0.5, -0.25],
                "priority_date": "2023-01-05",
                "source_url": "http://x",
                "keywords": ["deposit", "protection"]
            })))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&mock_server)
            .await;

        let supabase = supabase(&mock_server.uri());
        supabase.setup().await.unwrap();
        let node = supabase.store(embedded_node()).await.unwrap();

        assert_eq!(node.chunk, "Deposits must be protected within 30 days.");
    }

    #[test_log::test(tokio::test)]
    async fn test_rejected_insert_reports_status_and_body() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/rest/v1/documents"))
            .respond_with(ResponseTemplate::new(401).set_body_string("Invalid API key"))
            .expect(1)
            .mount(&mock_server)
            .await;

        let err = supabase(&mock_server.uri())
            .store(embedded_node())
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(message.contains("401"), "{message}");
        assert!(message.contains("Invalid API key"), "{message}");
    }

    #[test_log::test(tokio::test)]
    async fn test_node_without_embedding_is_not_sent() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&mock_server)
            .await;

        let result = supabase(&mock_server.uri())
            .store(Node::new("no vector"))
            .await;

        assert!(result.is_err());
    }

    #[test_log::test(tokio::test)]
    async fn test_setup_rejects_invalid_url() {
        let supabase = supabase("not a url");

        assert!(supabase.setup().await.is_err());
    }
}
