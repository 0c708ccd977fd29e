use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use kbingest_core::{
    Persist,
    indexing::{DocumentRow, Node},
};
use tokio::sync::RwLock;

/// A simple in-memory storage, used for dry runs and in tests.
///
/// Nodes are kept in the order they were stored. Like a real document store it only accepts
/// nodes that make a complete [`DocumentRow`].
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    data: Arc<RwLock<Vec<Node>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Retrieve a node by the order it was stored in
    pub async fn get(&self, index: usize) -> Option<Node> {
        self.data.read().await.get(index).cloned()
    }

    /// Retrieve all nodes in the storage
    pub async fn get_all(&self) -> Vec<Node> {
        self.data.read().await.clone()
    }

    /// Retrieve all nodes as the rows that would have been inserted
    ///
    /// # Errors
    ///
    /// Cannot fail for stored nodes; they are validated when stored.
    pub async fn get_all_rows(&self) -> Result<Vec<DocumentRow>> {
        self.data
            .read()
            .await
            .iter()
            .map(DocumentRow::try_from)
            .collect()
    }

    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.data.read().await.is_empty()
    }
}

#[async_trait]
impl Persist for MemoryStorage {
    #[tracing::instrument(skip_all, name = "storage.memory.store")]
    async fn store(&self, node: Node) -> Result<Node> {
        let row = DocumentRow::try_from(&node)?;
        tracing::debug!(
            keywords = ?row.keywords,
            source_url = ?row.source_url,
            "Storing row in memory"
        );

        self.data.write().await.push(node.clone());

        Ok(node)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn embedded(chunk: &str) -> Node {
        Node::builder()
            .chunk(chunk)
            .vector(vec![1.0_f32])
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_memory_storage() {
        let storage = MemoryStorage::default();
        let node = storage.store(embedded("first")).await.unwrap();

        assert_eq!(storage.get(0).await, Some(node));
    }

    #[tokio::test]
    async fn test_keeps_insertion_order() {
        let storage = MemoryStorage::default();

        storage.store(embedded("first")).await.unwrap();
        storage.store(embedded("second")).await.unwrap();

        let chunks = storage
            .get_all_rows()
            .await
            .unwrap()
            .into_iter()
            .map(|row| row.content)
            .collect::<Vec<_>>();
        assert_eq!(chunks, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_rejects_nodes_without_embedding() {
        let storage = MemoryStorage::default();

        assert!(storage.store(Node::new("no vector")).await.is_err());
        assert!(storage.is_empty().await);
    }
}
