//! The persisted unit of the pipeline
//!
//! A [`DocumentRow`] is created once per chunk and inserted as-is into the document store.
use anyhow::{Context as _, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{Embedding, node::Node};

/// Metadata key holding the source url found in the file header
pub const SOURCE_URL: &str = "source_url";
/// Metadata key holding the priority date as an ISO date string
pub const PRIORITY_DATE: &str = "priority_date";
/// Metadata key holding the generated keywords as an array of strings
pub const KEYWORDS: &str = "keywords";

/// A row in the `documents` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRow {
    pub content: String,
    pub embedding: Embedding,
    /// Serialized as `YYYY-MM-DD` or null
    pub priority_date: Option<NaiveDate>,
    pub source_url: Option<String>,
    pub keywords: Vec<String>,
}

impl TryFrom<&Node> for DocumentRow {
    type Error = anyhow::Error;

    /// Assembles the row from an embedded chunk.
    ///
    /// # Errors
    ///
    /// Errors if the node has no embedding or carries a priority date that is not an ISO date.
    fn try_from(node: &Node) -> Result<Self> {
        let embedding = node
            .vector
            .clone()
            .with_context(|| format!("Node {} has no embedding", node.id()))?;

        let priority_date = node
            .metadata
            .get_str(PRIORITY_DATE)
            .map(|date| {
                NaiveDate::parse_from_str(date, "%Y-%m-%d")
                    .with_context(|| format!("Invalid priority date '{date}'"))
            })
            .transpose()?;

        Ok(DocumentRow {
            content: node.chunk.clone(),
            embedding,
            priority_date,
            source_url: node.metadata.get_str(SOURCE_URL).map(ToString::to_string),
            keywords: node.metadata.get_str_list(KEYWORDS),
        })
    }
}

impl TryFrom<Node> for DocumentRow {
    type Error = anyhow::Error;

    fn try_from(node: Node) -> Result<Self> {
        DocumentRow::try_from(&node)
    }
}
