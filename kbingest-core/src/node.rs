//! This module defines the `Node` struct and its associated methods.
//!
//! `Node` is the unit of data flowing through the ingestion pipeline. A loader emits one node
//! per source file holding the whole file; the header transformer strips the header and records
//! its fields as metadata; the chunker then turns it into one node per chunk, which is tagged,
//! embedded and finally uploaded as a single document row.
use std::{fmt::Debug, path::PathBuf};

use derive_builder::Builder;
use serde::{Deserialize, Serialize};

use crate::{Embedding, metadata::Metadata, util::debug_long_utf8};

/// Represents a unit of data in the ingestion process.
#[derive(Default, Clone, Serialize, Deserialize, PartialEq, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "anyhow::Error"))]
pub struct Node {
    /// File path the node was loaded from.
    #[builder(default)]
    pub path: PathBuf,
    /// Text contained in the node; the whole file, the body, or a single chunk.
    pub chunk: String,
    /// Embedding of the chunk, once computed.
    #[builder(default)]
    pub vector: Option<Embedding>,
    /// Metadata associated with the node.
    #[builder(default)]
    pub metadata: Metadata,
    /// Size of the input this node was originally derived from in bytes
    #[builder(default)]
    pub original_size: usize,
    /// Offset of the chunk relative to the start of the body it was split from, in bytes
    #[builder(default)]
    pub offset: usize,
}

impl NodeBuilder {
    pub fn maybe_vector(&mut self, vector: Option<Embedding>) -> &mut Self {
        self.vector = Some(vector);
        self
    }

    /// Inserts a single metadata value, keeping values set earlier on the builder.
    pub fn with_metadata_value(
        &mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> &mut Self {
        self.metadata
            .get_or_insert_with(Metadata::default)
            .insert(key, value);
        self
    }
}

impl Debug for Node {
    /// The chunk is truncated and the vector is displayed as its dimension.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("path", &self.path)
            .field("chunk", &debug_long_utf8(&self.chunk, 100))
            .field("metadata", &self.metadata)
            .field("vector", &self.vector.as_ref().map(Vec::len))
            .field("offset", &self.offset)
            .finish()
    }
}

impl Node {
    /// Builds a new instance of `Node`, returning a `NodeBuilder`. Copies
    /// over the fields from the provided `Node`.
    pub fn build_from_other(node: &Node) -> NodeBuilder {
        NodeBuilder::default()
            .path(node.path.clone())
            .chunk(node.chunk.clone())
            .metadata(node.metadata.clone())
            .maybe_vector(node.vector.clone())
            .original_size(node.original_size)
            .offset(node.offset)
            .to_owned()
    }

    /// Creates a new instance of `NodeBuilder.`
    pub fn builder() -> NodeBuilder {
        NodeBuilder::default()
    }

    /// Creates a new instance of `Node` with the specified data chunk.
    ///
    /// The other fields are set to their default values.
    pub fn new(chunk: impl Into<String>) -> Node {
        let chunk = chunk.into();
        let original_size = chunk.len();
        Node {
            chunk,
            original_size,
            ..Default::default()
        }
    }

    pub fn with_metadata(&mut self, metadata: impl Into<Metadata>) -> &mut Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_vector(&mut self, vector: impl Into<Embedding>) -> &mut Self {
        self.vector = Some(vector.into());
        self
    }

    /// Retrieve the identifier of the node.
    ///
    /// Calculated from the path, offset and chunk, returning a UUID (v3). Only used to correlate
    /// log lines; rows are inserted without an idempotency key.
    ///
    /// WARN: Does not memoize the id. Use sparingly.
    pub fn id(&self) -> uuid::Uuid {
        let bytes = [
            self.path.to_string_lossy().as_bytes(),
            &self.offset.to_le_bytes(),
            self.chunk.as_bytes(),
        ]
        .concat();

        uuid::Uuid::new_v3(&uuid::Uuid::NAMESPACE_OID, &bytes)
    }
}

impl<T: Into<String>> From<T> for Node {
    fn from(value: T) -> Self {
        Node::new(value)
    }
}
