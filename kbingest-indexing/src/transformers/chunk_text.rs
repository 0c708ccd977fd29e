//! Chunk text content into smaller, overlapping pieces
use anyhow::{Context as _, Result};
use async_trait::async_trait;
use derive_builder::Builder;
use kbingest_core::{
    ChunkerTransformer,
    indexing::{IndexingStream, Node},
};
use text_splitter::{Characters, ChunkConfig, TextSplitter};

pub const DEFAULT_CHUNK_SIZE: usize = 1000;
pub const DEFAULT_CHUNK_OVERLAP: usize = 100;

#[derive(Debug, Clone, Copy, Builder)]
#[builder(build_fn(error = "anyhow::Error", validate = "Self::validate"))]
/// Splits a node into chunks of at most `chunk_size` characters, each overlapping the previous
/// one by up to `overlap` characters.
///
/// Splitting uses [`text_splitter`] and prefers the largest semantic boundary that fits:
/// paragraphs, then sentences, words, graphemes and characters. Whitespace is kept, so the chunks
/// put back together at their offsets reproduce the input exactly.
pub struct ChunkText {
    #[builder(default = "DEFAULT_CHUNK_SIZE")]
    chunk_size: usize,
    #[builder(default = "DEFAULT_CHUNK_OVERLAP")]
    overlap: usize,
}

impl Default for ChunkText {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
        }
    }
}

impl ChunkTextBuilder {
    fn validate(&self) -> Result<()> {
        let chunk_size = self.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE);
        let overlap = self.overlap.unwrap_or(DEFAULT_CHUNK_OVERLAP);

        anyhow::ensure!(chunk_size > 0, "Chunk size must be greater than zero");
        anyhow::ensure!(
            overlap < chunk_size,
            "Overlap ({overlap}) must be smaller than the chunk size ({chunk_size})"
        );
        Ok(())
    }
}

impl ChunkText {
    pub fn builder() -> ChunkTextBuilder {
        ChunkTextBuilder::default()
    }

    /// Splits text into chunks paired with their byte offset in the text.
    ///
    /// Empty text yields no chunks; text no longer than the chunk size yields itself.
    ///
    /// # Errors
    ///
    /// Errors if the overlap is not smaller than the chunk size.
    pub fn split<'text>(&self, text: &'text str) -> Result<Vec<(usize, &'text str)>> {
        let config = ChunkConfig::<Characters>::new(self.chunk_size)
            .with_overlap(self.overlap)
            .context("Invalid chunk configuration")?
            .with_trim(false);

        Ok(TextSplitter::new(config).chunk_indices(text).collect())
    }
}

#[async_trait]
impl ChunkerTransformer for ChunkText {
    #[tracing::instrument(skip_all, name = "transformers.chunk_text")]
    async fn transform_node(&self, node: Node) -> IndexingStream {
        let chunks = match self.split(&node.chunk) {
            Ok(chunks) => chunks,
            Err(err) => return err.into(),
        };

        tracing::info!("Split content into {} chunks", chunks.len());

        let nodes = chunks
            .into_iter()
            .map(|(offset, chunk)| {
                Node::build_from_other(&node)
                    .chunk(chunk)
                    .offset(offset)
                    .build()
            })
            .collect::<Vec<_>>();

        IndexingStream::iter(nodes)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use futures_util::stream::TryStreamExt;
    use kbingest_core::indexing::SOURCE_URL;
    use pretty_assertions::assert_eq;

    const TEXT: &str = "A landlord must return the deposit within 14 days.\n\n\
        Deductions are only allowed for damage beyond normal wear and tear.\n\n\
        Tenants can dispute deductions with the deposit protection scheme.";

    /// Puts chunks back together by dropping the part each chunk shares with the text covered so
    /// far.
    fn reassemble(chunks: &[(usize, &str)]) -> String {
        let mut text = String::new();
        for (offset, chunk) in chunks {
            assert!(*offset <= text.len(), "gap before offset {offset}");
            let end = offset + chunk.len();
            if end > text.len() {
                text.push_str(&chunk[text.len() - offset..]);
            }
        }
        text
    }

    #[test]
    fn test_short_text_is_a_single_chunk() {
        let chunks = ChunkText::default().split(TEXT).unwrap();

        assert_eq!(chunks, vec![(0, TEXT)]);
    }

    #[test]
    fn test_empty_text_has_no_chunks() {
        assert!(ChunkText::default().split("").unwrap().is_empty());
    }

    #[test]
    fn test_chunks_respect_size_and_reassemble_losslessly() {
        let body = TEXT.repeat(40);
        let chunker = ChunkText::default();

        let chunks = chunker.split(&body).unwrap();

        assert!(chunks.len() > 1);
        assert!(
            chunks
                .iter()
                .all(|(_, chunk)| chunk.chars().count() <= DEFAULT_CHUNK_SIZE)
        );
        for (offset, chunk) in &chunks {
            assert_eq!(&body[*offset..offset + chunk.len()], *chunk);
        }
        assert_eq!(reassemble(&chunks), body);
    }

    #[test]
    fn test_small_chunks_reassemble_losslessly() {
        let chunker = ChunkText::builder()
            .chunk_size(40)
            .overlap(10)
            .build()
            .unwrap();

        let chunks = chunker.split(TEXT).unwrap();

        assert!(chunks.len() > 3);
        assert_eq!(reassemble(&chunks), TEXT);
    }

    #[test]
    fn test_unbroken_text_overlaps() {
        let body = "a".repeat(2500);

        let chunks = ChunkText::default().split(&body).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].1.len(), 1000);
        assert!(chunks[1].0 < 1000, "second chunk should overlap the first");
        assert_eq!(reassemble(&chunks), body);
    }

    #[test]
    fn test_overlap_must_be_smaller_than_chunk_size() {
        assert!(
            ChunkText::builder()
                .chunk_size(100)
                .overlap(100)
                .build()
                .is_err()
        );
        assert!(ChunkText::builder().chunk_size(0).build().is_err());
    }

    #[tokio::test]
    async fn test_chunks_inherit_metadata_and_record_offsets() {
        let body = TEXT.repeat(40);
        let mut node = Node::new(body.clone());
        node.with_metadata([(SOURCE_URL, "http://x")]);

        let nodes: Vec<Node> = ChunkText::default()
            .transform_node(node)
            .await
            .try_collect()
            .await
            .unwrap();

        assert!(nodes.len() > 1);
        assert_eq!(nodes[0].offset, 0);
        for node in &nodes {
            assert_eq!(node.metadata.get_str(SOURCE_URL), Some("http://x"));
            assert_eq!(node.original_size, body.len());
            assert_eq!(&body[node.offset..node.offset + node.chunk.len()], node.chunk);
        }
    }
}
