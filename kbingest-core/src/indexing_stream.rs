//! The stream of nodes flowing between pipeline stages.
//!
//! Loaders produce an [`IndexingStream`] of whole files and chunkers one of chunks. Errors travel
//! through the stream as `Err` items so a stage can fail a single file without ending the run.

use crate::node::Node;
use anyhow::Result;
use futures_util::stream::{self, Stream};
use std::pin::Pin;

pub use futures_util::StreamExt;

type BoxedNodeStream = Pin<Box<dyn Stream<Item = Result<Node>> + Send>>;

/// An asynchronous stream of `Result<Node>` items.
///
/// Vectors of nodes or results, boxed streams and errors all convert into an `IndexingStream`.
#[pin_project::pin_project]
pub struct IndexingStream {
    #[pin]
    pub(crate) inner: BoxedNodeStream,
}

impl Stream for IndexingStream {
    type Item = Result<Node>;

    fn poll_next(
        self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.project().inner.poll_next(cx)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl From<Vec<Result<Node>>> for IndexingStream {
    fn from(results: Vec<Result<Node>>) -> Self {
        IndexingStream::iter(results)
    }
}

impl From<Vec<Node>> for IndexingStream {
    fn from(nodes: Vec<Node>) -> Self {
        IndexingStream::from_nodes(nodes)
    }
}

impl From<BoxedNodeStream> for IndexingStream {
    fn from(inner: BoxedNodeStream) -> Self {
        IndexingStream { inner }
    }
}

/// A stream holding only the error, failing whatever node it was produced for.
impl From<anyhow::Error> for IndexingStream {
    fn from(err: anyhow::Error) -> Self {
        IndexingStream::iter(vec![Err(err)])
    }
}

impl IndexingStream {
    pub fn empty() -> Self {
        IndexingStream {
            inner: stream::empty().boxed(),
        }
    }

    /// Creates an `IndexingStream` from an iterator of `Result<Node>`.
    pub fn iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = Result<Node>> + Send + 'static,
        <I as IntoIterator>::IntoIter: Send,
    {
        IndexingStream {
            inner: stream::iter(iter).boxed(),
        }
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        IndexingStream::iter(nodes.into_iter().map(Ok))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt as _;

    #[tokio::test]
    async fn test_error_stream_yields_single_error() {
        let stream: IndexingStream = anyhow::anyhow!("unreadable").into();

        let items: Vec<Result<Node>> = stream.collect().await;

        assert_eq!(items.len(), 1);
        assert!(items[0].is_err());
    }

    #[tokio::test]
    async fn test_nodes_keep_their_order() {
        let stream: IndexingStream = vec![Node::new("one"), Node::new("two")].into();

        let chunks: Vec<String> = stream
            .map_ok(|node| node.chunk)
            .try_collect()
            .await
            .unwrap();

        assert_eq!(chunks, vec!["one", "two"]);
    }
}
