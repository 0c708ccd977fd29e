use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures_util::{StreamExt, TryStreamExt, stream};
use kbingest_core::{
    ChunkerTransformer, Loader, Persist, Transformer,
    indexing::{IndexingStream, Node},
    util::display_file_name,
};
use tracing::Instrument;

enum Stage {
    Transform(Arc<dyn Transformer>),
    Chunk(Arc<dyn ChunkerTransformer>),
}

impl Stage {
    fn apply(&self, stream: IndexingStream) -> IndexingStream {
        match self {
            Stage::Transform(transformer) => {
                let transformer = Arc::clone(transformer);
                stream
                    .and_then(move |node| {
                        let transformer = Arc::clone(&transformer);
                        async move {
                            tracing::debug!(
                                transformer = transformer.name(),
                                "Transforming node"
                            );
                            transformer.transform_node(node).await
                        }
                    })
                    .boxed()
                    .into()
            }
            Stage::Chunk(chunker) => {
                let chunker = Arc::clone(chunker);
                stream
                    .and_then(move |node| {
                        let chunker = Arc::clone(&chunker);
                        async move {
                            tracing::debug!(chunker = chunker.name(), "Chunking node");
                            let chunks: Vec<Node> =
                                chunker.transform_node(node).await.try_collect().await?;

                            let total = chunks.len();
                            let chunks = chunks.into_iter().enumerate().map(move |(i, chunk)| {
                                tracing::info!("Processing chunk {}/{}", i + 1, total);
                                Ok::<_, anyhow::Error>(chunk)
                            });

                            Ok::<_, anyhow::Error>(stream::iter(chunks))
                        }
                    })
                    .try_flatten()
                    .boxed()
                    .into()
            }
        }
    }
}

/// Counters of a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Files the loader produced, including the ones that failed
    pub files: usize,
    pub failed_files: usize,
    pub stored_nodes: usize,
}

/// A pipeline for ingesting files: adding metadata, chunking, tagging, embedding and then storing
/// them.
///
/// Processing is strictly sequential and depth-first. Files are handled one at a time and each
/// chunk passes through every later stage, storage included, before the next chunk is produced.
///
/// Failures are scoped to a file. The first error while processing a file is logged with the
/// file name, the remaining chunks of that file are never attempted and the pipeline moves on to
/// the next file. Chunks stored before the error stay stored.
///
/// # Example
///
/// ```no_run
/// # use kbingest_indexing::{Pipeline, loaders::FileLoader, persist::MemoryStorage, transformers::*};
/// # async fn run() -> anyhow::Result<()> {
/// Pipeline::from_loader(FileLoader::new("knowledge_source").with_extensions(&["txt"]))
///     .then(MetadataHeader::new())
///     .then_chunk(ChunkText::default())
///     .then_store_with(MemoryStorage::default())
///     .run()
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct Pipeline {
    stream: IndexingStream,
    stages: Vec<Stage>,
    storage: Option<Arc<dyn Persist>>,
}

impl Default for Pipeline {
    /// Creates a `Pipeline` with an empty stream and no storage
    fn default() -> Self {
        Self {
            stream: IndexingStream::empty(),
            stages: Vec::new(),
            storage: None,
        }
    }
}

impl Pipeline {
    /// Creates a `Pipeline` from a loader; every node it emits is processed as a file.
    pub fn from_loader(loader: impl Loader + 'static) -> Self {
        Self {
            stream: loader.into_stream(),
            ..Default::default()
        }
    }

    /// Creates a `Pipeline` from a given stream of file nodes.
    pub fn from_stream(stream: impl Into<IndexingStream>) -> Self {
        Self {
            stream: stream.into(),
            ..Default::default()
        }
    }

    /// Adds a transformer to the pipeline.
    ///
    /// Closures can also be provided as transformers.
    #[must_use]
    pub fn then(mut self, transformer: impl Transformer + 'static) -> Self {
        self.stages.push(Stage::Transform(Arc::new(transformer)));
        self
    }

    /// Adds a chunker to the pipeline; the stages after it run once per chunk.
    #[must_use]
    pub fn then_chunk(mut self, chunker: impl ChunkerTransformer + 'static) -> Self {
        self.stages.push(Stage::Chunk(Arc::new(chunker)));
        self
    }

    /// Persists nodes using the provided storage backend, after all other stages.
    ///
    /// Setting a storage again replaces the previous one.
    #[must_use]
    pub fn then_store_with(mut self, storage: impl Persist + 'static) -> Self {
        self.storage = Some(Arc::new(storage));
        self
    }

    /// Runs the pipeline until all files are processed.
    ///
    /// # Errors
    ///
    /// Errors if no storage is configured or the storage fails to set up. Failures while
    /// processing a file are logged and counted in the returned [`RunStats`] instead.
    pub async fn run(self) -> Result<RunStats> {
        let Pipeline {
            mut stream,
            stages,
            storage,
        } = self;

        let storage = storage.context("No storage configured for ingestion pipeline")?;
        storage.setup().await.context("Failed to set up storage")?;

        tracing::info!(storage = storage.name(), "Starting ingestion pipeline");
        let now = std::time::Instant::now();
        let mut stats = RunStats::default();

        while let Some(file) = stream.next().await {
            stats.files += 1;

            let file = match file {
                Ok(file) => file,
                Err(err) => {
                    stats.failed_files += 1;
                    tracing::error!("Failed to load file: {err:#}");
                    continue;
                }
            };

            let name = display_file_name(&file.path);
            let span = tracing::info_span!("file", file = %name);
            let outcome = process_file(&stages, &storage, &name, file)
                .instrument(span)
                .await;

            stats.stored_nodes += outcome.stored;
            if let Some(err) = outcome.error {
                stats.failed_files += 1;
                tracing::error!("Failed to process file {name}: {err:#}");
            }
        }

        let elapsed_in_seconds = now.elapsed().as_secs();
        tracing::info!(
            elapsed_in_seconds,
            files = stats.files,
            failed_files = stats.failed_files,
            stored_nodes = stats.stored_nodes,
            "Processed {} files and stored {} nodes in {} seconds",
            stats.files,
            stats.stored_nodes,
            elapsed_in_seconds
        );

        Ok(stats)
    }
}

struct FileOutcome {
    stored: usize,
    error: Option<anyhow::Error>,
}

/// Runs one file through all stages and the storage, stopping at the first error.
async fn process_file(
    stages: &[Stage],
    storage: &Arc<dyn Persist>,
    name: &str,
    file: Node,
) -> FileOutcome {
    tracing::info!("Processing file: {name}");

    let mut nodes = IndexingStream::from_nodes(vec![file]);
    for stage in stages {
        nodes = stage.apply(nodes);
    }

    let storage = Arc::clone(storage);
    let mut stored_nodes = nodes
        .and_then(move |node| {
            let storage = Arc::clone(&storage);
            async move {
                tracing::debug!(storage = storage.name(), "Storing node");
                storage.store(node).await
            }
        })
        .boxed();

    let mut outcome = FileOutcome {
        stored: 0,
        error: None,
    };
    while let Some(result) = stored_nodes.next().await {
        match result {
            Ok(_) => outcome.stored += 1,
            Err(err) => {
                outcome.error = Some(err);
                break;
            }
        }
    }

    outcome
}
