//! Sets up the clients and runs the ingestion of a knowledge folder.
use anyhow::Result;
use kbingest_indexing::{
    Pipeline, RunStats,
    loaders::FileLoader,
    transformers::{ChunkText, Embed, MetadataHeader, MetadataKeywords},
};
use kbingest_integrations::{gemini::Gemini, supabase::Supabase};
use secrecy::ExposeSecret as _;

use crate::config::{Credentials, Settings};

/// Extension of the files picked up in the knowledge folder.
pub const SOURCE_EXTENSION: &str = "txt";

/// Clients created once and shared by every stage.
#[derive(Debug, Clone)]
pub struct Clients {
    /// Generates keywords and embeddings
    pub gemini: Gemini,
    pub supabase: Supabase,
}

impl Clients {
    /// Creates the Gemini and Supabase clients.
    ///
    /// # Errors
    ///
    /// Errors if a client cannot be built from the settings and credentials.
    pub fn init(settings: &Settings, credentials: &Credentials) -> Result<Self> {
        let gemini = Gemini::builder()
            .api_key(credentials.gemini_api_key.expose_secret())
            .default_prompt_model(&settings.prompt_model)
            .default_embed_model(&settings.embed_model)
            .build()?;

        let supabase = Supabase::builder()
            .url(&credentials.supabase_url)
            .key(credentials.supabase_key.expose_secret())
            .table(&settings.table)
            .build()?;

        tracing::info!("Successfully connected to Supabase and Google AI");
        Ok(Clients { gemini, supabase })
    }
}

/// Assembles the pipeline for every `.txt` file of `loader`.
///
/// # Errors
///
/// Errors if the chunking or keyword settings are invalid.
pub fn pipeline(settings: &Settings, clients: Clients, loader: FileLoader) -> Result<Pipeline> {
    let chunker = ChunkText::builder()
        .chunk_size(settings.chunk_size)
        .overlap(settings.chunk_overlap)
        .build()?;

    let mut keywords = MetadataKeywords::builder();
    keywords
        .client(clients.gemini.clone())
        .rate_limit_wait(settings.rate_limit_wait());
    if let Some(max_retries) = settings.max_rate_limit_retries {
        keywords.max_rate_limit_retries(max_retries);
    }

    Ok(Pipeline::from_loader(loader)
        .then(MetadataHeader::new())
        .then_chunk(chunker)
        .then(keywords.build()?)
        .then(Embed::new(clients.gemini))
        .then_store_with(clients.supabase))
}

/// Ingests the knowledge folder.
///
/// Returns `None` without doing any work when the folder is missing or holds no `.txt` files.
///
/// # Errors
///
/// Errors if the pipeline cannot be assembled or the storage fails to set up. Failures while
/// processing a single file are logged and counted in the returned [`RunStats`].
#[tracing::instrument(skip_all, fields(source_dir = %settings.source_dir.display()))]
pub async fn ingest(settings: &Settings, clients: Clients) -> Result<Option<RunStats>> {
    let source_dir = &settings.source_dir;

    if !source_dir.is_dir() {
        tracing::error!(
            "The '{}' folder was not found. Please create it and add your .txt files.",
            source_dir.display()
        );
        return Ok(None);
    }

    let loader = FileLoader::new(source_dir).with_extensions(&[SOURCE_EXTENSION]);
    let files = loader.list_files();
    if files.is_empty() {
        tracing::warn!(
            "No .txt files found in the '{}' folder. Exiting.",
            source_dir.display()
        );
        return Ok(None);
    }
    tracing::info!("Found {} files to ingest", files.len());

    let stats = pipeline(settings, clients, loader)?.run().await?;

    tracing::info!("Ingestion complete!");
    tracing::info!("Your knowledge base has been successfully built in Supabase.");
    Ok(Some(stats))
}
