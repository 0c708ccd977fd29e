//! # kbingest
//!
//! Builds a retrieval knowledge base from a folder of plain-text files. Every `.txt` file is
//! stripped of its metadata header, split into overlapping chunks, tagged with keywords and
//! embedded by Gemini, and inserted chunk by chunk into a Supabase `documents` table.
//!
//! Files are expected to start with a short header:
//!
//! ```text
//! Source URL: https://example.org/tenancy-deposits
//! Date modified: 2023-01-05
//! ---
//! Body text...
//! ```
//!
//! ## Example
//!
//! ```no_run
//! # use kbingest::indexing::{Pipeline, loaders::FileLoader, transformers::*};
//! # use kbingest::integrations::{gemini::Gemini, supabase::Supabase};
//! # async fn run() -> anyhow::Result<()> {
//! let gemini = Gemini::builder().with_default_models().build()?;
//!
//! Pipeline::from_loader(FileLoader::new("knowledge_source").with_extensions(&["txt"]))
//!     .then(MetadataHeader::new())
//!     .then_chunk(ChunkText::default())
//!     .then(MetadataKeywords::from_client(gemini.clone()))
//!     .then(Embed::new(gemini))
//!     .then_store_with(
//!         Supabase::builder()
//!             .url("https://project.supabase.co")
//!             .key("service-role-key")
//!             .build()?,
//!     )
//!     .run()
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod ingest;

#[doc(inline)]
pub use kbingest_core::prompt;
#[doc(inline)]
pub use kbingest_core::type_aliases::*;

/// Common traits implemented by the pipeline stages
pub mod traits {
    #[doc(inline)]
    pub use kbingest_core::indexing_traits::*;
}

/// Gemini and Supabase clients.
pub mod integrations {
    #[doc(inline)]
    pub use kbingest_integrations::*;
}

/// The ingestion pipeline, its loader, transformers and storages.
pub mod indexing {
    #[doc(inline)]
    pub use kbingest_core::indexing::*;
    #[doc(inline)]
    pub use kbingest_indexing::*;
}
