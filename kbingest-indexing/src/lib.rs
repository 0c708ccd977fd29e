//! The ingestion pipeline and the stages it is assembled from
//!
//! A [`Pipeline`] starts from a [`loaders::FileLoader`], runs the file through
//! [`transformers::MetadataHeader`] and [`transformers::ChunkText`], tags and embeds every
//! chunk with [`transformers::MetadataKeywords`] and [`transformers::Embed`], and hands the
//! result to a storage.
pub mod loaders;
pub mod persist;
pub mod transformers;

mod pipeline;
pub use pipeline::{Pipeline, RunStats};
