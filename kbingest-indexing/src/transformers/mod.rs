//! Transformers for every step between loading a file and storing its chunks
//!
//! [`MetadataHeader`] strips the file header, [`ChunkText`] splits the body, [`MetadataKeywords`]
//! tags each chunk with a prompt (customizable, see [`kbingest_core::template::Template`]) and
//! [`Embed`] attaches the vector.
pub mod chunk_text;
pub mod embed;
pub mod metadata_header;
pub mod metadata_keywords;

pub use chunk_text::ChunkText;
pub use embed::Embed;
pub use metadata_header::{HeaderMetadata, MetadataHeader};
pub use metadata_keywords::MetadataKeywords;
