//! Types and traits shared by the ingestion pipeline and its integrations
mod document;
pub mod errors;
mod indexing_stream;
pub mod indexing_traits;
mod metadata;
mod node;
pub mod type_aliases;

pub mod prompt;
pub mod template;
pub use type_aliases::*;

/// All traits are available from the root
pub use crate::indexing_traits::*;

pub mod indexing {
    pub use crate::document::*;
    pub use crate::indexing_stream::IndexingStream;
    pub use crate::indexing_traits::*;
    pub use crate::metadata::*;
    pub use crate::node::*;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;

pub mod util;
