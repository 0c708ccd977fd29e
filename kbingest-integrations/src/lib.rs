//! Clients for the services the ingestion pipeline talks to
//!
//! - [`gemini::Gemini`] generates keywords ([`kbingest_core::SimplePrompt`]) and embeddings
//!   ([`kbingest_core::EmbeddingModel`]) through the OpenAI compatible Gemini API
//! - [`supabase::Supabase`] inserts document rows ([`kbingest_core::Persist`])
pub mod gemini;
pub mod openai;
pub mod supabase;
