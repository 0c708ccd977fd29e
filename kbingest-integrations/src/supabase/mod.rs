//! Stores embedded chunks in a Supabase table through its REST interface.
//!
//! Every node becomes one [`DocumentRow`](kbingest_core::indexing::DocumentRow) inserted with a
//! single `POST /rest/v1/{table}` request, authenticated with the project's api key.
//!
//! # Example
//! ```rust
//! # use kbingest_integrations::supabase::Supabase;
//! # fn example() -> anyhow::Result<()> {
//! let supabase = Supabase::builder()
//!     .url("https://project.supabase.co")
//!     .key("service-role-key")
//!     .build()?;
//! # Ok(())
//! # }
//! ```
use std::fmt;

use derive_builder::Builder;
use secrecy::SecretString;

mod persist;

/// Table rows are inserted into by default.
pub const DEFAULT_TABLE: &str = "documents";

#[derive(Builder, Clone)]
#[builder(setter(into), build_fn(error = "anyhow::Error"))]
pub struct Supabase {
    /// Project url, for instance `https://project.supabase.co`.
    url: String,

    /// Api key sent as both `apikey` and bearer token.
    #[builder(setter(custom))]
    key: SecretString,

    #[builder(default = "DEFAULT_TABLE.to_string()")]
    table: String,

    #[builder(default = "reqwest::Client::new()")]
    client: reqwest::Client,
}

impl fmt::Debug for Supabase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supabase")
            .field("url", &self.url)
            .field("table", &self.table)
            .finish_non_exhaustive()
    }
}

impl SupabaseBuilder {
    pub fn key(&mut self, key: impl Into<String>) -> &mut Self {
        self.key = Some(SecretString::from(key.into()));
        self
    }
}

impl Supabase {
    pub fn builder() -> SupabaseBuilder {
        SupabaseBuilder::default()
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// The REST endpoint rows are posted to.
    pub fn endpoint(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.url.trim_end_matches('/'),
            self.table
        )
    }
}
