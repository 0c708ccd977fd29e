//! Settings and credentials of an ingestion run
//!
//! [`Settings`] come from command line flags with environment fallbacks. [`Credentials`] are
//! taken from the environment (a `.env` file is loaded by the binary beforehand) and only the
//! missing ones are asked for on the terminal.
use std::{
    io::{BufRead as _, Write as _},
    path::PathBuf,
    time::Duration,
};

use anyhow::{Context as _, Result};
use clap::Parser;
use kbingest_indexing::transformers::{chunk_text, metadata_keywords};
use kbingest_integrations::{gemini, supabase};
use secrecy::SecretString;

#[derive(Debug, Clone, Parser)]
#[command(name = "kbingest", version, about)]
pub struct Settings {
    /// Folder holding the `.txt` files to ingest
    #[arg(long, env = "KBINGEST_SOURCE_DIR", default_value = "knowledge_source")]
    pub source_dir: PathBuf,

    /// Model generating the keywords of each chunk
    #[arg(long, env = "KBINGEST_PROMPT_MODEL", default_value = gemini::DEFAULT_PROMPT_MODEL)]
    pub prompt_model: String,

    /// Model embedding each chunk
    #[arg(long, env = "KBINGEST_EMBED_MODEL", default_value = gemini::DEFAULT_EMBED_MODEL)]
    pub embed_model: String,

    /// Table rows are inserted into
    #[arg(long, env = "KBINGEST_TABLE", default_value = supabase::DEFAULT_TABLE)]
    pub table: String,

    /// Maximum characters per chunk
    #[arg(long, env = "KBINGEST_CHUNK_SIZE", default_value_t = chunk_text::DEFAULT_CHUNK_SIZE)]
    pub chunk_size: usize,

    /// Characters shared by consecutive chunks
    #[arg(long, env = "KBINGEST_CHUNK_OVERLAP", default_value_t = chunk_text::DEFAULT_CHUNK_OVERLAP)]
    pub chunk_overlap: usize,

    /// Seconds to wait before asking again for keywords after a rate limit
    #[arg(
        long,
        env = "KBINGEST_RATE_LIMIT_WAIT",
        default_value_t = metadata_keywords::DEFAULT_RATE_LIMIT_WAIT.as_secs()
    )]
    pub rate_limit_wait: u64,

    /// Gives up on the keywords of a chunk after this many rate limits; retries forever if unset
    #[arg(long, env = "KBINGEST_MAX_RATE_LIMIT_RETRIES")]
    pub max_rate_limit_retries: Option<usize>,

    /// Fail instead of prompting for missing credentials
    #[arg(long, env = "KBINGEST_NON_INTERACTIVE")]
    pub non_interactive: bool,
}

impl Settings {
    pub fn rate_limit_wait(&self) -> Duration {
        Duration::from_secs(self.rate_limit_wait)
    }
}

/// A secret needed before any work starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Secret {
    SupabaseUrl,
    SupabaseKey,
    GeminiApiKey,
}

impl Secret {
    /// Environment variables checked in order.
    pub fn env_vars(self) -> &'static [&'static str] {
        match self {
            Secret::SupabaseUrl => &["SUPABASE_URL"],
            Secret::SupabaseKey => &["SUPABASE_KEY"],
            Secret::GeminiApiKey => &["GEMINI_API_KEY", "GOOGLE_API_KEY"],
        }
    }

    fn prompt(self) -> &'static str {
        match self {
            Secret::SupabaseUrl => "Enter your Supabase URL: ",
            Secret::SupabaseKey => "Enter your Supabase Anon Key: ",
            Secret::GeminiApiKey => "Enter your Google AI API Key: ",
        }
    }

    /// Keys are read without echo, the url is not secret.
    fn is_hidden(self) -> bool {
        !matches!(self, Secret::SupabaseUrl)
    }
}

#[derive(Debug, Clone)]
pub struct Credentials {
    pub supabase_url: String,
    pub supabase_key: SecretString,
    pub gemini_api_key: SecretString,
}

impl Credentials {
    /// Collects the credentials from the environment, prompting on the terminal for missing
    /// ones when `interactive`.
    ///
    /// Returns `None` if any credential is still missing.
    ///
    /// # Errors
    ///
    /// Errors if reading from the terminal fails.
    pub fn acquire(interactive: bool) -> Result<Option<Self>> {
        let mut terminal = Terminal::default();

        Self::resolve(env_value, |secret| {
            if interactive {
                terminal.ask(secret).map(Some)
            } else {
                Ok(None)
            }
        })
    }

    /// Looks every secret up with `lookup` and asks for the missing ones with `ask`.
    ///
    /// Values are trimmed; empty values count as missing.
    ///
    /// # Errors
    ///
    /// Errors if `ask` fails.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        mut ask: impl FnMut(Secret) -> Result<Option<String>>,
    ) -> Result<Option<Self>> {
        let mut value_of = |secret: Secret| -> Result<Option<String>> {
            let value = match secret.env_vars().iter().find_map(|var| lookup(var)) {
                Some(value) => Some(value),
                None => ask(secret)?,
            };
            Ok(value
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()))
        };

        let supabase_url = value_of(Secret::SupabaseUrl)?;
        let supabase_key = value_of(Secret::SupabaseKey)?;
        let gemini_api_key = value_of(Secret::GeminiApiKey)?;

        let (Some(supabase_url), Some(supabase_key), Some(gemini_api_key)) =
            (supabase_url, supabase_key, gemini_api_key)
        else {
            return Ok(None);
        };

        Ok(Some(Credentials {
            supabase_url,
            supabase_key: supabase_key.into(),
            gemini_api_key: gemini_api_key.into(),
        }))
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|value| !value.trim().is_empty())
}

/// Prompts on the terminal, greeting once before the first question.
#[derive(Debug, Default)]
struct Terminal {
    greeted: bool,
}

impl Terminal {
    fn ask(&mut self, secret: Secret) -> Result<String> {
        if !self.greeted {
            println!("--- Please enter your credentials ---");
            self.greeted = true;
        }

        if secret.is_hidden() {
            return rpassword::prompt_password(secret.prompt())
                .with_context(|| format!("Failed to read {secret:?}"));
        }

        print!("{}", secret.prompt());
        std::io::stdout().flush()?;

        let mut line = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut line)
            .with_context(|| format!("Failed to read {secret:?}"))?;
        Ok(line)
    }
}
