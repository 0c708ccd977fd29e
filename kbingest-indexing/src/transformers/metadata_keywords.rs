//! Tag a chunk with keywords generated by a language model
//!
//! The model is asked for a short list literal such as `['rent', 'deposit']`. Replies are free
//! form, so the first bracketed list in the reply is parsed and everything around it ignored.
//! Tagging never fails a chunk: any problem leaves the chunk with an empty keyword list.
use std::{sync::Arc, time::Duration};

use anyhow::{Context as _, Result, bail};
use async_trait::async_trait;
use derive_builder::Builder;
use indoc::indoc;
use kbingest_core::{
    SimplePrompt, Transformer,
    indexing::{KEYWORDS, Node},
    prompt::Prompt,
    template::Template,
};
use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_MAX_KEYWORDS: usize = 5;
pub const DEFAULT_RATE_LIMIT_WAIT: Duration = Duration::from_secs(5);

lazy_static! {
    static ref LIST_LITERAL: Regex = Regex::new(r"\[.*?\]").unwrap();
}

/// The prompt asking for keywords, rendered with the node as context
pub fn default_prompt() -> Template {
    indoc! {r#"
        From the following text, extract a list of the 3-5 most important keywords or topics.
        Return ONLY a Python list of strings, like `['keyword1', 'keyword2']`.

        Text: "{{ node.chunk }}"
    "#}
    .into()
}

/// Generates keywords for a chunk and stores them under the `keywords` metadata key.
///
/// When the model reports a rate limit, the identical prompt is sent again after
/// `rate_limit_wait`, for as long as `max_rate_limit_retries` allows (forever if unset).
#[derive(Debug, Clone, Builder)]
#[builder(setter(into, strip_option), build_fn(error = "anyhow::Error"))]
pub struct MetadataKeywords {
    #[builder(setter(custom))]
    client: Arc<dyn SimplePrompt>,
    #[builder(default = "default_prompt()")]
    prompt_template: Template,
    /// Replies with more keywords are truncated
    #[builder(default = "DEFAULT_MAX_KEYWORDS")]
    max_keywords: usize,
    #[builder(default = "DEFAULT_RATE_LIMIT_WAIT")]
    rate_limit_wait: Duration,
    #[builder(default)]
    max_rate_limit_retries: Option<usize>,
}

impl MetadataKeywordsBuilder {
    pub fn client(&mut self, client: impl SimplePrompt + 'static) -> &mut Self {
        self.client = Some(Arc::new(client));
        self
    }
}

impl MetadataKeywords {
    pub fn builder() -> MetadataKeywordsBuilder {
        MetadataKeywordsBuilder::default()
    }

    pub fn from_client(client: impl SimplePrompt + 'static) -> Self {
        MetadataKeywords {
            client: Arc::new(client),
            prompt_template: default_prompt(),
            max_keywords: DEFAULT_MAX_KEYWORDS,
            rate_limit_wait: DEFAULT_RATE_LIMIT_WAIT,
            max_rate_limit_retries: None,
        }
    }

    /// Prompts for and parses the keywords of a node, or returns an empty list on failure.
    pub async fn generate_keywords(&self, node: &Node) -> Vec<String> {
        let prompt = self.prompt_template.to_prompt().with_node(node);

        let Some(reply) = self.prompt_with_rate_limit_retries(prompt).await else {
            return Vec::new();
        };

        match parse_keywords(&reply) {
            Ok(mut keywords) => {
                keywords.truncate(self.max_keywords);
                keywords
            }
            Err(err) => {
                tracing::warn!(reply = %reply, "Could not parse keywords: {err:#}");
                Vec::new()
            }
        }
    }

    async fn prompt_with_rate_limit_retries(&self, prompt: Prompt) -> Option<String> {
        let mut retries = 0;

        loop {
            match self.client.prompt(prompt.clone()).await {
                Ok(reply) => return Some(reply),
                Err(err)
                    if err.is_rate_limit()
                        && self
                            .max_rate_limit_retries
                            .is_none_or(|max| retries < max) =>
                {
                    retries += 1;
                    tracing::warn!(
                        retries,
                        "Rate limit hit, pausing for {} seconds",
                        self.rate_limit_wait.as_secs_f32()
                    );
                    tokio::time::sleep(self.rate_limit_wait).await;
                }
                Err(err) => {
                    tracing::warn!("Could not generate keywords: {err}");
                    return None;
                }
            }
        }
    }
}

/// Extracts the first list literal from a reply and parses it as a list of strings.
///
/// # Errors
///
/// Errors if the reply holds no bracketed list on a single line, or if the list is not a list of
/// quoted strings.
pub fn parse_keywords(reply: &str) -> Result<Vec<String>> {
    let literal = LIST_LITERAL
        .find(reply)
        .context("Reply does not contain a list")?;

    parse_string_list(literal.as_str())
        .with_context(|| format!("Malformed list literal {}", literal.as_str()))
}

/// Parses a list literal of single or double quoted strings, such as `['a', "b",]`.
fn parse_string_list(literal: &str) -> Result<Vec<String>> {
    let inner = literal
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
        .context("Not a list")?;

    let mut chars = inner.chars().peekable();
    let mut items = Vec::new();

    loop {
        skip_whitespace(&mut chars);
        let Some(&next) = chars.peek() else {
            break;
        };

        match next {
            '\'' | '"' => {
                chars.next();
                items.push(parse_quoted(&mut chars, next)?);
            }
            other => bail!("Unexpected element starting with {other:?}, expected a string"),
        }

        skip_whitespace(&mut chars);
        match chars.next() {
            None => break,
            Some(',') => {}
            Some(other) => bail!("Expected a comma, found {other:?}"),
        }
    }

    Ok(items)
}

fn skip_whitespace(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}
}

fn parse_quoted(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, quote: char) -> Result<String> {
    let mut value = String::new();

    while let Some(c) = chars.next() {
        match c {
            c if c == quote => return Ok(value),
            '\\' => match chars.next() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some(escaped @ ('\\' | '\'' | '"')) => value.push(escaped),
                // Unknown escapes are kept as written
                Some(other) => {
                    value.push('\\');
                    value.push(other);
                }
                None => break,
            },
            c => value.push(c),
        }
    }

    bail!("Unterminated string")
}

#[async_trait]
impl Transformer for MetadataKeywords {
    #[tracing::instrument(skip_all, name = "transformers.metadata_keywords")]
    async fn transform_node(&self, mut node: Node) -> Result<Node> {
        let keywords = self.generate_keywords(&node).await;
        tracing::info!("Generated keywords: {keywords:?}");

        node.metadata.insert(KEYWORDS, keywords);

        Ok(node)
    }
}
