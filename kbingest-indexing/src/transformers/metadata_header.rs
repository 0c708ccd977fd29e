//! Extract the source url and priority date from the header of a knowledge file
//!
//! A header is a handful of `Key: value` lines at the top of the file, closed by a line
//! containing `---`:
//!
//! ```text
//! Source URL: https://example.org/tenancy/deposits
//! Date modified: 2023-01-05
//! ---
//! Body starts here...
//! ```
//!
//! The scan reads at most [`MAX_HEADER_LINES`] lines. A file without a separator has its first
//! ten lines treated as header.
use std::{borrow::Cow, path::Path};

use anyhow::{Context as _, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use kbingest_core::{
    Transformer,
    indexing::{Node, PRIORITY_DATE, SOURCE_URL},
};
use lazy_static::lazy_static;
use regex::Regex;

/// Number of lines scanned for header fields, not counting a separator on the line after.
pub const MAX_HEADER_LINES: usize = 10;

const SEPARATOR: &str = "---";
const SOURCE_URL_KEYS: &[&str] = &["source url:"];
const MODIFIED_KEYS: &[&str] = &["date modified:", "last modified:"];
const SCRAPED_KEYS: &[&str] = &["date scraped:", "scrape date:"];

/// Fields found in a file header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderMetadata {
    pub source_url: Option<String>,
    pub modified_date: Option<NaiveDate>,
    pub scraped_date: Option<NaiveDate>,
    /// Number of lines that belong to the header, including the separator
    pub header_end_line: usize,
}

impl HeaderMetadata {
    /// Scans the header of a file's content.
    pub fn parse(content: &str) -> Self {
        let mut header = HeaderMetadata::default();

        for (i, line) in content.split_inclusive('\n').enumerate() {
            if i >= MAX_HEADER_LINES && !line.contains(SEPARATOR) {
                break;
            }
            header.header_end_line = i + 1;

            if let Some(value) = field_value(line, SOURCE_URL_KEYS) {
                header.source_url = Some(value.to_string());
            }

            if let Some(value) = field_value(line, MODIFIED_KEYS) {
                if let Some(date) = parse_date(value) {
                    header.modified_date = Some(date);
                }
            } else if let Some(value) = field_value(line, SCRAPED_KEYS) {
                if let Some(date) = parse_date(value) {
                    header.scraped_date = Some(date);
                }
            }

            if line.contains(SEPARATOR) {
                break;
            }
        }

        header
    }

    /// Reads a file and scans its header.
    ///
    /// # Errors
    ///
    /// Errors if the file cannot be read as UTF-8.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs_err::read_to_string(path.as_ref()).context("Failed to read file")?;
        Ok(Self::parse(&content))
    }

    /// The modified date if present, else the scraped date.
    pub fn priority_date(&self) -> Option<NaiveDate> {
        self.modified_date.or(self.scraped_date)
    }

    /// Everything after the header, with the original line endings.
    pub fn body<'content>(&self, content: &'content str) -> &'content str {
        let offset = content
            .split_inclusive('\n')
            .take(self.header_end_line)
            .map(str::len)
            .sum::<usize>();

        &content[offset..]
    }
}

/// Returns the trimmed text after the first colon if the line starts with one of the keys,
/// ignoring case.
fn field_value<'line>(line: &'line str, keys: &[&str]) -> Option<&'line str> {
    let starts_with_key = keys.iter().any(|key| {
        line.get(..key.len())
            .is_some_and(|prefix| prefix.eq_ignore_ascii_case(key))
    });
    if !starts_with_key {
        return None;
    }

    line.split_once(':').map(|(_, value)| value.trim())
}

/// Tried in order; month first wins over day first for ambiguous numeric dates.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d", "%Y/%m/%d", "%Y.%m.%d", "%m/%d/%Y", "%d/%m/%Y", "%d.%m.%Y", "%B %d, %Y",
    "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%B %d %Y", "%b %d %Y", "%d-%b-%Y", "%d-%B-%Y",
];

lazy_static! {
    static ref ORDINAL_SUFFIX: Regex = Regex::new(r"(?i)\b(\d{1,2})(?:st|nd|rd|th)\b").unwrap();
    static ref ABBREVIATION_DOT: Regex = Regex::new(r"\b([A-Za-z]{3,4})\.").unwrap();
}

const WEEKDAYS: &[&str] = &[
    "monday",
    "tuesday",
    "wednesday",
    "thursday",
    "friday",
    "saturday",
    "sunday",
    "mon",
    "tue",
    "tues",
    "wed",
    "thu",
    "thur",
    "thurs",
    "fri",
    "sat",
    "sun",
];

/// Parses the date formats found in scraped headers, returning the calendar date.
///
/// Accepts RFC 3339 and RFC 2822 timestamps, ISO style dates (optionally followed by a time after
/// a `T` or a space), numeric US and European dates and written out month names, optionally
/// preceded by a weekday. Ordinal days and abbreviations ending in a dot are accepted. Numeric
/// dates are read month first unless the first number cannot be a month.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(datetime) = DateTime::parse_from_rfc3339(value) {
        return Some(datetime.date_naive());
    }
    if let Ok(datetime) = DateTime::parse_from_rfc2822(value) {
        return Some(datetime.date_naive());
    }

    let normalized = normalize(value);
    if let Some(date) = parse_with_formats(strip_weekday(&normalized)) {
        return Some(date);
    }

    let value = strip_weekday(value);

    // ISO date with a time suffix
    let (date, time) = value.split_at_checked(10)?;
    if time.starts_with(['T', ' ']) {
        return ["%Y-%m-%d", "%Y/%m/%d"]
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(date, format).ok());
    }

    None
}

fn parse_with_formats(value: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Drops ordinal suffixes (`5th`) and abbreviation dots (`Jan.`, `Thu.`).
fn normalize(value: &str) -> Cow<'_, str> {
    match ORDINAL_SUFFIX.replace_all(value, "$1") {
        Cow::Borrowed(value) => ABBREVIATION_DOT.replace_all(value, "$1"),
        Cow::Owned(value) => Cow::Owned(ABBREVIATION_DOT.replace_all(&value, "$1").into_owned()),
    }
}

fn strip_weekday(value: &str) -> &str {
    let Some((first, rest)) = value.split_once(|c: char| c == ',' || c.is_whitespace()) else {
        return value;
    };

    if WEEKDAYS.contains(&first.to_lowercase().as_str()) {
        rest.trim_start_matches(|c: char| c == ',' || c.is_whitespace())
    } else {
        value
    }
}

/// Strips the header of a file node and records its fields as metadata.
///
/// Writes `source_url` and `priority_date` (as `YYYY-MM-DD`) when found and replaces the node
/// text with the body.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataHeader;

impl MetadataHeader {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Transformer for MetadataHeader {
    #[tracing::instrument(skip_all, name = "transformers.metadata_header")]
    async fn transform_node(&self, mut node: Node) -> Result<Node> {
        let header = HeaderMetadata::parse(&node.chunk);
        let priority_date = header.priority_date();

        tracing::info!(
            header_lines = header.header_end_line,
            "Found metadata: url={}, date={}",
            header.source_url.is_some(),
            priority_date.map_or_else(|| "none".to_string(), |date| date.to_string())
        );

        node.chunk = header.body(&node.chunk).to_string();

        if let Some(source_url) = header.source_url {
            node.metadata.insert(SOURCE_URL, source_url);
        }
        if let Some(date) = priority_date {
            node.metadata
                .insert(PRIORITY_DATE, date.format("%Y-%m-%d").to_string());
        }

        Ok(node)
    }
}
