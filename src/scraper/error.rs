//! Scraper error type: URL handling, HTTP, GraphQL, page parsing, and payload decoding.

use crate::codec::CodecError;
use thiserror::Error;

/// Shared scraper error.
#[derive(Debug, Error)]
pub enum ScraperError {
    // Site / URL
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Unsupported host '{host}'. Expected a <language>.pratilipi.com series URL.")]
    UnrecognizedHost { host: String },

    // HTTP and network
    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "series page", "chapter 5") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    // GraphQL listing
    #[error("GraphQL request failed: {message}")]
    GraphQl { message: String },

    #[error("Could not parse series listing: {reason}")]
    ChapterListParse { reason: String },

    #[error("Series has no published parts (possibly deleted or unpublished).")]
    EmptyChapterList,

    // Pages
    #[error("Invalid CSS selector {selector:?}: {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Could not parse chapter {index}: encoded content not found at {url}.")]
    ParseChapter { index: u32, url: String },

    #[error("Chapter {index} has no content at {url}.")]
    EmptyChapter { index: u32, url: String },

    #[error("Could not decode content of chapter {index} at {url}: {source}")]
    Payload {
        index: u32,
        url: String,
        #[source]
        source: CodecError,
    },

    // Site policy
    #[error("Series has {count} early-access part(s). Use --early-access skip or placeholder to include only free parts or add placeholders.")]
    EarlyAccessNotAllowed { count: usize },

    #[error("No chapters could be retrieved (all early-access, missing, or failed).")]
    NoChaptersRetrieved,
}
