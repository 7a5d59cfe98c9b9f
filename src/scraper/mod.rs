//! Series scraping: URL handling, scrape options, the shared polite client, and the Pratilipi adapter.

mod client;
mod error;

pub mod payload;
pub mod pratilipi;

pub use client::{
    PoliteClient, PoliteClientBuilder, DEFAULT_BACKOFF_SECS, DEFAULT_DELAY_SECS, DEFAULT_RETRY_COUNT,
    DEFAULT_TIMEOUT_SECS,
};
pub use error::ScraperError;

use crate::model::Book;
use reqwest::Url;

/// Strip a known site suffix from the end of a page title (e.g. " | Pratilipi") so that titles
/// containing " - " or " | " themselves are preserved.
pub fn strip_title_site_suffix(s: &str, suffixes: &[&str]) -> String {
    let mut t = s.trim();
    for suffix in suffixes {
        if t.ends_with(suffix) {
            t = t[..t.len() - suffix.len()].trim();
            break;
        }
    }
    t.to_string()
}

/// How to handle early-access parts (not yet free to read).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EarlyAccessBehavior {
    /// Exclude early-access parts from the book (default).
    Skip,
    /// Include a placeholder chapter for each early-access part.
    Placeholder,
    /// Fail the scrape if any part is early-access.
    Fail,
}

/// How to handle chapters whose encoded content is missing, undecodable, or empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptyChapterBehavior {
    /// Skip the chapter (default).
    Skip,
    /// Include a placeholder chapter (title and body indicating no content).
    Placeholder,
    /// Fail the scrape.
    Fail,
}

/// A parsed series URL such as `https://tamil.pratilipi.com/series/some-story-abc123`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesUrl {
    /// The URL as given (trailing slash removed).
    pub url: String,
    /// `scheme://host`, used for the GraphQL endpoint and relative chapter links.
    pub origin: String,
    /// Last path segment.
    pub slug: String,
    /// Language tag derived from the subdomain.
    pub language: &'static str,
}

impl SeriesUrl {
    pub fn graphql_endpoint(&self) -> String {
        format!("{}/graphql", self.origin)
    }

    /// Resolve a `readPageUrl` (usually site-relative) against the origin.
    pub fn resolve(&self, read_page_url: &str) -> String {
        if read_page_url.starts_with("http://") || read_page_url.starts_with("https://") {
            read_page_url.to_string()
        } else if read_page_url.starts_with('/') {
            format!("{}{}", self.origin, read_page_url)
        } else {
            format!("{}/{}", self.origin, read_page_url)
        }
    }
}

/// Subdomain -> language tag. Unknown subdomains (including `www`) fall back to English.
fn language_for_subdomain(subdomain: &str) -> &'static str {
    match subdomain {
        "tamil" => "ta",
        "hindi" => "hi",
        "bengali" => "bn",
        "marathi" => "mr",
        "malayalam" => "ml",
        "telugu" => "te",
        "kannada" => "kn",
        "gujarati" => "gu",
        "odia" => "or",
        "punjabi" => "pa",
        _ => "en",
    }
}

/// Parse and validate a series URL. The host must be pratilipi.com or one of its subdomains.
pub fn parse_series_url(url_input: &str) -> Result<SeriesUrl, ScraperError> {
    let invalid = |reason: &str| ScraperError::InvalidUrl {
        input: url_input.to_string(),
        reason: reason.to_string(),
    };
    let url = Url::parse(url_input.trim()).map_err(|e| invalid(&e.to_string()))?;
    let host = url.host_str().ok_or_else(|| invalid("URL has no host"))?;
    if host != "pratilipi.com" && !host.ends_with(".pratilipi.com") {
        return Err(ScraperError::UnrecognizedHost {
            host: host.to_string(),
        });
    }
    let slug = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .ok_or_else(|| invalid("URL has no series slug"))?
        .to_string();
    let subdomain = host.split('.').next().unwrap_or_default();
    let origin = match url.port() {
        Some(port) => format!("{}://{}:{}", url.scheme(), host, port),
        None => format!("{}://{}", url.scheme(), host),
    };
    Ok(SeriesUrl {
        url: url_input.trim().trim_end_matches('/').to_string(),
        origin,
        slug,
        language: language_for_subdomain(subdomain),
    })
}

/// Options for a scrape run: progress callback, chapter range, resume state, checkpoint,
/// early-access/empty handling, listing page size, toc-only.
pub struct ScrapeOptions<'a> {
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    pub chapter_range: Option<(u32, u32)>,
    pub initial_book: Option<&'a Book>,
    pub on_checkpoint: Option<&'a dyn Fn(&Book)>,
    pub early_access_behavior: Option<EarlyAccessBehavior>,
    pub empty_chapter_behavior: Option<EmptyChapterBehavior>,
    /// Parts requested per GraphQL page (default 15).
    pub page_size: Option<u32>,
    pub toc_only: bool,
}

/// Trait implemented by site adapters.
pub trait Scraper {
    fn scrape_book(&mut self, url: &str, options: &ScrapeOptions<'_>)
        -> Result<Book, ScraperError>;
}

/// Build the Pratilipi adapter around `client` and scrape `url`.
pub fn scrape_book(
    url: &str,
    client: &mut PoliteClient,
    options: &ScrapeOptions<'_>,
) -> Result<Book, ScraperError> {
    let mut adapter = pratilipi::PratilipiScraper::new(client);
    adapter.scrape_book(url, options)
}
