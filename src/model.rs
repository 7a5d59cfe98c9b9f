//! Canonical data model for a scraped series.
//!
//! The Pratilipi adapter produces this shape; the EPUB writer and the JSON/resume files consume it.

use serde::{Deserialize, Serialize};

/// One series.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Book {
    pub title: String,
    pub author: String,
    /// BCP 47 language tag derived from the site subdomain (e.g. `ta` for tamil.pratilipi.com).
    #[serde(default = "default_language")]
    pub language: String,
    pub description: Option<String>,
    #[serde(rename = "coverUrl")]
    pub cover_url: Option<String>,
    pub chapters: Vec<Chapter>,
    /// Series URL. Used as the EPUB identifier and to match resume files.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// One chapter (series part) in reading order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    pub title: String,
    /// 1-based position in the series listing.
    pub index: u32,
    /// Decoded chapter content: an XHTML fragment.
    pub body: String,
    /// Publication time in milliseconds since the Unix epoch, as reported by the API.
    #[serde(
        rename = "publishedAt",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub published_at: Option<i64>,
}

fn default_language() -> String {
    "en".to_string()
}

impl Book {
    /// Latest publication time across chapters, if any chapter has one.
    pub fn last_published_at(&self) -> Option<i64> {
        self.chapters.iter().filter_map(|c| c.published_at).max()
    }
}
