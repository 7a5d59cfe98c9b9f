//! pratilipi2epub: downloads Pratilipi series and writes EPUB.
//!
//! [codec] holds the variant Base64 + UTF-8 transcoder the reader pages use for chapter content;
//! [scraper] fetches a series, [epub] writes it, [cli] wires them together.

pub mod cli;
pub mod codec;
pub mod config;
pub mod epub;
pub mod model;
pub mod scraper;

pub use codec::{decode, encode, CodecError};
pub use epub::{write_epub, EpubError, EpubOptions, EpubVersion};
pub use model::{Book, Chapter};
pub use scraper::{
    parse_series_url, scrape_book, EarlyAccessBehavior, EmptyChapterBehavior, PoliteClient,
    PoliteClientBuilder, ScrapeOptions, Scraper, ScraperError, SeriesUrl,
};
