//! Pratilipi adapter. Lists series parts through the GraphQL API, reads series metadata from the
//! series page, then fetches each reader page and decodes its embedded content.

use crate::codec;
use crate::model::{Book, Chapter};
use crate::scraper::error::ScraperError;
use crate::scraper::payload::extract_payload;
use crate::scraper::{
    parse_series_url, strip_title_site_suffix, EarlyAccessBehavior, EmptyChapterBehavior,
    PoliteClient, ScrapeOptions, Scraper, SeriesUrl,
};
use scraper::{Html, Selector};
use serde::{Deserialize, Serialize};

const OPERATION_NAME: &str = "getSeriesPartsPaginatedBySlug";
const SERIES_PARTS_QUERY: &str = "query getSeriesPartsPaginatedBySlug($where: GetSeriesInput!, $page: LimitCursorPageInput) { \
getSeries(where: $where) { series { seriesId id publishedParts(page: $page) { cursor id parts { id pratilipi { \
title readPageUrl publishedAt author { id displayName } pratilipiEarlyAccess { isEarlyAccess } } } } } } }";
const GRAPHQL_HEADERS: [(&str, &str); 2] = [
    ("Apollographql-client-name", "WEB_prod"),
    ("Apollographql-client-version", "1.0.0"),
];
pub const DEFAULT_PAGE_SIZE: u32 = 15;
const TITLE_SUFFIXES: [&str; 2] = [" | Pratilipi", " - Pratilipi"];
const UNKNOWN_AUTHOR: &str = "Unknown";

fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| ScraperError::InvalidSelector {
        selector: sel.to_string(),
        message: e.to_string(),
    })
}

/// Pratilipi scraper. Holds a reference to the shared polite client.
pub struct PratilipiScraper<'a> {
    client: &'a mut PoliteClient,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesPartsRequest<'a> {
    operation_name: &'a str,
    variables: SeriesPartsVariables<'a>,
    query: &'a str,
}

#[derive(Debug, Serialize)]
struct SeriesPartsVariables<'a> {
    #[serde(rename = "where")]
    filter: SeriesWhere<'a>,
    page: PageCursor,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SeriesWhere<'a> {
    series_slug: &'a str,
}

#[derive(Debug, Serialize)]
struct PageCursor {
    limit: u32,
    cursor: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<ResponseData>,
    #[serde(default)]
    errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Deserialize)]
struct GraphQlErrorEntry {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseData {
    get_series: Option<GetSeries>,
}

#[derive(Debug, Deserialize)]
struct GetSeries {
    series: Option<Series>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Series {
    published_parts: Option<PublishedParts>,
}

#[derive(Debug, Deserialize)]
struct PublishedParts {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    pratilipi: PartPratilipi,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartPratilipi {
    title: String,
    read_page_url: String,
    published_at: Option<i64>,
    author: Option<PartAuthor>,
    pratilipi_early_access: Option<PartEarlyAccess>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartAuthor {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PartEarlyAccess {
    #[serde(default)]
    is_early_access: bool,
}

/// One series part from the listing, flattened.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PartEntry {
    title: String,
    read_page_url: String,
    published_at: Option<i64>,
    author: Option<String>,
    early_access: bool,
}

/// One entry of the table of contents, 1-based.
#[derive(Debug, Clone)]
struct TocEntry {
    index: u32,
    url: String,
    title: String,
    early_access: bool,
    published_at: Option<i64>,
}

/// Metadata read from the series page.
#[derive(Debug, Default)]
struct SeriesMetadata {
    title: Option<String>,
    description: Option<String>,
    cover_url: Option<String>,
}

fn parts_request(slug: &str, limit: u32, cursor: u32) -> SeriesPartsRequest<'_> {
    SeriesPartsRequest {
        operation_name: OPERATION_NAME,
        variables: SeriesPartsVariables {
            filter: SeriesWhere { series_slug: slug },
            page: PageCursor {
                limit,
                cursor: cursor.to_string(),
            },
        },
        query: SERIES_PARTS_QUERY,
    }
}

/// Parse one GraphQL page of series parts.
fn parse_parts_page(json: &str) -> Result<Vec<PartEntry>, ScraperError> {
    let response: GraphQlResponse =
        serde_json::from_str(json).map_err(|e| ScraperError::ChapterListParse {
            reason: e.to_string(),
        })?;
    if !response.errors.is_empty() {
        let message = response
            .errors
            .iter()
            .map(|e| e.message.as_str())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ScraperError::GraphQl { message });
    }
    let published = response
        .data
        .and_then(|d| d.get_series)
        .and_then(|s| s.series)
        .and_then(|s| s.published_parts)
        .ok_or_else(|| ScraperError::ChapterListParse {
            reason: "response has no getSeries.series.publishedParts".to_string(),
        })?;
    Ok(published
        .parts
        .into_iter()
        .map(|part| {
            let p = part.pratilipi;
            PartEntry {
                title: p.title.trim().to_string(),
                read_page_url: p.read_page_url,
                published_at: p.published_at,
                author: p
                    .author
                    .and_then(|a| a.display_name)
                    .map(|n| n.trim().to_string())
                    .filter(|n| !n.is_empty()),
                early_access: p
                    .pratilipi_early_access
                    .map(|e| e.is_early_access)
                    .unwrap_or(false),
            }
        })
        .collect())
}

/// Number the listed parts (1-based, listing order) and resolve their reader URLs.
fn build_toc(series: &SeriesUrl, parts: &[PartEntry]) -> Vec<TocEntry> {
    parts
        .iter()
        .enumerate()
        .map(|(i, p)| TocEntry {
            index: i as u32 + 1,
            url: series.resolve(&p.read_page_url),
            title: if p.title.is_empty() {
                format!("Part {}", i + 1)
            } else {
                p.title.clone()
            },
            early_access: p.early_access,
            published_at: p.published_at,
        })
        .collect()
}

/// Series title, description and cover from the series page. Title falls back from `h1.title`
/// to `og:title` to `<title>`.
fn parse_series_page(html: &str) -> Result<SeriesMetadata, ScraperError> {
    let doc = Html::parse_document(html);
    let h1_sel = parse_selector("h1.title")?;
    let og_title_sel = parse_selector("meta[property=\"og:title\"]")?;
    let title_sel = parse_selector("title")?;
    let desc_sel = parse_selector("meta[name=\"description\"]")?;
    let cover_sel = parse_selector("meta[property=\"og:image\"]")?;

    let title = doc
        .select(&h1_sel)
        .next()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
        .or_else(|| {
            doc.select(&og_title_sel)
                .next()
                .and_then(|e| e.value().attr("content"))
                .map(|s| strip_title_site_suffix(s, &TITLE_SUFFIXES))
                .filter(|s| !s.is_empty())
        })
        .or_else(|| {
            doc.select(&title_sel)
                .next()
                .map(|e| e.text().collect::<String>())
                .map(|t| strip_title_site_suffix(&t, &TITLE_SUFFIXES))
                .filter(|s| !s.is_empty())
        });
    let description = doc
        .select(&desc_sel)
        .next()
        .and_then(|e| e.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    let cover_url = doc
        .select(&cover_sel)
        .next()
        .and_then(|e| e.value().attr("content"))
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());
    Ok(SeriesMetadata {
        title,
        description,
        cover_url,
    })
}

/// Turn decoded chapter HTML into a minimal XHTML body of `<p>` elements.
///
/// Paragraph elements are kept (text only); content without any `<p>` is split on blank lines.
fn normalize_body(decoded: &str) -> Result<String, ScraperError> {
    let fragment = Html::parse_fragment(decoded);
    let p_sel = parse_selector("p")?;
    let mut paragraphs: Vec<String> = fragment
        .select(&p_sel)
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();
    if paragraphs.is_empty() {
        let text: String = fragment.root_element().text().collect();
        paragraphs = text
            .split("\n\n")
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
    }
    Ok(paragraphs
        .iter()
        .map(|t| format!("<p>{}</p>", html_escape_inner(t)))
        .collect::<Vec<_>>()
        .join(""))
}

/// Extract, decode and normalize the chapter body of a reader page.
fn parse_chapter_page(html: &str, index: u32, url: &str) -> Result<String, ScraperError> {
    let payload = extract_payload(html).ok_or_else(|| ScraperError::ParseChapter {
        index,
        url: url.to_string(),
    })?;
    let decoded = codec::decode(&payload).map_err(|source| ScraperError::Payload {
        index,
        url: url.to_string(),
        source,
    })?;
    normalize_body(&decoded)
}

fn html_escape_inner(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Check response status and read body as text.
fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
    context: Option<&str>,
) -> Result<String, ScraperError> {
    let status = response.status();
    if !status.is_success() {
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            context: context.map(String::from),
        });
    }
    response
        .text()
        .map_err(|e| ScraperError::BodyRead { source: e })
}

/// Walk the listing cursor from 0 in steps of `page_size` until a page comes back short.
fn walk_parts<F>(page_size: u32, mut fetch_page: F) -> Result<Vec<PartEntry>, ScraperError>
where
    F: FnMut(u32, u32) -> Result<Vec<PartEntry>, ScraperError>,
{
    let page_size = page_size.max(1);
    let mut parts = Vec::new();
    let mut cursor = 0u32;
    loop {
        let page = fetch_page(page_size, cursor)?;
        let received = page.len();
        parts.extend(page);
        if received < page_size as usize {
            break;
        }
        cursor += page_size;
    }
    Ok(parts)
}

fn check_early_access(
    parts: &[PartEntry],
    behavior: EarlyAccessBehavior,
) -> Result<(), ScraperError> {
    let count = parts.iter().filter(|p| p.early_access).count();
    if count > 0 && behavior == EarlyAccessBehavior::Fail {
        return Err(ScraperError::EarlyAccessNotAllowed { count });
    }
    Ok(())
}

fn apply_range(toc: &mut Vec<TocEntry>, range: Option<(u32, u32)>) {
    if let Some((from, to)) = range {
        toc.retain(|e| e.index >= from && e.index <= to);
    }
}

impl<'a> PratilipiScraper<'a> {
    pub fn new(client: &'a mut PoliteClient) -> Self {
        Self { client }
    }

    fn fetch_parts_page(
        &mut self,
        series: &SeriesUrl,
        limit: u32,
        cursor: u32,
    ) -> Result<Vec<PartEntry>, ScraperError> {
        let endpoint = series.graphql_endpoint();
        let request = parts_request(&series.slug, limit, cursor);
        let response = self
            .client
            .post_json_with_retry(&endpoint, &GRAPHQL_HEADERS, &request)
            .map_err(|e| ScraperError::Network {
                url: endpoint.clone(),
                source: e,
            })?;
        let body = check_response(response, &endpoint, Some("series listing"))?;
        parse_parts_page(&body)
    }

    fn fetch_all_parts(
        &mut self,
        series: &SeriesUrl,
        page_size: u32,
    ) -> Result<Vec<PartEntry>, ScraperError> {
        walk_parts(page_size, |limit, cursor| {
            self.fetch_parts_page(series, limit, cursor)
        })
    }

    fn fetch_series_metadata(&mut self, series: &SeriesUrl) -> SeriesMetadata {
        let result = self
            .client
            .get_with_retry(&series.url)
            .map_err(|e| ScraperError::Network {
                url: series.url.clone(),
                source: e,
            })
            .and_then(|r| check_response(r, &series.url, Some("series page")))
            .and_then(|html| parse_series_page(&html));
        match result {
            Ok(meta) => meta,
            Err(e) => {
                eprintln!("Series page could not be read: {}. Using the slug as title.", e);
                SeriesMetadata::default()
            }
        }
    }

    fn fetch_chapter(&mut self, entry: &TocEntry) -> Result<String, ScraperError> {
        let response =
            self.client
                .get_with_retry(&entry.url)
                .map_err(|e| ScraperError::Network {
                    url: entry.url.clone(),
                    source: e,
                })?;
        let context = format!("chapter {}", entry.index);
        let html = check_response(response, &entry.url, Some(context.as_str()))?;
        parse_chapter_page(&html, entry.index, &entry.url)
    }
}

fn push_chapter(book: &mut Book, chapter: Chapter, options: &ScrapeOptions<'_>) {
    book.chapters.push(chapter);
    book.chapters.sort_by_key(|c| c.index);
    if let Some(cb) = options.on_checkpoint {
        cb(book);
    }
}

fn early_access_placeholder(entry: &TocEntry) -> Chapter {
    Chapter {
        title: format!("{} (early access)", entry.title),
        index: entry.index,
        body: "<p>This part is in early access and could not be retrieved.</p>".to_string(),
        published_at: entry.published_at,
    }
}

fn empty_placeholder(entry: &TocEntry, error: &ScraperError) -> Chapter {
    let body = match error {
        ScraperError::EmptyChapter { .. } => "<p>This chapter returned no content.</p>".to_string(),
        other => format!(
            "<p>This chapter could not be retrieved: {}</p>",
            html_escape_inner(&other.to_string())
        ),
    };
    Chapter {
        title: format!("{} (no content)", entry.title),
        index: entry.index,
        body,
        published_at: entry.published_at,
    }
}

/// Stderr line for a chapter dropped under the skip policy. Decode failures are called out
/// separately since they point at a changed payload format, not a missing chapter.
fn skip_notice(error: &ScraperError) -> String {
    match error {
        ScraperError::Payload { .. } => format!(
            "Warning: {} The reader page payload format may have changed. Skipped.",
            error
        ),
        other => format!("{} Skipped.", other),
    }
}

/// Table of contents only: no chapter pages are fetched.
fn list_chapters(book: &mut Book, toc: Vec<TocEntry>, early_behavior: EarlyAccessBehavior) {
    for entry in toc {
        if book.chapters.iter().any(|c| c.index == entry.index) {
            continue;
        }
        if entry.early_access {
            if early_behavior == EarlyAccessBehavior::Placeholder {
                book.chapters.push(early_access_placeholder(&entry));
            }
            continue;
        }
        book.chapters.push(Chapter {
            title: entry.title,
            index: entry.index,
            body: String::new(),
            published_at: entry.published_at,
        });
    }
    book.chapters.sort_by_key(|c| c.index);
}

/// Fetch every entry not already in `book` with `fetch`, applying the early-access and
/// empty-chapter policies. Network and HTTP failures abort the scrape.
fn collect_chapters<F>(
    book: &mut Book,
    toc: Vec<TocEntry>,
    options: &ScrapeOptions<'_>,
    mut fetch: F,
) -> Result<(), ScraperError>
where
    F: FnMut(&TocEntry) -> Result<String, ScraperError>,
{
    let early_behavior = options
        .early_access_behavior
        .unwrap_or(EarlyAccessBehavior::Skip);
    let empty_behavior = options
        .empty_chapter_behavior
        .unwrap_or(EmptyChapterBehavior::Skip);
    let total = toc.len() as u32;
    for (done, entry) in toc.into_iter().enumerate() {
        if let Some(p) = options.progress {
            p(done as u32 + 1, total);
        }
        if book.chapters.iter().any(|c| c.index == entry.index) {
            continue;
        }

        if entry.early_access {
            if early_behavior == EarlyAccessBehavior::Placeholder {
                push_chapter(book, early_access_placeholder(&entry), options);
            }
            continue;
        }

        let result = fetch(&entry).and_then(|body| {
            if body.is_empty() {
                Err(ScraperError::EmptyChapter {
                    index: entry.index,
                    url: entry.url.clone(),
                })
            } else {
                Ok(body)
            }
        });
        match result {
            Ok(body) => {
                let chapter = Chapter {
                    title: entry.title.clone(),
                    index: entry.index,
                    body,
                    published_at: entry.published_at,
                };
                push_chapter(book, chapter, options);
            }
            Err(
                e @ (ScraperError::ParseChapter { .. }
                | ScraperError::EmptyChapter { .. }
                | ScraperError::Payload { .. }),
            ) => match empty_behavior {
                EmptyChapterBehavior::Skip => eprintln!("{}", skip_notice(&e)),
                EmptyChapterBehavior::Placeholder => {
                    push_chapter(book, empty_placeholder(&entry, &e), options);
                }
                EmptyChapterBehavior::Fail => return Err(e),
            },
            Err(e) => return Err(e),
        }
    }

    if book.chapters.is_empty() {
        return Err(ScraperError::NoChaptersRetrieved);
    }
    Ok(())
}

impl Scraper for PratilipiScraper<'_> {
    fn scrape_book(
        &mut self,
        url: &str,
        options: &ScrapeOptions<'_>,
    ) -> Result<Book, ScraperError> {
        let series = parse_series_url(url)?;
        let parts =
            self.fetch_all_parts(&series, options.page_size.unwrap_or(DEFAULT_PAGE_SIZE))?;
        if parts.is_empty() {
            return Err(ScraperError::EmptyChapterList);
        }
        let early_behavior = options
            .early_access_behavior
            .unwrap_or(EarlyAccessBehavior::Skip);
        check_early_access(&parts, early_behavior)?;

        let mut toc = build_toc(&series, &parts);
        apply_range(&mut toc, options.chapter_range);

        let mut book: Book = match options.initial_book {
            Some(init) => init.clone(),
            None => {
                let meta = self.fetch_series_metadata(&series);
                let author = parts
                    .iter()
                    .find_map(|p| p.author.clone())
                    .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());
                Book {
                    title: meta.title.unwrap_or_else(|| series.slug.clone()),
                    author,
                    language: series.language.to_string(),
                    description: meta.description,
                    cover_url: meta.cover_url,
                    chapters: Vec::with_capacity(toc.len()),
                    source_url: Some(series.url.clone()),
                }
            }
        };

        if options.toc_only {
            list_chapters(&mut book, toc, early_behavior);
            return Ok(book);
        }
        collect_chapters(&mut book, toc, options, |entry| self.fetch_chapter(entry))?;
        Ok(book)
    }
}
