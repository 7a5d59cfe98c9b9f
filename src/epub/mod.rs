//! EPUB writer. Consumes the canonical `Book` and writes EPUB 2 or EPUB 3 (mimetype, container,
//! OPF, nav/NCX, cover, chapters).

use crate::model::Book;
use crate::scraper::PoliteClient;
use chrono::{DateTime, Utc};
use std::io::{Seek, Write};
use std::path::Path;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const CONTAINER_XML: &[u8] = b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<container version=\"1.0\" xmlns=\"urn:oasis:names:tc:opendocument:xmlns:container\">\n  <rootfiles>\n    <rootfile full-path=\"OEBPS/content.opf\" media-type=\"application/oebps-package+xml\"/>\n  </rootfiles>\n</container>";
const MIMETYPE: &[u8] = b"application/epub+zip";
const OEBPS_PREFIX: &str = "OEBPS/";
const DEFAULT_IDENTIFIER: &str = "urn:pratilipi2epub:book";

/// EPUB format version.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpubVersion {
    /// EPUB 3: OPF 3.0, nav.xhtml, HTML5 chapters. Optional toc.ncx for compatibility.
    Epub3,
    /// EPUB 2: OPF 2.0, toc.ncx only, XHTML 1.1 chapters.
    Epub2,
}

/// Errors from the EPUB writer. Maps to CLI exit code 3.
#[derive(Debug, Error)]
pub enum EpubError {
    #[error("Cannot write EPUB: book title is empty.")]
    EmptyTitle,

    #[error("Cannot write EPUB: book author is empty.")]
    EmptyAuthor,

    #[error("Cannot write EPUB: book has no chapters.")]
    NoChapters,

    #[error("Failed to create output file: {path}: {source}")]
    CreateFile {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write EPUB archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}

impl From<std::io::Error> for EpubError {
    fn from(e: std::io::Error) -> Self {
        EpubError::Zip(zip::result::ZipError::Io(e))
    }
}

/// Layout switches for [write_epub].
#[derive(Debug, Clone, Copy)]
pub struct EpubOptions {
    pub version: EpubVersion,
    /// Include toc.ncx in EPUB 3 for legacy readers (EPUB 2 always has it).
    pub epub3_include_ncx: bool,
    /// Insert a visible table-of-contents page after the cover.
    pub include_toc_page: bool,
}

impl Default for EpubOptions {
    fn default() -> Self {
        Self {
            version: EpubVersion::Epub3,
            epub3_include_ncx: false,
            include_toc_page: true,
        }
    }
}

impl EpubOptions {
    fn include_ncx(&self) -> bool {
        self.version == EpubVersion::Epub2 || self.epub3_include_ncx
    }
}

/// Result of cover handling: none, title-only (fetch failed), or image.
#[derive(Debug)]
enum CoverOutcome {
    NoCover,
    TitleOnly,
    Image { data: Vec<u8>, ext: &'static str },
}

impl CoverOutcome {
    fn has_page(&self) -> bool {
        !matches!(self, CoverOutcome::NoCover)
    }
}

/// Write a [Book](crate::model::Book) to an EPUB file.
///
/// Fetches the cover image with `client` if `book.cover_url` is set. On cover fetch failure a
/// title-only cover page is emitted and a warning goes to stderr; the write does not fail.
pub fn write_epub(
    book: &Book,
    path: &Path,
    options: EpubOptions,
    client: &mut PoliteClient,
) -> Result<(), EpubError> {
    validate_book(book)?;

    let file = std::fs::File::create(path).map_err(|e| EpubError::CreateFile {
        path: path.to_path_buf(),
        source: e,
    })?;
    let cover = fetch_cover(book, client);
    write_archive(book, &cover, options, file)
}

fn write_archive<W: Write + Seek>(
    book: &Book,
    cover: &CoverOutcome,
    options: EpubOptions,
    writer: W,
) -> Result<(), EpubError> {
    let mut zip = ZipWriter::new(writer);
    let stored = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o644);
    let deflated = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .unix_permissions(0o644);

    // mimetype must be the first entry, uncompressed.
    zip.start_file("mimetype", stored)?;
    zip.write_all(MIMETYPE)?;

    zip.start_file("META-INF/container.xml", deflated)?;
    zip.write_all(CONTAINER_XML)?;

    add_file(&mut zip, deflated, "content.opf", &render_opf(book, cover, options))?;
    if options.version == EpubVersion::Epub3 {
        add_file(&mut zip, deflated, "nav.xhtml", &render_nav(book))?;
    }
    if options.include_ncx() {
        add_file(&mut zip, deflated, "toc.ncx", &render_ncx(book))?;
    }
    if let Some(cover_page) = render_cover(book, cover) {
        add_file(&mut zip, deflated, "cover.xhtml", &cover_page)?;
    }
    if options.include_toc_page {
        add_file(&mut zip, deflated, "toc.xhtml", &render_toc_page(book))?;
    }
    for (i, _) in book.chapters.iter().enumerate() {
        let name = format!("chapter-{}.xhtml", i + 1);
        add_file(&mut zip, deflated, &name, &render_chapter(book, i, options.version))?;
    }
    if let CoverOutcome::Image { data, ext } = cover {
        zip.start_file(format!("{}images/cover.{}", OEBPS_PREFIX, ext), deflated)?;
        zip.write_all(data)?;
    }

    zip.finish()?;
    Ok(())
}

fn add_file<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    name: &str,
    content: &str,
) -> Result<(), EpubError> {
    zip.start_file(format!("{}{}", OEBPS_PREFIX, name), options)?;
    zip.write_all(content.as_bytes())?;
    Ok(())
}

fn validate_book(book: &Book) -> Result<(), EpubError> {
    if book.title.trim().is_empty() {
        return Err(EpubError::EmptyTitle);
    }
    if book.author.trim().is_empty() {
        return Err(EpubError::EmptyAuthor);
    }
    if book.chapters.is_empty() {
        return Err(EpubError::NoChapters);
    }
    Ok(())
}

/// Fetch cover image. No URL gives NoCover; any failure gives TitleOnly.
fn fetch_cover(book: &Book, client: &mut PoliteClient) -> CoverOutcome {
    let url = match &book.cover_url {
        Some(u) if !u.is_empty() => u.as_str(),
        _ => return CoverOutcome::NoCover,
    };
    let response = match client.get_with_retry(url) {
        Ok(r) => r,
        Err(e) => {
            eprintln!(
                "Cover image could not be fetched ({}): {}. Using title-only cover page.",
                url, e
            );
            return CoverOutcome::TitleOnly;
        }
    };
    if !response.status().is_success() {
        eprintln!(
            "Cover image could not be fetched (HTTP {}): {}. Using title-only cover page.",
            response.status().as_u16(),
            url
        );
        return CoverOutcome::TitleOnly;
    }
    let ext = response
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(cover_extension)
        .unwrap_or("jpg");
    match response.bytes() {
        Ok(b) => CoverOutcome::Image {
            data: b.to_vec(),
            ext,
        },
        Err(e) => {
            eprintln!(
                "Cover image could not be read: {}. Using title-only cover page.",
                e
            );
            CoverOutcome::TitleOnly
        }
    }
}

fn cover_extension(content_type: &str) -> &'static str {
    if content_type.contains("png") {
        "png"
    } else if content_type.contains("webp") {
        "webp"
    } else {
        "jpg"
    }
}

fn cover_media_type(ext: &str) -> &'static str {
    match ext {
        "png" => "image/png",
        "webp" => "image/webp",
        _ => "image/jpeg",
    }
}

fn identifier(book: &Book) -> String {
    book.source_url
        .as_deref()
        .unwrap_or(DEFAULT_IDENTIFIER)
        .to_string()
}

/// `YYYY-MM-DD` (UTC) for a Unix timestamp in milliseconds. `None` when out of range.
fn format_date(millis: i64) -> Option<String> {
    DateTime::<Utc>::from_timestamp_millis(millis).map(|d| d.format("%Y-%m-%d").to_string())
}

fn render_opf(book: &Book, cover: &CoverOutcome, options: EpubOptions) -> String {
    let mut manifest = String::new();
    if options.version == EpubVersion::Epub3 {
        manifest.push_str(
            "    <item id=\"nav\" href=\"nav.xhtml\" media-type=\"application/xhtml+xml\" properties=\"nav\"/>\n",
        );
    }
    if options.include_ncx() {
        manifest.push_str(
            "    <item id=\"ncx\" href=\"toc.ncx\" media-type=\"application/x-dtbncx+xml\"/>\n",
        );
    }
    if let CoverOutcome::Image { ext, .. } = cover {
        let properties = if options.version == EpubVersion::Epub3 {
            " properties=\"cover-image\""
        } else {
            ""
        };
        manifest.push_str(&format!(
            "    <item id=\"cover-img\" href=\"images/cover.{}\" media-type=\"{}\"{}/>\n",
            ext,
            cover_media_type(ext),
            properties
        ));
    }
    if cover.has_page() {
        manifest.push_str(
            "    <item id=\"cover\" href=\"cover.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
    }
    if options.include_toc_page {
        manifest.push_str(
            "    <item id=\"toc-page\" href=\"toc.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
        );
    }
    for (i, _) in book.chapters.iter().enumerate() {
        manifest.push_str(&format!(
            "    <item id=\"chapter-{n}\" href=\"chapter-{n}.xhtml\" media-type=\"application/xhtml+xml\"/>\n",
            n = i + 1
        ));
    }

    // Reading order: cover, optional toc page, chapters. nav.xhtml is not in the spine.
    let mut spine = String::new();
    if cover.has_page() {
        spine.push_str("    <itemref idref=\"cover\"/>\n");
    }
    if options.include_toc_page {
        spine.push_str("    <itemref idref=\"toc-page\"/>\n");
    }
    for (i, _) in book.chapters.iter().enumerate() {
        spine.push_str(&format!("    <itemref idref=\"chapter-{}\"/>\n", i + 1));
    }

    let mut metadata = format!(
        "    <dc:identifier id=\"book-id\">{}</dc:identifier>\n    <dc:title>{}</dc:title>\n    <dc:creator>{}</dc:creator>\n    <dc:language>{}</dc:language>\n",
        xml_escape(&identifier(book)),
        xml_escape(&book.title),
        xml_escape(&book.author),
        xml_escape(&book.language)
    );
    if let Some(description) = book.description.as_deref().filter(|d| !d.is_empty()) {
        metadata.push_str(&format!(
            "    <dc:description>{}</dc:description>\n",
            xml_escape(description)
        ));
    }
    if let Some(date) = book.last_published_at().and_then(format_date) {
        metadata.push_str(&format!("    <dc:date>{}</dc:date>\n", date));
    }
    if options.version == EpubVersion::Epub2 && matches!(cover, CoverOutcome::Image { .. }) {
        metadata.push_str("    <meta name=\"cover\" content=\"cover-img\"/>\n");
    }

    let (package_version, spine_open) = match options.version {
        EpubVersion::Epub3 if options.epub3_include_ncx => ("3.0", "<spine toc=\"ncx\">"),
        EpubVersion::Epub3 => ("3.0", "<spine>"),
        EpubVersion::Epub2 => ("2.0", "<spine toc=\"ncx\">"),
    };
    let guide = if cover.has_page() {
        "  <guide>\n    <reference type=\"cover\" href=\"cover.xhtml\" title=\"Cover\"/>\n  </guide>\n"
    } else {
        ""
    };

    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<package xmlns="http://www.idpf.org/2007/opf" unique-identifier="book-id" version="{package_version}">
  <metadata xmlns:dc="http://purl.org/dc/elements/1.1/">
{metadata}  </metadata>
  <manifest>
{manifest}  </manifest>
  {spine_open}
{spine}  </spine>
{guide}</package>
"#
    )
}

fn chapter_list_items(book: &Book) -> String {
    book.chapters
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            format!(
                "    <li><a href=\"chapter-{}.xhtml\">{}</a></li>\n",
                i + 1,
                xml_escape(&ch.title)
            )
        })
        .collect()
}

fn render_nav(book: &Book) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xmlns:epub="http://www.idpf.org/2007/ops" xml:lang="{lang}" lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <nav epub:type="toc">
    <h1>Contents</h1>
    <ol>
{items}    </ol>
  </nav>
</body>
</html>
"#,
        lang = xml_escape(&book.language),
        items = chapter_list_items(book)
    )
}

/// Visible table-of-contents page placed after the cover.
fn render_toc_page(book: &Book) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  <meta charset="UTF-8"/>
  <title>Table of Contents</title>
</head>
<body>
  <h1>Table of Contents</h1>
  <ol>
{items}  </ol>
</body>
</html>
"#,
        lang = xml_escape(&book.language),
        items = chapter_list_items(book)
    )
}

fn render_ncx(book: &Book) -> String {
    let nav_points: String = book
        .chapters
        .iter()
        .enumerate()
        .map(|(i, ch)| {
            format!(
                r#"    <navPoint id="navpoint-{n}" playOrder="{n}">
      <navLabel><text>{label}</text></navLabel>
      <content src="chapter-{n}.xhtml"/>
    </navPoint>
"#,
                n = i + 1,
                label = xml_escape(&ch.title)
            )
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ncx xmlns="http://www.daisy.org/z3986/2005/ncx/" version="2005-1" xml:lang="{lang}">
  <head>
    <meta name="dtb:uid" content="{uid}"/>
    <meta name="dtb:depth" content="1"/>
    <meta name="dtb:totalPageCount" content="0"/>
    <meta name="dtb:maxPageNumber" content="0"/>
  </head>
  <docTitle><text>{title}</text></docTitle>
  <docAuthor><text>{author}</text></docAuthor>
  <navMap>
{nav_points}  </navMap>
</ncx>
"#,
        lang = xml_escape(&book.language),
        uid = xml_escape(&identifier(book)),
        title = xml_escape(&book.title),
        author = xml_escape(&book.author),
        nav_points = nav_points
    )
}

fn render_cover(book: &Book, cover: &CoverOutcome) -> Option<String> {
    let body = match cover {
        CoverOutcome::NoCover => return None,
        CoverOutcome::TitleOnly => format!(
            r#"  <div style="text-align: center; margin-top: 3em;">
    <h1 style="font-size: 1.5em;">{}</h1>
    <p style="margin-top: 1em;">{}</p>
  </div>"#,
            xml_escape(&book.title),
            xml_escape(&book.author)
        ),
        CoverOutcome::Image { ext, .. } => format!(
            r#"  <div style="text-align: center;">
    <img src="images/cover.{}" alt="Cover" style="max-width: 100%; height: auto;"/>
  </div>"#,
            ext
        ),
    };
    Some(format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{}">
<head>
  <meta charset="UTF-8"/>
  <title>Cover</title>
</head>
<body>
{}
</body>
</html>
"#,
        xml_escape(&book.language),
        body
    ))
}

/// Chapter document: HTML5 doctype for EPUB 3, XHTML 1.1 for EPUB 2. The chapter title leads
/// the body as `<h1>`.
fn render_chapter(book: &Book, i: usize, version: EpubVersion) -> String {
    let ch = &book.chapters[i];
    let title = xml_escape(&ch.title);
    let (doctype, meta) = match version {
        EpubVersion::Epub3 => ("<!DOCTYPE html>", "<meta charset=\"UTF-8\"/>"),
        EpubVersion::Epub2 => (
            "<!DOCTYPE html PUBLIC \"-//W3C//DTD XHTML 1.1//EN\" \"http://www.w3.org/TR/xhtml11/DTD/xhtml11.dtd\">",
            "<meta http-equiv=\"Content-Type\" content=\"application/xhtml+xml; charset=utf-8\"/>",
        ),
    };
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
{doctype}
<html xmlns="http://www.w3.org/1999/xhtml" xml:lang="{lang}">
<head>
  {meta}
  <title>{title}</title>
</head>
<body>
<h1>{title}</h1>
{body}
</body>
</html>
"#,
        lang = xml_escape(&book.language),
        body = ch.body
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
