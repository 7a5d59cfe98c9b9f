//! CLI parsing and orchestration: resolve settings from flags and config, scrape each series,
//! write EPUB or JSON, optionally run epubcheck. Errors map to exit codes.

use crate::config::{self, Config};
use crate::epub::{write_epub, EpubError, EpubOptions, EpubVersion};
use crate::model::Book;
use crate::scraper::{
    parse_series_url, scrape_book, EarlyAccessBehavior, EmptyChapterBehavior, PoliteClient,
    ScrapeOptions, ScraperError, SeriesUrl, DEFAULT_BACKOFF_SECS, DEFAULT_DELAY_SECS,
    DEFAULT_RETRY_COUNT, DEFAULT_TIMEOUT_SECS,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Epub(#[from] EpubError),

    #[error("{0}")]
    Validation(String),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) => 2,
            CliRunError::Epub(_) | CliRunError::Validation(_) => 3,
        }
    }
}

/// Output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Epub,
    /// The scraped `Book` as JSON (same shape as resume files).
    Json,
}

impl OutputFormat {
    fn extension(self) -> &'static str {
        match self {
            OutputFormat::Epub => "epub",
            OutputFormat::Json => "json",
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "pratilipi2epub")]
#[command(about = "Download Pratilipi series and write EPUB")]
#[command(
    after_help = "Config file keys: output_dir, user_agent, request_delay_secs, timeout_secs, toc_page, retry_count, retry_backoff_secs, empty_chapters, early_access, page_size. Flags override config."
)]
pub struct Args {
    /// Series URLs, e.g. https://tamil.pratilipi.com/series/<slug>. Processed in order.
    #[arg(required = true)]
    pub urls: Vec<String>,

    /// Output path (single URL only). Default: <output_dir>/<slug>.<ext>.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// epub or json.
    #[arg(long, default_value = "epub", value_parser = parse_format)]
    pub format: OutputFormat,

    /// Write EPUB 2 instead of EPUB 3.
    #[arg(long)]
    pub epub_2: bool,

    /// Include toc.ncx in EPUB 3 output.
    #[arg(long)]
    pub ncx: bool,

    /// Errors only.
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the full error chain on failure.
    #[arg(long)]
    pub verbose: bool,

    /// Only parts in this 1-based inclusive range, e.g. 1-10.
    #[arg(long, value_parser = parse_chapter_range)]
    pub chapters: Option<(u32, u32)>,

    /// Resume file (JSON, single URL only). Existing parts are kept and progress is saved after
    /// each part.
    #[arg(long)]
    pub resume: Option<PathBuf>,

    /// Early-access parts: skip (default), placeholder, or fail.
    #[arg(long, value_parser = parse_early_access)]
    pub early_access: Option<EarlyAccessBehavior>,

    /// Parts with missing, undecodable, or empty content: skip (default), placeholder, or fail.
    #[arg(long, value_parser = parse_empty_chapter_behavior)]
    pub empty_chapters: Option<EmptyChapterBehavior>,

    #[arg(long)]
    pub user_agent: Option<String>,

    /// Seconds between requests (default 2).
    #[arg(long)]
    pub delay: Option<u64>,

    /// Request timeout in seconds (default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// List parts and print the output path without downloading chapters.
    #[arg(long)]
    pub dry_run: bool,

    /// Run epubcheck on the written EPUB.
    #[arg(long)]
    pub validate: bool,
}

fn parse_chapter_range(s: &str) -> Result<(u32, u32), String> {
    let (from, to) = s
        .trim()
        .split_once('-')
        .ok_or_else(|| format!("Invalid --chapters: expected FROM-TO (e.g. 1-10), got '{}'", s))?;
    let number = |part: &str, which: &str| {
        part.trim()
            .parse::<u32>()
            .map_err(|_| format!("Invalid --chapters: '{}' is not a valid {} part number", part.trim(), which))
    };
    let from = number(from, "start")?;
    let to = number(to, "end")?;
    if from == 0 || from > to {
        return Err(format!(
            "Invalid --chapters: need 1 <= start <= end, got {}-{}",
            from, to
        ));
    }
    Ok((from, to))
}

fn parse_early_access(s: &str) -> Result<EarlyAccessBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(EarlyAccessBehavior::Skip),
        "placeholder" => Ok(EarlyAccessBehavior::Placeholder),
        "fail" => Ok(EarlyAccessBehavior::Fail),
        _ => Err(format!(
            "Invalid early-access value: '{}'. Use skip, placeholder, or fail.",
            s
        )),
    }
}

fn parse_empty_chapter_behavior(s: &str) -> Result<EmptyChapterBehavior, String> {
    match s.to_lowercase().as_str() {
        "skip" => Ok(EmptyChapterBehavior::Skip),
        "placeholder" => Ok(EmptyChapterBehavior::Placeholder),
        "fail" => Ok(EmptyChapterBehavior::Fail),
        _ => Err(format!(
            "Invalid empty-chapters value: '{}'. Use skip, placeholder, or fail.",
            s
        )),
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    match s.to_lowercase().as_str() {
        "epub" => Ok(OutputFormat::Epub),
        "json" => Ok(OutputFormat::Json),
        _ => Err(format!("Invalid --format value: '{}'. Use epub or json.", s)),
    }
}

/// Lowercase ASCII alphanumerics, everything else collapsed to single dashes.
fn sanitize_file_stem(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "book".to_string()
    } else {
        trimmed.to_string()
    }
}

fn validate_output_path(path: &Path) -> Result<(), CliRunError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() && !parent.exists() => {
            Err(CliRunError::InvalidInput(format!(
                "Cannot write output: {}: parent directory does not exist.",
                path.display()
            )))
        }
        _ => Ok(()),
    }
}

fn validate_epub(path: &Path) -> Result<(), CliRunError> {
    let output = std::process::Command::new("epubcheck")
        .arg(path)
        .output()
        .map_err(|e| {
            CliRunError::Validation(format!(
                "Could not run epubcheck: {}. Is epubcheck installed and on PATH?",
                e
            ))
        })?;
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    let report = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout)
    } else {
        stderr
    };
    Err(CliRunError::Validation(format!(
        "epubcheck reported errors:\n{}",
        report.trim()
    )))
}

/// Flags merged over config merged over defaults.
#[derive(Debug, Clone, PartialEq)]
struct Settings {
    output_dir: PathBuf,
    user_agent: Option<String>,
    delay_secs: u64,
    timeout_secs: u64,
    retry_count: u32,
    retry_backoff_secs: Vec<u64>,
    include_toc_page: bool,
    early_access: EarlyAccessBehavior,
    empty_chapters: EmptyChapterBehavior,
    page_size: Option<u32>,
}

fn resolve_settings(args: &Args, config: Option<&Config>) -> Result<Settings, CliRunError> {
    let early_access = match (args.early_access, config.and_then(|c| c.early_access.as_deref())) {
        (Some(b), _) => b,
        (None, Some(s)) => parse_early_access(s)
            .map_err(|e| CliRunError::InvalidInput(format!("Config: {}", e)))?,
        (None, None) => EarlyAccessBehavior::Skip,
    };
    let empty_chapters = match (
        args.empty_chapters,
        config.and_then(|c| c.empty_chapters.as_deref()),
    ) {
        (Some(b), _) => b,
        (None, Some(s)) => parse_empty_chapter_behavior(s)
            .map_err(|e| CliRunError::InvalidInput(format!("Config: {}", e)))?,
        (None, None) => EmptyChapterBehavior::Skip,
    };
    let page_size = config.and_then(|c| c.page_size);
    if page_size == Some(0) {
        return Err(CliRunError::InvalidInput(
            "Config: page_size must be at least 1".to_string(),
        ));
    }
    Ok(Settings {
        output_dir: config
            .and_then(|c| c.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(".")),
        user_agent: args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone())),
        delay_secs: args
            .delay
            .or_else(|| config.and_then(|c| c.request_delay_secs))
            .unwrap_or(DEFAULT_DELAY_SECS),
        timeout_secs: args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS),
        retry_count: config
            .and_then(|c| c.retry_count)
            .unwrap_or(DEFAULT_RETRY_COUNT)
            .max(1),
        retry_backoff_secs: config
            .and_then(|c| c.retry_backoff_secs.clone())
            .unwrap_or_else(|| DEFAULT_BACKOFF_SECS.to_vec()),
        include_toc_page: config.and_then(|c| c.toc_page).unwrap_or(true),
        early_access,
        empty_chapters,
        page_size,
    })
}

fn build_client(settings: &Settings) -> Result<PoliteClient, CliRunError> {
    let mut builder = PoliteClient::builder()
        .delay_secs(settings.delay_secs)
        .timeout_secs(settings.timeout_secs)
        .retry_count(settings.retry_count)
        .retry_backoff_secs(settings.retry_backoff_secs.clone());
    if let Some(ua) = &settings.user_agent {
        builder = builder.user_agent(ua.clone());
    }
    builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))
}

fn output_path_for(args: &Args, settings: &Settings, series: &SeriesUrl) -> PathBuf {
    match &args.output {
        Some(p) => p.clone(),
        None => settings.output_dir.join(format!(
            "{}.{}",
            sanitize_file_stem(&series.slug),
            args.format.extension()
        )),
    }
}

/// Lazily created chapter progress bar.
struct Progress {
    bar: RefCell<Option<ProgressBar>>,
}

impl Progress {
    fn new() -> Self {
        Self {
            bar: RefCell::new(None),
        }
    }

    fn update(&self, n: u32, total: u32) {
        if total == 0 {
            return;
        }
        let mut slot = self.bar.borrow_mut();
        let bar = slot.get_or_insert_with(|| {
            let bar = ProgressBar::new(u64::from(total));
            if let Ok(style) =
                ProgressStyle::default_bar().template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        bar.set_position(u64::from(n));
        bar.set_message(format!("Fetching part {}/{}", n, total));
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Load a resume file. A missing file means a fresh start.
fn load_resume(path: &Path, series: &SeriesUrl) -> Result<Option<Book>, CliRunError> {
    let file = match std::fs::File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CliRunError::InvalidInput(format!(
                "Cannot read resume file {}: {}",
                path.display(),
                e
            )))
        }
    };
    let book: Book = serde_json::from_reader(file).map_err(|e| {
        CliRunError::InvalidInput(format!("Invalid resume file {}: {}", path.display(), e))
    })?;
    if let Some(source) = &book.source_url {
        if source.trim_end_matches('/') != series.url {
            return Err(CliRunError::InvalidInput(format!(
                "Resume file is for a different series ({}). Use the same URL as the original run ({}).",
                source, series.url
            )));
        }
    }
    Ok(Some(book))
}

fn save_checkpoint(path: &Path, book: &Book) {
    let written = std::fs::File::create(path).and_then(|f| {
        serde_json::to_writer(f, book)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    });
    if let Err(e) = written {
        eprintln!(
            "Warning: could not write resume file {}: {}",
            path.display(),
            e
        );
    }
}

fn write_json(book: &Book, path: &Path) -> Result<(), CliRunError> {
    let file = std::fs::File::create(path).map_err(|source| {
        CliRunError::Epub(EpubError::CreateFile {
            path: path.to_path_buf(),
            source,
        })
    })?;
    serde_json::to_writer_pretty(file, book)
        .map_err(|e| CliRunError::Validation(format!("Failed to write JSON {}: {}", path.display(), e)))
}

/// Entry point for the CLI.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    if args.urls.len() > 1 && (args.output.is_some() || args.resume.is_some()) {
        return Err(CliRunError::InvalidInput(
            "--output and --resume can only be used with a single URL.".to_string(),
        ));
    }
    let series: Vec<SeriesUrl> = args
        .urls
        .iter()
        .map(|u| parse_series_url(u).map_err(invalid_url))
        .collect::<Result<_, _>>()?;

    let config = config::load_config().map_err(|e| CliRunError::InvalidInput(e.to_string()))?;
    let settings = resolve_settings(args, config.as_ref())?;
    let mut client = build_client(&settings)?;

    for s in &series {
        run_one(args, &settings, &mut client, s)?;
    }
    Ok(())
}

fn invalid_url(e: ScraperError) -> CliRunError {
    match e {
        ScraperError::InvalidUrl { input, reason } => CliRunError::InvalidInput(format!(
            "Expected a series URL such as https://tamil.pratilipi.com/series/<slug>. Invalid: {}: {}",
            input, reason
        )),
        ScraperError::UnrecognizedHost { host } => CliRunError::InvalidInput(format!(
            "Unsupported site: {}. Only pratilipi.com series URLs are supported.",
            host
        )),
        other => CliRunError::Scraper(other),
    }
}

fn run_one(
    args: &Args,
    settings: &Settings,
    client: &mut PoliteClient,
    series: &SeriesUrl,
) -> Result<(), CliRunError> {
    let output_path = output_path_for(args, settings, series);

    if args.dry_run {
        let options = ScrapeOptions {
            progress: None,
            chapter_range: args.chapters,
            initial_book: None,
            on_checkpoint: None,
            early_access_behavior: Some(settings.early_access),
            empty_chapter_behavior: Some(settings.empty_chapters),
            page_size: settings.page_size,
            toc_only: true,
        };
        let book = scrape_book(&series.url, client, &options)?;
        eprintln!("Title: {}", book.title);
        eprintln!("Chapters: {}", book.chapters.len());
        eprintln!("Output: {}", output_path.display());
        return Ok(());
    }

    validate_output_path(&output_path)?;

    let initial_book = match &args.resume {
        Some(path) => load_resume(path, series)?,
        None => None,
    };
    let progress = Progress::new();
    let progress_cb = |n: u32, total: u32| progress.update(n, total);
    let checkpoint_cb = |book: &Book| {
        if let Some(path) = &args.resume {
            save_checkpoint(path, book);
        }
    };
    let progress_fn: Option<&dyn Fn(u32, u32)> = if args.quiet {
        None
    } else {
        Some(&progress_cb)
    };
    let checkpoint_fn: Option<&dyn Fn(&Book)> = if args.resume.is_some() {
        Some(&checkpoint_cb)
    } else {
        None
    };
    let options = ScrapeOptions {
        progress: progress_fn,
        chapter_range: args.chapters,
        initial_book: initial_book.as_ref(),
        on_checkpoint: checkpoint_fn,
        early_access_behavior: Some(settings.early_access),
        empty_chapter_behavior: Some(settings.empty_chapters),
        page_size: settings.page_size,
        toc_only: false,
    };
    let scraped = scrape_book(&series.url, client, &options);
    progress.finish();
    let book = scraped?;

    match args.format {
        OutputFormat::Json => write_json(&book, &output_path)?,
        OutputFormat::Epub => {
            let epub_options = EpubOptions {
                version: if args.epub_2 {
                    EpubVersion::Epub2
                } else {
                    EpubVersion::Epub3
                },
                epub3_include_ncx: args.ncx,
                include_toc_page: settings.include_toc_page,
            };
            write_epub(&book, &output_path, epub_options, client)?;
            if args.validate {
                validate_epub(&output_path)?;
            }
        }
    }

    if !args.quiet {
        eprintln!("Wrote {}", output_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> Result<Args, clap::Error> {
        let mut argv = vec!["pratilipi2epub"];
        argv.extend_from_slice(extra);
        Args::try_parse_from(argv)
    }

    fn series(slug: &str) -> Result<SeriesUrl, ScraperError> {
        parse_series_url(&format!("https://tamil.pratilipi.com/series/{}", slug))
    }

    #[test]
    fn sanitize_file_stem_cases() {
        assert_eq!(sanitize_file_stem("en-kadhal-XYZ123"), "en-kadhal-xyz123");
        assert_eq!(sanitize_file_stem("--a  b!!"), "a-b");
        assert_eq!(sanitize_file_stem("என் காதல்"), "book");
        assert_eq!(sanitize_file_stem(""), "book");
    }

    #[test]
    fn parse_chapter_range_valid() -> Result<(), String> {
        assert_eq!(parse_chapter_range("1-10")?, (1, 10));
        assert_eq!(parse_chapter_range(" 4 - 4 ")?, (4, 4));
        Ok(())
    }

    #[test]
    fn parse_chapter_range_invalid() {
        assert!(parse_chapter_range("7").is_err());
        assert!(parse_chapter_range("a-3").is_err());
        assert!(parse_chapter_range("9-2").is_err());
        assert!(parse_chapter_range("0-2").is_err());
    }

    #[test]
    fn parse_policies() -> Result<(), String> {
        assert_eq!(parse_early_access("SKIP")?, EarlyAccessBehavior::Skip);
        assert_eq!(parse_early_access("placeholder")?, EarlyAccessBehavior::Placeholder);
        assert_eq!(parse_early_access("fail")?, EarlyAccessBehavior::Fail);
        assert!(parse_early_access("maybe").is_err());
        assert_eq!(parse_empty_chapter_behavior("Fail")?, EmptyChapterBehavior::Fail);
        assert!(parse_empty_chapter_behavior("").is_err());
        Ok(())
    }

    #[test]
    fn parse_format_values() -> Result<(), String> {
        assert_eq!(parse_format("EPUB")?, OutputFormat::Epub);
        assert_eq!(parse_format("json")?, OutputFormat::Json);
        assert!(parse_format("html").is_err());
        Ok(())
    }

    #[test]
    fn args_require_a_url() {
        assert!(args(&[]).is_err());
    }

    #[test]
    fn args_accept_many_urls_and_flags() -> Result<(), clap::Error> {
        let a = args(&[
            "--early-access",
            "placeholder",
            "--chapters",
            "2-5",
            "https://tamil.pratilipi.com/series/a",
            "https://hindi.pratilipi.com/series/b",
        ])?;
        assert_eq!(a.urls.len(), 2);
        assert_eq!(a.early_access, Some(EarlyAccessBehavior::Placeholder));
        assert_eq!(a.chapters, Some((2, 5)));
        assert_eq!(a.format, OutputFormat::Epub);
        Ok(())
    }

    #[test]
    fn output_with_many_urls_is_invalid_input() -> Result<(), clap::Error> {
        let a = args(&[
            "-o",
            "x.epub",
            "https://tamil.pratilipi.com/series/a",
            "https://tamil.pratilipi.com/series/b",
        ])?;
        let err = run(&a).err();
        assert_eq!(err.map(|e| e.exit_code()), Some(1));
        Ok(())
    }

    #[test]
    fn bad_url_is_invalid_input() -> Result<(), clap::Error> {
        let a = args(&["https://example.com/series/a"])?;
        match run(&a) {
            Err(CliRunError::InvalidInput(msg)) => assert!(msg.contains("example.com")),
            other => panic!("expected InvalidInput, got {:?}", other),
        }
        Ok(())
    }

    #[test]
    fn settings_defaults_without_config() -> Result<(), Box<dyn std::error::Error>> {
        let a = args(&["https://tamil.pratilipi.com/series/a"])?;
        let s = resolve_settings(&a, None)?;
        assert_eq!(s.output_dir, PathBuf::from("."));
        assert_eq!(s.delay_secs, DEFAULT_DELAY_SECS);
        assert_eq!(s.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(s.retry_count, DEFAULT_RETRY_COUNT);
        assert_eq!(s.retry_backoff_secs, DEFAULT_BACKOFF_SECS.to_vec());
        assert!(s.include_toc_page);
        assert_eq!(s.early_access, EarlyAccessBehavior::Skip);
        assert_eq!(s.empty_chapters, EmptyChapterBehavior::Skip);
        assert_eq!(s.page_size, None);
        Ok(())
    }

    #[test]
    fn flags_override_config() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(
            r#"
            request_delay_secs = 9
            timeout_secs = 90
            early_access = "fail"
            empty_chapters = "placeholder"
            page_size = 20
            toc_page = false
            "#,
        )?;
        let a = args(&[
            "--delay",
            "1",
            "--early-access",
            "skip",
            "https://tamil.pratilipi.com/series/a",
        ])?;
        let s = resolve_settings(&a, Some(&config))?;
        assert_eq!(s.delay_secs, 1);
        assert_eq!(s.timeout_secs, 90);
        assert_eq!(s.early_access, EarlyAccessBehavior::Skip);
        assert_eq!(s.empty_chapters, EmptyChapterBehavior::Placeholder);
        assert_eq!(s.page_size, Some(20));
        assert!(!s.include_toc_page);
        Ok(())
    }

    #[test]
    fn invalid_config_policy_is_invalid_input() -> Result<(), Box<dyn std::error::Error>> {
        let config: Config = toml::from_str(r#"early_access = "sometimes""#)?;
        let a = args(&["https://tamil.pratilipi.com/series/a"])?;
        let err = resolve_settings(&a, Some(&config)).err();
        assert_eq!(err.map(|e| e.exit_code()), Some(1));
        Ok(())
    }

    #[test]
    fn default_output_path_uses_output_dir_and_slug() -> Result<(), Box<dyn std::error::Error>> {
        let a = args(&["--format", "json", "https://tamil.pratilipi.com/series/My-Story-ab12"])?;
        let mut s = resolve_settings(&a, None)?;
        s.output_dir = PathBuf::from("out");
        let path = output_path_for(&a, &s, &series("My-Story-ab12")?);
        assert_eq!(path, PathBuf::from("out/my-story-ab12.json"));
        Ok(())
    }

    #[test]
    fn explicit_output_path_wins() -> Result<(), Box<dyn std::error::Error>> {
        let a = args(&["-o", "book.epub", "https://tamil.pratilipi.com/series/a"])?;
        let s = resolve_settings(&a, None)?;
        assert_eq!(output_path_for(&a, &s, &series("a")?), PathBuf::from("book.epub"));
        Ok(())
    }

    #[test]
    fn validate_output_path_parent() {
        let ok = std::env::temp_dir().join("pratilipi2epub_cli_out.epub");
        assert!(validate_output_path(&ok).is_ok());
        let missing = PathBuf::from("/nonexistent_pratilipi2epub_dir/out.epub");
        assert!(matches!(
            validate_output_path(&missing),
            Err(CliRunError::InvalidInput(_))
        ));
    }

    #[test]
    fn resume_missing_file_is_fresh_start() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join("pratilipi2epub_resume_absent.json");
        if path.exists() {
            std::fs::remove_file(&path)?;
        }
        assert!(load_resume(&path, &series("a")?)?.is_none());
        Ok(())
    }

    #[test]
    fn resume_for_other_series_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
        let path = std::env::temp_dir().join("pratilipi2epub_resume_other.json");
        let book = Book {
            title: "T".to_string(),
            author: "A".to_string(),
            language: "ta".to_string(),
            description: None,
            cover_url: None,
            chapters: Vec::new(),
            source_url: Some("https://tamil.pratilipi.com/series/other".to_string()),
        };
        save_checkpoint(&path, &book);
        assert!(matches!(
            load_resume(&path, &series("a")?),
            Err(CliRunError::InvalidInput(_))
        ));
        let same = load_resume(&path, &series("other")?)?;
        assert_eq!(same.map(|b| b.title), Some("T".to_string()));
        Ok(())
    }

    #[test]
    fn exit_codes() {
        assert_eq!(CliRunError::InvalidInput("x".into()).exit_code(), 1);
        assert_eq!(
            CliRunError::Scraper(ScraperError::EmptyChapterList).exit_code(),
            2
        );
        assert_eq!(CliRunError::Epub(EpubError::NoChapters).exit_code(), 3);
        assert_eq!(CliRunError::Validation("bad".into()).exit_code(), 3);
    }
}
