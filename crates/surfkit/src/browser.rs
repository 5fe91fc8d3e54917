//! Stateful text browser
//!
//! An extremely simple text-based browser, comparable to Lynx, suitable for
//! agentic use. Pages are whatever the conversion engine produces for an
//! address: web pages, search results, local files, downloaded documents.
//! Content is paginated into fixed-size viewports aligned on whitespace,
//! with incremental find support across viewports.
//!
//! Browsing failures are page content, not errors: `visit_page` always
//! returns a viewport string.

use crate::engine::{ConvertEngine, EngineConfig};
use crate::error::ConvertError;
use crate::search::SearchBackend;
use crate::sniff;
use crate::types::ConvertHints;
use percent_encoding::percent_decode_str;
use regex::Regex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{info, warn};
use url::Url;

/// Bound on collision-avoidance renames for downloads
const MAX_DOWNLOAD_SUFFIX: usize = 1000;

/// Browser configuration.
///
/// `request_headers` is an opaque pass-through map (cookies included) merged
/// into every outbound request the browser makes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Address visited on construction
    pub start_page: String,
    /// Nominal viewport width in bytes
    pub viewport_size: usize,
    /// Where downloads land; the system temp directory when unset
    pub downloads_folder: Option<PathBuf>,
    /// Base URL of the SearxNG-compatible search instance
    pub search_url: String,
    /// Extra headers (cookies, auth) sent with every request
    pub request_headers: HashMap<String, String>,
    /// Conversion engine settings
    pub engine: EngineConfig,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            start_page: "about:blank".to_string(),
            viewport_size: crate::DEFAULT_VIEWPORT_SIZE,
            downloads_folder: None,
            search_url: crate::DEFAULT_SEARCH_URL.to_string(),
            request_headers: HashMap::new(),
            engine: EngineConfig::default(),
        }
    }
}

/// Text-mode browser with linear navigation history
pub struct TextBrowser {
    viewport_size: usize,
    downloads_folder: Option<PathBuf>,
    request_headers: HashMap<String, String>,
    client: reqwest::blocking::Client,
    engine: ConvertEngine,
    search: SearchBackend,

    history: Vec<(String, SystemTime)>,
    page_title: Option<String>,
    page_content: String,
    viewport_pages: Vec<(usize, usize)>,
    viewport_current_page: usize,

    find_query: Option<String>,
    find_last_result: Option<usize>,
}

impl Default for TextBrowser {
    fn default() -> Self {
        Self::new(BrowserConfig::default())
    }
}

impl TextBrowser {
    /// Create a browser and visit its start page
    pub fn new(config: BrowserConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.engine.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_default();
        let search = SearchBackend::new(config.search_url, &config.engine.user_agent);
        let engine = ConvertEngine::new(config.engine);

        let mut browser = Self {
            viewport_size: config.viewport_size.max(1),
            downloads_folder: config.downloads_folder,
            request_headers: config.request_headers,
            client,
            engine,
            search,
            history: Vec::new(),
            page_title: None,
            page_content: String::new(),
            viewport_pages: Vec::new(),
            viewport_current_page: 0,
            find_query: None,
            find_last_result: None,
        };
        browser.set_address(&config.start_page, None);
        browser
    }

    /// Address of the current page
    pub fn address(&self) -> &str {
        self.history
            .last()
            .map(|(address, _)| address.as_str())
            .unwrap_or("about:blank")
    }

    /// Title of the current page, when known
    pub fn page_title(&self) -> Option<&str> {
        self.page_title.as_deref()
    }

    /// Full text of the current page
    pub fn page_content(&self) -> &str {
        &self.page_content
    }

    /// Text of the current viewport
    pub fn viewport(&self) -> &str {
        let (start, end) = self.viewport_pages[self.viewport_current_page];
        &self.page_content[start..end]
    }

    /// Current viewport number and total, 1-based
    pub fn viewport_position(&self) -> (usize, usize) {
        (self.viewport_current_page + 1, self.viewport_pages.len())
    }

    /// Navigation history: `(address, visit time)`, oldest first
    pub fn history(&self) -> &[(String, SystemTime)] {
        &self.history
    }

    /// Navigate to an address and return the first viewport of the result.
    ///
    /// Never fails: network errors, unsupported formats, and missing files
    /// all render as page content.
    pub fn visit_page(&mut self, uri_or_path: &str, filter_year: Option<u16>) -> &str {
        self.set_address(uri_or_path, filter_year);
        self.viewport()
    }

    /// Navigate to an address.
    ///
    /// Recognized shapes: `about:blank`, `search:<query>`, `http(s)://`,
    /// `file://`, and bare paths, which resolve against the previous
    /// history entry (the history entry is rewritten to the resolved form).
    pub fn set_address(&mut self, uri_or_path: &str, filter_year: Option<u16>) {
        self.history
            .push((uri_or_path.to_string(), SystemTime::now()));

        if uri_or_path == "about:blank" {
            self.page_title = None;
            self.set_page_content(String::new());
        } else if let Some(query) = uri_or_path.strip_prefix("search:") {
            let page = self.search.search(
                query.trim(),
                filter_year,
                &self.history,
                &self.request_headers,
            );
            self.page_title = Some(page.title);
            self.set_page_content(page.content);
        } else {
            let mut target = uri_or_path.to_string();
            let has_scheme = target.starts_with("http:")
                || target.starts_with("https:")
                || target.starts_with("file:");
            if !has_scheme && self.history.len() > 1 {
                let prior = &self.history[self.history.len() - 2].0;
                if let Some(resolved) = Url::parse(prior)
                    .ok()
                    .and_then(|base| base.join(&target).ok())
                {
                    target = resolved.to_string();
                    if let Some(last) = self.history.last_mut() {
                        last.0 = target.clone();
                    }
                }
            }
            self.fetch_page(&target);
        }

        self.viewport_current_page = 0;
        self.find_query = None;
        self.find_last_result = None;
    }

    /// Move one viewport forward, clamped at the last page
    pub fn page_down(&mut self) {
        self.viewport_current_page =
            (self.viewport_current_page + 1).min(self.viewport_pages.len() - 1);
    }

    /// Move one viewport back, clamped at the first page
    pub fn page_up(&mut self) {
        self.viewport_current_page = self.viewport_current_page.saturating_sub(1);
    }

    /// Search for the query from the current viewport forward, looping back
    /// to the start if necessary. Returns the matching viewport's text.
    ///
    /// Repeating the same query while positioned on its last match behaves
    /// like [`find_next`](Self::find_next).
    pub fn find_on_page(&mut self, query: &str) -> Option<String> {
        if self.find_query.as_deref() == Some(query)
            && self.find_last_result == Some(self.viewport_current_page)
        {
            return self.find_next();
        }

        self.find_query = Some(query.to_string());
        let matched = build_find_pattern(query)
            .and_then(|pattern| self.find_next_viewport(&pattern, self.viewport_current_page));
        self.apply_find_result(matched)
    }

    /// Scroll to the next viewport matching the previous query, wrapping
    /// around at the end. No-op when no query was set.
    pub fn find_next(&mut self) -> Option<String> {
        let query = self.find_query.clone()?;

        let starting_viewport = match self.find_last_result {
            None => 0,
            Some(last) => {
                let next = last + 1;
                if next >= self.viewport_pages.len() {
                    0
                } else {
                    next
                }
            }
        };

        let matched = build_find_pattern(&query)
            .and_then(|pattern| self.find_next_viewport(&pattern, starting_viewport));
        self.apply_find_result(matched)
    }

    fn apply_find_result(&mut self, matched: Option<usize>) -> Option<String> {
        match matched {
            Some(index) => {
                self.viewport_current_page = index;
                self.find_last_result = Some(index);
                Some(self.viewport().to_string())
            }
            None => {
                self.find_last_result = None;
                None
            }
        }
    }

    /// Search viewports from `starting_viewport`, wrapping once
    fn find_next_viewport(&self, pattern: &Regex, starting_viewport: usize) -> Option<usize> {
        let total = self.viewport_pages.len();
        let indices = (starting_viewport..total).chain(0..starting_viewport);
        for i in indices {
            let (start, end) = self.viewport_pages[i];
            let content = normalize_for_find(&self.page_content[start..end]);
            if pattern.is_match(&content) {
                return Some(i);
            }
        }
        None
    }

    /// Update the viewport width. Takes effect on the next page load.
    pub fn set_viewport_size(&mut self, viewport_size: usize) {
        self.viewport_size = viewport_size.max(1);
    }

    /// Update the downloads folder
    pub fn set_downloads_folder(&mut self, folder: Option<PathBuf>) {
        self.downloads_folder = folder;
    }

    /// Replace the outbound header map
    pub fn set_request_headers(&mut self, headers: HashMap<String, String>) {
        self.request_headers = headers;
    }

    fn set_page_content(&mut self, content: String) {
        self.page_content = content;
        self.split_pages();
        if self.viewport_current_page >= self.viewport_pages.len() {
            self.viewport_current_page = self.viewport_pages.len() - 1;
        }
    }

    fn set_error_page(&mut self, title: impl Into<String>, content: String) {
        self.page_title = Some(title.into());
        self.set_page_content(content);
    }

    /// Partition the page into viewports.
    ///
    /// Search-result pages are never split so result ordering stays intact.
    /// Boundaries extend past the nominal size to land on whitespace, so a
    /// viewport never ends mid-word unless the text has no whitespace left.
    fn split_pages(&mut self) {
        let is_search_page = self.address().starts_with("search:");
        if is_search_page {
            self.viewport_pages = vec![(0, self.page_content.len())];
            return;
        }

        if self.page_content.is_empty() {
            self.viewport_pages = vec![(0, 0)];
            return;
        }

        self.viewport_pages.clear();
        let bytes = self.page_content.as_bytes();
        let mut start_idx = 0;
        while start_idx < bytes.len() {
            let mut end_idx = (start_idx + self.viewport_size).min(bytes.len());
            // Adjust to end on a space
            while end_idx < bytes.len() && !matches!(bytes[end_idx - 1], b' ' | b'\t' | b'\r' | b'\n')
            {
                end_idx += 1;
            }
            self.viewport_pages.push((start_idx, end_idx));
            start_idx = end_idx;
        }
    }

    /// Fetch an address and install the result as the current page
    fn fetch_page(&mut self, url: &str) {
        if let Some(rest) = url.strip_prefix("file://") {
            let local = percent_decode_str(rest).decode_utf8_lossy().into_owned();
            self.fetch_local(Path::new(&local), true);
            return;
        }
        if !url.starts_with("http://") && !url.starts_with("https://") {
            self.fetch_local(Path::new(url), false);
            return;
        }

        let response = match self
            .client
            .get(url)
            .headers(self.merged_headers())
            .send()
        {
            Ok(response) => response,
            Err(e) => {
                self.set_error_page("Error", format!("## Error\n\n{e}"));
                return;
            }
        };

        let status = response.status();
        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();

        if !status.is_success() {
            // If the error was rendered in HTML we might as well render it
            let code = status.as_u16();
            let body = response.text().unwrap_or_default();
            let detail = if content_type.contains("text/html") {
                crate::convert::convert_html(&body).text
            } else {
                body
            };
            self.set_error_page(format!("Error {code}"), format!("## Error {code}\n\n{detail}"));
            return;
        }

        if content_type.contains("text/") {
            match self.engine.convert_response(response, &ConvertHints::default()) {
                Ok(result) => {
                    self.page_title = result.title;
                    self.set_page_content(result.text);
                }
                Err(e) => {
                    self.set_error_page("Error", format!("## Error: {e}"));
                }
            }
            return;
        }

        // A download
        match self.save_download(url, response) {
            Ok(path) => {
                let uri = Url::from_file_path(&path)
                    .map(|u| u.to_string())
                    .unwrap_or_else(|_| format!("file://{}", path.display()));
                self.set_address(&uri, None);
            }
            Err(e) => {
                self.set_error_page("Error", format!("## Error\n\n{e}"));
            }
        }
    }

    /// Render a local file through the conversion engine
    fn fetch_local(&mut self, path: &Path, from_file_uri: bool) {
        match self.engine.convert_local(path, &ConvertHints::default()) {
            Ok(result) => {
                self.page_title = result.title;
                self.set_page_content(result.text);
            }
            Err(ConvertError::NotFound(missing)) => {
                self.set_error_page(
                    "Error 404",
                    format!("## Error 404\n\nFile not found: {missing}"),
                );
            }
            Err(e) if from_file_uri => {
                // The file exists but cannot be rendered; most commonly this
                // is the re-navigation step right after a download.
                warn!(path = %path.display(), error = %e, "local file not renderable");
                self.set_error_page(
                    "Download complete.",
                    format!("# Download complete\n\nSaved file to '{}'", path.display()),
                );
            }
            Err(e) => {
                self.set_error_page("Error", format!("## Error: {e}"));
            }
        }
    }

    /// Stream a non-text response body into the downloads folder.
    ///
    /// Name selection: sanitized URL basename; `__N` suffix on collision;
    /// random name with a best-guess extension when no usable name exists.
    fn save_download(
        &self,
        url: &str,
        mut response: reqwest::blocking::Response,
    ) -> Result<PathBuf, ConvertError> {
        let folder = self
            .downloads_folder
            .clone()
            .unwrap_or_else(std::env::temp_dir);
        fs::create_dir_all(&folder)?;

        let content_type = response
            .headers()
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let base_name = Url::parse(url)
            .ok()
            .and_then(|u| u.path().rsplit('/').next().map(|s| s.to_string()))
            .map(|s| percent_decode_str(&s).decode_utf8_lossy().into_owned())
            .map(|s| sanitize_filename(&s))
            .filter(|s| !s.is_empty());

        let path = match base_name {
            Some(name) => {
                let (stem, ext) = match name.rsplit_once('.') {
                    Some((stem, ext)) if !stem.is_empty() => {
                        (stem.to_string(), format!(".{ext}"))
                    }
                    _ => (name.clone(), String::new()),
                };
                let mut candidate = folder.join(&name);
                let mut suffix = 0;
                while candidate.exists() && suffix < MAX_DOWNLOAD_SUFFIX {
                    suffix += 1;
                    candidate = folder.join(format!("{stem}__{suffix}{ext}"));
                }
                candidate
            }
            None => {
                let ext = content_type
                    .as_deref()
                    .and_then(sniff::extension_for_mime)
                    .unwrap_or(".download");
                folder.join(format!("{}{ext}", uuid::Uuid::new_v4()))
            }
        };

        info!(url, path = %path.display(), "saving download");
        let mut file = fs::File::create(&path)?;
        response.copy_to(&mut file)?;
        Ok(path)
    }

    /// Configured pass-through headers as a header map
    fn merged_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for (name, value) in &self.request_headers {
            let Ok(name) = HeaderName::from_bytes(name.as_bytes()) else {
                warn!(header = %name, "skipping invalid header name");
                continue;
            };
            let Ok(value) = HeaderValue::from_str(value) else {
                warn!(header = %name, "skipping invalid header value");
                continue;
            };
            headers.insert(name, value);
        }
        headers
    }
}

/// Strip path separators and characters unsafe in filenames
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| {
            !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|') && !c.is_control()
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Collapse non-word runs to single spaces
fn squash_words(text: &str) -> String {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    for c in text.chars() {
        if c.is_alphanumeric() || c == '_' {
            current.push(c);
        } else if !current.is_empty() {
            words.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words.join(" ")
}

/// Normalize a find query into a regular expression.
///
/// Non-word runs collapse to single spaces, everything is lowercased, and a
/// literal `*` becomes an "any sequence" token attached to the prior word.
/// An empty normalized query matches nothing.
fn build_find_pattern(query: &str) -> Option<Regex> {
    let marked = query.replace('*', "__STAR__");
    let mut nquery = format!(" {} ", squash_words(&marked));
    // Merge isolated stars with the prior word
    nquery = nquery.replace(" __STAR__ ", "__STAR__ ");
    let nquery = nquery.replace("__STAR__", ".*").to_lowercase();

    if nquery.trim().is_empty() {
        return None;
    }
    Regex::new(&nquery).ok()
}

/// Normalize viewport content the same way find queries are normalized
fn normalize_for_find(content: &str) -> String {
    format!(" {} ", squash_words(content).to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blank_browser() -> TextBrowser {
        TextBrowser::default()
    }

    #[test]
    fn test_starts_at_about_blank() {
        let browser = blank_browser();
        assert_eq!(browser.address(), "about:blank");
        assert_eq!(browser.viewport(), "");
        assert_eq!(browser.viewport_position(), (1, 1));
        assert_eq!(browser.page_title(), None);
    }

    #[test]
    fn test_empty_page_has_one_empty_viewport() {
        let mut browser = blank_browser();
        browser.set_page_content(String::new());
        assert_eq!(browser.viewport_pages, vec![(0, 0)]);
    }

    #[test]
    fn test_short_text_is_one_viewport() {
        let mut browser = blank_browser();
        browser.set_page_content("a short page".to_string());
        assert_eq!(browser.viewport_pages.len(), 1);
        assert_eq!(browser.viewport(), "a short page");
    }

    #[test]
    fn test_pagination_splits_on_whitespace() {
        // 20,000 characters with the default 8192-byte viewport: 3 viewports,
        // every boundary on whitespace
        let mut browser = blank_browser();
        let content = "word ".repeat(4000);
        let content = content[..20000].to_string();
        browser.set_page_content(content.clone());
        assert_eq!(browser.viewport_pages.len(), 3);
        for &(_, end) in &browser.viewport_pages {
            if end < content.len() {
                let boundary = content.as_bytes()[end - 1];
                assert!(matches!(boundary, b' ' | b'\t' | b'\r' | b'\n'));
            }
        }
        // Contiguous, non-overlapping partition of the full text
        assert_eq!(browser.viewport_pages[0].0, 0);
        for pair in browser.viewport_pages.windows(2) {
            assert_eq!(pair[0].1, pair[1].0);
        }
        assert_eq!(browser.viewport_pages.last().map(|b| b.1), Some(content.len()));
    }

    #[test]
    fn test_whitespace_free_content_clamps_to_document_end() {
        let mut browser = blank_browser();
        browser.set_viewport_size(16);
        browser.set_page_content("x".repeat(100));
        assert_eq!(browser.viewport_pages, vec![(0, 100)]);
    }

    #[test]
    fn test_page_up_down_clamp() {
        let mut browser = blank_browser();
        browser.set_viewport_size(8);
        browser.set_page_content("one two three four five six seven eight nine ten".to_string());
        assert!(browser.viewport_pages.len() > 2);

        browser.page_up();
        assert_eq!(browser.viewport_current_page, 0);
        for _ in 0..100 {
            browser.page_down();
        }
        assert_eq!(
            browser.viewport_current_page,
            browser.viewport_pages.len() - 1
        );
    }

    #[test]
    fn test_find_on_blank_page_yields_no_match() {
        let mut browser = blank_browser();
        assert_eq!(browser.find_on_page("x"), None);
        assert_eq!(browser.find_last_result, None);
    }

    #[test]
    fn test_find_wraps_and_visits_each_match_once() {
        let mut browser = blank_browser();
        browser.set_viewport_size(8);
        browser.set_page_content("needle aa bb cc dd needle ee ff gg hh needle ii".to_string());
        let total = browser.viewport_pages.len();
        assert!(total >= 3);

        let matching: Vec<usize> = (0..total)
            .filter(|&i| {
                let (s, e) = browser.viewport_pages[i];
                browser.page_content[s..e].contains("needle")
            })
            .collect();
        assert!(matching.len() >= 2);

        assert!(browser.find_on_page("needle").is_some());
        let mut visited = vec![browser.viewport_current_page];
        for _ in 1..matching.len() {
            assert!(browser.find_next().is_some());
            visited.push(browser.viewport_current_page);
        }
        assert_eq!(visited, matching);

        // One more wraps to the first match again
        assert!(browser.find_next().is_some());
        assert_eq!(browser.viewport_current_page, matching[0]);
    }

    #[test]
    fn test_find_same_query_at_match_behaves_like_find_next() {
        let mut browser = blank_browser();
        browser.set_viewport_size(8);
        browser.set_page_content("needle aa bb cc dd needle ee".to_string());
        assert!(browser.find_on_page("needle").is_some());
        let first = browser.viewport_current_page;
        assert!(browser.find_on_page("needle").is_some());
        assert_ne!(browser.viewport_current_page, first);
    }

    #[test]
    fn test_find_normalizes_punctuation_and_case() {
        let mut browser = blank_browser();
        browser.set_page_content("Hello, World! Something else.".to_string());
        assert!(browser.find_on_page("hello world").is_some());
    }

    #[test]
    fn test_find_wildcard() {
        let mut browser = blank_browser();
        browser.set_page_content("prefix middle suffix".to_string());
        assert!(browser.find_on_page("prefix * suffix").is_some());
        assert!(browser.find_on_page("pre* suffix").is_some());
    }

    #[test]
    fn test_find_empty_query_matches_nothing() {
        let mut browser = blank_browser();
        browser.set_page_content("content".to_string());
        assert_eq!(browser.find_on_page("!!!"), None);
        assert_eq!(browser.find_on_page(""), None);
    }

    #[test]
    fn test_find_next_without_query_is_noop() {
        let mut browser = blank_browser();
        browser.set_page_content("content".to_string());
        assert_eq!(browser.find_next(), None);
    }

    #[test]
    fn test_visit_resets_search_state() {
        let mut browser = blank_browser();
        browser.set_page_content("needle".to_string());
        assert!(browser.find_on_page("needle").is_some());
        browser.set_address("about:blank", None);
        assert_eq!(browser.find_query, None);
        assert_eq!(browser.find_last_result, None);
        assert_eq!(browser.viewport_current_page, 0);
    }

    #[test]
    fn test_relative_address_resolves_against_prior_entry() {
        let mut browser = blank_browser();
        browser.set_address("file:///tmp/surfkit-test-dir/page.html", None);
        browser.set_address("other.txt", None);
        assert_eq!(browser.address(), "file:///tmp/surfkit-test-dir/other.txt");
        // Missing file renders as a 404 page rather than failing
        assert!(browser.page_content().contains("Error 404"));
    }

    #[test]
    fn test_missing_local_file_renders_404() {
        let mut browser = blank_browser();
        browser.set_address("file:///no/such/surfkit-file.txt", None);
        assert_eq!(browser.page_title(), Some("Error 404"));
        assert!(browser.page_content().contains("File not found"));
    }

    #[test]
    fn test_history_appends_every_visit() {
        let mut browser = blank_browser();
        browser.set_address("about:blank", None);
        browser.set_address("about:blank", None);
        assert_eq!(browser.history().len(), 3);
    }

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("report.pdf"), "report.pdf");
        assert_eq!(sanitize_filename("a/b\\c:d*e.pdf"), "abcde.pdf");
        assert_eq!(sanitize_filename("  spaced.txt  "), "spaced.txt");
        assert_eq!(sanitize_filename("///"), "");
    }

    #[test]
    fn test_build_find_pattern() {
        let pattern = build_find_pattern("Hello, World!").unwrap();
        assert!(pattern.is_match(" hello world "));
        assert!(!pattern.is_match(" hello there world "));

        let pattern = build_find_pattern("foo*").unwrap();
        assert!(pattern.is_match(" foobar "));

        assert!(build_find_pattern("??").is_none());
    }
}
