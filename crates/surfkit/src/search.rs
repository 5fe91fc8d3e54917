//! Search backend adapter
//!
//! Translates a `search:` pseudo-address into a query against a
//! SearxNG-compatible search API. Zero results with a year filter trigger
//! one retry without the filter; transport failures become page content
//! describing the error, never an error return.

use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, SystemTime};
use tracing::debug;

/// A rendered search-result page
#[derive(Debug, Clone)]
pub struct SearchPage {
    /// Page title, e.g. `rust browser - Search`
    pub title: String,
    /// Rendered result list (or error/no-result text)
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
struct SearchResult {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    url: String,
    #[serde(default)]
    content: String,
    #[serde(rename = "publishedDate", default)]
    published_date: Option<String>,
}

/// Client for the external search API
pub struct SearchBackend {
    base_url: String,
    client: reqwest::blocking::Client,
}

impl SearchBackend {
    /// Create a backend for the given SearxNG-compatible instance
    pub fn new(base_url: impl Into<String>, user_agent: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Base URL of the search instance
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Run a search and render the result page.
    ///
    /// `history` supplies the "previously visited" annotations; `headers`
    /// is the browser's opaque header pass-through.
    pub fn search(
        &self,
        query: &str,
        filter_year: Option<u16>,
        history: &[(String, SystemTime)],
        headers: &HashMap<String, String>,
    ) -> SearchPage {
        match self.attempt(query, filter_year, false, history, headers) {
            Ok(page) => page,
            Err(e) => SearchPage {
                title: "Search Error".to_string(),
                content: format!(
                    "## Search Error\n\nFailed to search: {e}\n\nPlease check the \
                     search backend URL: {}",
                    self.base_url
                ),
            },
        }
    }

    fn attempt(
        &self,
        query: &str,
        filter_year: Option<u16>,
        retry: bool,
        history: &[(String, SystemTime)],
        headers: &HashMap<String, String>,
    ) -> Result<SearchPage, reqwest::Error> {
        let mut params: Vec<(&str, String)> = vec![
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("engines", "google".to_string()),
        ];
        if let Some(year) = filter_year {
            if !retry {
                params.push(("time_range", format!("{year}-{year}")));
            }
        }

        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        debug!(url, query, retry, "search request");
        let mut request = self.client.get(&url).query(&params);
        for (name, value) in headers {
            request = request.header(name.as_str(), value.as_str());
        }
        let response = request.send()?.error_for_status()?;
        let parsed: SearchResponse = response.json()?;

        if parsed.results.is_empty() {
            if !retry && filter_year.is_some() {
                return self.attempt(query, filter_year, true, history, headers);
            }
            return Ok(SearchPage {
                title: format!("{query} - Search"),
                content: no_results_message(query, filter_year, retry),
            });
        }

        Ok(SearchPage {
            title: format!("{query} - Search"),
            content: render_results(query, &parsed.results, history, filter_year, retry),
        })
    }
}

fn no_results_message(query: &str, filter_year: Option<u16>, retried: bool) -> String {
    let year_message = filter_year
        .map(|y| format!(" with filter year={y}"))
        .unwrap_or_default();
    if retried {
        format!(
            "No results found for '{query}'{year_message}. Already searched removing \
             the year limitation, but no results were found. Try with a more general query."
        )
    } else {
        format!(
            "No results found for '{query}'{year_message}. Try with a more general \
             query, or remove the year filter."
        )
    }
}

fn render_results(
    query: &str,
    results: &[SearchResult],
    history: &[(String, SystemTime)],
    filter_year: Option<u16>,
    retried: bool,
) -> String {
    let mut snippets: Vec<String> = Vec::new();
    for (idx, result) in results.iter().enumerate() {
        let title = result
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| "No title".to_string());
        let date = result
            .published_date
            .as_deref()
            .filter(|d| !d.is_empty())
            .map(|d| format!("\nDate published: {d}"))
            .unwrap_or_default();
        let snippet = if result.content.is_empty() {
            String::new()
        } else {
            format!("\n{}", result.content)
        };
        let entry = format!(
            "{}. [{}]({}){}\n{}{}",
            idx + 1,
            title,
            result.url,
            date,
            previously_visited(&result.url, history),
            snippet
        );
        snippets.push(entry.replace("Your browser can't play this video.", ""));
    }

    let mut content = format!(
        "A search for '{query}' found {} results:\n\n## Web Results\n{}",
        snippets.len(),
        snippets.join("\n\n")
    );

    if retried {
        let year = filter_year.map(|y| y.to_string()).unwrap_or_default();
        content = format!(
            "No results were found for filtering year: {year}.\nREMOVED YEAR \
             FILTER.\n\nThe following results can be of any year.\n\n{content}\n"
        );
    }
    content
}

/// Annotation for a result URL that appears in navigation history
fn previously_visited(url: &str, history: &[(String, SystemTime)]) -> String {
    if url.is_empty() {
        return String::new();
    }
    for (address, stamp) in history.iter().rev() {
        if address == url {
            let seconds = stamp.elapsed().unwrap_or(Duration::ZERO).as_secs();
            return format!("You previously visited this page {seconds} seconds ago.\n");
        }
    }
    String::new()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(title: &str, url: &str, content: &str, date: Option<&str>) -> SearchResult {
        SearchResult {
            title: Some(title.to_string()),
            url: url.to_string(),
            content: content.to_string(),
            published_date: date.map(|d| d.to_string()),
        }
    }

    #[test]
    fn test_render_results_numbered_entries() {
        let results = vec![
            result("First", "https://a.example", "snippet a", Some("2024-01-01")),
            result("Second", "https://b.example", "", None),
        ];
        let content = render_results("q", &results, &[], None, false);
        assert!(content.starts_with("A search for 'q' found 2 results:"));
        assert!(content.contains("## Web Results"));
        assert!(content.contains("1. [First](https://a.example)\nDate published: 2024-01-01"));
        assert!(content.contains("snippet a"));
        assert!(content.contains("2. [Second](https://b.example)"));
    }

    #[test]
    fn test_render_results_previously_visited() {
        let history = vec![("https://a.example".to_string(), SystemTime::now())];
        let results = vec![result("First", "https://a.example", "", None)];
        let content = render_results("q", &results, &history, None, false);
        assert!(content.contains("You previously visited this page"));
        assert!(content.contains("seconds ago."));
    }

    #[test]
    fn test_render_results_retry_notice() {
        let results = vec![result("First", "https://a.example", "", None)];
        let content = render_results("q", &results, &[], Some(2019), true);
        assert!(content.starts_with("No results were found for filtering year: 2019."));
        assert!(content.contains("REMOVED YEAR FILTER."));
    }

    #[test]
    fn test_render_scrubs_video_notice() {
        let results = vec![result(
            "Clip",
            "https://v.example",
            "Your browser can't play this video. But here is text.",
            None,
        )];
        let content = render_results("q", &results, &[], None, false);
        assert!(!content.contains("Your browser can't play this video."));
        assert!(content.contains("But here is text."));
    }

    #[test]
    fn test_no_results_messages() {
        let plain = no_results_message("q", None, false);
        assert!(plain.contains("No results found for 'q'"));
        let with_year = no_results_message("q", Some(2020), false);
        assert!(with_year.contains("with filter year=2020"));
        let retried = no_results_message("q", Some(2020), true);
        assert!(retried.contains("Already searched removing the year limitation"));
    }
}
