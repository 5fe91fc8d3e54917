//! YouTube watch-page converter
//!
//! Handles YouTube specially, focusing on the video title, metadata,
//! description, and transcript. Applies only when both the extension hint
//! and the watch-page URL pattern match; otherwise the generic HTML
//! converter takes over.

use crate::convert::{extract_attribute, extract_title};
use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

/// URL prefix that marks a watch page
const WATCH_PREFIX: &str = "https://www.youtube.com/watch?";

pub struct YouTubeConverter {
    client: reqwest::blocking::Client,
}

impl YouTubeConverter {
    /// Create a converter that fetches transcripts with the given User-Agent
    pub fn new(user_agent: &str) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();
        Self { client }
    }

    /// Transcript text for the caption track embedded in the page, if any
    fn fetch_transcript(&self, html: &str) -> Result<Option<String>, ConvertError> {
        let Some(player) = embedded_json(html, "ytInitialPlayerResponse") else {
            return Ok(None);
        };
        let Some(tracks) = find_key(&player, "captionTracks") else {
            return Ok(None);
        };
        let Some(base_url) = tracks
            .get(0)
            .and_then(|t| t.get("baseUrl"))
            .and_then(Value::as_str)
        else {
            return Ok(None);
        };

        let body = self
            .client
            .get(base_url)
            .send()?
            .error_for_status()?
            .text()
            .map_err(|e| ConvertError::Failed(format!("could not read transcript: {e}")))?;
        Ok(Some(parse_transcript_xml(&body)?))
    }
}

impl DocumentConverter for YouTubeConverter {
    fn name(&self) -> &'static str {
        "youtube"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".html", ".htm"]) {
            return Ok(None);
        }
        let Some(url) = hints.url.as_deref() else {
            return Ok(None);
        };
        if !url.starts_with(WATCH_PREFIX) {
            return Ok(None);
        }

        let html = fs::read_to_string(path)
            .map_err(|e| ConvertError::Failed(format!("could not read page: {e}")))?;

        // Page title plus <meta> tag properties
        let mut metadata: HashMap<String, String> = HashMap::new();
        if let Some(title) = extract_title(&html) {
            metadata.insert("title".to_string(), title);
        }
        collect_meta_tags(&html, &mut metadata);

        // The full description lives in the embedded ytInitialData blob.
        // Reaching into page internals is brittle, so failures are silent.
        if let Some(data) = embedded_json(&html, "ytInitialData") {
            if let Some(desc) = find_key(&data, "attributedDescriptionBodyText")
                .and_then(|v| v.get("content"))
                .and_then(Value::as_str)
            {
                metadata.insert("description".to_string(), desc.to_string());
            }
        }

        video_id(url).ok_or_else(|| {
            ConvertError::Failed("watch URL has no video identifier".to_string())
        })?;

        let mut webpage_text = String::from("# YouTube\n");

        let title = first_of(&metadata, &["title", "og:title", "name"]);
        if let Some(title) = &title {
            webpage_text.push_str(&format!("\n## {title}\n"));
        }

        let mut stats = String::new();
        if let Some(views) = first_of(&metadata, &["interactionCount"]) {
            stats.push_str(&format!("- **Views:** {views}\n"));
        }
        if let Some(keywords) = first_of(&metadata, &["keywords"]) {
            stats.push_str(&format!("- **Keywords:** {keywords}\n"));
        }
        if let Some(runtime) = first_of(&metadata, &["duration"]) {
            stats.push_str(&format!("- **Runtime:** {runtime}\n"));
        }
        if !stats.is_empty() {
            webpage_text.push_str(&format!("\n### Video Metadata\n{stats}\n"));
        }

        if let Some(description) = first_of(&metadata, &["description", "og:description"]) {
            webpage_text.push_str(&format!("\n### Description\n{description}\n"));
        }

        if let Some(transcript) = self.fetch_transcript(&html)? {
            if !transcript.is_empty() {
                webpage_text.push_str(&format!("\n### Transcript\n{transcript}\n"));
            }
        }

        Ok(Some(ConversionResult {
            title,
            text: webpage_text,
        }))
    }
}

/// The `v` query parameter of a watch URL
fn video_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .query_pairs()
        .find(|(k, _)| k == "v")
        .map(|(_, v)| v.into_owned())
}

/// First value present in `map` among `keys`
fn first_of(map: &HashMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| map.get(*k).cloned())
}

/// Collect `<meta>` tags keyed by their itemprop/property/name attribute
fn collect_meta_tags(html: &str, metadata: &mut HashMap<String, String>) {
    let lower = html.to_ascii_lowercase();
    let mut from = 0;
    while let Some(found) = lower[from..].find("<meta") {
        let open = from + found;
        let Some(close) = lower[open..].find('>').map(|i| open + i) else {
            break;
        };
        let tag = &html[open + 1..close];
        for attr in ["itemprop", "property", "name"] {
            if let Some(key) = extract_attribute(tag, attr) {
                let content = extract_attribute(tag, "content").unwrap_or_default();
                metadata.insert(key, content);
                break;
            }
        }
        from = close + 1;
    }
}

/// Parse the first JSON object on the line that mentions `marker`
fn embedded_json(html: &str, marker: &str) -> Option<Value> {
    let idx = html.find(marker)?;
    let line_end = html[idx..]
        .find(['\r', '\n'])
        .map(|i| idx + i)
        .unwrap_or(html.len());
    let line = &html[idx..line_end];
    let start = line.find('{')?;
    let end = line.rfind('}')?;
    if end < start {
        return None;
    }
    serde_json::from_str(&line[start..=end]).ok()
}

/// Depth-first search for the first occurrence of `key` in a JSON tree
fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Array(items) => items.iter().find_map(|item| find_key(item, key)),
        Value::Object(map) => {
            for (k, v) in map {
                if k == key {
                    return Some(v);
                }
                if let Some(found) = find_key(v, key) {
                    return Some(found);
                }
            }
            None
        }
        _ => None,
    }
}

/// Flatten a timedtext XML document into a single line of caption text
fn parse_transcript_xml(xml: &str) -> Result<String, ConvertError> {
    let mut reader = Reader::from_str(xml);
    let mut parts: Vec<String> = Vec::new();
    let mut in_text = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.name().as_ref() == b"text" => in_text = true,
            Ok(Event::Text(t)) if in_text => {
                let part = t.unescape().map(|c| c.into_owned()).unwrap_or_default();
                let part = part.trim().to_string();
                if !part.is_empty() {
                    parts.push(part);
                }
            }
            Ok(Event::End(e)) if e.name().as_ref() == b"text" => in_text = false,
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(ConvertError::Failed(format!("invalid transcript XML: {e}")));
            }
            _ => {}
        }
    }
    Ok(parts.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const WATCH_URL: &str = "https://www.youtube.com/watch?v=dQw4w9WgXcQ";

    const PAGE: &str = concat!(
        "<html><head><title>Demo Video - YouTube</title>\n",
        r#"<meta itemprop="interactionCount" content="1234">"#,
        "\n",
        r#"<meta name="keywords" content="demo, video">"#,
        "\n",
        r#"<meta itemprop="duration" content="PT4M13S">"#,
        "\n",
        "</head><body>\n",
        r#"<script>var ytInitialData = {"contents":{"x":[{"attributedDescriptionBodyText":{"content":"A demo description."}}]}};</script>"#,
        "\n",
        "</body></html>"
    );

    fn page_file(contents: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents.as_bytes()).unwrap();
        f
    }

    fn hints(url: &str) -> ConvertHints {
        ConvertHints {
            extension: Some(".html".to_string()),
            url: Some(url.to_string()),
        }
    }

    #[test]
    fn test_declines_non_watch_urls() {
        let converter = YouTubeConverter::new("test");
        let f = page_file(PAGE);
        let res = converter
            .convert(f.path(), &hints("https://www.youtube.com/feed/library"))
            .unwrap();
        assert!(res.is_none());

        let res = converter
            .convert(f.path(), &ConvertHints::with_extension(".html"))
            .unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_renders_metadata_sections() {
        let converter = YouTubeConverter::new("test");
        let f = page_file(PAGE);
        let res = converter.convert(f.path(), &hints(WATCH_URL)).unwrap().unwrap();
        assert_eq!(res.title.as_deref(), Some("Demo Video - YouTube"));
        assert!(res.text.starts_with("# YouTube\n"));
        assert!(res.text.contains("## Demo Video - YouTube"));
        assert!(res.text.contains("- **Views:** 1234"));
        assert!(res.text.contains("- **Keywords:** demo, video"));
        assert!(res.text.contains("- **Runtime:** PT4M13S"));
        assert!(res.text.contains("### Description\nA demo description."));
    }

    #[test]
    fn test_missing_video_id_is_recoverable() {
        let converter = YouTubeConverter::new("test");
        let f = page_file(PAGE);
        let res = converter.convert(f.path(), &hints("https://www.youtube.com/watch?t=10"));
        assert!(matches!(res, Err(ConvertError::Failed(_))));
    }

    #[test]
    fn test_find_key_depth_first() {
        let value: Value = serde_json::from_str(
            r#"{"a":[{"b":1},{"c":{"needle":"found"}}],"needle":"shallow-after"}"#,
        )
        .unwrap();
        // Object iteration reaches the nested needle under "a" first
        assert_eq!(
            find_key(&value, "needle").and_then(Value::as_str),
            Some("found")
        );
        assert!(find_key(&value, "missing").is_none());
    }

    #[test]
    fn test_parse_transcript_xml() {
        let xml = r#"<transcript><text start="0" dur="2">Hello</text><text start="2" dur="2">world &amp; beyond</text></transcript>"#;
        assert_eq!(parse_transcript_xml(xml).unwrap(), "Hello world & beyond");
    }
}
