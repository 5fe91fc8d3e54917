//! Conversion engine
//!
//! Resolves candidate extensions for a source, stages remote bodies in a
//! temporary file, and walks the converter registry until one converter
//! produces text. Converter failures are recoverable here; only a file that
//! cannot even be decoded as text makes a conversion call fail.

use crate::converters::{ConverterRegistry, PlainTextConverter};
use crate::error::ConvertError;
use crate::sniff;
use crate::types::{ConversionResult, ConvertHints};
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Connect timeout for engine-initiated fetches
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Total request timeout for engine-initiated fetches
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Settings for the external transcription service used by the audio
/// converter
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible transcription endpoint
    pub endpoint: String,
    /// Bearer token; transcription fails (recoverably) when unset
    pub api_key: Option<String>,
    /// Model name sent with each request
    pub model: String,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/audio/transcriptions".to_string(),
            api_key: None,
            model: "whisper-1".to_string(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// User-Agent sent on engine-initiated fetches
    pub user_agent: String,
    /// Transcription service settings
    pub transcription: TranscriptionConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            transcription: TranscriptionConfig::default(),
        }
    }
}

/// Multi-format document-to-text conversion engine
pub struct ConvertEngine {
    client: reqwest::blocking::Client,
    registry: ConverterRegistry,
}

impl Default for ConvertEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl ConvertEngine {
    /// Create an engine with the built-in converter registry
    pub fn new(config: EngineConfig) -> Self {
        let registry = ConverterRegistry::with_defaults(&config);
        Self::with_registry(config, registry)
    }

    /// Create an engine over a custom registry
    pub fn with_registry(config: EngineConfig, registry: ConverterRegistry) -> Self {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent)
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self { client, registry }
    }

    /// Convert a source, routed by shape: `http(s)://` URLs are fetched,
    /// `file://` URIs and bare paths are read locally
    pub fn convert(
        &self,
        source: &str,
        hints: &ConvertHints,
    ) -> Result<ConversionResult, ConvertError> {
        if source.starts_with("http://") || source.starts_with("https://") {
            self.convert_url(source, hints)
        } else if let Some(rest) = source.strip_prefix("file://") {
            let path = percent_decode_str(rest).decode_utf8_lossy().into_owned();
            self.convert_local(Path::new(&path), hints)
        } else {
            self.convert_local(Path::new(source), hints)
        }
    }

    /// Convert a local file
    pub fn convert_local(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<ConversionResult, ConvertError> {
        let mut extensions: Vec<String> = Vec::new();
        append_ext(&mut extensions, hints.extension.as_deref());
        append_ext(&mut extensions, path_extension(path).as_deref());
        append_ext(&mut extensions, sniff::guess_extension(path).as_deref());
        self.convert_with_extensions(path, &extensions, hints)
    }

    /// Fetch a URL and convert the response body
    pub fn convert_url(
        &self,
        url: &str,
        hints: &ConvertHints,
    ) -> Result<ConversionResult, ConvertError> {
        debug!(url, "fetching source for conversion");
        let response = self.client.get(url).send()?.error_for_status()?;
        self.convert_response(response, hints)
    }

    /// Convert an already-fetched response.
    ///
    /// The body is staged in a temporary file that is deleted on every exit
    /// path, including errors.
    pub fn convert_response(
        &self,
        mut response: reqwest::blocking::Response,
        hints: &ConvertHints,
    ) -> Result<ConversionResult, ConvertError> {
        let url = response.url().to_string();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let content_type = header("content-type");
        let content_disposition = header("content-disposition");

        let mut extensions: Vec<String> = Vec::new();
        append_ext(&mut extensions, hints.extension.as_deref());
        append_ext(&mut extensions, url_path_extension(&url).as_deref());
        if let Some(cd) = content_disposition.as_deref() {
            let ext = parse_content_disposition_filename(cd)
                .as_deref()
                .and_then(filename_extension);
            append_ext(&mut extensions, ext.as_deref());
        }
        if let Some(ct) = content_type.as_deref() {
            append_ext(&mut extensions, sniff::extension_for_mime(ct));
        }

        let mut temp = tempfile::NamedTempFile::new()?;
        response.copy_to(&mut temp)?;
        temp.flush()?;

        append_ext(&mut extensions, sniff::guess_extension(temp.path()).as_deref());

        let hints = ConvertHints {
            extension: hints.extension.clone(),
            url: Some(url),
        };
        self.convert_with_extensions(temp.path(), &extensions, &hints)
    }

    /// Try each candidate extension against each converter, in order
    fn convert_with_extensions(
        &self,
        path: &Path,
        extensions: &[String],
        hints: &ConvertHints,
    ) -> Result<ConversionResult, ConvertError> {
        let mut last_error: Option<String> = None;

        for ext in extensions {
            for converter in self.registry.converters() {
                let trial = ConvertHints {
                    extension: Some(ext.clone()),
                    url: hints.url.clone(),
                };
                match converter.convert(path, &trial) {
                    Ok(Some(result)) => {
                        debug!(converter = converter.name(), extension = %ext, "converted");
                        return Ok(normalize_result(result));
                    }
                    Ok(None) => {}
                    Err(e) => {
                        warn!(
                            converter = converter.name(),
                            extension = %ext,
                            error = %e,
                            "converter failed, trying next"
                        );
                        last_error = Some(e.to_string());
                    }
                }
            }
        }

        // Exhausted: one final raw text decode, ignoring extension gating
        match PlainTextConverter::read_text(path) {
            Ok(result) => Ok(normalize_result(result)),
            Err(ConvertError::NotFound(p)) => Err(ConvertError::NotFound(p)),
            Err(decode_error) => {
                let last_error = last_error.unwrap_or_else(|| decode_error.to_string());
                Err(ConvertError::Exhausted {
                    path: path.display().to_string(),
                    attempted: extensions.to_vec(),
                    last_error,
                })
            }
        }
    }
}

/// Strip trailing whitespace per line and collapse runs of blank lines
pub(crate) fn normalize_text(text: &str) -> String {
    let joined = text
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    let mut out = String::with_capacity(joined.len());
    let mut newlines = 0;
    for c in joined.chars() {
        if c == '\n' {
            newlines += 1;
            if newlines <= 2 {
                out.push(c);
            }
        } else {
            newlines = 0;
            out.push(c);
        }
    }
    out
}

fn normalize_result(mut result: ConversionResult) -> ConversionResult {
    result.text = normalize_text(&result.text);
    result
}

/// Append a non-empty candidate extension.
///
/// Duplicates are kept on purpose: repetition biases trial order but each
/// trial is idempotent.
fn append_ext(extensions: &mut Vec<String>, ext: Option<&str>) {
    if let Some(ext) = ext {
        let ext = ext.trim();
        if !ext.is_empty() {
            extensions.push(ext.to_string());
        }
    }
}

/// `.ext` of a local path
fn path_extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{e}"))
}

/// `.ext` of the last path segment of a URL
fn url_path_extension(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let name = parsed.path().rsplit('/').next()?;
    filename_extension(name)
}

/// `.ext` of a bare filename
fn filename_extension(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(format!(".{ext}"))
}

/// Parse filename from Content-Disposition header value
fn parse_content_disposition_filename(value: &str) -> Option<String> {
    let patterns = ["filename=\"", "filename="];
    for pattern in patterns {
        if let Some(start) = value.find(pattern) {
            let rest = &value[start + pattern.len()..];
            if pattern.ends_with('"') {
                // Quoted
                if let Some(end) = rest.find('"') {
                    return Some(rest[..end].to_string());
                }
            } else {
                // Unquoted - take until space or semicolon
                let end = rest
                    .find(|c: char| c.is_whitespace() || c == ';')
                    .unwrap_or(rest.len());
                let filename = rest[..end].trim_matches('"');
                if !filename.is_empty() {
                    return Some(filename.to_string());
                }
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_html_hint_selects_html_converter() {
        let engine = ConvertEngine::default();
        let mut f = tempfile::Builder::new().suffix(".html").tempfile().unwrap();
        f.write_all(b"<html><head><title>T</title></head><body><p>hello</p></body></html>")
            .unwrap();
        let res = engine
            .convert_local(f.path(), &ConvertHints::default())
            .unwrap();
        assert_eq!(res.title.as_deref(), Some("T"));
        assert!(res.text.contains("hello"));
    }

    #[test]
    fn test_unknown_extension_falls_back_to_text() {
        let engine = ConvertEngine::default();
        let mut f = tempfile::Builder::new().suffix(".conf").tempfile().unwrap();
        f.write_all(b"key = value").unwrap();
        let res = engine
            .convert_local(f.path(), &ConvertHints::default())
            .unwrap();
        assert_eq!(res.text, "key = value");
    }

    #[test]
    fn test_extensionless_text_still_decodes() {
        // No candidates at all: the last-resort decode must kick in
        let engine = ConvertEngine::default();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"bare prose with no extension").unwrap();
        let res = engine
            .convert_local(f.path(), &ConvertHints::default())
            .unwrap();
        assert_eq!(res.text, "bare prose with no extension");
    }

    #[test]
    fn test_binary_garbage_is_exhausted() {
        let engine = ConvertEngine::default();
        let mut f = tempfile::Builder::new().suffix(".docx").tempfile().unwrap();
        f.write_all(&[0x00, 0xFF, 0xFE, 0x01, 0x02]).unwrap();
        let res = engine.convert_local(f.path(), &ConvertHints::default());
        match res {
            Err(ConvertError::Exhausted { attempted, .. }) => {
                assert!(attempted.contains(&".docx".to_string()));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let engine = ConvertEngine::default();
        let res = engine.convert("/no/such/file.txt", &ConvertHints::default());
        assert!(matches!(res, Err(ConvertError::NotFound(_))));
    }

    #[test]
    fn test_normalize_strips_trailing_whitespace_and_blank_runs() {
        let text = "a   \nb\t\n\n\n\n\nc\n";
        let normalized = normalize_text(text);
        assert_eq!(normalized, "a\nb\n\nc\n");
        assert!(!normalized.contains("\n\n\n"));
        assert!(!normalized.lines().any(|l| l.ends_with(' ') || l.ends_with('\t')));
    }

    #[test]
    fn test_append_ext_keeps_duplicates() {
        let mut extensions = Vec::new();
        append_ext(&mut extensions, Some(".pdf"));
        append_ext(&mut extensions, Some(""));
        append_ext(&mut extensions, None);
        append_ext(&mut extensions, Some(".pdf"));
        assert_eq!(extensions, vec![".pdf", ".pdf"]);
    }

    #[test]
    fn test_url_path_extension() {
        assert_eq!(
            url_path_extension("https://example.com/a/report.pdf?x=1"),
            Some(".pdf".to_string())
        );
        assert_eq!(url_path_extension("https://example.com/a/report"), None);
        assert_eq!(url_path_extension("https://example.com/"), None);
    }

    #[test]
    fn test_parse_content_disposition_filename() {
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=\"file.pdf\""),
            Some("file.pdf".to_string())
        );
        assert_eq!(
            parse_content_disposition_filename("attachment; filename=file.pdf"),
            Some("file.pdf".to_string())
        );
        assert_eq!(parse_content_disposition_filename("inline"), None);
    }

    #[test]
    fn test_convert_routes_file_uri() {
        let engine = ConvertEngine::default();
        let mut f = tempfile::Builder::new().suffix(".txt").tempfile().unwrap();
        f.write_all(b"via file uri").unwrap();
        let uri = format!("file://{}", f.path().display());
        let res = engine.convert(&uri, &ConvertHints::default()).unwrap();
        assert_eq!(res.text, "via file uri");
    }
}
