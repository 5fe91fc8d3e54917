//! Surfkit - AI-friendly text browsing and document conversion library
//!
//! This crate lets an automated agent "visit" any URI — web page, search
//! query, local file, or downloaded binary — and receive normalized,
//! paginated Markdown/plain text regardless of the underlying format.
//!
//! ## Converter System
//!
//! Surfkit uses a pluggable converter system where format-specific
//! converters turn local files into text. The [`ConverterRegistry`] holds
//! converters in a fixed trial order and the [`ConvertEngine`] walks it for
//! every candidate extension it infers for a source, falling back to a raw
//! text decode when everything else declines.
//!
//! Built-in converters, in trial order:
//! - [`XmlConverter`] - WordprocessingML text and table-bearing XML
//! - [`YouTubeConverter`] - watch pages: metadata, description, transcript
//! - [`DocxConverter`] - Word documents
//! - [`XlsxConverter`] - spreadsheets, one section per sheet
//! - [`PptxConverter`] - presentations, slide by slide
//! - [`PdfConverter`] - PDF text extraction
//! - [`AudioConverter`] - speech-to-text transcription
//! - [`HtmlConverter`] - generic HTML to Markdown
//! - [`PlainTextConverter`] - raw text, the universal fallback
//!
//! ## Browsing
//!
//! [`TextBrowser`] layers stateful navigation on top of the engine:
//! history-relative addressing, whitespace-aligned viewport pagination,
//! incremental find with wraparound, downloads, and a `search:` scheme
//! backed by an external search API.

pub mod browser;
mod convert;
pub mod converters;
mod engine;
mod error;
mod search;
mod sniff;
mod store;
mod tool;
mod types;

pub use browser::{BrowserConfig, TextBrowser};
pub use convert::{convert_html, html_to_markdown};
pub use converters::{
    AudioConverter, ConverterRegistry, DocumentConverter, DocxConverter, HtmlConverter,
    PdfConverter, PlainTextConverter, PptxConverter, Transcriber, WhisperClient, XlsxConverter,
    XmlConverter, YouTubeConverter,
};
pub use engine::{ConvertEngine, EngineConfig, TranscriptionConfig};
pub use error::ConvertError;
pub use search::{SearchBackend, SearchPage};
pub use sniff::{extension_for_mime, guess_extension};
pub use store::{EmbeddingStore, ScoredChunk, TextChunk};
pub use tool::{BrowserAction, BrowserTool, BrowserToolResponse};
pub use types::{ConversionResult, ConvertHints};

/// Default User-Agent string.
///
/// A mainstream browser signature: several document hosts refuse obvious
/// bot agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/119.0.0.0 Safari/537.36 Edg/119.0.0.0";

/// Default viewport width in bytes
pub const DEFAULT_VIEWPORT_SIZE: usize = 1024 * 8;

/// Default search instance
pub const DEFAULT_SEARCH_URL: &str = "https://searx.be";

/// Tool description for LLM consumption
pub const TOOL_DESCRIPTION: &str = r#"A text-mode browser for reading web pages, search results, and documents.

- Visits URLs, local files, and search: queries
- Converts HTML, PDF, DOCX, XLSX, PPTX, XML, and audio to text
- Paginates long pages into viewports
- Finds text across viewports with wraparound"#;
