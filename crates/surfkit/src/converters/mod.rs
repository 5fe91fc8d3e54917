//! Converter system for multi-format document-to-text conversion
//!
//! Design: each converter gates on the candidate file extension and converts
//! a local file into normalized text. The ConverterRegistry holds converters
//! in a fixed order; the engine tries them in registration order for every
//! candidate extension.

mod audio;
mod docx;
mod html;
mod pdf;
mod pptx;
mod text;
mod xlsx;
mod xml;
mod youtube;

pub use audio::{AudioConverter, Transcriber, WhisperClient};
pub use docx::DocxConverter;
pub use html::HtmlConverter;
pub use pdf::PdfConverter;
pub use pptx::PptxConverter;
pub use text::PlainTextConverter;
pub use xlsx::XlsxConverter;
pub use xml::XmlConverter;
pub use youtube::YouTubeConverter;

use crate::engine::EngineConfig;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use std::path::Path;

/// Trait for format-specific document converters
///
/// Implement this trait to plug a new format into the conversion engine.
/// A converter inspects the extension hint (and optionally the source URL)
/// and returns:
///
/// - `Ok(None)` when the format is not its own — the engine moves on,
/// - `Ok(Some(result))` on success — the engine stops immediately,
/// - `Err(..)` on a recoverable failure — the engine logs it and keeps trying.
pub trait DocumentConverter: Send + Sync {
    /// Unique identifier for this converter (for logging/debugging)
    fn name(&self) -> &'static str;

    /// Attempt to convert the local file at `path`
    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError>;
}

/// Ordered collection of converters
///
/// Registration order is trial order: the engine iterates converters
/// front-to-back for each candidate extension and stops at the first one
/// that returns a result.
pub struct ConverterRegistry {
    converters: Vec<Box<dyn DocumentConverter>>,
}

impl Default for ConverterRegistry {
    fn default() -> Self {
        Self::with_defaults(&EngineConfig::default())
    }
}

impl ConverterRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            converters: Vec::new(),
        }
    }

    /// Create a registry with the built-in converters.
    ///
    /// Specific formats come before the generic HTML converter; the
    /// plain-text decoder is registered last so any non-empty extension
    /// hint eventually gets a raw text attempt.
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(XmlConverter::new()));
        registry.register(Box::new(YouTubeConverter::new(&config.user_agent)));
        registry.register(Box::new(DocxConverter::new()));
        registry.register(Box::new(XlsxConverter::new()));
        registry.register(Box::new(PptxConverter::new()));
        registry.register(Box::new(PdfConverter::new()));
        registry.register(Box::new(AudioConverter::new(Box::new(WhisperClient::new(
            config.transcription.clone(),
        )))));
        registry.register(Box::new(HtmlConverter::new()));
        registry.register(Box::new(PlainTextConverter::new()));
        registry
    }

    /// Register a converter at the end of the trial order
    pub fn register(&mut self, converter: Box<dyn DocumentConverter>) {
        self.converters.push(converter);
    }

    /// Converters in trial order
    pub(crate) fn converters(&self) -> &[Box<dyn DocumentConverter>] {
        &self.converters
    }

    /// Number of registered converters
    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// True if no converters are registered
    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }
}
