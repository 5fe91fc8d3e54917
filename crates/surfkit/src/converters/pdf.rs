//! PDF converter

use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use std::path::Path;

/// Extracts text from `.pdf` files.
///
/// The extraction itself is delegated wholesale to `pdf-extract`; this
/// converter only supplies the gating and error mapping.
pub struct PdfConverter;

impl PdfConverter {
    /// Create a new PDF converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for PdfConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for PdfConverter {
    fn name(&self) -> &'static str {
        "pdf"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".pdf"]) {
            return Ok(None);
        }
        let text = pdf_extract::extract_text(path)
            .map_err(|e| ConvertError::Failed(format!("PDF text extraction failed: {e}")))?;
        Ok(Some(ConversionResult::text_only(text)))
    }
}
