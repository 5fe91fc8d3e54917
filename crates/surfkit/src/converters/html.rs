//! Generic HTML converter

use crate::convert::convert_html;
use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use std::fs;
use std::path::Path;

/// Converts `.html`/`.htm` files to Markdown.
///
/// Script and style subtrees are stripped, the `<body>` subtree is preferred
/// when present, and the title comes from the `<title>` element.
pub struct HtmlConverter;

impl HtmlConverter {
    /// Create a new HTML converter
    pub fn new() -> Self {
        Self
    }
}

impl Default for HtmlConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for HtmlConverter {
    fn name(&self) -> &'static str {
        "html"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(&[".html", ".htm"]) {
            return Ok(None);
        }
        let html = fs::read_to_string(path)
            .map_err(|e| ConvertError::Failed(format!("could not read HTML file: {e}")))?;
        Ok(Some(convert_html(&html)))
    }
}
