//! Plain-text converter: the universal fallback

use crate::converters::DocumentConverter;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use std::fs;
use std::path::Path;

/// Reads any file with a non-empty extension hint as UTF-8 text.
///
/// Registered last so that every recognized-but-unconvertible file still
/// gets a raw decode attempt. An empty extension hint is declined, which
/// keeps extension-less candidates from short-circuiting the trial loop.
pub struct PlainTextConverter;

impl PlainTextConverter {
    /// Create a new plain-text converter
    pub fn new() -> Self {
        Self
    }

    /// Decode a file as UTF-8 text, ignoring extension gating.
    ///
    /// Used by the engine as the last-resort decode after all converters
    /// are exhausted.
    pub fn read_text(path: &Path) -> Result<ConversionResult, ConvertError> {
        let bytes = fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConvertError::NotFound(path.display().to_string())
            } else {
                ConvertError::Io(e)
            }
        })?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ConvertError::Failed(format!("not valid UTF-8 text: {e}")))?;
        Ok(ConversionResult::text_only(text))
    }
}

impl Default for PlainTextConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentConverter for PlainTextConverter {
    fn name(&self) -> &'static str {
        "text"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        match hints.extension.as_deref() {
            None | Some("") => Ok(None),
            Some(_) => Self::read_text(path).map(Some),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_declines_without_extension() {
        let converter = PlainTextConverter::new();
        let f = tempfile::NamedTempFile::new().unwrap();
        let res = converter.convert(f.path(), &ConvertHints::default()).unwrap();
        assert!(res.is_none());
    }

    #[test]
    fn test_reads_any_extension() {
        let converter = PlainTextConverter::new();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(b"some text").unwrap();
        let res = converter
            .convert(f.path(), &ConvertHints::with_extension(".log"))
            .unwrap()
            .unwrap();
        assert_eq!(res.text, "some text");
        assert_eq!(res.title, None);
    }

    #[test]
    fn test_invalid_utf8_is_an_error() {
        let converter = PlainTextConverter::new();
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(&[0xFF, 0xFE, 0x00, 0x01]).unwrap();
        let res = converter.convert(f.path(), &ConvertHints::with_extension(".txt"));
        assert!(matches!(res, Err(ConvertError::Failed(_))));
    }

    #[test]
    fn test_missing_file_is_not_found() {
        let res = PlainTextConverter::read_text(Path::new("/no/such/file.txt"));
        assert!(matches!(res, Err(ConvertError::NotFound(_))));
    }
}
