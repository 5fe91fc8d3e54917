//! Core types for the conversion pipeline

/// The result of converting a document to text.
///
/// Produced by exactly one converter per conversion call; ownership moves to
/// the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionResult {
    /// Document title, when the source format carries one
    pub title: Option<String>,
    /// Normalized markdown/plain text body
    pub text: String,
}

impl ConversionResult {
    /// Create a result with a body and no title
    pub fn text_only(text: impl Into<String>) -> Self {
        Self {
            title: None,
            text: text.into(),
        }
    }
}

/// Hints passed to each converter alongside the local path.
///
/// `extension` is the candidate extension currently on trial (with leading
/// dot); converters gate on it and return `None` when it is not theirs.
#[derive(Debug, Clone, Default)]
pub struct ConvertHints {
    /// Candidate file extension, e.g. `.pdf`
    pub extension: Option<String>,
    /// Source URL, when the file was fetched from one
    pub url: Option<String>,
}

impl ConvertHints {
    /// Hints with only an extension set
    pub fn with_extension(extension: impl Into<String>) -> Self {
        Self {
            extension: Some(extension.into()),
            url: None,
        }
    }

    /// True if the extension hint matches one of `allowed` (case-insensitive)
    pub fn extension_is(&self, allowed: &[&str]) -> bool {
        match self.extension.as_deref() {
            Some(ext) => allowed.iter().any(|a| ext.eq_ignore_ascii_case(a)),
            None => false,
        }
    }
}
