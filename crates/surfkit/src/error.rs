//! Error types for Surfkit

use thiserror::Error;

/// Errors that can occur while converting a document to text
#[derive(Debug, Error)]
pub enum ConvertError {
    /// A converter recognized the format but failed partway through.
    /// Recoverable: the engine logs it and moves on to the next candidate.
    #[error("conversion failed: {0}")]
    Failed(String),

    /// Every candidate extension/converter pair was tried and the final
    /// plain-text decode also failed
    #[error(
        "could not convert '{path}' to Markdown. File type was recognized as \
         {attempted:?}. While converting the file, the following error was \
         encountered: {last_error}"
    )]
    Exhausted {
        /// Local path that was being converted
        path: String,
        /// Candidate extensions in the order they were tried
        attempted: Vec<String>,
        /// Message of the last underlying converter or decode error
        last_error: String,
    },

    /// Network-level failure while fetching a remote source
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file does not exist
    #[error("file not found: {0}")]
    NotFound(String),

    /// Other I/O failure while reading or staging a file
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
