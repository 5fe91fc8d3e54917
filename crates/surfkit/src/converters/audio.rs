//! Audio converter: speech-to-text via an external transcription service

use crate::converters::DocumentConverter;
use crate::engine::TranscriptionConfig;
use crate::error::ConvertError;
use crate::types::{ConversionResult, ConvertHints};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Extensions handled by the audio converter
const AUDIO_EXTENSIONS: &[&str] = &[".wav", ".mp3", ".flac", ".m4a"];

/// External speech-to-text boundary.
///
/// The converter does not know how transcription happens; it hands over a
/// local path and receives text.
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `path`
    fn transcribe(&self, path: &Path) -> Result<String, ConvertError>;
}

/// Transcriber backed by an OpenAI-compatible `/audio/transcriptions` endpoint
pub struct WhisperClient {
    config: TranscriptionConfig,
    client: reqwest::blocking::Client,
}

#[derive(Debug, Deserialize)]
struct TranscriptionResponse {
    text: String,
}

impl WhisperClient {
    /// Create a client from transcription settings
    pub fn new(config: TranscriptionConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .unwrap_or_default();
        Self { config, client }
    }
}

impl Transcriber for WhisperClient {
    fn transcribe(&self, path: &Path) -> Result<String, ConvertError> {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return Err(ConvertError::Failed(
                "transcription API key not configured".to_string(),
            ));
        };

        let form = reqwest::blocking::multipart::Form::new()
            .file("file", path)?
            .text("model", self.config.model.clone());

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .multipart(form)
            .send()?
            .error_for_status()?;

        let parsed: TranscriptionResponse = response
            .json()
            .map_err(|e| ConvertError::Failed(format!("bad transcription response: {e}")))?;
        Ok(parsed.text)
    }
}

/// Transcribes audio files and returns the transcript as the text body.
///
/// No title: a transcript has none.
pub struct AudioConverter {
    transcriber: Box<dyn Transcriber>,
}

impl AudioConverter {
    /// Create an audio converter over the given transcriber
    pub fn new(transcriber: Box<dyn Transcriber>) -> Self {
        Self { transcriber }
    }
}

impl DocumentConverter for AudioConverter {
    fn name(&self) -> &'static str {
        "audio"
    }

    fn convert(
        &self,
        path: &Path,
        hints: &ConvertHints,
    ) -> Result<Option<ConversionResult>, ConvertError> {
        if !hints.extension_is(AUDIO_EXTENSIONS) {
            return Ok(None);
        }
        let transcript = self.transcriber.transcribe(path)?;
        Ok(Some(ConversionResult::text_only(transcript)))
    }
}
