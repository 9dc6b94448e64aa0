//! Speech-to-text (STT) processing

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::config::TranscriptionConfig;
use crate::{Error, Result};

/// Trait for speech-to-text backends
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio file at `audio`
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or the backend fails
    async fn transcribe(&self, audio: &Path) -> Result<Transcript>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// Transcription result with optional timing detail
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    /// Plain transcript text
    pub text: String,
    /// Detected or hinted language
    pub language: Option<String>,
    /// Audio duration in seconds
    pub duration: Option<f64>,
    /// Segment-level timestamps
    pub segments: Vec<Segment>,
    /// Word-level timestamps
    pub words: Vec<Word>,
}

impl Transcript {
    /// Transcript carrying only text
    #[must_use]
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }

    /// Whether the text is empty after trimming
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }
}

/// A timed transcript segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// A timed transcript word
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Word {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// `verbose_json` response from an OpenAI-compatible transcription API
#[derive(Deserialize)]
struct VerboseTranscription {
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    segments: Option<Vec<Segment>>,
    #[serde(default)]
    words: Option<Vec<Word>>,
}

impl From<VerboseTranscription> for Transcript {
    fn from(v: VerboseTranscription) -> Self {
        Self {
            text: v.text,
            language: v.language,
            duration: v.duration,
            segments: v.segments.unwrap_or_default(),
            words: v.words.unwrap_or_default(),
        }
    }
}

/// Transcribes speech to text via an OpenAI-compatible `/audio/transcriptions` API
pub struct SpeechToText {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    language: String,
    temperature: f32,
}

impl SpeechToText {
    /// Create a new STT client
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty or the HTTP client cannot be built
    pub fn new(config: &TranscriptionConfig, api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("API key required for transcription".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            language: config.language.clone(),
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl Transcriber for SpeechToText {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        let data = tokio::fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.wav")
            .to_string();
        let mime_type =
            crate::intake::guess_mime_type(&file_name).unwrap_or("application/octet-stream");

        tracing::debug!(
            audio_bytes = data.len(),
            model = %self.model,
            "starting transcription"
        );

        let part = Part::bytes(data)
            .file_name(file_name)
            .mime_str(mime_type)
            .map_err(|e| Error::Transcription(format!("invalid MIME type: {e}")))?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("response_format", "verbose_json")
            .text("timestamp_granularities[]", "word")
            .text("timestamp_granularities[]", "segment")
            .text("language", self.language.clone())
            .text("temperature", self.temperature.to_string());

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                Error::Transcription(format!("request failed: {e}"))
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(Error::Transcription(format!("API error {status}: {body}")));
        }

        let result: VerboseTranscription = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            Error::Transcription(format!("invalid response: {e}"))
        })?;

        let transcript = Transcript::from(result);
        tracing::info!(
            transcript = %transcript.text,
            segments = transcript.segments.len(),
            words = transcript.words.len(),
            "transcription complete"
        );
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "openai-compatible-stt"
    }
}
