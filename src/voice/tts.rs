//! Text-to-speech (TTS) processing

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};

use crate::config::{ApiKeys, SynthesisConfig, TtsProviderKind};
use crate::{Error, Result};

/// Google Translate TTS rejects requests longer than this many characters
pub const GOOGLE_MAX_CHARS: usize = 100;

/// Trait for text-to-speech backends
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` to MP3 bytes
    ///
    /// # Errors
    ///
    /// Returns error if synthesis fails
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;

    /// Provider name for logging
    fn name(&self) -> &'static str;
}

/// TTS provider backend
#[derive(Clone, Copy, Debug)]
enum TtsProvider {
    Google,
    OpenAI,
}

/// Synthesizes speech from text
pub struct TextToSpeech {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    language: String,
    voice: String,
    speed: f32,
    model: String,
    provider: TtsProvider,
}

impl TextToSpeech {
    /// Create a TTS instance for the provider selected in `config`
    ///
    /// # Errors
    ///
    /// Returns error if the provider needs a key that isn't configured
    pub fn from_config(config: &SynthesisConfig, keys: &ApiKeys) -> Result<Self> {
        match config.provider {
            TtsProviderKind::Google => Self::new_google(config),
            TtsProviderKind::OpenAI => Self::new_openai(config, keys.openai()?),
        }
    }

    /// Create a new TTS instance using Google Translate TTS
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new_google(config: &SynthesisConfig) -> Result<Self> {
        Self::build(config, None, TtsProvider::Google)
    }

    /// Create a new TTS instance using `OpenAI`
    ///
    /// # Errors
    ///
    /// Returns error if API key is missing
    pub fn new_openai(config: &SynthesisConfig, api_key: SecretString) -> Result<Self> {
        if api_key.expose_secret().is_empty() {
            return Err(Error::Config("OpenAI API key required for TTS".to_string()));
        }
        Self::build(config, Some(api_key), TtsProvider::OpenAI)
    }

    fn build(
        config: &SynthesisConfig,
        api_key: Option<SecretString>,
        provider: TtsProvider,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            language: config.language.clone(),
            voice: config.voice.clone(),
            speed: config.speed,
            model: config.model.clone(),
            provider,
        })
    }

    /// Synthesize using Google Translate TTS, one request per chunk
    async fn synthesize_google(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct GoogleTtsQuery<'a> {
            ie: &'static str,
            client: &'static str,
            tl: &'a str,
            q: &'a str,
            total: usize,
            idx: usize,
            textlen: usize,
        }

        let chunks = split_for_tts(text, GOOGLE_MAX_CHARS);
        if chunks.is_empty() {
            return Err(Error::Synthesis("nothing to synthesize".to_string()));
        }

        let url = format!("{}/translate_tts", self.base_url);
        let mut audio = Vec::new();

        for (idx, chunk) in chunks.iter().enumerate() {
            let query = GoogleTtsQuery {
                ie: "UTF-8",
                client: "tw-ob",
                tl: &self.language,
                q: chunk,
                total: chunks.len(),
                idx,
                textlen: chunk.chars().count(),
            };

            let response = self
                .client
                .get(&url)
                .query(&query)
                .header("User-Agent", "Mozilla/5.0")
                .send()
                .await
                .map_err(|e| Error::Synthesis(format!("Google TTS request failed: {e}")))?;

            if !response.status().is_success() {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(Error::Synthesis(format!("Google TTS error {status}: {body}")));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Error::Synthesis(format!("Google TTS read failed: {e}")))?;
            audio.extend_from_slice(&bytes);
        }

        tracing::debug!(chunks = chunks.len(), audio_bytes = audio.len(), "Google TTS complete");
        Ok(audio)
    }

    /// Synthesize using `OpenAI` TTS
    async fn synthesize_openai(&self, text: &str) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct TtsRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            speed: f32,
        }

        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| Error::Config("OpenAI API key required for TTS".to_string()))?;

        let request = TtsRequest {
            model: &self.model,
            input: text,
            voice: &self.voice,
            speed: self.speed,
        };

        let response = self
            .client
            .post(format!("{}/audio/speech", self.base_url))
            .bearer_auth(api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(format!("OpenAI TTS request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis(format!("OpenAI TTS error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(format!("OpenAI TTS read failed: {e}")))?;
        Ok(audio.to_vec())
    }
}

#[async_trait]
impl SpeechSynthesizer for TextToSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(provider = self.name(), chars = text.chars().count(), "converting text to speech");
        match self.provider {
            TtsProvider::Google => self.synthesize_google(text).await,
            TtsProvider::OpenAI => self.synthesize_openai(text).await,
        }
    }

    fn name(&self) -> &'static str {
        match self.provider {
            TtsProvider::Google => "google-tts",
            TtsProvider::OpenAI => "openai-tts",
        }
    }
}

/// Split text into chunks of at most `max_chars` characters
///
/// Breaks on whitespace where possible; words longer than `max_chars` are cut.
#[must_use]
pub fn split_for_tts(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let chars: Vec<char> = word.chars().collect();
            for piece in chars.chunks(max_chars) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }

        let needed = if current.is_empty() { word_len } else { current_len + 1 + word_len };
        if needed > max_chars {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }

        if !current.is_empty() {
            current.push(' ');
            current_len += 1;
        }
        current.push_str(word);
        current_len += word_len;
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_text_is_one_chunk() {
        assert_eq!(split_for_tts("Hello there, friend.", 100), vec!["Hello there, friend."]);
    }

    #[test]
    fn splits_on_whitespace() {
        let chunks = split_for_tts("aaa bbb ccc ddd", 7);
        assert_eq!(chunks, vec!["aaa bbb", "ccc ddd"]);
    }

    #[test]
    fn collapses_extra_whitespace() {
        assert_eq!(split_for_tts("  one\n\ntwo  ", 100), vec!["one two"]);
    }

    #[test]
    fn cuts_overlong_words() {
        let chunks = split_for_tts("ab abcdefgh cd", 3);
        assert_eq!(chunks, vec!["ab", "abc", "def", "gh", "cd"]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let chunks = split_for_tts("héllo wörld", 5);
        assert_eq!(chunks, vec!["héllo", "wörld"]);
    }

    #[test]
    fn every_chunk_respects_limit() {
        let text = "The quick brown fox jumps over the lazy dog. ".repeat(20);
        for chunk in split_for_tts(&text, GOOGLE_MAX_CHARS) {
            assert!(chunk.chars().count() <= GOOGLE_MAX_CHARS);
        }
    }

    #[test]
    fn empty_text_has_no_chunks() {
        assert!(split_for_tts("   ", 100).is_empty());
    }

    #[test]
    fn openai_requires_key() {
        let mut config = crate::Config::default().synthesis;
        config.provider = TtsProviderKind::OpenAI;
        let result = TextToSpeech::from_config(&config, &ApiKeys::default());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn google_needs_no_key() {
        let config = crate::Config::default().synthesis;
        let tts = TextToSpeech::from_config(&config, &ApiKeys::default()).unwrap();
        assert_eq!(tts.name(), "google-tts");
    }
}
