//! Configuration management for Parrot gateway
//!
//! Values resolve as env > TOML file > default.

pub mod file;

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::{Error, Result};

/// Default base URL for the OpenAI-compatible STT and chat APIs
pub const DEFAULT_INFERENCE_URL: &str = "https://api.groq.com/openai/v1";

/// Default base URL for Google Translate TTS
pub const DEFAULT_GOOGLE_TTS_URL: &str = "https://translate.google.com";

/// Default base URL for `OpenAI` TTS
pub const DEFAULT_OPENAI_TTS_URL: &str = "https://api.openai.com/v1";

/// Parrot gateway configuration
#[derive(Debug)]
pub struct Config {
    /// HTTP server configuration
    pub server: ServerConfig,

    /// Artifact storage configuration
    pub storage: StorageConfig,

    /// Speech-to-text configuration
    pub transcription: TranscriptionConfig,

    /// Language model configuration
    pub generation: GenerationConfig,

    /// Text-to-speech configuration
    pub synthesis: SynthesisConfig,

    /// API keys
    pub api_keys: ApiKeys,
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Maximum accepted upload size in bytes
    pub max_upload_bytes: u64,
}

/// Artifact storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory; `uploads/`, `ai_responses/` and `output/` live below it
    pub root: PathBuf,

    /// Give every run its own directory instead of one shared slot per artifact
    pub isolate_requests: bool,
}

impl StorageConfig {
    /// Directory holding uploaded audio
    #[must_use]
    pub fn uploads_dir(&self) -> PathBuf {
        self.root.join("uploads")
    }

    /// Directory holding generated reply text
    #[must_use]
    pub fn responses_dir(&self) -> PathBuf {
        self.root.join("ai_responses")
    }

    /// Directory holding synthesized speech
    #[must_use]
    pub fn output_dir(&self) -> PathBuf {
        self.root.join("output")
    }
}

/// Speech-to-text configuration
#[derive(Debug, Clone)]
pub struct TranscriptionConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Model identifier (e.g. "whisper-large-v3-turbo")
    pub model: String,

    /// Language hint (ISO 639-1, e.g. "en")
    pub language: String,

    /// Decoding temperature; 0 means greedy
    pub temperature: f32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Language model configuration
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    /// OpenAI-compatible API base URL
    pub base_url: String,

    /// Model identifier (e.g. "llama3-70b-8192")
    pub model: String,

    /// Sampling temperature
    pub temperature: f32,

    /// Nucleus sampling mass
    pub top_p: f32,

    /// Output token cap
    pub max_tokens: u32,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// TTS provider backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TtsProviderKind {
    /// Google Translate TTS (no key required)
    #[default]
    Google,
    /// `OpenAI` `/audio/speech`
    OpenAI,
}

impl TtsProviderKind {
    /// Parse a provider name, case-insensitively
    #[must_use]
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "google" | "gtts" => Some(Self::Google),
            "openai" => Some(Self::OpenAI),
            _ => None,
        }
    }

    const fn default_base_url(self) -> &'static str {
        match self {
            Self::Google => DEFAULT_GOOGLE_TTS_URL,
            Self::OpenAI => DEFAULT_OPENAI_TTS_URL,
        }
    }
}

/// Text-to-speech configuration
#[derive(Debug, Clone)]
pub struct SynthesisConfig {
    /// Which TTS backend to call
    pub provider: TtsProviderKind,

    /// API base URL for the selected provider
    pub base_url: String,

    /// Language code (Google) (e.g. "en")
    pub language: String,

    /// TTS model (`OpenAI`)
    pub model: String,

    /// TTS voice identifier (`OpenAI`)
    pub voice: String,

    /// TTS speed multiplier (`OpenAI`, 0.25 to 4.0)
    pub speed: f32,

    /// Fail the request when synthesis fails
    pub required: bool,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// API keys for external services
#[derive(Debug, Default)]
pub struct ApiKeys {
    /// Groq API key (STT and chat)
    pub groq: Option<SecretString>,

    /// `OpenAI` API key (TTS, or STT/chat when no Groq key is set)
    pub openai: Option<SecretString>,
}

impl ApiKeys {
    /// Key for the OpenAI-compatible STT and chat endpoints
    ///
    /// # Errors
    ///
    /// Returns error if neither a Groq nor an `OpenAI` key is configured
    pub fn inference(&self) -> Result<SecretString> {
        self.groq
            .as_ref()
            .or(self.openai.as_ref())
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
            .ok_or_else(|| {
                Error::Config("GROQ_API_KEY or OPENAI_API_KEY required".to_string())
            })
    }

    /// Key for `OpenAI` TTS
    ///
    /// # Errors
    ///
    /// Returns error if no `OpenAI` key is configured
    pub fn openai(&self) -> Result<SecretString> {
        self.openai
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
            .ok_or_else(|| Error::Config("OPENAI_API_KEY required for OpenAI TTS".to_string()))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::resolve(file::ParrotConfigFile::default(), |_| None)
    }
}

impl Config {
    /// Load configuration from the environment and the optional TOML file
    #[must_use]
    pub fn load() -> Self {
        let fc = file::load_config_file();
        Self::resolve(fc, |key| std::env::var(key).ok())
    }

    /// Merge environment lookups over a parsed config file over defaults
    #[must_use]
    pub fn resolve(fc: file::ParrotConfigFile, env: impl Fn(&str) -> Option<String>) -> Self {
        let parse_bool = |v: String| v == "1" || v.eq_ignore_ascii_case("true");

        // Server config (env > toml > default)
        let server = ServerConfig {
            host: env("PARROT_HOST")
                .or(fc.server.host)
                .unwrap_or_else(|| "0.0.0.0".to_string()),
            port: env("PARROT_PORT")
                .or_else(|| env("PORT"))
                .and_then(|s| s.parse().ok())
                .or(fc.server.port)
                .unwrap_or(8000),
            max_upload_bytes: env("PARROT_MAX_UPLOAD_BYTES")
                .and_then(|s| s.parse().ok())
                .or(fc.server.max_upload_bytes)
                .unwrap_or(25 * 1024 * 1024), // 25MB
        };

        let storage = StorageConfig {
            root: env("PARROT_STORAGE_ROOT")
                .or(fc.storage.root)
                .map_or_else(|| PathBuf::from("app"), PathBuf::from),
            isolate_requests: env("PARROT_ISOLATE_REQUESTS")
                .map(parse_bool)
                .or(fc.storage.isolate_requests)
                .unwrap_or(true),
        };

        let transcription = TranscriptionConfig {
            base_url: env("PARROT_STT_BASE_URL")
                .or(fc.transcription.base_url)
                .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            model: env("PARROT_STT_MODEL")
                .or(fc.transcription.model)
                .unwrap_or_else(|| "whisper-large-v3-turbo".to_string()),
            language: env("PARROT_STT_LANGUAGE")
                .or(fc.transcription.language)
                .unwrap_or_else(|| "en".to_string()),
            temperature: fc.transcription.temperature.unwrap_or(0.0),
            timeout_secs: fc.transcription.timeout_secs.unwrap_or(120),
        };

        let generation = GenerationConfig {
            base_url: env("PARROT_LLM_BASE_URL")
                .or(fc.generation.base_url)
                .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string()),
            model: env("PARROT_LLM_MODEL")
                .or(fc.generation.model)
                .unwrap_or_else(|| "llama3-70b-8192".to_string()),
            temperature: fc.generation.temperature.unwrap_or(1.0),
            top_p: fc.generation.top_p.unwrap_or(1.0),
            max_tokens: env("PARROT_LLM_MAX_TOKENS")
                .and_then(|s| s.parse().ok())
                .or(fc.generation.max_tokens)
                .unwrap_or(1024),
            timeout_secs: fc.generation.timeout_secs.unwrap_or(120),
        };

        let provider = env("PARROT_TTS_PROVIDER")
            .and_then(|s| {
                let parsed = TtsProviderKind::parse(&s);
                if parsed.is_none() {
                    tracing::warn!(provider = %s, "unknown TTS provider, ignoring");
                }
                parsed
            })
            .or(fc.synthesis.provider)
            .unwrap_or_default();
        let synthesis = SynthesisConfig {
            provider,
            base_url: env("PARROT_TTS_BASE_URL")
                .or(fc.synthesis.base_url)
                .unwrap_or_else(|| provider.default_base_url().to_string()),
            language: env("PARROT_TTS_LANGUAGE")
                .or(fc.synthesis.language)
                .unwrap_or_else(|| "en".to_string()),
            model: fc.synthesis.model.unwrap_or_else(|| "tts-1".to_string()),
            voice: env("PARROT_TTS_VOICE")
                .or(fc.synthesis.voice)
                .unwrap_or_else(|| "alloy".to_string()),
            speed: fc.synthesis.speed.unwrap_or(1.0),
            required: env("PARROT_TTS_REQUIRED")
                .map(parse_bool)
                .or(fc.synthesis.required)
                .unwrap_or(false),
            timeout_secs: fc.synthesis.timeout_secs.unwrap_or(60),
        };

        // API keys (env > toml > None)
        let api_keys = ApiKeys {
            groq: env("GROQ_API_KEY")
                .or(fc.api_keys.groq)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
            openai: env("OPENAI_API_KEY")
                .or(fc.api_keys.openai)
                .filter(|k| !k.is_empty())
                .map(SecretString::from),
        };

        Self {
            server,
            storage,
            transcription,
            generation,
            synthesis,
            api_keys,
        }
    }
}
