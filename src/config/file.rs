//! TOML configuration file loading
//!
//! Supports `~/.config/parrot/config.toml` (or the path in `PARROT_CONFIG`) as a
//! persistent config source. All fields are optional; the file is a partial overlay
//! on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use super::TtsProviderKind;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ParrotConfigFile {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerFileConfig,

    /// Artifact storage configuration
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Speech-to-text configuration
    #[serde(default)]
    pub transcription: TranscriptionFileConfig,

    /// Language model configuration
    #[serde(default)]
    pub generation: GenerationFileConfig,

    /// Text-to-speech configuration
    #[serde(default)]
    pub synthesis: SynthesisFileConfig,

    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,
}

/// Server/runtime configuration
#[derive(Debug, Default, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub max_upload_bytes: Option<u64>,
}

/// Artifact storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Root directory holding uploads, responses and output audio
    pub root: Option<String>,

    /// Namespace artifacts per run (false = single shared slot per artifact)
    pub isolate_requests: Option<bool>,
}

/// Speech-to-text configuration
#[derive(Debug, Default, Deserialize)]
pub struct TranscriptionFileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub language: Option<String>,
    pub temperature: Option<f32>,
    pub timeout_secs: Option<u64>,
}

/// Language model configuration
#[derive(Debug, Default, Deserialize)]
pub struct GenerationFileConfig {
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_secs: Option<u64>,
}

/// Text-to-speech configuration
#[derive(Debug, Default, Deserialize)]
pub struct SynthesisFileConfig {
    /// "google" or "openai"
    pub provider: Option<TtsProviderKind>,
    pub base_url: Option<String>,
    pub language: Option<String>,
    pub model: Option<String>,
    pub voice: Option<String>,
    pub speed: Option<f32>,

    /// Fail the request when synthesis fails
    pub required: Option<bool>,
    pub timeout_secs: Option<u64>,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub groq: Option<String>,
    pub openai: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ParrotConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ParrotConfigFile {
    let Some(path) = config_file_path() else {
        return ParrotConfigFile::default();
    };

    load_config_file_from(&path)
}

/// Load a TOML config file from an explicit path
///
/// Missing or malformed files fall back to defaults with a logged warning.
pub fn load_config_file_from(path: &Path) -> ParrotConfigFile {
    if !path.exists() {
        return ParrotConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ParrotConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ParrotConfigFile::default()
        }
    }
}

/// Return the config file path: `PARROT_CONFIG` or `~/.config/parrot/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("PARROT_CONFIG") {
        return Some(PathBuf::from(path));
    }

    directories::BaseDirs::new().map(|d| d.config_dir().join("parrot").join("config.toml"))
}
