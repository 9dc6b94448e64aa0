//! Error types for Parrot gateway

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias for Parrot operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Parrot gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Upload rejected by the intake validator
    #[error("invalid file type: {0}")]
    InvalidFileType(String),

    /// Multipart request carried no file field
    #[error("no file provided")]
    MissingUpload,

    /// Upload exceeded the configured size limit
    #[error("upload exceeds {limit} bytes")]
    UploadTooLarge { limit: u64 },

    /// Upload stream failed mid-transfer
    #[error("upload error: {0}")]
    Upload(String),

    /// Requested audio file does not exist
    #[error("file not found: {}", .0.display())]
    MissingFile(PathBuf),

    /// Requested path points outside the uploads directory
    #[error("invalid file path: {}", .0.display())]
    InvalidPath(PathBuf),

    /// Speech-to-text error
    #[error("STT error: {0}")]
    Transcription(String),

    /// Speech-to-text returned no usable text
    #[error("transcription returned empty text")]
    EmptyTranscription,

    /// Language model error
    #[error("generation error: {0}")]
    Generation(String),

    /// Language model returned no usable text
    #[error("generation returned empty text")]
    EmptyGeneration,

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Synthesis(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}
