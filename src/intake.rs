//! Upload intake validation
//!
//! Decides from the filename alone whether an upload is audio. File contents are
//! never inspected, so a mislabeled file can pass and a valid file with the wrong
//! extension fails.

use std::path::Path;

use crate::{Error, Result};

/// Extensions accepted for upload
pub const ALLOWED_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "flac", "m4a"];

/// An upload that passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedAudio {
    /// Lower-cased extension without the dot
    pub extension: String,
    /// MIME type guessed from the extension
    pub mime_type: &'static str,
}

/// Guess a MIME type from a filename's extension
#[must_use]
pub fn guess_mime_type(filename: &str) -> Option<&'static str> {
    let ext = extension(filename)?;
    let mime = match ext.as_str() {
        "mp3" | "mpga" => "audio/mpeg",
        "wav" => "audio/wav",
        "ogg" | "oga" | "opus" => "audio/ogg",
        "flac" => "audio/flac",
        "m4a" => "audio/mp4",
        "aac" => "audio/aac",
        "webm" => "audio/webm",
        "mp4" => "video/mp4",
        "txt" => "text/plain",
        "json" => "application/json",
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        _ => return None,
    };
    Some(mime)
}

/// Validate an upload's filename
///
/// Accepts iff the extension is in [`ALLOWED_EXTENSIONS`] and the guessed MIME type
/// starts with `audio`.
///
/// # Errors
///
/// Returns `Error::InvalidFileType` otherwise
pub fn validate(filename: &str) -> Result<AcceptedAudio> {
    let accepted = extension(filename)
        .filter(|ext| ALLOWED_EXTENSIONS.contains(&ext.as_str()))
        .and_then(|ext| {
            guess_mime_type(filename)
                .filter(|mime| mime.starts_with("audio"))
                .map(|mime_type| AcceptedAudio {
                    extension: ext,
                    mime_type,
                })
        });

    accepted.ok_or_else(|| {
        tracing::debug!(filename, "rejected upload");
        Error::InvalidFileType(filename.to_string())
    })
}

/// Lower-cased extension of the final path component
fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
}
