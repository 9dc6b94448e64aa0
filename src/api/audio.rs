//! Audio upload and processing endpoints

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Multipart, Query, State, multipart::MultipartError},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ApiState;
use crate::Error;
use crate::pipeline::PipelineOutput;

/// Multipart field carrying the audio file
pub const FILE_FIELD: &str = "file";

/// Build audio router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/upload-audio/", post(upload_audio))
        .route("/upload-audio", post(upload_audio))
        .route("/transcribe-audio/", post(transcribe_audio))
        .route("/transcribe-audio", post(transcribe_audio))
        .with_state(state)
}

/// Pipeline result returned to callers
#[derive(Debug, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub request_id: Uuid,
    pub uploaded_file: String,
    pub transcription: String,
    pub ai_response: String,
    pub response_text_file: String,
    pub audio_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub synthesis_error: Option<String>,
}

impl From<PipelineOutput> for ProcessResponse {
    fn from(output: PipelineOutput) -> Self {
        Self {
            request_id: output.run_id,
            uploaded_file: output.audio_file.display().to_string(),
            transcription: output.transcript.text,
            ai_response: output.reply,
            response_text_file: output.response_file.display().to_string(),
            audio_path: output.speech_file.map(|p| p.display().to_string()),
            synthesis_error: output.synthesis_error,
        }
    }
}

/// Upload an audio file and process it
async fn upload_audio(
    State(state): State<Arc<ApiState>>,
    mut multipart: Multipart,
) -> Result<Json<ProcessResponse>, ApiError> {
    let limit = state.pipeline.store().max_upload_bytes();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(&e, limit))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let body = field.map(move |chunk| chunk.map_err(|e| multipart_error(&e, limit)));
        let output = state.pipeline.accept_upload(&filename, body).await?;
        return Ok(Json(output.into()));
    }

    Err(Error::MissingUpload.into())
}

/// Map a multipart failure, keeping body-limit rejections as 413
fn multipart_error(err: &MultipartError, limit: u64) -> Error {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        Error::UploadTooLarge { limit }
    } else {
        Error::Upload(err.body_text())
    }
}

/// Query parameters for processing a stored upload
#[derive(Debug, Deserialize)]
pub struct TranscribeParams {
    pub file_path: Option<String>,
}

/// Transcribe a previously stored upload, generate a reply and speak it
async fn transcribe_audio(
    State(state): State<Arc<ApiState>>,
    Query(params): Query<TranscribeParams>,
) -> Result<Json<ProcessResponse>, ApiError> {
    let path = params
        .file_path
        .filter(|p| !p.trim().is_empty())
        .map(PathBuf::from)
        .ok_or_else(|| Error::MissingFile(PathBuf::new()))?;

    let output = state.pipeline.process_stored(&path).await?;
    Ok(Json(output.into()))
}

/// Audio API errors
#[derive(Debug)]
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct DetailBody {
            detail: String,
        }

        #[derive(Serialize)]
        struct MessageBody {
            message: &'static str,
        }

        let (status, detail) = match &self.0 {
            Error::InvalidFileType(_) => (
                StatusCode::BAD_REQUEST,
                "Invalid file type. Please upload an audio file.".to_string(),
            ),
            Error::MissingUpload => (StatusCode::BAD_REQUEST, "No file provided.".to_string()),
            Error::Upload(_) => (StatusCode::BAD_REQUEST, "Invalid upload.".to_string()),
            Error::InvalidPath(_) => (StatusCode::BAD_REQUEST, "Invalid file path.".to_string()),
            Error::EmptyTranscription => (
                StatusCode::BAD_REQUEST,
                "Transcription failed or returned empty text.".to_string(),
            ),
            Error::EmptyGeneration => (
                StatusCode::BAD_REQUEST,
                "AI response generation failed.".to_string(),
            ),
            Error::UploadTooLarge { limit } => (
                StatusCode::PAYLOAD_TOO_LARGE,
                format!("Uploaded file exceeds the {limit} byte limit."),
            ),
            Error::MissingFile(_) => {
                return (
                    StatusCode::NOT_FOUND,
                    Json(MessageBody {
                        message: "No uploaded file found. Please upload an audio file first.",
                    }),
                )
                    .into_response();
            }
            Error::Transcription(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Transcription Error: speech-to-text request failed".to_string(),
            ),
            Error::Generation(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Generation Error: language model request failed".to_string(),
            ),
            Error::Synthesis(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Synthesis Error: text-to-speech request failed".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Error: internal server error".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!(error = %self.0, "request failed");
        } else {
            tracing::debug!(error = %self.0, status = %status, "request rejected");
        }

        (status, Json(DetailBody { detail })).into_response()
    }
}
