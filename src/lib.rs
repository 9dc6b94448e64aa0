//! Parrot Gateway - audio in, audio out
//!
//! Accepts an uploaded audio file, transcribes it, asks a language model for a
//! reply, and speaks the reply back:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    HTTP API (axum)                    │
//! │   POST /upload-audio/   │   POST /transcribe-audio/   │
//! └──────────────────────────┬───────────────────────────┘
//!                            │
//! ┌──────────────────────────▼───────────────────────────┐
//! │                       Pipeline                        │
//! │  intake → storage → STT → chat → TTS → storage        │
//! └──────────────────────────┬───────────────────────────┘
//!                            │
//! ┌──────────────────────────▼───────────────────────────┐
//! │                  External services                    │
//! │   Whisper (Groq/OpenAI) │ Chat completions │ TTS      │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod chat;
pub mod config;
pub mod error;
pub mod intake;
pub mod pipeline;
pub mod storage;
pub mod voice;

pub use chat::{ChatClient, ReplyGenerator};
pub use config::Config;
pub use error::{Error, Result};
pub use pipeline::{Pipeline, PipelineOutput, Stage};
pub use storage::{ArtifactStore, RunPaths};
pub use voice::{SpeechSynthesizer, SpeechToText, TextToSpeech, Transcriber, Transcript};
