//! Voice processing module
//!
//! STT turns uploaded audio into a transcript; TTS turns the model's reply back
//! into MP3 audio.

mod stt;
mod tts;

pub use stt::{Segment, SpeechToText, Transcriber, Transcript, Word};
pub use tts::{GOOGLE_MAX_CHARS, SpeechSynthesizer, TextToSpeech, split_for_tts};
