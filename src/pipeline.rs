//! Audio → transcript → reply → speech orchestration
//!
//! A run moves through a fixed sequence of stages with no branching or retry:
//!
//! ```text
//! Received → Validated → Stored → Transcribed → Generated → Synthesized → Completed
//!     └──────────┴──────────┴───────────┴────────────┴──────→ Failed(reason)
//! ```
//!
//! Synthesis failure only fails the run when synthesis is marked required;
//! otherwise the run completes and reports the failure alongside the result.

use std::fmt::{self, Display};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::Stream;
use uuid::Uuid;

use crate::chat::{ChatClient, ReplyGenerator};
use crate::intake;
use crate::storage::{ArtifactStore, RunPaths};
use crate::voice::{SpeechSynthesizer, SpeechToText, TextToSpeech, Transcriber, Transcript};
use crate::{Config, Error, Result};

/// Pipeline stage, used for logging transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Received,
    Validated,
    Stored,
    Transcribed,
    Generated,
    Synthesized,
    Completed,
}

impl Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Validated => "validated",
            Self::Stored => "stored",
            Self::Transcribed => "transcribed",
            Self::Generated => "generated",
            Self::Synthesized => "synthesized",
            Self::Completed => "completed",
        };
        f.write_str(name)
    }
}

/// Result of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    /// Run identifier
    pub run_id: Uuid,
    /// Stored upload the run transcribed
    pub audio_file: PathBuf,
    /// Speech-to-text result
    pub transcript: Transcript,
    /// Language model reply
    pub reply: String,
    /// Where the reply was written
    pub response_file: PathBuf,
    /// Where the speech was written; `None` if synthesis failed
    pub speech_file: Option<PathBuf>,
    /// Why synthesis failed, when it did and was not required
    pub synthesis_error: Option<String>,
}

/// Runs the transcription → generation → synthesis sequence
pub struct Pipeline {
    store: ArtifactStore,
    transcriber: Arc<dyn Transcriber>,
    generator: Arc<dyn ReplyGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    synthesis_required: bool,
}

impl Pipeline {
    /// Create a pipeline from its collaborators
    #[must_use]
    pub fn new(
        store: ArtifactStore,
        transcriber: Arc<dyn Transcriber>,
        generator: Arc<dyn ReplyGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            store,
            transcriber,
            generator,
            synthesizer,
            synthesis_required: false,
        }
    }

    /// Build a pipeline with the HTTP-backed providers named in `config`
    ///
    /// # Errors
    ///
    /// Returns error if a required API key is missing
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = ArtifactStore::new(config.storage.clone(), config.server.max_upload_bytes);
        let inference_key = config.api_keys.inference()?;
        let transcriber = SpeechToText::new(&config.transcription, inference_key)?;
        let generator = ChatClient::new(&config.generation, config.api_keys.inference()?)?;
        let synthesizer = TextToSpeech::from_config(&config.synthesis, &config.api_keys)?;

        tracing::info!(
            stt_model = %config.transcription.model,
            llm_model = %config.generation.model,
            tts = synthesizer.name(),
            isolate_requests = config.storage.isolate_requests,
            "pipeline configured"
        );

        Ok(Self::new(
            store,
            Arc::new(transcriber),
            Arc::new(generator),
            Arc::new(synthesizer),
        )
        .synthesis_required(config.synthesis.required))
    }

    /// Fail the run when synthesis fails
    #[must_use]
    pub fn synthesis_required(mut self, required: bool) -> Self {
        self.synthesis_required = required;
        self
    }

    /// Artifact store backing this pipeline
    #[must_use]
    pub const fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Validate and store an upload, then process it
    ///
    /// # Errors
    ///
    /// Returns the error of the first stage that fails
    pub async fn accept_upload<S, B, E>(&self, filename: &str, body: S) -> Result<PipelineOutput>
    where
        S: Stream<Item = std::result::Result<B, E>>,
        B: AsRef<[u8]>,
        E: Into<Error>,
    {
        let run = self.store.begin_run();
        log_stage(&run, Stage::Received);

        let accepted = intake::validate(filename).map_err(|e| fail(&run, Stage::Received, e))?;
        log_stage(&run, Stage::Validated);

        let upload = self.store.upload_path(&run, &accepted.extension);
        let bytes = self
            .store
            .write_upload(&upload, body)
            .await
            .map_err(|e| fail(&run, Stage::Validated, e))?;
        tracing::info!(run_id = %run.run_id, filename, bytes, "upload accepted");
        log_stage(&run, Stage::Stored);

        self.process(run, upload).await
    }

    /// Process an upload that is already on disk
    ///
    /// # Errors
    ///
    /// Returns `Error::MissingFile` or `Error::InvalidPath` if `requested` isn't a
    /// stored upload, or the error of the first stage that fails
    pub async fn process_stored(&self, requested: &Path) -> Result<PipelineOutput> {
        let audio = self.store.resolve_upload(requested).await?;
        let filename = audio
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        intake::validate(filename)?;

        let run = self.store.begin_run();
        tracing::info!(run_id = %run.run_id, path = %audio.display(), "processing stored upload");
        log_stage(&run, Stage::Stored);

        self.process(run, audio).await
    }

    async fn process(&self, run: RunPaths, audio: PathBuf) -> Result<PipelineOutput> {
        let transcript = self
            .transcriber
            .transcribe(&audio)
            .await
            .map_err(|e| fail(&run, Stage::Stored, e))?;
        if transcript.is_blank() {
            return Err(fail(&run, Stage::Stored, Error::EmptyTranscription));
        }
        tracing::debug!(run_id = %run.run_id, text = %transcript.text, "transcribed text");
        log_stage(&run, Stage::Transcribed);

        let reply = self
            .generator
            .generate(&transcript.text)
            .await
            .map_err(|e| fail(&run, Stage::Transcribed, e))?;
        if reply.trim().is_empty() {
            return Err(fail(&run, Stage::Transcribed, Error::EmptyGeneration));
        }
        self.store
            .write_reply(&run, &reply)
            .await
            .map_err(|e| fail(&run, Stage::Transcribed, e))?;
        tracing::debug!(run_id = %run.run_id, reply = %reply, "generated reply");
        log_stage(&run, Stage::Generated);

        let (speech_file, synthesis_error) = match self.synthesize(&run, &reply).await {
            Ok(()) => (Some(run.speech.clone()), None),
            Err(e) if self.synthesis_required => {
                return Err(fail(&run, Stage::Generated, e));
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %run.run_id,
                    provider = self.synthesizer.name(),
                    error = %e,
                    "speech synthesis failed, completing without audio"
                );
                (None, Some(synthesis_failure_reason(&e).to_string()))
            }
        };
        log_stage(&run, Stage::Synthesized);

        log_stage(&run, Stage::Completed);
        Ok(PipelineOutput {
            run_id: run.run_id,
            audio_file: audio,
            transcript,
            reply,
            response_file: run.response,
            speech_file,
            synthesis_error,
        })
    }

    async fn synthesize(&self, run: &RunPaths, reply: &str) -> Result<()> {
        let audio = self.synthesizer.synthesize(reply).await?;
        self.store.write_speech(run, &audio).await?;
        tracing::info!(
            run_id = %run.run_id,
            path = %run.speech.display(),
            audio_bytes = audio.len(),
            "speech saved"
        );
        Ok(())
    }
}

/// Caller-facing description of a synthesis failure
fn synthesis_failure_reason(err: &Error) -> &'static str {
    match err {
        Error::Synthesis(_) | Error::Http(_) => "text-to-speech request failed",
        _ => "failed to store synthesized audio",
    }
}

fn log_stage(run: &RunPaths, stage: Stage) {
    tracing::info!(run_id = %run.run_id, stage = %stage, "pipeline stage reached");
}

fn fail(run: &RunPaths, stage: Stage, err: Error) -> Error {
    tracing::warn!(run_id = %run.run_id, stage = %stage, error = %err, "pipeline failed");
    err
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names() {
        assert_eq!(Stage::Received.to_string(), "received");
        assert_eq!(Stage::Completed.to_string(), "completed");
    }

    #[test]
    fn synthesis_reasons_are_redacted() {
        let reason = synthesis_failure_reason(&Error::Synthesis("secret upstream body".into()));
        assert_eq!(reason, "text-to-speech request failed");

        let reason = synthesis_failure_reason(&Error::Io(std::io::Error::other("disk full")));
        assert_eq!(reason, "failed to store synthesized audio");
    }
}
