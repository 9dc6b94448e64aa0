//! Shared test utilities

#![allow(dead_code)]

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use parrot_gateway::config::StorageConfig;
use parrot_gateway::{
    ArtifactStore, Error, Pipeline, ReplyGenerator, Result, SpeechSynthesizer, Transcriber,
    Transcript,
};

/// Create a store rooted at `root`
pub fn test_store(root: &Path, isolate: bool) -> ArtifactStore {
    ArtifactStore::new(
        StorageConfig {
            root: root.to_path_buf(),
            isolate_requests: isolate,
        },
        1024 * 1024,
    )
}

/// Build a pipeline over fakes with an initialized store
pub async fn test_pipeline(
    store: ArtifactStore,
    transcriber: &Arc<FakeTranscriber>,
    generator: &Arc<FakeGenerator>,
    synthesizer: &Arc<FakeSynthesizer>,
) -> Pipeline {
    store.init().await.expect("failed to init test store");
    Pipeline::new(
        store,
        transcriber.clone(),
        generator.clone(),
        synthesizer.clone(),
    )
}

/// Transcriber returning fixed text and recording the audio it was given
pub struct FakeTranscriber {
    text: Option<String>,
    calls: AtomicUsize,
    seen: Mutex<Vec<Vec<u8>>>,
}

impl FakeTranscriber {
    pub fn returning(text: &str) -> Arc<Self> {
        Arc::new(Self {
            text: Some(text.to_string()),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            text: None,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn seen(&self) -> Vec<Vec<u8>> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transcriber for FakeTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<Transcript> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let data = tokio::fs::read(audio).await?;
        self.seen.lock().unwrap().push(data);

        match &self.text {
            Some(text) => Ok(Transcript::from_text(text.clone())),
            None => Err(Error::Transcription("upstream exploded: key gsk_secret".to_string())),
        }
    }

    fn name(&self) -> &'static str {
        "fake-stt"
    }
}

/// Generator returning a fixed reply and recording prompts
pub struct FakeGenerator {
    reply: Option<String>,
    prompts: Mutex<Vec<String>>,
}

impl FakeGenerator {
    pub fn returning(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReplyGenerator for FakeGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.reply
            .clone()
            .ok_or_else(|| Error::Generation("rate limited".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake-chat"
    }
}

/// Synthesizer returning fixed audio bytes
pub struct FakeSynthesizer {
    audio: Option<Vec<u8>>,
    calls: AtomicUsize,
}

impl FakeSynthesizer {
    pub fn returning(audio: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            audio: Some(audio.to_vec()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            audio: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, _text: &str) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.audio
            .clone()
            .ok_or_else(|| Error::Synthesis("503 service unavailable".to_string()))
    }

    fn name(&self) -> &'static str {
        "fake-tts"
    }
}
