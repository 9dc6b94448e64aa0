//! HTTP provider tests against a mock upstream

use parrot_gateway::config::{SynthesisConfig, TtsProviderKind};
use parrot_gateway::{
    ChatClient, Config, Error, ReplyGenerator, SpeechSynthesizer, SpeechToText, TextToSpeech,
    Transcriber,
};
use secrecy::SecretString;
use serde_json::json;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn key(value: &str) -> SecretString {
    SecretString::from(value.to_string())
}

async fn audio_file(dir: &tempfile::TempDir) -> std::path::PathBuf {
    let path = dir.path().join("uploaded_audio.wav");
    tokio::fs::write(&path, b"RIFF-fake-wave-data").await.unwrap();
    path
}

fn synthesis_config(server: &MockServer, provider: TtsProviderKind) -> SynthesisConfig {
    SynthesisConfig {
        provider,
        base_url: server.uri(),
        ..Config::default().synthesis
    }
}

#[tokio::test]
async fn transcription_posts_verbose_multipart() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_string_contains("verbose_json"))
        .and(body_string_contains("timestamp_granularities[]"))
        .and(body_string_contains("RIFF-fake-wave-data"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "text": " What time is it?",
            "language": "english",
            "duration": 1.5,
            "segments": [{"id": 0, "start": 0.0, "end": 1.5, "text": " What time is it?"}],
            "words": [
                {"word": "What", "start": 0.0, "end": 0.3},
                {"word": "time", "start": 0.3, "end": 0.6}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = parrot_gateway::config::TranscriptionConfig {
        base_url: server.uri(),
        ..Config::default().transcription
    };
    let stt = SpeechToText::new(&config, key("gsk_test")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let transcript = stt.transcribe(&audio_file(&dir).await).await.unwrap();

    assert_eq!(transcript.text.trim(), "What time is it?");
    assert_eq!(transcript.segments.len(), 1);
    assert_eq!(transcript.words.len(), 2);
    assert_eq!(transcript.words[1].word, "time");
}

#[tokio::test]
async fn transcription_api_error_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/transcriptions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let config = parrot_gateway::config::TranscriptionConfig {
        base_url: server.uri(),
        ..Config::default().transcription
    };
    let stt = SpeechToText::new(&config, key("bad")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let err = stt.transcribe(&audio_file(&dir).await).await.unwrap_err();

    assert!(matches!(err, Error::Transcription(msg) if msg.contains("401")));
}

#[tokio::test]
async fn chat_sends_single_user_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer gsk_test"))
        .and(body_partial_json(json!({
            "model": "llama3-70b-8192",
            "max_tokens": 1024,
            "messages": [{"role": "user", "content": "What is 2 + 2?"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": "4"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 1}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = parrot_gateway::config::GenerationConfig {
        base_url: server.uri(),
        ..Config::default().generation
    };
    let chat = ChatClient::new(&config, key("gsk_test")).unwrap();

    assert_eq!(chat.generate("What is 2 + 2?").await.unwrap(), "4");
}

#[tokio::test]
async fn chat_without_choices_is_an_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let config = parrot_gateway::config::GenerationConfig {
        base_url: server.uri(),
        ..Config::default().generation
    };
    let chat = ChatClient::new(&config, key("gsk_test")).unwrap();

    assert!(matches!(
        chat.generate("hello").await,
        Err(Error::Generation(_))
    ));
}

#[tokio::test]
async fn google_tts_concatenates_chunks() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("client", "tw-ob"))
        .and(query_param("tl", "en"))
        .and(query_param("total", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"MP3".to_vec()))
        .expect(2)
        .mount(&server)
        .await;

    let tts = TextToSpeech::new_google(&synthesis_config(&server, TtsProviderKind::Google)).unwrap();
    let text = "word ".repeat(30);
    let audio = tts.synthesize(&text).await.unwrap();

    assert_eq!(audio, b"MP3MP3");
}

#[tokio::test]
async fn openai_tts_returns_audio() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .and(header("authorization", "Bearer sk_test"))
        .and(body_partial_json(json!({"input": "Hello there", "voice": "alloy"})))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(b"ID3audio".to_vec()))
        .expect(1)
        .mount(&server)
        .await;

    let config = SynthesisConfig {
        voice: "alloy".to_string(),
        ..synthesis_config(&server, TtsProviderKind::OpenAI)
    };
    let tts = TextToSpeech::new_openai(&config, key("sk_test")).unwrap();

    assert_eq!(tts.synthesize("Hello there").await.unwrap(), b"ID3audio");
}

#[tokio::test]
async fn tts_upstream_failure_is_typed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/audio/speech"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let tts =
        TextToSpeech::new_openai(&synthesis_config(&server, TtsProviderKind::OpenAI), key("sk_test"))
            .unwrap();

    assert!(matches!(
        tts.synthesize("Hello").await,
        Err(Error::Synthesis(_))
    ));
}
