use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use parrot_gateway::api::ApiServer;
use parrot_gateway::api::audio::ProcessResponse;
use parrot_gateway::{ArtifactStore, Config, Pipeline, SpeechSynthesizer, TextToSpeech};

/// Parrot - transcribe audio, ask an LLM, speak the reply
#[derive(Parser)]
#[command(name = "parrot", version, about)]
struct Cli {
    /// Address to bind
    #[arg(long, env = "PARROT_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(long, env = "PARROT_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the pipeline on a local audio file and print the result
    Process {
        /// Audio file (mp3, wav, ogg, flac or m4a)
        file: PathBuf,
    },
    /// Synthesize text to the output directory
    Speak {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,parrot_gateway=info",
        1 => "info,parrot_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command {
        Some(Command::Process { file }) => process_file(&config, &file).await,
        Some(Command::Speak { text }) => speak(&config, &text).await,
        None => serve(config).await,
    }
}

/// Serve the HTTP API
async fn serve(config: Config) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(&config)?;
    pipeline.store().init().await?;

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        storage = %config.storage.root.display(),
        "starting parrot gateway"
    );

    ApiServer::new(pipeline, config.server.host, config.server.port)
        .run()
        .await?;

    Ok(())
}

/// Run the full pipeline on a local file
async fn process_file(config: &Config, file: &std::path::Path) -> anyhow::Result<()> {
    let pipeline = Pipeline::from_config(config)?;
    pipeline.store().init().await?;

    let filename = file
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| anyhow::anyhow!("invalid file name: {}", file.display()))?;
    let data = tokio::fs::read(file).await?;
    let body = futures::stream::once(async move { Ok::<_, std::io::Error>(data) });

    let output = pipeline.accept_upload(filename, body).await?;
    let response = ProcessResponse::from(output);
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}

/// Synthesize text and save it to a fresh output path
async fn speak(config: &Config, text: &str) -> anyhow::Result<()> {
    let tts = TextToSpeech::from_config(&config.synthesis, &config.api_keys)?;
    let store = ArtifactStore::new(config.storage.clone(), config.server.max_upload_bytes);
    store.init().await?;

    println!("Synthesizing with {}: \"{text}\"", tts.name());
    let audio = tts.synthesize(text).await?;

    let run = store.begin_run();
    store.write_speech(&run, &audio).await?;
    println!("Saved {} bytes to {}", audio.len(), run.speech.display());

    Ok(())
}
