use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use transcribe_bridge::{
    speaker_stats, speakers::format_timestamp, OutputFormat, PipelineConfig, RemoteConfig,
    ScriptConfig, TranscriptionOptions, TranscriptionPipeline,
};

#[derive(Parser)]
#[command(name = "transcribe-bridge")]
#[command(about = "Transcribe an audio file via a local script, a remote API, or a mock backend")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Args {
    /// Audio file to transcribe
    #[arg(required_unless_present = "status")]
    pub audio_file: Option<PathBuf>,

    /// Language code to request (e.g. 'sv', 'en')
    #[arg(long)]
    pub language: Option<String>,

    /// Output format requested from the local script
    #[arg(long, value_enum, default_value = "json")]
    pub format: Format,

    /// Interpreter used to run the transcription script
    #[arg(long, default_value = "python3")]
    pub python_cmd: String,

    /// Path to the transcription script
    #[arg(long, default_value = "transcription_pipeline.py")]
    pub script: PathBuf,

    /// HuggingFace token for diarization (defaults to $HF_TOKEN)
    #[arg(long)]
    pub hf_token: Option<String>,

    /// API key enabling the remote fallback (defaults to $OPENAI_API_KEY)
    #[arg(long)]
    pub api_key: Option<String>,

    /// Endpoint URL for the remote transcription API
    #[arg(long, default_value = "https://api.openai.com/v1/audio/transcriptions")]
    pub endpoint: String,

    /// Remote request timeout in seconds
    #[arg(long, default_value = "60")]
    pub remote_timeout: u64,

    /// Fail instead of synthesizing a mock result when no backend is usable
    #[arg(long)]
    pub no_mock: bool,

    /// Print per-speaker statistics alongside the result
    #[arg(long)]
    pub speaker_stats: bool,

    /// Print backend availability and exit
    #[arg(long)]
    pub status: bool,

    /// Log level
    #[arg(long, value_enum, default_value = "info")]
    pub log_level: LogLevel,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum, Debug)]
pub enum Format {
    Json,
    Markdown,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Markdown => OutputFormat::Markdown,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

fn pipeline_config(args: &Args) -> PipelineConfig {
    let script = ScriptConfig {
        python_command: args.python_cmd.clone(),
        script_path: args.script.clone(),
        hf_token: args
            .hf_token
            .clone()
            .or_else(|| std::env::var("HF_TOKEN").ok()),
        ..Default::default()
    };

    let api_key = args
        .api_key
        .clone()
        .or_else(|| std::env::var("OPENAI_API_KEY").ok());
    let remote = api_key.map(|key| {
        let mut config = RemoteConfig::new(key);
        config.endpoint = args.endpoint.clone();
        config.request_timeout = Duration::from_secs(args.remote_timeout);
        config
    });

    PipelineConfig {
        script,
        remote,
        allow_mock: !args.no_mock,
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level: tracing::Level = args.log_level.into();
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    info!("Starting Transcribe Bridge v{}", env!("CARGO_PKG_VERSION"));

    let pipeline = TranscriptionPipeline::new(pipeline_config(&args));

    if args.status {
        let status = pipeline.status().await;
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    let audio_file = args
        .audio_file
        .as_ref()
        .context("an audio file is required unless --status is given")?;
    let audio = tokio::fs::read(audio_file)
        .await
        .with_context(|| format!("failed to read audio file {}", audio_file.display()))?;
    info!("Read {} bytes from {}", audio.len(), audio_file.display());

    let status = pipeline.status().await;
    if status.mock_mode_active {
        warn!("No transcription backend is configured; the result will be mocked");
    }

    let options = TranscriptionOptions {
        language: args.language.clone(),
        output_format: args.format.into(),
        ..Default::default()
    };

    let result = pipeline
        .transcribe(&audio, &options)
        .await
        .context("transcription failed")?;
    info!("Transcription served by the {} pipeline", result.pipeline_used);

    if args.format == Format::Markdown {
        println!("{}", result.text);
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }

    if args.speaker_stats {
        let stats = speaker_stats(&result.segments);
        for (speaker, entry) in &stats {
            info!(
                "{speaker}: {} words, {} - {}",
                entry.words,
                format_timestamp(entry.first_start),
                format_timestamp(entry.last_end)
            );
        }
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }

    Ok(())
}
