//! Hosted speech-to-text backend.
//!
//! Stages the audio buffer in a temporary file and streams it to an
//! OpenAI-compatible `audio/transcriptions` endpoint as a multipart upload.
//! The API returns plain text with no score, so confidence is synthesized
//! from the text itself.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Body;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio_util::io::ReaderStream;
use tracing::debug;

use super::{discard_staged, output_prefix, stage_audio, TranscriptionStrategy};
use crate::protocol::{Pipeline, TranscriptionOptions, TranscriptionResult};
use crate::{Result, TranscribeError};

const DEFAULT_ENDPOINT: &str = "https://api.openai.com/v1/audio/transcriptions";
const DEFAULT_MODEL: &str = "whisper-1";

/// Punctuation counted by the confidence heuristic.
const PUNCTUATION: [char; 6] = ['.', ',', '!', '?', ';', ':'];

/// Configuration for the remote backend.
#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Bearer credential for the API.
    pub api_key: String,
    /// Full endpoint URL for the transcriptions call.
    pub endpoint: String,
    /// Model name sent with the upload.
    pub model: String,
    /// End-to-end request timeout.
    pub request_timeout: Duration,
    /// Directory where audio buffers are staged.
    pub temp_dir: PathBuf,
}

impl RemoteConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout: Duration::from_secs(60),
            temp_dir: std::env::temp_dir(),
        }
    }
}

/// Response body of the transcriptions endpoint (`json` response format).
#[derive(Debug, Deserialize)]
struct RemoteResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Remote-API transcription backend.
pub struct RemoteStrategy {
    config: RemoteConfig,
    client: reqwest::Client,
}

impl RemoteStrategy {
    pub fn new(config: RemoteConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    async fn upload(
        &self,
        audio_path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let file = tokio::fs::File::open(audio_path)
            .await
            .map_err(TranscribeError::TempFile)?;
        let part = Part::stream(Body::wrap_stream(ReaderStream::new(file)))
            .file_name("audio.webm")
            .mime_str("audio/webm")?;

        let mut form = Form::new()
            .part("file", part)
            .text("model", self.config.model.clone());
        if let Some(language) = &options.language {
            form = form.text("language", language.clone());
        }
        if let Some(format) = &options.response_format {
            form = form.text("response_format", format.clone());
        }
        if let Some(temperature) = options.temperature {
            form = form.text("temperature", temperature.to_string());
        }

        debug!(endpoint = %self.config.endpoint, model = %self.config.model, "uploading audio to remote transcription API");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .timeout(self.config.request_timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::RemoteApi { status, body });
        }

        let raw = response.text().await?;
        let parsed: RemoteResponse =
            serde_json::from_str(&raw).map_err(|e| TranscribeError::OutputParse {
                message: e.to_string(),
                prefix: output_prefix(&raw),
            })?;

        let text = parsed.text.trim().to_string();
        let confidence = estimate_confidence(&text);
        let language = options
            .language
            .clone()
            .or(parsed.language)
            .unwrap_or_else(|| "en".to_string());

        Ok(TranscriptionResult {
            text,
            language,
            confidence,
            segments: Vec::new(),
            speakers: Vec::new(),
            duration: parsed.duration.unwrap_or(0.0),
            pipeline_used: Pipeline::Remote,
        })
    }
}

#[async_trait]
impl TranscriptionStrategy for RemoteStrategy {
    fn name(&self) -> &'static str {
        "remote-api"
    }

    async fn run(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let staged = stage_audio(&self.config.temp_dir, audio)?;
        let outcome = self.upload(staged.path(), options).await;
        discard_staged(staged);
        outcome
    }
}

/// Synthesize a confidence score from returned text.
///
/// The API supplies no score, so one is estimated: base 0.5, up to 0.3 for
/// length, up to 0.2 for punctuation density, clamped to 1.0; empty text
/// scores 0. The exact arithmetic is kept for output compatibility.
pub fn estimate_confidence(text: &str) -> f32 {
    if text.is_empty() {
        return 0.0;
    }
    let length_bonus = (text.len() as f32 / 100.0).min(0.3);
    let punctuation = text.chars().filter(|c| PUNCTUATION.contains(c)).count() as f32;
    let punctuation_bonus = (punctuation * 0.1).min(0.2);
    (0.5 + length_bonus + punctuation_bonus).min(1.0)
}
