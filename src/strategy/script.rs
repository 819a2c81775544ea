//! Local transcription script backend.
//!
//! Runs an external diarizing transcription script as a child process: the
//! audio buffer is staged in a temporary file, the script is invoked with an
//! argument vector (never a shell string), and its output is buffered in
//! full and parsed only after it exits.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

use super::{discard_staged, output_prefix, stage_audio, TranscriptionStrategy};
use crate::protocol::{
    OutputFormat, Pipeline, TranscriptionOptions, TranscriptionResult, WordSegment,
};
use crate::speakers::distinct_speakers;
use crate::{Result, TranscribeError};

/// Confidence reported for script results. The script emits per-word
/// confidences but no overall score; this fixed value is kept for output
/// compatibility and is not a quality estimate.
pub const SCRIPT_CONFIDENCE: f32 = 0.9;

/// Configuration for the script backend.
#[derive(Debug, Clone)]
pub struct ScriptConfig {
    /// Interpreter the script runs under.
    pub python_command: String,
    /// Path to the transcription script.
    pub script_path: PathBuf,
    /// Arguments passed to the interpreter for the capability probe.
    pub probe_args: Vec<String>,
    /// Probe timeout; an unresponsive interpreter counts as unavailable.
    pub probe_timeout: Duration,
    /// HuggingFace token forwarded to the script for diarization.
    pub hf_token: Option<String>,
    /// Working directory for the child process.
    pub working_dir: Option<PathBuf>,
    /// Directory where audio buffers are staged.
    pub temp_dir: PathBuf,
    /// Language reported when neither the request nor the backend names one.
    pub default_language: String,
}

impl Default for ScriptConfig {
    fn default() -> Self {
        Self {
            python_command: "python3".to_string(),
            script_path: PathBuf::from("transcription_pipeline.py"),
            probe_args: vec![
                "-c".to_string(),
                "import whisper_timestamped, pyannote.audio".to_string(),
            ],
            probe_timeout: Duration::from_secs(2),
            hf_token: None,
            working_dir: None,
            temp_dir: std::env::temp_dir(),
            default_language: "sv".to_string(),
        }
    }
}

/// JSON envelope printed by the transcription script.
///
/// The script reports caught exceptions as `{"success": false, "error": …}`
/// with a zero exit code, so `success` is the only field required up front;
/// the rest are validated once `success` is known.
#[derive(Debug, Deserialize)]
struct ScriptEnvelope {
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    segments: Option<Vec<WordSegment>>,
    #[serde(default)]
    speakers: Option<Vec<String>>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    total_words: Option<usize>,
    #[serde(default)]
    markdown: Option<String>,
}

/// Subprocess-based transcription backend.
pub struct ScriptStrategy {
    config: ScriptConfig,
}

impl ScriptStrategy {
    pub fn new(config: ScriptConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ScriptConfig {
        &self.config
    }

    /// Cheap pre-flight check: can the interpreter execute the probe
    /// command within the timeout? Spawn errors, non-zero exits, missing
    /// modules and timeouts all mean "unavailable", never an error.
    pub async fn probe(&self) -> bool {
        let mut cmd = Command::new(&self.config.python_command);
        cmd.args(&self.config.probe_args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        match timeout(self.config.probe_timeout, cmd.output()).await {
            Ok(Ok(output)) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                let available =
                    output.status.success() && !stderr.contains("ModuleNotFoundError");
                if !available {
                    debug!(status = %output.status, stderr = %stderr.trim(), "script backend probe failed");
                }
                available
            }
            Ok(Err(e)) => {
                debug!(error = %e, "script backend probe could not start");
                false
            }
            Err(_) => {
                debug!(timeout = ?self.config.probe_timeout, "script backend probe timed out");
                false
            }
        }
    }

    async fn run_script(
        &self,
        audio_path: &Path,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let mut cmd = Command::new(&self.config.python_command);
        cmd.arg(&self.config.script_path)
            .arg(audio_path)
            .arg("--output")
            .arg(options.output_format.as_arg());
        if let Some(token) = &self.config.hf_token {
            cmd.arg("--hf-token").arg(token);
        }
        if let Some(dir) = &self.config.working_dir {
            cmd.current_dir(dir);
        }
        cmd.stdin(Stdio::null()).kill_on_drop(true);

        debug!(
            script = %self.config.script_path.display(),
            format = options.output_format.as_arg(),
            "invoking transcription script"
        );

        let output = cmd.output().await.map_err(|source| TranscribeError::Spawn {
            command: self.config.python_command.clone(),
            source,
        })?;

        if !output.status.success() {
            return Err(TranscribeError::ProcessExit {
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        self.assemble(&stdout, options)
    }

    /// Turn raw script output into the uniform result shape.
    fn assemble(
        &self,
        stdout: &str,
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let language = options
            .language
            .clone()
            .unwrap_or_else(|| self.config.default_language.clone());

        if options.output_format == OutputFormat::Markdown {
            // Markdown mode: stdout is the final transcript, no structure.
            return Ok(TranscriptionResult {
                text: stdout.trim().to_string(),
                language,
                confidence: SCRIPT_CONFIDENCE,
                segments: Vec::new(),
                speakers: Vec::new(),
                duration: 0.0,
                pipeline_used: Pipeline::Script,
            });
        }

        let envelope: ScriptEnvelope = serde_json::from_str(stdout).map_err(|e| {
            TranscribeError::OutputParse {
                message: e.to_string(),
                prefix: output_prefix(stdout),
            }
        })?;

        if !envelope.success {
            return Err(TranscribeError::ScriptFailure {
                message: envelope
                    .error
                    .unwrap_or_else(|| "script reported failure without a message".to_string()),
            });
        }

        let segments = require_field(envelope.segments, "segments", stdout)?;
        let duration = require_field(envelope.duration, "duration", stdout)?;
        let total_words = require_field(envelope.total_words, "total_words", stdout)?;
        require_field(envelope.speakers, "speakers", stdout)?;

        if total_words != segments.len() {
            warn!(
                total_words,
                segment_count = segments.len(),
                "script word count disagrees with its segment list"
            );
        }

        let text = envelope.markdown.unwrap_or_else(|| {
            segments
                .iter()
                .map(|s| s.word.as_str())
                .collect::<Vec<_>>()
                .join(" ")
        });
        let speakers = distinct_speakers(&segments);

        Ok(TranscriptionResult {
            text,
            language,
            confidence: SCRIPT_CONFIDENCE,
            segments,
            speakers,
            duration,
            pipeline_used: Pipeline::Script,
        })
    }
}

#[async_trait]
impl TranscriptionStrategy for ScriptStrategy {
    fn name(&self) -> &'static str {
        "local-script"
    }

    async fn run(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let staged = stage_audio(&self.config.temp_dir, audio)?;
        let outcome = self.run_script(staged.path(), options).await;
        discard_staged(staged);
        outcome
    }
}

fn require_field<T>(value: Option<T>, name: &str, raw: &str) -> Result<T> {
    value.ok_or_else(|| TranscribeError::OutputParse {
        message: format!("missing `{name}` field"),
        prefix: output_prefix(raw),
    })
}
