//! Transcribe Bridge - a thin transcription backend selector
//!
//! This crate takes an encoded audio buffer from a caller (typically a web
//! layer relaying browser microphone captures) and turns it into transcript
//! text through one of three backends:
//!
//! - A local transcription script run as a child process (word timestamps
//!   and speaker diarization)
//! - A hosted speech-to-text API used as a fallback when the script fails
//! - A mock backend that keeps the system demonstrable with no credentials
//!
//! Whichever backend runs, the caller gets the same
//! [`TranscriptionResult`] shape back, tagged with the pipeline that
//! produced it.
//!
//! # Example
//!
//! ```no_run
//! use transcribe_bridge::{PipelineConfig, TranscriptionOptions, TranscriptionPipeline};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let pipeline = TranscriptionPipeline::new(PipelineConfig::default());
//!
//!     let status = pipeline.status().await;
//!     if status.mock_mode_active {
//!         eprintln!("warning: no backend configured, results will be mocked");
//!     }
//!
//!     let audio = std::fs::read("recording.webm")?;
//!     let result = pipeline
//!         .transcribe(&audio, &TranscriptionOptions::default())
//!         .await?;
//!     println!("[{}] {}", result.pipeline_used, result.text);
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod protocol;
pub mod speakers;
pub mod strategy;

// Re-export commonly used types for convenience
pub use pipeline::{PipelineConfig, RemoteConfig, ScriptConfig, TranscriptionPipeline};
pub use protocol::{
    OutputFormat, Pipeline, PipelineStatus, TranscriptionOptions, TranscriptionResult, WordSegment,
};
pub use speakers::{distinct_speakers, speaker_stats, SpeakerStats};
pub use strategy::{MockStrategy, RemoteStrategy, ScriptStrategy, TranscriptionStrategy};

// Error types
use thiserror::Error;

/// Errors that can occur while transcribing a buffer.
///
/// Strategy-level errors are recoverable at the selector (they trigger
/// fallback to the next backend); whatever error survives selection is
/// returned to the caller verbatim so operators can tell a crashed script
/// from a network failure from malformed output.
#[derive(Error, Debug)]
pub enum TranscribeError {
    /// The transcription script could not be started at all (missing
    /// interpreter, permission denied).
    #[error("failed to start transcription process `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The transcription script ran and exited non-zero. Carries the
    /// captured stderr verbatim.
    #[error("transcription script exited with code {}: {stderr}", .code.map_or_else(|| "unknown".to_string(), |c| c.to_string()))]
    ProcessExit { code: Option<i32>, stderr: String },

    /// The script exited zero but reported a caught failure in its JSON
    /// envelope (`{"success": false, ...}`).
    #[error("transcription script reported failure: {message}")]
    ScriptFailure { message: String },

    /// Backend output could not be parsed in the expected format. Carries
    /// a prefix of the raw output for diagnosis.
    #[error("could not parse transcription output ({message}); output began with: {prefix:?}")]
    OutputParse { message: String, prefix: String },

    /// The remote API call failed in transport (connect, TLS, timeout).
    #[error("remote transcription request failed: {0}")]
    RemoteRequest(#[from] reqwest::Error),

    /// The remote API answered with a non-success status.
    #[error("remote transcription API returned HTTP {status}: {body}")]
    RemoteApi { status: u16, body: String },

    /// The audio buffer could not be staged in a temporary file.
    #[error("failed to stage audio in a temporary file: {0}")]
    TempFile(#[source] std::io::Error),

    /// Every configured backend is unavailable and mock fallback is
    /// disabled.
    #[error("no transcription backend is configured and mock fallback is disabled")]
    NoBackend,
}

/// Result type alias for transcribe-bridge operations.
pub type Result<T> = std::result::Result<T, TranscribeError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_constants() {
        assert!(!VERSION.is_empty());
        assert_eq!(NAME, "transcribe-bridge");
    }

    #[test]
    fn process_exit_message_carries_stderr() {
        let err = TranscribeError::ProcessExit {
            code: Some(1),
            stderr: "boom".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("code 1"));
        assert!(message.contains("boom"));
    }

    #[test]
    fn process_exit_without_code_mentions_unknown() {
        let err = TranscribeError::ProcessExit {
            code: None,
            stderr: "killed".to_string(),
        };
        assert!(err.to_string().contains("unknown"));
    }
}
