use serde::{Deserialize, Serialize};
use std::fmt;

/// Desired shape of the local script's standard output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Structured JSON envelope with word-level segments.
    #[default]
    Json,
    /// Human-readable transcript, one speaker turn per line.
    Markdown,
}

impl OutputFormat {
    /// Value passed to the script's `--output` flag.
    pub fn as_arg(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Markdown => "markdown",
        }
    }
}

/// Per-request options supplied by the caller.
///
/// Deserialized leniently: unrecognized keys are ignored and every field
/// has a default, so a bare `{}` is a valid request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranscriptionOptions {
    /// Requested language code (e.g. "sv", "en"). Forwarded to the backend.
    pub language: Option<String>,
    /// Output shape requested from the local script.
    pub output_format: OutputFormat,
    /// Response format forwarded verbatim to the remote API.
    pub response_format: Option<String>,
    /// Sampling temperature forwarded verbatim to the remote API.
    pub temperature: Option<f32>,
}

/// A timestamped span of transcript text, optionally attributed to a speaker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordSegment {
    /// Start time in seconds.
    pub start: f64,
    /// End time in seconds.
    pub end: f64,
    /// The transcribed word.
    pub word: String,
    /// Speaker label, if diarization attributed one.
    #[serde(default)]
    pub speaker: Option<String>,
    /// Per-word confidence, if the backend supplied one.
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl WordSegment {
    pub fn new(start: f64, end: f64, word: impl Into<String>) -> Self {
        Self {
            start,
            end,
            word: word.into(),
            speaker: None,
            confidence: None,
        }
    }

    pub fn with_speaker(mut self, speaker: impl Into<String>) -> Self {
        self.speaker = Some(speaker.into());
        self
    }
}

/// Identifies which backend produced a result.
///
/// Always set on a [`TranscriptionResult`]; callers rely on it to assert
/// fallback behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pipeline {
    /// Local transcription script run as a child process.
    #[serde(rename = "local-script")]
    Script,
    /// Hosted speech-to-text API.
    #[serde(rename = "remote-api")]
    Remote,
    /// Synthesized result, no real backend involved.
    #[serde(rename = "mock")]
    Mock,
}

impl Pipeline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Pipeline::Script => "local-script",
            Pipeline::Remote => "remote-api",
            Pipeline::Mock => "mock",
        }
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Uniform transcription result, regardless of which backend served the call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptionResult {
    /// Concatenated transcript. May be empty.
    pub text: String,
    /// Language code: the requested language, or the backend's detection.
    pub language: String,
    /// Overall confidence in [0, 1]. Synthesized when the backend does not
    /// supply one.
    pub confidence: f32,
    /// Word-level segments in chronological order. May be empty.
    pub segments: Vec<WordSegment>,
    /// Distinct non-empty, non-"Unknown" speaker labels found in `segments`.
    pub speakers: Vec<String>,
    /// Audio duration in seconds, 0 when unknown.
    pub duration: f64,
    /// Which backend produced this result.
    pub pipeline_used: Pipeline,
}

/// Diagnostic snapshot of backend eligibility.
///
/// `mock_mode_active` means no real backend is usable and calls will return
/// synthesized results; callers use this to warn users up front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineStatus {
    pub script_available: bool,
    pub remote_configured: bool,
    pub mock_mode_active: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_to_json_output() {
        let options = TranscriptionOptions::default();
        assert_eq!(options.output_format, OutputFormat::Json);
        assert!(options.language.is_none());
        assert!(options.temperature.is_none());
    }

    #[test]
    fn options_ignore_unrecognized_keys() {
        let options: TranscriptionOptions = serde_json::from_str(
            r#"{"language": "sv", "outputFormat": "markdown", "speakerHints": ["A"]}"#,
        )
        .unwrap();
        assert_eq!(options.language.as_deref(), Some("sv"));
        assert_eq!(options.output_format, OutputFormat::Markdown);
    }

    #[test]
    fn result_serializes_camel_case_with_pipeline_tag() {
        let result = TranscriptionResult {
            text: "hej".to_string(),
            language: "sv".to_string(),
            confidence: 0.9,
            segments: vec![WordSegment::new(0.0, 0.4, "hej").with_speaker("SPEAKER_00")],
            speakers: vec!["SPEAKER_00".to_string()],
            duration: 0.4,
            pipeline_used: Pipeline::Script,
        };

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["pipelineUsed"], "local-script");
        assert_eq!(json["segments"][0]["speaker"], "SPEAKER_00");
        assert_eq!(json["duration"], 0.4);
    }

    #[test]
    fn pipeline_display_matches_wire_tag() {
        assert_eq!(Pipeline::Remote.to_string(), "remote-api");
        assert_eq!(
            serde_json::to_value(Pipeline::Mock).unwrap(),
            serde_json::Value::String("mock".to_string())
        );
    }

    #[test]
    fn segment_speaker_defaults_to_none() {
        let segment: WordSegment =
            serde_json::from_str(r#"{"start": 0.0, "end": 1.0, "word": "ord"}"#).unwrap();
        assert!(segment.speaker.is_none());
        assert!(segment.confidence.is_none());
    }
}
