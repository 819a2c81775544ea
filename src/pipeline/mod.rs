//! Backend selection and fallback.
//!
//! One [`TranscriptionPipeline`] owns the three strategies and decides,
//! per call, which one serves a request: the local script when its
//! capability probe passes, the remote API when the script is unavailable
//! or fails, and the mock only when no real backend is configured at all.

use tracing::{info, warn};
use uuid::Uuid;

use crate::protocol::{PipelineStatus, TranscriptionOptions, TranscriptionResult};
use crate::strategy::{MockStrategy, RemoteStrategy, ScriptStrategy, TranscriptionStrategy};
use crate::{Result, TranscribeError};

pub use crate::strategy::{RemoteConfig, ScriptConfig};

/// Configuration for the whole pipeline, passed explicitly at construction.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Script backend settings.
    pub script: ScriptConfig,
    /// Remote backend settings. `None` means no API key is configured and
    /// the remote strategy is ineligible.
    pub remote: Option<RemoteConfig>,
    /// Whether a synthesized result may stand in when no backend is usable.
    pub allow_mock: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            script: ScriptConfig::default(),
            remote: None,
            allow_mock: true,
        }
    }
}

/// The transcription backend selector.
///
/// Explicitly constructed and dependency-injected; holds no global state
/// and retains nothing between calls beyond its read-only configuration.
pub struct TranscriptionPipeline {
    script: ScriptStrategy,
    remote: Option<RemoteStrategy>,
    mock: MockStrategy,
    allow_mock: bool,
}

impl TranscriptionPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            script: ScriptStrategy::new(config.script),
            remote: config.remote.map(RemoteStrategy::new),
            mock: MockStrategy::new(),
            allow_mock: config.allow_mock,
        }
    }

    /// Backend eligibility snapshot for diagnostics. Runs the capability
    /// probe, so the answer reflects the current state of the host.
    pub async fn status(&self) -> PipelineStatus {
        let script_available = self.script.probe().await;
        let remote_configured = self.remote.is_some();
        PipelineStatus {
            script_available,
            remote_configured,
            mock_mode_active: !script_available && !remote_configured,
        }
    }

    /// Transcribe one audio buffer.
    ///
    /// Selection is evaluated once per call and never cached: probe the
    /// script backend, run it if available, fall back to the remote API on
    /// failure, and synthesize a mock result only in mock mode (no backend
    /// configured at all). Whatever error survives selection is returned
    /// verbatim.
    pub async fn transcribe(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        let request_id = Uuid::new_v4();
        info!(%request_id, bytes = audio.len(), "transcription requested");

        if self.script.probe().await {
            match self.script.run(audio, options).await {
                Ok(result) => {
                    info!(%request_id, pipeline = %result.pipeline_used, "transcription complete");
                    return Ok(result);
                }
                Err(script_err) => {
                    let Some(remote) = &self.remote else {
                        warn!(%request_id, error = %script_err, "script backend failed, no fallback configured");
                        return Err(script_err);
                    };
                    warn!(%request_id, error = %script_err, "script backend failed, falling back to remote API");
                    let result = remote.run(audio, options).await?;
                    info!(%request_id, pipeline = %result.pipeline_used, "transcription complete");
                    return Ok(result);
                }
            }
        }

        if let Some(remote) = &self.remote {
            info!(%request_id, "script backend unavailable, using remote API");
            let result = remote.run(audio, options).await?;
            info!(%request_id, pipeline = %result.pipeline_used, "transcription complete");
            return Ok(result);
        }

        if !self.allow_mock {
            return Err(TranscribeError::NoBackend);
        }

        info!(%request_id, "no transcription backend configured, mock mode active");
        self.mock.run(audio, options).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::Pipeline;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn failing_script(dir: &TempDir) -> ScriptConfig {
        let script_path = dir.path().join("failing.sh");
        std::fs::write(&script_path, "echo boom >&2; exit 1").unwrap();
        sh_config(script_path, dir.path().join("staging"))
    }

    fn succeeding_script(dir: &TempDir) -> ScriptConfig {
        let script_path = dir.path().join("ok.sh");
        std::fs::write(
            &script_path,
            r#"echo '{"success": true, "total_words": 1, "segments": [{"start": 0.0, "end": 1.0, "word": "hej", "speaker": "SPEAKER_00"}], "speakers": ["SPEAKER_00"], "duration": 1.0, "markdown": "**SPEAKER_00** hej"}'"#,
        )
        .unwrap();
        sh_config(script_path, dir.path().join("staging"))
    }

    fn sh_config(script_path: PathBuf, temp_dir: PathBuf) -> ScriptConfig {
        ScriptConfig {
            python_command: "sh".to_string(),
            script_path,
            probe_args: vec!["-c".to_string(), "true".to_string()],
            temp_dir,
            ..Default::default()
        }
    }

    fn unavailable_script(dir: &TempDir) -> ScriptConfig {
        ScriptConfig {
            probe_args: vec!["-c".to_string(), "exit 1".to_string()],
            python_command: "sh".to_string(),
            temp_dir: dir.path().join("staging"),
            ..Default::default()
        }
    }

    fn remote_to(server: &MockServer, temp_dir: &Path) -> RemoteConfig {
        let mut config = RemoteConfig::new("test-key");
        config.endpoint = format!("{}/v1/audio/transcriptions", server.uri());
        config.temp_dir = temp_dir.to_path_buf();
        config
    }

    fn staging_count(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("staging"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[tokio::test]
    async fn script_result_is_preferred_when_available() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: succeeding_script(&dir),
            remote: None,
            allow_mock: true,
        });

        let result = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.pipeline_used, Pipeline::Script);
        assert_eq!(staging_count(&dir), 0);
    }

    #[tokio::test]
    async fn script_failure_falls_back_to_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "fallback transcript"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: failing_script(&dir),
            remote: Some(remote_to(&server, &dir.path().join("staging"))),
            allow_mock: true,
        });

        let result = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap();

        assert_eq!(result.pipeline_used, Pipeline::Remote);
        assert_eq!(result.text, "fallback transcript");
        assert_eq!(staging_count(&dir), 0);
    }

    #[tokio::test]
    async fn script_failure_without_fallback_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: failing_script(&dir),
            remote: None,
            allow_mock: false,
        });

        let err = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(staging_count(&dir), 0);
    }

    #[tokio::test]
    async fn remote_error_is_terminal_when_both_backends_fail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: failing_script(&dir),
            remote: Some(remote_to(&server, &dir.path().join("staging"))),
            allow_mock: true,
        });

        let err = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap_err();

        match err {
            TranscribeError::RemoteApi { status, body } => {
                assert_eq!(status, 500);
                assert!(body.contains("upstream down"));
            }
            other => panic!("expected RemoteApi, got {other:?}"),
        }
        assert_eq!(staging_count(&dir), 0);
    }

    #[tokio::test]
    async fn unavailable_script_goes_straight_to_remote() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "text": "remote only"
            })))
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: unavailable_script(&dir),
            remote: Some(remote_to(&server, &dir.path().join("staging"))),
            allow_mock: true,
        });

        let result = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.pipeline_used, Pipeline::Remote);
    }

    #[tokio::test(start_paused = true)]
    async fn mock_mode_serves_when_nothing_is_configured() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: unavailable_script(&dir),
            remote: None,
            allow_mock: true,
        });

        let result = pipeline
            .transcribe(b"", &TranscriptionOptions::default())
            .await
            .unwrap();
        assert_eq!(result.pipeline_used, Pipeline::Mock);
        assert!((0.7..1.0).contains(&result.confidence));
    }

    #[tokio::test]
    async fn disallowed_mock_yields_no_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: unavailable_script(&dir),
            remote: None,
            allow_mock: false,
        });

        let err = pipeline
            .transcribe(b"audio", &TranscriptionOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::NoBackend));
    }

    #[tokio::test]
    async fn status_reports_mock_mode() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: unavailable_script(&dir),
            remote: None,
            allow_mock: true,
        });

        let status = pipeline.status().await;
        assert!(!status.script_available);
        assert!(!status.remote_configured);
        assert!(status.mock_mode_active);
    }

    #[tokio::test]
    async fn status_reflects_an_available_script() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = TranscriptionPipeline::new(PipelineConfig {
            script: succeeding_script(&dir),
            remote: None,
            allow_mock: true,
        });

        let status = pipeline.status().await;
        assert!(status.script_available);
        assert!(!status.mock_mode_active);
    }
}
