use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::warn;

use crate::protocol::{TranscriptionOptions, TranscriptionResult};
use crate::{Result, TranscribeError};

pub mod mock;
pub mod remote;
pub mod script;

pub use mock::MockStrategy;
pub use remote::{RemoteConfig, RemoteStrategy};
pub use script::{ScriptConfig, ScriptStrategy};

/// One concrete way of turning an audio buffer into transcript text.
#[async_trait]
pub trait TranscriptionStrategy: Send + Sync {
    /// Strategy name for logging and diagnostics.
    fn name(&self) -> &'static str;

    /// Transcribe one audio buffer. The buffer is borrowed for the duration
    /// of the call; no state is retained afterwards.
    async fn run(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult>;
}

/// Write the audio buffer to a uniquely named temporary file.
///
/// The name combines a UTC timestamp with `tempfile`'s random suffix, so
/// concurrent calls never collide even though nothing locks the temp
/// directory. The returned handle owns the file; it must be passed to
/// [`discard_staged`] (or dropped) before the strategy returns.
pub(crate) fn stage_audio(temp_dir: &Path, audio: &[u8]) -> Result<NamedTempFile> {
    std::fs::create_dir_all(temp_dir).map_err(TranscribeError::TempFile)?;
    let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
    let mut file = tempfile::Builder::new()
        .prefix(&format!("bridge_{stamp}_"))
        .suffix(".audio")
        .tempfile_in(temp_dir)
        .map_err(TranscribeError::TempFile)?;
    file.write_all(audio).map_err(TranscribeError::TempFile)?;
    file.flush().map_err(TranscribeError::TempFile)?;
    Ok(file)
}

/// How much raw backend output an `OutputParse` error keeps for diagnosis.
pub(crate) const PARSE_PREFIX_CHARS: usize = 200;

/// First part of raw backend output, for parse-error diagnostics.
pub(crate) fn output_prefix(raw: &str) -> String {
    raw.chars().take(PARSE_PREFIX_CHARS).collect()
}

/// Remove a staged audio file. A deletion failure is logged, never raised;
/// it must not mask whatever the strategy is about to return.
pub(crate) fn discard_staged(file: NamedTempFile) {
    let path = file.path().to_path_buf();
    if let Err(e) = file.close() {
        warn!(path = %path.display(), error = %e, "failed to remove temporary audio file");
    }
}
