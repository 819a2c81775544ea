//! Mock transcription backend.
//!
//! Used when neither real backend is configured, so the system stays
//! demonstrable without credentials. Synthesizes a plausible result with
//! artificial latency; never fails.

use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

use super::TranscriptionStrategy;
use crate::protocol::{Pipeline, TranscriptionOptions, TranscriptionResult};
use crate::Result;

/// Nominal byte rate used to estimate duration from buffer size. This is an
/// approximation (16 kB/s, roughly 16 kHz mono), not a measured value.
const NOMINAL_BYTES_PER_SECOND: f64 = 16_000.0;

const CANNED_TRANSCRIPTS: [&str; 5] = [
    "Thanks everyone for joining, let's get started with the agenda.",
    "I think we should revisit the timeline before committing to a date.",
    "Could you share the document with the rest of the team after the call?",
    "The recording quality looks good, the microphone is picking up clearly.",
    "Let's schedule a follow-up meeting for early next week.",
];

/// Backend that synthesizes results instead of transcribing.
#[derive(Debug, Default)]
pub struct MockStrategy;

impl MockStrategy {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TranscriptionStrategy for MockStrategy {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn run(
        &self,
        audio: &[u8],
        options: &TranscriptionOptions,
    ) -> Result<TranscriptionResult> {
        // Draw everything up front; nothing exclusive is held across the
        // sleep, so concurrent calls are unaffected.
        let (text, delay_ms, confidence) = {
            let mut rng = rand::thread_rng();
            (
                CANNED_TRANSCRIPTS[rng.gen_range(0..CANNED_TRANSCRIPTS.len())],
                rng.gen_range(1000u64..3000),
                rng.gen_range(0.7f32..1.0),
            )
        };

        debug!(delay_ms, "mock backend simulating transcription latency");
        sleep(Duration::from_millis(delay_ms)).await;

        Ok(TranscriptionResult {
            text: text.to_string(),
            language: options.language.clone().unwrap_or_else(|| "en".to_string()),
            confidence,
            segments: Vec::new(),
            speakers: Vec::new(),
            duration: audio.len() as f64 / NOMINAL_BYTES_PER_SECOND,
            pipeline_used: Pipeline::Mock,
        })
    }
}
