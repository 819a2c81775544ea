//! Pure aggregation helpers over word segments: who spoke, how much, when.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::protocol::WordSegment;

/// Diarization produces this label when no speaker turn covers a word.
const UNKNOWN_SPEAKER: &str = "Unknown";

/// Per-speaker aggregate over a segment list.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SpeakerStats {
    /// Number of words attributed to this speaker.
    pub words: usize,
    /// Earliest segment start, in seconds.
    pub first_start: f64,
    /// Latest segment end, in seconds.
    pub last_end: f64,
    /// `last_end - first_start`, in seconds.
    pub duration: f64,
}

/// Distinct non-empty, non-"Unknown" speaker labels, sorted.
pub fn distinct_speakers(segments: &[WordSegment]) -> Vec<String> {
    let mut labels: Vec<String> = segments
        .iter()
        .filter_map(|s| s.speaker.as_deref())
        .filter(|label| !label.is_empty() && *label != UNKNOWN_SPEAKER)
        .map(str::to_string)
        .collect();
    labels.sort();
    labels.dedup();
    labels
}

/// Group segments by speaker and aggregate word count and speaking span.
///
/// Empty input yields an empty map; there are no failure modes.
pub fn speaker_stats(segments: &[WordSegment]) -> BTreeMap<String, SpeakerStats> {
    let mut stats: BTreeMap<String, SpeakerStats> = BTreeMap::new();

    for segment in segments {
        let Some(label) = segment.speaker.as_deref() else {
            continue;
        };
        if label.is_empty() || label == UNKNOWN_SPEAKER {
            continue;
        }

        let entry = stats.entry(label.to_string()).or_insert(SpeakerStats {
            words: 0,
            first_start: segment.start,
            last_end: segment.end,
            duration: 0.0,
        });
        entry.words += 1;
        entry.first_start = entry.first_start.min(segment.start);
        entry.last_end = entry.last_end.max(segment.end);
    }

    for entry in stats.values_mut() {
        entry.duration = entry.last_end - entry.first_start;
    }
    stats
}

/// Format seconds as `HH:MM:SS.mmm`.
pub fn format_timestamp(seconds: f64) -> String {
    let hours = (seconds / 3600.0) as u64;
    let minutes = ((seconds % 3600.0) / 60.0) as u64;
    let secs = seconds % 60.0;
    format!("{hours:02}:{minutes:02}:{secs:06.3}")
}
