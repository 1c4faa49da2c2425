//! Transcript-derived semantic segmentation.
//!
//! When a plain-text transcript is available, paragraph structure provides a
//! third, low-weight boundary signal. Paragraphs get uniform time spans over
//! the clip; topic-shift wording and question/paragraph patterns raise a
//! segment's confidence.

use serde::Serialize;
use tracing::debug;

/// Wording that usually signals a topic shift.
const TOPIC_KEYWORDS: [&str; 6] = ["now", "next", "let's", "moving on", "another", "finally"];

/// Baseline confidence for a plain paragraph split.
const BASE_CONFIDENCE: f64 = 0.6;
/// Confidence for a segment with topic-shift evidence.
const TOPIC_CONFIDENCE: f64 = 0.8;

/// One semantic segment of the transcript.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscriptSegment {
    /// Segment start time in seconds.
    pub start: f64,
    /// Segment end time in seconds.
    pub end: f64,
    /// Segmentation confidence in `[0, 1]`.
    pub confidence: f64,
}

/// Split a transcript into semantic segments over `[0, duration]`.
///
/// Returns an empty list for blank transcripts or a single paragraph (no
/// internal boundaries to contribute).
pub fn segment_transcript(text: &str, duration: f64) -> Vec<TranscriptSegment> {
    if duration <= 0.0 {
        return Vec::new();
    }

    let paragraphs: Vec<&str> = text
        .split("\n\n")
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();
    if paragraphs.len() < 2 {
        return Vec::new();
    }

    let time_per_paragraph = duration / paragraphs.len() as f64;
    let segments: Vec<TranscriptSegment> = paragraphs
        .iter()
        .enumerate()
        .map(|(i, paragraph)| TranscriptSegment {
            start: i as f64 * time_per_paragraph,
            end: (i + 1) as f64 * time_per_paragraph,
            confidence: if signals_topic_change(paragraph) {
                TOPIC_CONFIDENCE
            } else {
                BASE_CONFIDENCE
            },
        })
        .collect();

    debug!(
        paragraphs = paragraphs.len(),
        segments = segments.len(),
        "Segmented transcript"
    );
    segments
}

/// Heuristic topic-change test over one paragraph.
fn signals_topic_change(text: &str) -> bool {
    let lowered = text.to_lowercase();
    let has_keyword = TOPIC_KEYWORDS
        .iter()
        .any(|keyword| lowered.contains(keyword));
    let has_question = text.contains('?');
    let is_long = text.len() > 200;
    has_keyword || (has_question && is_long)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_transcript_yields_nothing() {
        assert!(segment_transcript("", 60.0).is_empty());
        assert!(segment_transcript("   \n\n  ", 60.0).is_empty());
    }

    #[test]
    fn test_single_paragraph_yields_nothing() {
        assert!(segment_transcript("just one block of text", 60.0).is_empty());
    }

    #[test]
    fn test_uniform_time_allocation() {
        let text = "first part\n\nsecond part\n\nthird part";
        let segments = segment_transcript(text, 30.0);
        assert_eq!(segments.len(), 3);
        assert!((segments[0].end - 10.0).abs() < 1e-9);
        assert!((segments[1].start - 10.0).abs() < 1e-9);
        assert!((segments[2].end - 30.0).abs() < 1e-9);
    }

    #[test]
    fn test_topic_keywords_raise_confidence() {
        let text = "intro remarks here\n\nmoving on to the demo\n\nplain wrap up text";
        let segments = segment_transcript(text, 30.0);
        assert!((segments[1].confidence - TOPIC_CONFIDENCE).abs() < 1e-9);
        assert!((segments[2].confidence - BASE_CONFIDENCE).abs() < 1e-9);
    }
}
