use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DubError {
    #[error("Invalid time format for segment {segment}: {reason}")]
    InvalidTimeFormat { segment: String, reason: String },

    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid segment {index}: {reason}")]
    InvalidSegment { index: usize, reason: String },

    #[error("Speech synthesis failed for \"{text}\": {reason}")]
    SynthesisFailure { text: String, reason: String },

    #[error("Remux failed: {0}")]
    RemuxFailure(String),

    #[error("Audio processing failed: {0}")]
    AudioProcessing(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl DubError {
    pub(crate) fn synthesis(text: &str, reason: impl fmt::Display) -> Self {
        DubError::SynthesisFailure {
            text: text.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, DubError>;

/// Non-fatal conditions recorded while dubbing.
///
/// These never abort a request. They are logged when they occur and handed
/// back in the pipeline result so the caller can decide how to present them.
#[derive(Debug, Clone, PartialEq)]
pub enum DubWarning {
    /// Natural/target speed ratio fell outside the allowed range and was clamped.
    DurationMismatch {
        segment: usize,
        natural_ms: u64,
        target_ms: u64,
        applied_speed: f64,
    },
    /// Segment `after` runs past the start of segment `before`.
    GapOverlap {
        after: usize,
        before: usize,
        gap_ms: i64,
    },
    /// Assembled track length differs from the source audio by more than the tolerance.
    TrackDurationMismatch { track_ms: u64, source_ms: u64 },
}

impl fmt::Display for DubWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DubWarning::DurationMismatch {
                segment,
                natural_ms,
                target_ms,
                applied_speed,
            } => write!(
                f,
                "Time for segment {} is too off. Natural time={}ms, segment time={}ms (speed clamped to {:.2})",
                segment, natural_ms, target_ms, applied_speed
            ),
            DubWarning::GapOverlap {
                after,
                before,
                gap_ms,
            } => write!(
                f,
                "Negative gap ({}ms) detected between segments {} and {}. Audio segments may overlap",
                gap_ms,
                after + 1,
                before + 1
            ),
            DubWarning::TrackDurationMismatch {
                track_ms,
                source_ms,
            } => write!(
                f,
                "Audio length mismatch: source {}ms != dubbed {}ms",
                source_ms, track_ms
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesis_failure_mentions_text() {
        let err = DubError::synthesis("namaste", "voice not found");
        let message = err.to_string();
        assert!(message.contains("namaste"));
        assert!(message.contains("voice not found"));
    }

    #[test]
    fn test_overlap_warning_uses_one_based_positions() {
        let warning = DubWarning::GapOverlap {
            after: 0,
            before: 1,
            gap_ms: -50,
        };
        assert_eq!(
            warning.to_string(),
            "Negative gap (-50ms) detected between segments 1 and 2. Audio segments may overlap"
        );
    }
}
