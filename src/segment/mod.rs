pub mod builder;
pub mod gaps;
pub mod srt;
pub mod table;

pub use builder::{build_segments, extract_speaker, SegmentSource};
pub use gaps::{
    find_large_gaps, find_large_segments, load_records, render_report, GapInfo, LargeSegmentInfo,
    SegmentRecord,
};
pub use srt::{parse_srt, write_srt};
pub use table::{load_segments, read_table, write_table, TableRow};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Voice role a segment is spoken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Speaker {
    /// The main narrator voice, tagged `AP`.
    #[default]
    #[serde(rename = "AP")]
    Narrator,
    #[serde(rename = "MALE")]
    Male,
    #[serde(rename = "FEMALE")]
    Female,
}

impl Speaker {
    pub const ALL: [Speaker; 3] = [Speaker::Narrator, Speaker::Male, Speaker::Female];

    /// Tag used inside subtitle text, e.g. `[MALE]`.
    pub fn tag(&self) -> &'static str {
        match self {
            Speaker::Narrator => "AP",
            Speaker::Male => "MALE",
            Speaker::Female => "FEMALE",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.tag() == tag)
    }
}

impl fmt::Display for Speaker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl std::str::FromStr for Speaker {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Speaker::from_tag(s.trim()).ok_or_else(|| {
            format!("Unknown speaker: {}. Use 'AP', 'MALE' or 'FEMALE'", s)
        })
    }
}

/// A timed unit of translated text spoken by one voice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub index: usize,
    pub start_ms: u64,
    pub end_ms: u64,
    pub speaker: Speaker,
    pub text: String,
}

impl Segment {
    pub fn target_duration_ms(&self) -> u64 {
        self.end_ms.saturating_sub(self.start_ms)
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::new(self.start_ms, self.end_ms, self.speaker, &self.text)
    }
}

/// Deterministic digest over the inputs that determine a segment's audio.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(start_ms: u64, end_ms: u64, speaker: Speaker, text: &str) -> Self {
        let normalized = text.replace('\n', " ");
        let mut hasher = Sha256::new();
        hasher.update(format!("{}-{}-{}-{}", start_ms, end_ms, speaker.tag(), normalized).as_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(text: &str) -> Segment {
        Segment {
            index: 0,
            start_ms: 1000,
            end_ms: 2000,
            speaker: Speaker::Narrator,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_speaker_tags() {
        assert_eq!(Speaker::from_tag("AP"), Some(Speaker::Narrator));
        assert_eq!(Speaker::from_tag("MALE"), Some(Speaker::Male));
        assert_eq!(Speaker::from_tag("FEMALE"), Some(Speaker::Female));
        assert_eq!(Speaker::from_tag("female"), None);
        assert_eq!(Speaker::default(), Speaker::Narrator);
        assert_eq!("MALE".parse::<Speaker>().unwrap(), Speaker::Male);
        assert!("CHILD".parse::<Speaker>().is_err());
    }

    #[test]
    fn test_fingerprint_is_deterministic() {
        let a = segment("Hello world");
        let b = Segment { index: 5, ..segment("Hello world") };
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn test_fingerprint_treats_newlines_as_spaces() {
        assert_eq!(
            segment("Hello\nworld").fingerprint(),
            segment("Hello world").fingerprint()
        );
    }

    #[test]
    fn test_fingerprint_changes_with_inputs() {
        let base = segment("Hello");
        let moved = Segment { start_ms: 1001, ..base.clone() };
        let longer = Segment { end_ms: 2001, ..base.clone() };
        let revoiced = Segment { speaker: Speaker::Female, ..base.clone() };
        let reworded = segment("Hello!");

        for other in [moved, longer, revoiced, reworded] {
            assert_ne!(base.fingerprint(), other.fingerprint());
        }
    }

    #[test]
    fn test_target_duration() {
        assert_eq!(segment("x").target_duration_ms(), 1000);
    }
}
