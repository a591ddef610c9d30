use super::srt::parse_srt;
use super::{Segment, Speaker};
use crate::error::{DubError, Result};
use regex::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

static SPEAKER_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(.*?)\]").expect("Invalid regex"));

/// Where the segments of a dubbing request come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SegmentSource {
    /// Subtitle (SRT) content; every cue becomes one segment.
    Subtitles(String),
    /// One translated block with no timing, spread over the whole source audio.
    PlainText { text: String, duration_ms: u64 },
}

impl SegmentSource {
    /// Pick the source from the available inputs. Subtitles win over plain text.
    pub fn select(
        subtitles: Option<&str>,
        plain_text: Option<&str>,
        source_duration_ms: u64,
    ) -> Result<Self> {
        let present = |s: Option<&str>| s.filter(|s| !s.trim().is_empty()).map(str::to_string);

        if let Some(content) = present(subtitles) {
            return Ok(SegmentSource::Subtitles(content));
        }
        if let Some(text) = present(plain_text) {
            return Ok(SegmentSource::PlainText {
                text,
                duration_ms: source_duration_ms,
            });
        }

        Err(DubError::MissingInput(
            "Please provide valid subtitles or translated text".to_string(),
        ))
    }

    /// Convert the source into ordered, validated segments.
    pub fn build(&self) -> Result<Vec<Segment>> {
        let segments = match self {
            SegmentSource::Subtitles(content) => {
                let cues = parse_srt(content)?;
                if cues.is_empty() {
                    return Err(DubError::MissingInput(
                        "Subtitles contain no cues".to_string(),
                    ));
                }
                cues.into_iter()
                    .enumerate()
                    .map(|(index, cue)| {
                        let (speaker, text) = extract_speaker(&cue.text);
                        Segment {
                            index,
                            start_ms: cue.start_ms,
                            end_ms: cue.end_ms,
                            speaker,
                            text,
                        }
                    })
                    .collect::<Vec<_>>()
            }
            SegmentSource::PlainText { text, duration_ms } => vec![Segment {
                index: 0,
                start_ms: 0,
                end_ms: *duration_ms,
                speaker: Speaker::default(),
                text: text.trim().to_string(),
            }],
        };

        for segment in &segments {
            validate(segment)?;
        }

        debug!("Built {} segments", segments.len());
        Ok(segments)
    }
}

/// Build segments from whichever input is available.
pub fn build_segments(
    subtitles: Option<&str>,
    plain_text: Option<&str>,
    source_duration_ms: u64,
) -> Result<Vec<Segment>> {
    SegmentSource::select(subtitles, plain_text, source_duration_ms)?.build()
}

/// Split a leading `[SPEAKER]` tag from cue text.
///
/// The first bracketed tag picks the voice when it names a known speaker.
/// Every bracketed tag is removed from the returned text.
pub fn extract_speaker(raw: &str) -> (Speaker, String) {
    let text = raw.trim();
    let mut speaker = Speaker::default();

    if let Some(captures) = SPEAKER_TAG.captures(text) {
        let tag = &captures[1];
        match Speaker::from_tag(tag) {
            Some(s) => speaker = s,
            None => warn!("Invalid speaker: {}", tag),
        }
    }

    let stripped = SPEAKER_TAG.replace_all(text, "");
    (speaker, stripped.trim().to_string())
}

fn validate(segment: &Segment) -> Result<()> {
    if segment.end_ms <= segment.start_ms {
        return Err(DubError::InvalidSegment {
            index: segment.index,
            reason: format!(
                "end ({}ms) must be after start ({}ms)",
                segment.end_ms, segment.start_ms
            ),
        });
    }
    if segment.text.is_empty() {
        return Err(DubError::InvalidSegment {
            index: segment.index,
            reason: "Enter text".to_string(),
        });
    }
    Ok(())
}
