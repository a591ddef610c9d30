// SRT subtitle format
use super::Segment;
use crate::error::{DubError, Result};
use crate::timing;

/// A single cue as it appears in an SRT document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrtCue {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
}

/// Parse SRT content into cues, preserving document order.
pub fn parse_srt(content: &str) -> Result<Vec<SrtCue>> {
    let normalized = content.replace("\r\n", "\n").replace('\u{feff}', "");
    let mut cues = Vec::new();

    for block in split_blocks(&normalized) {
        let label = cues.len() + 1;
        let mut lines = block.iter().copied().peekable();

        // Sequence numbers are optional and ignored; order comes from the document.
        if let Some(first) = lines.peek() {
            if !first.contains("-->") && first.trim().chars().all(|c| c.is_ascii_digit()) {
                lines.next();
            }
        }

        let timing_line = lines.next().ok_or_else(|| DubError::InvalidTimeFormat {
            segment: label.to_string(),
            reason: "missing timing line".to_string(),
        })?;

        let (start, end) = timing_line
            .split_once("-->")
            .ok_or_else(|| DubError::InvalidTimeFormat {
                segment: label.to_string(),
                reason: format!("expected 'start --> end', got '{}'", timing_line.trim()),
            })?;

        // Anything after the end timestamp (cue settings) is ignored.
        let end = end.split_whitespace().next().unwrap_or_default();

        let text = lines
            .map(str::trim_end)
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string();

        cues.push(SrtCue {
            start_ms: timing::parse(start, label)?,
            end_ms: timing::parse(end, label)?,
            text,
        });
    }

    Ok(cues)
}

/// Render segments as SRT, tagging every cue with its speaker.
pub fn write_srt(segments: &[Segment]) -> String {
    segments
        .iter()
        .enumerate()
        .map(|(i, segment)| {
            format!(
                "{}\n{} --> {}\n[{}] {}\n",
                i + 1,
                timing::format(segment.start_ms),
                timing::format(segment.end_ms),
                segment.speaker.tag(),
                segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_blocks(content: &str) -> Vec<Vec<&str>> {
    let mut blocks = Vec::new();
    let mut current = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                blocks.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        blocks.push(current);
    }

    blocks
}
