//! Gap and long-segment analysis over transcript segment lists.

use crate::error::{DubError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::Path;

const RULE_WIDTH: usize = 80;

/// One transcript segment as stored in a segment-list JSON file (seconds).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub id: u64,
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub duration: Option<f64>,
    pub text: String,
    #[serde(default)]
    pub speaker: Option<String>,
}

impl SegmentRecord {
    pub fn duration(&self) -> f64 {
        self.duration.unwrap_or(self.end_time - self.start_time)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GapInfo {
    pub gap_size: f64,
    pub prev_segment_id: u64,
    pub prev_segment_end: f64,
    pub prev_segment_text: String,
    pub next_segment_id: u64,
    pub next_segment_start: f64,
    pub next_segment_text: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LargeSegmentInfo {
    pub segment_id: u64,
    pub duration: f64,
    pub start_time: f64,
    pub end_time: f64,
    pub text: String,
    pub speaker: String,
}

/// Load a segment list from a JSON file.
pub fn load_records(path: &Path) -> Result<Vec<SegmentRecord>> {
    if !path.exists() {
        return Err(DubError::FileNotFound(path.display().to_string()));
    }
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

/// Find gaps between consecutive segments (by start time) larger than `threshold` seconds.
pub fn find_large_gaps(segments: &[SegmentRecord], threshold: f64) -> Vec<GapInfo> {
    let mut sorted: Vec<&SegmentRecord> = segments.iter().collect();
    sorted.sort_by(|a, b| a.start_time.total_cmp(&b.start_time));

    sorted
        .windows(2)
        .filter_map(|pair| {
            let (prev, next) = (pair[0], pair[1]);
            let gap_size = next.start_time - prev.end_time;
            (gap_size > threshold).then(|| GapInfo {
                gap_size: round2(gap_size),
                prev_segment_id: prev.id,
                prev_segment_end: prev.end_time,
                prev_segment_text: prev.text.clone(),
                next_segment_id: next.id,
                next_segment_start: next.start_time,
                next_segment_text: next.text.clone(),
            })
        })
        .collect()
}

/// Find segments longer than `threshold` seconds, longest first.
pub fn find_large_segments(segments: &[SegmentRecord], threshold: f64) -> Vec<LargeSegmentInfo> {
    let mut large: Vec<LargeSegmentInfo> = segments
        .iter()
        .filter(|s| s.duration() > threshold)
        .map(|s| LargeSegmentInfo {
            segment_id: s.id,
            duration: round2(s.duration()),
            start_time: s.start_time,
            end_time: s.end_time,
            text: s.text.clone(),
            speaker: s.speaker.clone().unwrap_or_else(|| "unknown".to_string()),
        })
        .collect();

    large.sort_by(|a, b| b.duration.total_cmp(&a.duration));
    large
}

/// Render the human-readable analysis report.
///
/// Seconds use `Debug` formatting so whole values keep their `.0`.
pub fn render_report(
    gaps: &[GapInfo],
    gap_threshold: f64,
    large_segments: &[LargeSegmentInfo],
    segment_threshold: f64,
) -> String {
    let rule = "-".repeat(RULE_WIDTH);
    let mut out = String::new();

    if gaps.is_empty() {
        let _ = writeln!(out, "No gaps larger than {:?} seconds found.", gap_threshold);
    } else {
        let _ = writeln!(
            out,
            "Found {} gaps larger than {:?} seconds:",
            gaps.len(),
            gap_threshold
        );
        let _ = writeln!(out, "{rule}");
        for (i, gap) in gaps.iter().enumerate() {
            let _ = writeln!(out, "Gap #{}: {:?} seconds", i + 1, gap.gap_size);
            let _ = writeln!(
                out,
                "Between segment {} (ends at {:?}s)",
                gap.prev_segment_id, gap.prev_segment_end
            );
            let _ = writeln!(out, "  Text: \"{}\"", gap.prev_segment_text);
            let _ = writeln!(
                out,
                "And segment {} (starts at {:?}s)",
                gap.next_segment_id, gap.next_segment_start
            );
            let _ = writeln!(out, "  Text: \"{}\"", gap.next_segment_text);
            let _ = writeln!(out, "{rule}");
        }
    }

    if large_segments.is_empty() {
        let _ = writeln!(
            out,
            "\nNo segments longer than {:?} seconds found.",
            segment_threshold
        );
    } else {
        let _ = writeln!(
            out,
            "\nFound {} segments longer than {:?} seconds:",
            large_segments.len(),
            segment_threshold
        );
        let _ = writeln!(out, "{rule}");
        for (i, segment) in large_segments.iter().enumerate() {
            let _ = writeln!(
                out,
                "Large Segment #{}: {:?} seconds (ID: {})",
                i + 1,
                segment.duration,
                segment.segment_id
            );
            let _ = writeln!(
                out,
                "  Time Range: {:?}s - {:?}s",
                segment.start_time, segment.end_time
            );
            let _ = writeln!(out, "  Speaker: {}", segment.speaker);
            let _ = writeln!(out, "  Text: \"{}\"", segment.text);
            let _ = writeln!(out, "{rule}");
        }
    }

    out
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
