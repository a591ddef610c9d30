//! CSV persistence of an editable segment list (`start,end,text,speaker`).
//!
//! Times are stored as entered or as `HH:MM:SS,mmm`, so the table can be
//! edited by hand between sessions and re-validated on load.

use super::{Segment, Speaker};
use crate::error::{DubError, Result};
use crate::timing;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableRow {
    pub start: String,
    pub end: String,
    pub text: String,
    #[serde(default)]
    pub speaker: String,
}

impl TableRow {
    pub fn from_segment(segment: &Segment) -> Self {
        Self {
            start: timing::format(segment.start_ms),
            end: timing::format(segment.end_ms),
            text: segment.text.clone(),
            speaker: segment.speaker.tag().to_string(),
        }
    }

    /// Validate the row and turn it into a segment at `index`.
    pub fn to_segment(&self, index: usize) -> Result<Segment> {
        let label = index + 1;
        let start_ms = timing::parse(&self.start, label)?;
        let end_ms = timing::parse(&self.end, label)?;

        let text = self.text.trim();
        if text.is_empty() {
            return Err(DubError::InvalidSegment {
                index,
                reason: "Enter text".to_string(),
            });
        }
        if end_ms <= start_ms {
            return Err(DubError::InvalidSegment {
                index,
                reason: format!("end ({end_ms}ms) must be after start ({start_ms}ms)"),
            });
        }

        let speaker = match self.speaker.trim() {
            "" => Speaker::default(),
            tag => Speaker::from_tag(tag).unwrap_or_else(|| {
                warn!("Invalid speaker: {}", tag);
                Speaker::default()
            }),
        };

        Ok(Segment {
            index,
            start_ms,
            end_ms,
            speaker,
            text: text.to_string(),
        })
    }
}

/// Write segments to a CSV table, replacing any existing file.
pub fn write_table(path: &Path, segments: &[Segment]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for segment in segments {
        writer.serialize(TableRow::from_segment(segment))?;
    }
    writer.flush()?;

    if !segments.is_empty() {
        info!("Segment table of {} rows written to {:?}", segments.len(), path);
    }
    Ok(())
}

/// Read raw rows; an empty file yields no rows.
pub fn read_table(path: &Path) -> Result<Vec<TableRow>> {
    if !path.exists() {
        return Err(DubError::FileNotFound(path.display().to_string()));
    }

    let mut reader = csv::Reader::from_path(path)?;
    let mut rows = Vec::new();
    for record in reader.deserialize() {
        let row: TableRow = record?;
        rows.push(row);
    }
    Ok(rows)
}

/// Read a table and validate every row into a segment.
pub fn load_segments(path: &Path) -> Result<Vec<Segment>> {
    read_table(path)?
        .iter()
        .enumerate()
        .map(|(index, row)| row.to_segment(index))
        .collect()
}
