//! Stitching corrected segment audio and silence into one continuous track.

use crate::audio::wav::{track_spec, wav_duration_ms, WavTrackWriter};
use crate::error::{DubError, DubWarning, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Largest accepted difference between the dubbed track and the source audio.
pub const SOURCE_TOLERANCE_MS: u64 = 1000;

/// Where a clip starts and how long it actually plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimedClip {
    pub start_ms: u64,
    pub actual_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackPiece {
    Silence(u64),
    /// Position of the clip in the input list.
    Clip(usize),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrackPlan {
    pub pieces: Vec<TrackPiece>,
    pub total_ms: u64,
    pub warnings: Vec<DubWarning>,
}

/// Lay clips out in order, padding up to each next start with silence.
///
/// A clip that runs past the next clip's start is kept whole; the overlap is
/// reported and the following clip simply starts late.
pub fn plan_track(clips: &[TimedClip]) -> TrackPlan {
    let mut pieces = Vec::with_capacity(clips.len() * 2 + 1);
    let mut warnings = Vec::new();
    let mut total_ms = 0;

    if let Some(first) = clips.first() {
        if first.start_ms > 0 {
            pieces.push(TrackPiece::Silence(first.start_ms));
            total_ms += first.start_ms;
        }
    }

    for (i, clip) in clips.iter().enumerate() {
        pieces.push(TrackPiece::Clip(i));
        total_ms += clip.actual_ms;

        let Some(next) = clips.get(i + 1) else {
            continue;
        };
        let gap = next.start_ms as i64 - (clip.start_ms + clip.actual_ms) as i64;
        if gap > 0 {
            pieces.push(TrackPiece::Silence(gap as u64));
            total_ms += gap as u64;
        } else if gap < 0 {
            let warning = DubWarning::GapOverlap {
                after: i,
                before: i + 1,
                gap_ms: gap,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }
    }

    TrackPlan {
        pieces,
        total_ms,
        warnings,
    }
}

/// A corrected artifact and the start of its segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedClip {
    pub start_ms: u64,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssembledTrack {
    pub path: PathBuf,
    pub total_ms: u64,
    pub warnings: Vec<DubWarning>,
}

#[derive(Debug, Default)]
pub struct TrackAssembler;

impl TrackAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Write the full dubbed track for `clips` to `output` as one WAV.
    pub fn assemble(
        &self,
        clips: &[PlacedClip],
        source_duration_ms: u64,
        output: &Path,
    ) -> Result<AssembledTrack> {
        if clips.is_empty() {
            return Err(DubError::InvalidInput("No segments to assemble".to_string()));
        }

        let timed = clips
            .iter()
            .map(|clip| {
                Ok(TimedClip {
                    start_ms: clip.start_ms,
                    actual_ms: wav_duration_ms(&clip.path)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let plan = plan_track(&timed);
        let mut writer = WavTrackWriter::create(output, track_spec())?;
        for piece in &plan.pieces {
            match *piece {
                TrackPiece::Silence(ms) => writer.append_silence(ms)?,
                TrackPiece::Clip(i) => {
                    writer.append_file(&clips[i].path)?;
                }
            }
        }
        let total_ms = writer.finalize()?;
        info!("Final audio written to {} ({}ms)", output.display(), total_ms);

        let mut warnings = plan.warnings;
        if total_ms.abs_diff(source_duration_ms) > SOURCE_TOLERANCE_MS {
            let warning = DubWarning::TrackDurationMismatch {
                track_ms: total_ms,
                source_ms: source_duration_ms,
            };
            warn!("{}", warning);
            warnings.push(warning);
        }

        Ok(AssembledTrack {
            path: output.to_path_buf(),
            total_ms,
            warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::tests::write_clip;
    use tempfile::TempDir;

    fn clip(start_ms: u64, actual_ms: u64) -> TimedClip {
        TimedClip {
            start_ms,
            actual_ms,
        }
    }

    #[test]
    fn test_plan_exact_fit() {
        let plan = plan_track(&[clip(0, 900), clip(1000, 900), clip(1900, 1000)]);
        assert_eq!(
            plan.pieces,
            vec![
                TrackPiece::Clip(0),
                TrackPiece::Silence(100),
                TrackPiece::Clip(1),
                TrackPiece::Clip(2),
            ]
        );
        assert_eq!(plan.total_ms, 2900);
        assert!(plan.warnings.is_empty());
    }

    #[test]
    fn test_plan_leading_silence() {
        let plan = plan_track(&[clip(2500, 1000)]);
        assert_eq!(
            plan.pieces,
            vec![TrackPiece::Silence(2500), TrackPiece::Clip(0)]
        );
        assert_eq!(plan.total_ms, 3500);
    }

    #[test]
    fn test_plan_overlap_warns_and_inserts_nothing() {
        let plan = plan_track(&[clip(0, 1050), clip(1000, 500)]);
        assert_eq!(plan.pieces, vec![TrackPiece::Clip(0), TrackPiece::Clip(1)]);
        assert_eq!(plan.total_ms, 1550);
        assert_eq!(
            plan.warnings,
            vec![DubWarning::GapOverlap {
                after: 0,
                before: 1,
                gap_ms: -50,
            }]
        );
    }

    #[test]
    fn test_plan_empty() {
        let plan = plan_track(&[]);
        assert!(plan.pieces.is_empty());
        assert_eq!(plan.total_ms, 0);
    }

    #[test]
    fn test_assemble_writes_track() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.wav");
        let b = dir.path().join("b.wav");
        write_clip(&a, 900);
        write_clip(&b, 500);

        let clips = vec![
            PlacedClip {
                start_ms: 100,
                path: a,
            },
            PlacedClip {
                start_ms: 1500,
                path: b,
            },
        ];
        let output = dir.path().join("final_audio.wav");
        let track = TrackAssembler::new().assemble(&clips, 2000, &output).unwrap();

        assert_eq!(track.total_ms, 2000);
        assert!(track.warnings.is_empty());
        assert_eq!(wav_duration_ms(&output).unwrap(), 2000);
    }

    #[test]
    fn test_assemble_reports_source_mismatch() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.wav");
        write_clip(&a, 900);

        let clips = vec![PlacedClip {
            start_ms: 0,
            path: a,
        }];
        let track = TrackAssembler::new()
            .assemble(&clips, 3000, &dir.path().join("out.wav"))
            .unwrap();

        assert_eq!(
            track.warnings,
            vec![DubWarning::TrackDurationMismatch {
                track_ms: 900,
                source_ms: 3000,
            }]
        );
    }

    #[test]
    fn test_assemble_within_tolerance() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.wav");
        write_clip(&a, 900);

        let clips = vec![PlacedClip {
            start_ms: 0,
            path: a,
        }];
        let track = TrackAssembler::new()
            .assemble(&clips, 1900, &dir.path().join("out.wav"))
            .unwrap();
        assert!(track.warnings.is_empty());
    }

    #[test]
    fn test_assemble_requires_clips() {
        let dir = TempDir::new().unwrap();
        assert!(TrackAssembler::new()
            .assemble(&[], 0, &dir.path().join("out.wav"))
            .is_err());
    }
}
