//! Fitting synthesized speech into its segment's time window.

use crate::audio::AudioTools;
use crate::error::{DubWarning, Result};
use crate::segment::Segment;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

pub const SPEED_MIN: f64 = 0.5;
pub const SPEED_MAX: f64 = 5.0;

/// Speed factor applied to one segment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedCorrection {
    /// Natural duration divided by target duration, before clamping.
    pub raw: f64,
    /// Factor actually applied, within `[SPEED_MIN, SPEED_MAX]`.
    pub factor: f64,
    pub clamped: bool,
}

/// Speed factor that makes `natural_ms` of audio fill `[start_ms, end_ms]`.
///
/// An empty or inverted window is treated as needing maximal compression.
pub fn compute_speed(natural_ms: u64, start_ms: u64, end_ms: u64) -> SpeedCorrection {
    let raw = if end_ms > start_ms {
        natural_ms as f64 / (end_ms - start_ms) as f64
    } else {
        f64::INFINITY
    };
    let factor = raw.clamp(SPEED_MIN, SPEED_MAX);
    SpeedCorrection {
        raw,
        factor,
        clamped: factor != raw,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub correction: SpeedCorrection,
    pub warning: Option<DubWarning>,
}

pub struct DurationReconciler {
    tools: Arc<dyn AudioTools>,
}

impl DurationReconciler {
    pub fn new(tools: Arc<dyn AudioTools>) -> Self {
        Self { tools }
    }

    /// Re-render `raw_audio` into `output` at the speed that fits `segment`.
    ///
    /// A factor outside the allowed range is clamped and reported as a
    /// warning; the segment is still rendered.
    pub fn reconcile(
        &self,
        segment: &Segment,
        raw_audio: &Path,
        natural_ms: u64,
        output: &Path,
    ) -> Result<Reconciled> {
        let target_ms = segment.target_duration_ms();
        let correction = compute_speed(natural_ms, segment.start_ms, segment.end_ms);

        let warning = correction.clamped.then(|| {
            let warning = DubWarning::DurationMismatch {
                segment: segment.index,
                natural_ms,
                target_ms,
                applied_speed: correction.factor,
            };
            warn!("{}", warning);
            warning
        });

        info!(
            "Segment {}: natural {}ms, target {}ms, speed {:.3}",
            segment.index, natural_ms, target_ms, correction.factor
        );
        self.tools.retime(raw_audio, output, correction.factor)?;

        Ok(Reconciled {
            correction,
            warning,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Speaker;
    use std::sync::Mutex;

    #[test]
    fn test_speed_within_range() {
        let c = compute_speed(4000, 0, 1000);
        assert_eq!(c.raw, 4.0);
        assert_eq!(c.factor, 4.0);
        assert!(!c.clamped);

        let c = compute_speed(1500, 1000, 4000);
        assert_eq!(c.factor, 0.5);
        assert!(!c.clamped);
    }

    #[test]
    fn test_speed_clamped_high() {
        let c = compute_speed(10_000, 0, 500);
        assert_eq!(c.raw, 20.0);
        assert_eq!(c.factor, SPEED_MAX);
        assert!(c.clamped);
    }

    #[test]
    fn test_speed_clamped_low() {
        let c = compute_speed(100, 0, 1000);
        assert_eq!(c.factor, SPEED_MIN);
        assert!(c.clamped);
    }

    #[test]
    fn test_empty_window_is_maximal_compression() {
        let c = compute_speed(1000, 500, 500);
        assert!(c.raw.is_infinite());
        assert_eq!(c.factor, SPEED_MAX);
        assert!(c.clamped);
    }

    struct RecordingTools {
        speeds: Mutex<Vec<f64>>,
    }

    impl AudioTools for RecordingTools {
        fn duration_ms(&self, _path: &Path) -> Result<u64> {
            Ok(0)
        }

        fn retime(&self, _input: &Path, _output: &Path, speed: f64) -> Result<()> {
            self.speeds.lock().unwrap().push(speed);
            Ok(())
        }
    }

    fn segment(start_ms: u64, end_ms: u64) -> Segment {
        Segment {
            index: 2,
            start_ms,
            end_ms,
            speaker: Speaker::Narrator,
            text: "text".to_string(),
        }
    }

    #[test]
    fn test_reconcile_warns_on_clamp_without_failing() {
        let tools = Arc::new(RecordingTools {
            speeds: Mutex::new(Vec::new()),
        });
        let reconciler = DurationReconciler::new(tools.clone());

        let result = reconciler
            .reconcile(&segment(0, 500), Path::new("in.mp3"), 10_000, Path::new("out.wav"))
            .unwrap();

        assert_eq!(result.correction.factor, 5.0);
        assert_eq!(
            result.warning,
            Some(DubWarning::DurationMismatch {
                segment: 2,
                natural_ms: 10_000,
                target_ms: 500,
                applied_speed: 5.0,
            })
        );
        assert_eq!(*tools.speeds.lock().unwrap(), vec![5.0]);
    }

    #[test]
    fn test_reconcile_in_range_has_no_warning() {
        let tools = Arc::new(RecordingTools {
            speeds: Mutex::new(Vec::new()),
        });
        let reconciler = DurationReconciler::new(tools.clone());

        let result = reconciler
            .reconcile(&segment(0, 1000), Path::new("in.mp3"), 1200, Path::new("out.wav"))
            .unwrap();

        assert!(result.warning.is_none());
        assert_eq!(*tools.speeds.lock().unwrap(), vec![1.2]);
    }
}
