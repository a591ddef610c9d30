pub mod ffmpeg;
pub mod remux;
pub mod wav;

pub use ffmpeg::{
    atempo_filter, change_speed, check_ffmpeg, check_ffprobe, download_video, extract_audio,
    get_media_duration,
};
pub use remux::remux;
pub use wav::{wav_duration_ms, WavTrackWriter, TRACK_CHANNELS, TRACK_SAMPLE_RATE};

use crate::error::Result;
use std::path::Path;
use std::time::Duration;

/// Metadata about an audio file.
#[derive(Debug, Clone)]
pub struct AudioMetadata {
    pub duration: Duration,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioMetadata {
    pub fn duration_ms(&self) -> u64 {
        self.duration.as_millis() as u64
    }
}

/// Audio operations the dubbing core needs from the outside world.
pub trait AudioTools: Send + Sync {
    /// Natural playback duration of an audio file in milliseconds.
    fn duration_ms(&self, path: &Path) -> Result<u64>;

    /// Re-render `input` at `speed`× into a track-format WAV at `output`.
    fn retime(&self, input: &Path, output: &Path, speed: f64) -> Result<()>;

    /// Replace the audio stream of `video` with `audio`.
    fn remux(&self, video: &Path, audio: &Path, output: &Path) -> Result<()> {
        remux(video, audio, output)
    }
}

/// [`AudioTools`] backed by the `ffmpeg` and `ffprobe` binaries.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegTools;

impl AudioTools for FfmpegTools {
    fn duration_ms(&self, path: &Path) -> Result<u64> {
        Ok(get_media_duration(path)?.as_millis() as u64)
    }

    fn retime(&self, input: &Path, output: &Path, speed: f64) -> Result<()> {
        change_speed(input, output, speed)
    }
}
