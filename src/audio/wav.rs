use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use tracing::debug;

use crate::error::{DubError, Result};

/// Sample rate of speed-corrected segments and of the assembled track.
pub const TRACK_SAMPLE_RATE: u32 = 44_100;
/// Channel count of speed-corrected segments and of the assembled track.
pub const TRACK_CHANNELS: u16 = 1;

/// The PCM format every track piece is written in.
pub fn track_spec() -> WavSpec {
    WavSpec {
        channels: TRACK_CHANNELS,
        sample_rate: TRACK_SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Duration of a WAV file in milliseconds, from its frame count.
pub fn wav_duration_ms(path: &Path) -> Result<u64> {
    let reader = open(path)?;
    let spec = reader.spec();
    Ok(frames_to_ms(reader.duration() as u64, spec.sample_rate))
}

fn open(path: &Path) -> Result<WavReader<std::io::BufReader<File>>> {
    WavReader::open(path).map_err(|e| {
        DubError::AudioProcessing(format!("Failed to open WAV file {}: {e}", path.display()))
    })
}

fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    frames * 1000 / u64::from(sample_rate)
}

fn ms_to_frames(ms: u64, sample_rate: u32) -> u64 {
    ms * u64::from(sample_rate) / 1000
}

/// Sequential WAV writer that concatenates clips and silence.
pub struct WavTrackWriter {
    writer: WavWriter<BufWriter<File>>,
    spec: WavSpec,
    frames: u64,
}

impl WavTrackWriter {
    pub fn create(path: &Path, spec: WavSpec) -> Result<Self> {
        let writer = WavWriter::create(path, spec).map_err(|e| {
            DubError::AudioProcessing(format!("Failed to create WAV file {}: {e}", path.display()))
        })?;
        Ok(Self {
            writer,
            spec,
            frames: 0,
        })
    }

    /// Append `ms` of digital silence.
    pub fn append_silence(&mut self, ms: u64) -> Result<()> {
        let samples = ms_to_frames(ms, self.spec.sample_rate) * u64::from(self.spec.channels);
        for _ in 0..samples {
            self.writer.write_sample(0i16).map_err(write_error)?;
        }
        self.frames += ms_to_frames(ms, self.spec.sample_rate);
        Ok(())
    }

    /// Append every sample of a WAV file in the writer's format.
    ///
    /// Returns the appended duration in milliseconds.
    pub fn append_file(&mut self, path: &Path) -> Result<u64> {
        let reader = open(path)?;
        let spec = reader.spec();
        if spec.sample_rate != self.spec.sample_rate
            || spec.channels != self.spec.channels
            || spec.bits_per_sample != self.spec.bits_per_sample
            || spec.sample_format != self.spec.sample_format
        {
            return Err(DubError::AudioProcessing(format!(
                "{} has format {:?}, expected {:?}",
                path.display(),
                spec,
                self.spec
            )));
        }

        let frames = reader.duration() as u64;
        for sample in reader.into_samples::<i16>() {
            let sample = sample.map_err(|e| {
                DubError::AudioProcessing(format!("Failed to read {}: {e}", path.display()))
            })?;
            self.writer.write_sample(sample).map_err(write_error)?;
        }

        self.frames += frames;
        debug!("Appended {} frames from {:?}", frames, path);
        Ok(frames_to_ms(frames, self.spec.sample_rate))
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames, self.spec.sample_rate)
    }

    /// Flush the header and return the total duration in milliseconds.
    pub fn finalize(self) -> Result<u64> {
        let total = self.duration_ms();
        self.writer.finalize().map_err(write_error)?;
        Ok(total)
    }
}

fn write_error(e: hound::Error) -> DubError {
    DubError::AudioProcessing(format!("Failed to write WAV data: {e}"))
}
