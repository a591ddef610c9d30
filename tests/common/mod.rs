//! Shared fakes for the integration tests.
//!
//! `FakeTools` treats the byte length of a non-WAV file as its duration in
//! milliseconds, and writes real track-format WAVs when retiming.

#![allow(dead_code)]

use autodub::audio::wav::{track_spec, wav_duration_ms, TRACK_SAMPLE_RATE};
use autodub::audio::AudioTools;
use autodub::Result;
use hound::WavWriter;
use std::path::Path;

pub struct FakeTools;

impl AudioTools for FakeTools {
    fn duration_ms(&self, path: &Path) -> Result<u64> {
        if path.extension().is_some_and(|e| e == "wav") {
            return wav_duration_ms(path);
        }
        Ok(std::fs::metadata(path)?.len())
    }

    fn retime(&self, input: &Path, output: &Path, speed: f64) -> Result<()> {
        let natural = std::fs::metadata(input)?.len() as f64;
        write_wav(output, (natural / speed).round() as u64);
        Ok(())
    }

    fn remux(&self, _video: &Path, audio: &Path, output: &Path) -> Result<()> {
        std::fs::copy(audio, output)?;
        Ok(())
    }
}

/// Write a track-format tone of `ms` milliseconds.
pub fn write_wav(path: &Path, ms: u64) {
    let mut writer = WavWriter::create(path, track_spec()).unwrap();
    for i in 0..ms * u64::from(TRACK_SAMPLE_RATE) / 1000 {
        writer.write_sample(((i % 64) as i16 - 32) * 200).unwrap();
    }
    writer.finalize().unwrap();
}

/// A file whose fake duration is `ms`.
pub fn write_sized(path: &Path, ms: u64) {
    std::fs::write(path, vec![0u8; ms as usize]).unwrap();
}
