use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{DubError, Result};

use super::wav::{TRACK_CHANNELS, TRACK_SAMPLE_RATE};
use super::AudioMetadata;

/// Range a single `atempo` filter stage accepts.
const ATEMPO_MIN: f64 = 0.5;
const ATEMPO_MAX: f64 = 2.0;

/// Check if FFmpeg is installed and accessible.
pub fn check_ffmpeg() -> Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| {
            DubError::AudioProcessing(format!(
                "FFmpeg not found. Please install FFmpeg and ensure it's in your PATH. Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(DubError::AudioProcessing("FFmpeg check failed".to_string()));
    }

    debug!("FFmpeg is available");
    Ok(())
}

/// Check if FFprobe is installed and accessible.
pub fn check_ffprobe() -> Result<()> {
    let output = Command::new("ffprobe")
        .arg("-version")
        .output()
        .map_err(|e| {
            DubError::AudioProcessing(format!(
                "FFprobe not found. Please install FFmpeg (includes FFprobe). Error: {e}"
            ))
        })?;

    if !output.status.success() {
        return Err(DubError::AudioProcessing("FFprobe check failed".to_string()));
    }

    debug!("FFprobe is available");
    Ok(())
}

/// Get media duration using FFprobe.
pub fn get_media_duration(input: &Path) -> Result<Duration> {
    if !input.exists() {
        return Err(DubError::FileNotFound(input.display().to_string()));
    }

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "default=noprint_wrappers=1:nokey=1",
        ])
        .arg(input)
        .output()
        .map_err(|e| DubError::AudioProcessing(format!("Failed to run FFprobe: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DubError::AudioProcessing(format!("FFprobe failed: {stderr}")));
    }

    let duration_str = String::from_utf8_lossy(&output.stdout);
    let duration_secs: f64 = duration_str.trim().parse().map_err(|e| {
        DubError::AudioProcessing(format!(
            "Failed to parse duration '{}': {e}",
            duration_str.trim()
        ))
    })?;

    Ok(Duration::from_secs_f64(duration_secs))
}

/// Extract the audio stream of a video into a mono 16kHz MP3.
pub async fn extract_audio(input: &Path, output: &Path) -> Result<AudioMetadata> {
    check_ffmpeg()?;
    check_ffprobe()?;

    if !input.exists() {
        return Err(DubError::FileNotFound(input.display().to_string()));
    }

    info!("Extracting audio from video: {}", input.display());

    let duration = get_media_duration(input)?;
    debug!("Input duration: {:?}", duration);

    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-i"])
        .arg(input)
        .args(["-vn", "-acodec", "libmp3lame", "-ar", "16000", "-ac", "1"])
        .arg(output);
    run(&mut command, "audio extraction")?;

    if !output.exists() {
        return Err(DubError::AudioProcessing(
            "Audio was not extracted correctly".to_string(),
        ));
    }

    info!("Extracted audio to {}", output.display());

    Ok(AudioMetadata {
        duration,
        sample_rate: 16000,
        channels: 1,
    })
}

/// Download a video with `yt-dlp`, preferring mp4 video with m4a audio.
pub async fn download_video(url: &str, output: &Path) -> Result<()> {
    info!("Downloading video from {}", url);

    let mut command = Command::new("yt-dlp");
    command
        .args([
            "--force-overwrite",
            "-f",
            "bestvideo[ext=mp4]+bestaudio[ext=m4a]/mp4",
            "-o",
        ])
        .arg(output)
        .arg(url);
    run(&mut command, "video download")?;

    if !output.exists() {
        return Err(DubError::AudioProcessing(
            "Video download finished but output file was not created".to_string(),
        ));
    }

    info!("Downloaded video to {}", output.display());
    Ok(())
}

/// Build an `atempo` filter chain for an arbitrary speed factor.
///
/// A single `atempo` stage only accepts factors in `[0.5, 2.0]`, so larger
/// or smaller factors are split into several stages whose product is `speed`.
pub fn atempo_filter(speed: f64) -> String {
    let mut stages = Vec::new();
    let mut remaining = speed;

    while remaining > ATEMPO_MAX {
        stages.push(ATEMPO_MAX);
        remaining /= ATEMPO_MAX;
    }
    while remaining < ATEMPO_MIN {
        stages.push(ATEMPO_MIN);
        remaining /= ATEMPO_MIN;
    }
    stages.push(remaining);

    stages
        .iter()
        .map(|factor| format!("atempo={:.6}", factor))
        .collect::<Vec<_>>()
        .join(",")
}

/// Change the tempo of `input` by `speed` and write a track-format PCM WAV.
pub fn change_speed(input: &Path, output: &Path, speed: f64) -> Result<()> {
    if !speed.is_finite() || speed <= 0.0 {
        return Err(DubError::AudioProcessing(format!(
            "Invalid speed factor: {speed}"
        )));
    }

    info!("Speeding by {:.3} for {}", speed, input.display());

    let sample_rate = TRACK_SAMPLE_RATE.to_string();
    let channels = TRACK_CHANNELS.to_string();

    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-i"])
        .arg(input)
        .args(["-filter:a", &atempo_filter(speed)])
        .args(["-acodec", "pcm_s16le", "-ar", &sample_rate, "-ac", &channels])
        .arg(output);
    run(&mut command, "speed adjustment")
}

fn run(command: &mut Command, what: &str) -> Result<()> {
    debug!("Running command: {:?}", command);

    let output = command
        .output()
        .map_err(|e| DubError::AudioProcessing(format!("Failed to run {what}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(DubError::AudioProcessing(format!(
            "{what} failed ({}): {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ffmpeg_available() -> bool {
        Command::new("ffmpeg")
            .arg("-version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn stage_product(filter: &str) -> f64 {
        filter
            .split(',')
            .map(|stage| {
                let factor: f64 = stage.trim_start_matches("atempo=").parse().unwrap();
                assert!((ATEMPO_MIN..=ATEMPO_MAX).contains(&factor), "{stage}");
                factor
            })
            .product()
    }

    #[test]
    fn test_atempo_single_stage() {
        assert_eq!(atempo_filter(1.25), "atempo=1.250000");
        assert_eq!(atempo_filter(0.5), "atempo=0.500000");
    }

    #[test]
    fn test_atempo_chains_stay_in_range() {
        for speed in [0.5, 0.75, 1.0, 2.0, 2.5, 4.0, 5.0] {
            let filter = atempo_filter(speed);
            assert!((stage_product(&filter) - speed).abs() < 1e-4, "{filter}");
        }
        assert_eq!(atempo_filter(5.0), "atempo=2.000000,atempo=2.000000,atempo=1.250000");
    }

    #[test]
    fn test_change_speed_rejects_bad_factor() {
        let result = change_speed(Path::new("/tmp/in.mp3"), Path::new("/tmp/out.wav"), 0.0);
        assert!(matches!(result, Err(DubError::AudioProcessing(_))));
    }

    #[test]
    fn test_check_ffmpeg() {
        let result = check_ffmpeg();
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available or broken");
            return;
        }
        assert!(result.is_ok(), "FFmpeg check failed: {:?}", result.err());
    }

    #[tokio::test]
    async fn test_extract_audio_file_not_found() {
        if !ffmpeg_available() {
            eprintln!("Skipping test: FFmpeg not available");
            return;
        }

        let result =
            extract_audio(Path::new("/nonexistent/input.mp4"), Path::new("/tmp/out.mp3")).await;
        match &result {
            Err(DubError::FileNotFound(path)) => assert!(path.contains("nonexistent")),
            Err(other) => panic!("Expected FileNotFound error, got: {other}"),
            Ok(_) => panic!("Expected error but got Ok"),
        }
    }

    #[test]
    fn test_media_duration_file_not_found() {
        assert!(matches!(
            get_media_duration(Path::new("/nonexistent/input.mp3")),
            Err(DubError::FileNotFound(_))
        ));
    }
}
