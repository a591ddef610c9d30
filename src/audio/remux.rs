use std::path::Path;
use std::process::Command;

use tracing::{debug, info};

use crate::error::{DubError, Result};

/// Replace the audio stream of `video` with `audio`, copying the video stream.
///
/// Any previous file at `output` is removed first so that a failed run never
/// leaves a stale result behind.
pub fn remux(video: &Path, audio: &Path, output: &Path) -> Result<()> {
    for input in [video, audio] {
        if !input.exists() {
            return Err(DubError::RemuxFailure(format!(
                "input not found: {}",
                input.display()
            )));
        }
    }
    if output.exists() {
        std::fs::remove_file(output)?;
    }

    info!("Merging {} into {}", audio.display(), video.display());

    let mut command = Command::new("ffmpeg");
    command
        .args(["-y", "-i"])
        .arg(video)
        .arg("-i")
        .arg(audio)
        .args(["-c:v", "copy", "-c:a", "aac", "-map", "0:v:0", "-map", "1:a:0"])
        .arg(output);
    debug!("Running command: {:?}", command);

    let result = command
        .output()
        .map_err(|e| DubError::RemuxFailure(format!("Failed to run ffmpeg: {e}")))?;

    if !result.status.success() {
        let stderr = String::from_utf8_lossy(&result.stderr);
        return Err(DubError::RemuxFailure(format!(
            "ffmpeg exited with {}: {}",
            result.status,
            stderr.trim()
        )));
    }
    if !output.exists() {
        return Err(DubError::RemuxFailure(format!(
            "ffmpeg produced no output at {}",
            output.display()
        )));
    }

    info!("Dubbed video written to {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_video_is_remux_failure() {
        let dir = TempDir::new().unwrap();
        let audio = dir.path().join("final_audio.wav");
        std::fs::write(&audio, b"").unwrap();

        let result = remux(&dir.path().join("input.mp4"), &audio, &dir.path().join("out.mp4"));
        match result {
            Err(DubError::RemuxFailure(msg)) => assert!(msg.contains("input.mp4")),
            other => panic!("Expected RemuxFailure, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_media_is_remux_failure() {
        let dir = TempDir::new().unwrap();
        let video = dir.path().join("input.mp4");
        let audio = dir.path().join("final_audio.wav");
        let output = dir.path().join("output.mp4");
        std::fs::write(&video, b"not a video").unwrap();
        std::fs::write(&audio, b"not audio").unwrap();
        std::fs::write(&output, b"stale").unwrap();

        // Fails whether or not ffmpeg is installed; the stale output must be gone.
        assert!(matches!(
            remux(&video, &audio, &output),
            Err(DubError::RemuxFailure(_))
        ));
        assert!(!output.exists());
    }
}
