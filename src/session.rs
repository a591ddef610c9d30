//! Per-request working directories.

use crate::error::{DubError, Result};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

const PREFIX: &str = "session_";

/// A `session_{id}` directory holding one dubbing job's inputs, segment
/// artifacts and outputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
    dir: PathBuf,
}

impl Session {
    /// Create a new session named after the current unix time.
    pub fn create(work_dir: &Path) -> Result<Self> {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self::create_with_id(work_dir, &secs.to_string())
    }

    pub fn create_with_id(work_dir: &Path, id: &str) -> Result<Self> {
        let dir = work_dir.join(format!("{PREFIX}{id}"));
        std::fs::create_dir_all(&dir)?;
        info!("Session directory: {}", dir.display());
        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    /// Open an existing session by id (`1712345678` or `session_1712345678`).
    pub fn open(work_dir: &Path, id: &str) -> Result<Self> {
        let id = id.trim().trim_start_matches(PREFIX);
        if id.is_empty() {
            return Err(DubError::InvalidInput("Empty session id".to_string()));
        }
        let dir = work_dir.join(format!("{PREFIX}{id}"));
        if !dir.is_dir() {
            return Err(DubError::FileNotFound(dir.display().to_string()));
        }
        Ok(Self {
            id: id.to_string(),
            dir,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn input_video(&self) -> PathBuf {
        self.dir.join("input.mp4")
    }

    pub fn input_audio(&self) -> PathBuf {
        self.dir.join("input_audio.mp3")
    }

    pub fn output_video(&self) -> PathBuf {
        self.dir.join("output.mp4")
    }

    pub fn subtitles_srt(&self) -> PathBuf {
        self.dir.join("subtitles.srt")
    }

    pub fn subtitles_csv(&self) -> PathBuf {
        self.dir.join("subtitles.csv")
    }

    pub fn transcript(&self) -> PathBuf {
        self.dir.join("transcript.txt")
    }

    pub fn translation(&self) -> PathBuf {
        self.dir.join("translation.txt")
    }

    pub fn final_audio(&self) -> PathBuf {
        self.dir.join("final_audio.wav")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_create_and_open() {
        let work = TempDir::new().unwrap();
        let session = Session::create(work.path()).unwrap();
        assert!(session.dir().is_dir());
        assert!(session
            .dir()
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("session_"));

        let reopened = Session::open(work.path(), session.id()).unwrap();
        assert_eq!(reopened, session);

        let by_dir_name = Session::open(work.path(), &format!("session_{}", session.id())).unwrap();
        assert_eq!(by_dir_name, session);
    }

    #[test]
    fn test_open_missing_session() {
        let work = TempDir::new().unwrap();
        assert!(matches!(
            Session::open(work.path(), "42"),
            Err(DubError::FileNotFound(_))
        ));
        assert!(Session::open(work.path(), " ").is_err());
    }

    #[test]
    fn test_well_known_paths() {
        let work = TempDir::new().unwrap();
        let session = Session::create_with_id(work.path(), "7").unwrap();
        assert_eq!(session.input_video(), work.path().join("session_7/input.mp4"));
        assert_eq!(session.final_audio(), work.path().join("session_7/final_audio.wav"));
        assert_eq!(session.subtitles_csv(), work.path().join("session_7/subtitles.csv"));
    }
}
