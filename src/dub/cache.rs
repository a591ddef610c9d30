//! Content-addressed store of speed-corrected segment audio.

use crate::dub::reconcile::{DurationReconciler, SpeedCorrection};
use crate::error::{DubError, DubWarning, Result};
use crate::segment::{Fingerprint, Segment};
use crate::synth::SpeechSynthesizer;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Where segment artifacts live, keyed by fingerprint.
pub trait ArtifactStore: Send + Sync {
    /// Location for the synthesized audio before speed correction.
    fn raw_path(&self, fingerprint: &Fingerprint) -> PathBuf;

    /// Location for the speed-corrected track-format WAV.
    fn corrected_path(&self, fingerprint: &Fingerprint) -> PathBuf;

    /// The corrected artifact, if one has already been produced.
    fn lookup(&self, fingerprint: &Fingerprint) -> Option<PathBuf> {
        let path = self.corrected_path(fingerprint);
        path.is_file().then_some(path)
    }
}

/// Artifacts stored as flat files in one directory.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl ArtifactStore for DirectoryStore {
    fn raw_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("{fingerprint}.mp3"))
    }

    fn corrected_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        self.root.join(format!("speed_{fingerprint}.wav"))
    }
}

/// A segment's corrected audio and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct CachedArtifact {
    pub path: PathBuf,
    pub fingerprint: Fingerprint,
    pub cache_hit: bool,
    /// Speed applied when the artifact was created; `None` on a cache hit.
    pub correction: Option<SpeedCorrection>,
    pub warning: Option<DubWarning>,
}

pub struct SegmentCache {
    store: Arc<dyn ArtifactStore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    reconciler: DurationReconciler,
}

impl SegmentCache {
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        reconciler: DurationReconciler,
    ) -> Self {
        Self {
            store,
            synthesizer,
            reconciler,
        }
    }

    /// Return the corrected artifact for `segment`, synthesizing it on a miss.
    pub async fn get_or_create(&self, segment: &Segment, language: &str) -> Result<CachedArtifact> {
        let fingerprint = segment.fingerprint();

        if let Some(path) = self.store.lookup(&fingerprint) {
            info!("Segment {} found in cache", segment.index);
            debug!("Cached artifact: {:?}", path);
            return Ok(CachedArtifact {
                path,
                fingerprint,
                cache_hit: true,
                correction: None,
                warning: None,
            });
        }

        let raw_path = self.store.raw_path(&fingerprint);
        let audio = self
            .synthesizer
            .synthesize(&segment.text, language, segment.speaker, &raw_path)
            .await?;

        // Only a finished render may appear under the cache key.
        let corrected = self.store.corrected_path(&fingerprint);
        let staging = staging_file(&corrected)?;
        let reconciled = self.reconciler.reconcile(
            segment,
            &audio.path,
            audio.natural_duration_ms,
            staging.path(),
        )?;
        staging
            .persist(&corrected)
            .map_err(|e| DubError::Io(e.error))?;
        debug!("Stored artifact: {:?}", corrected);

        Ok(CachedArtifact {
            path: corrected,
            fingerprint,
            cache_hit: false,
            correction: Some(reconciled.correction),
            warning: reconciled.warning,
        })
    }
}

fn staging_file(target: &Path) -> Result<NamedTempFile> {
    let dir = target.parent().unwrap_or_else(|| Path::new("."));
    let file = tempfile::Builder::new()
        .prefix(".staging_")
        .suffix(".wav")
        .tempfile_in(dir)?;
    Ok(file)
}
