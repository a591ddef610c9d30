use crate::audio::{AudioTools, FfmpegTools};
use crate::config::Config;
use crate::dub::{
    ArtifactStore, CachedArtifact, DirectoryStore, DurationReconciler, PlacedClip, SegmentCache,
    TrackAssembler,
};
use crate::error::{DubError, DubWarning, Result};
use crate::segment::build_segments;
use crate::session::Session;
use crate::synth::{
    ElevenLabsClient, GoogleTtsClient, RouteTable, SpeechSynthesizer, SynthesisRouter,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// One dubbing job.
#[derive(Debug, Clone)]
pub struct DubRequest {
    /// Video whose audio stream is replaced.
    pub video: PathBuf,
    /// Original audio, measured for plain-text timing and the final length check.
    pub source_audio: PathBuf,
    /// Synthesis language code, e.g. `hi` or `te-IN`.
    pub language: String,
    /// SRT document; takes precedence over `plain_text`.
    pub subtitles: Option<String>,
    /// Whole translated text, spoken across the full source duration.
    pub plain_text: Option<String>,
    pub final_audio: PathBuf,
    pub output: PathBuf,
    pub show_progress: bool,
}

impl DubRequest {
    /// A request using the session's well-known file locations.
    pub fn for_session(
        session: &Session,
        language: impl Into<String>,
        subtitles: Option<String>,
        plain_text: Option<String>,
    ) -> Self {
        Self {
            video: session.input_video(),
            source_audio: session.input_audio(),
            language: language.into(),
            subtitles,
            plain_text,
            final_audio: session.final_audio(),
            output: session.output_video(),
            show_progress: true,
        }
    }
}

/// Collaborators the pipeline runs with.
#[derive(Clone)]
pub struct DubServices {
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub tools: Arc<dyn AudioTools>,
    pub store: Arc<dyn ArtifactStore>,
}

impl DubServices {
    /// Hosted backends from configuration, storing artifacts in `session_dir`.
    pub fn from_config(config: &Config, session_dir: &Path) -> Result<Self> {
        let elevenlabs_key = config.elevenlabs_api_key.clone().ok_or_else(|| {
            DubError::Config("ELEVENLABS_API_KEY not set".to_string())
        })?;
        let elevenlabs = Arc::new(ElevenLabsClient::new(elevenlabs_key, config.voices.clone()));
        let google = Arc::new(GoogleTtsClient::new(
            config.google_api_key.clone().unwrap_or_default(),
        ));
        let tools: Arc<dyn AudioTools> = Arc::new(FfmpegTools);

        let router = SynthesisRouter::new(
            RouteTable::new(&config.direct_languages),
            elevenlabs.clone(),
            google,
            elevenlabs,
            tools.clone(),
        );

        Ok(Self {
            synthesizer: Arc::new(router),
            tools,
            store: Arc::new(DirectoryStore::new(session_dir)?),
        })
    }
}

#[derive(Debug, Clone)]
pub struct DubStats {
    pub segments: usize,
    pub cache_hits: usize,
    pub clamped_segments: usize,
    pub source_duration: Duration,
    pub track_duration: Duration,
    pub synthesis_time: Duration,
    pub total_time: Duration,
}

#[derive(Debug)]
pub struct DubResult {
    pub output_path: PathBuf,
    pub final_audio: PathBuf,
    pub artifacts: Vec<CachedArtifact>,
    /// Every non-fatal condition met along the way, in order.
    pub warnings: Vec<DubWarning>,
    pub stats: DubStats,
}

fn has_text(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

/// Dub `request.video` into `request.language`.
///
/// Segments are synthesized strictly in order; each is taken from the
/// artifact store when already present. The stitched track is written to
/// `request.final_audio` and muxed into `request.output`.
pub async fn create_dubbed_video(request: &DubRequest, services: &DubServices) -> Result<DubResult> {
    let start_time = Instant::now();

    if !has_text(&request.subtitles) && !has_text(&request.plain_text) {
        return Err(DubError::MissingInput(
            "Please upload a valid SRT or translated text.".to_string(),
        ));
    }
    if !request.video.exists() {
        return Err(DubError::FileNotFound(request.video.display().to_string()));
    }

    info!("Creating dubbed video for: {}", request.video.display());

    let source_ms = services.tools.duration_ms(&request.source_audio)?;
    let segments = build_segments(
        request.subtitles.as_deref(),
        request.plain_text.as_deref(),
        source_ms,
    )?;
    info!("Dubbing {} segments into {}", segments.len(), request.language);

    let cache = SegmentCache::new(
        services.store.clone(),
        services.synthesizer.clone(),
        DurationReconciler::new(services.tools.clone()),
    );

    let pb = request.show_progress.then(|| {
        let pb = ProgressBar::new(segments.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} segments ({eta})")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        pb
    });

    let synthesis_start = Instant::now();
    let mut artifacts = Vec::with_capacity(segments.len());
    let mut warnings = Vec::new();
    for segment in &segments {
        info!("Dubbing segment {}", segment.index);
        let artifact = cache.get_or_create(segment, &request.language).await?;
        warnings.extend(artifact.warning.clone());
        artifacts.push(artifact);
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    }
    let synthesis_time = synthesis_start.elapsed();
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }

    let clips: Vec<PlacedClip> = segments
        .iter()
        .zip(&artifacts)
        .map(|(segment, artifact)| PlacedClip {
            start_ms: segment.start_ms,
            path: artifact.path.clone(),
        })
        .collect();
    let track = TrackAssembler::new().assemble(&clips, source_ms, &request.final_audio)?;
    warnings.extend(track.warnings.iter().cloned());

    services
        .tools
        .remux(&request.video, &track.path, &request.output)?;
    info!("Dubbed video created successfully");

    let stats = DubStats {
        segments: segments.len(),
        cache_hits: artifacts.iter().filter(|a| a.cache_hit).count(),
        clamped_segments: artifacts
            .iter()
            .filter(|a| a.correction.is_some_and(|c| c.clamped))
            .count(),
        source_duration: Duration::from_millis(source_ms),
        track_duration: Duration::from_millis(track.total_ms),
        synthesis_time,
        total_time: start_time.elapsed(),
    };

    Ok(DubResult {
        output_path: request.output.clone(),
        final_audio: track.path,
        artifacts,
        warnings,
        stats,
    })
}

/// Print a summary of the dubbing results.
pub fn print_summary(result: &DubResult) {
    println!();
    println!("═══════════════════════════════════════════════════════════════");
    println!("                        Dubbing Complete                        ");
    println!("═══════════════════════════════════════════════════════════════");
    println!();
    println!("  Output:     {}", result.output_path.display());
    println!("  Audio:      {}", result.final_audio.display());
    println!(
        "  Segments:   {} ({} cached, {} clamped)",
        result.stats.segments, result.stats.cache_hits, result.stats.clamped_segments
    );
    println!(
        "  Duration:   {:.1}s dubbed / {:.1}s source",
        result.stats.track_duration.as_secs_f64(),
        result.stats.source_duration.as_secs_f64()
    );
    println!();
    println!("  Timing:");
    println!(
        "    Synthesis:   {:.2}s",
        result.stats.synthesis_time.as_secs_f64()
    );
    println!(
        "    Total:       {:.2}s",
        result.stats.total_time.as_secs_f64()
    );
    if !result.warnings.is_empty() {
        println!();
        println!("  Warnings:");
        for warning in &result.warnings {
            println!("    - {}", warning);
        }
    }
    println!();
    println!("═══════════════════════════════════════════════════════════════");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::segment::Speaker;
    use crate::synth::SynthesizedAudio;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct NeverSynthesizer;

    #[async_trait]
    impl SpeechSynthesizer for NeverSynthesizer {
        async fn synthesize(
            &self,
            text: &str,
            _: &str,
            _: Speaker,
            _: &Path,
        ) -> Result<SynthesizedAudio> {
            panic!("synthesis must not run for {text}");
        }
    }

    fn services(dir: &Path) -> DubServices {
        DubServices {
            synthesizer: Arc::new(NeverSynthesizer),
            tools: Arc::new(FfmpegTools),
            store: Arc::new(DirectoryStore::new(dir).unwrap()),
        }
    }

    #[tokio::test]
    async fn test_missing_input_before_synthesis() {
        let dir = TempDir::new().unwrap();
        let session = Session::create_with_id(dir.path(), "1").unwrap();
        let request = DubRequest::for_session(&session, "hi", Some("  ".to_string()), None);

        let result = create_dubbed_video(&request, &services(session.dir())).await;
        assert!(matches!(result, Err(DubError::MissingInput(_))));
    }

    #[tokio::test]
    async fn test_missing_video() {
        let dir = TempDir::new().unwrap();
        let session = Session::create_with_id(dir.path(), "1").unwrap();
        let request =
            DubRequest::for_session(&session, "hi", None, Some("नमस्ते".to_string()));

        let result = create_dubbed_video(&request, &services(session.dir())).await;
        assert!(matches!(result, Err(DubError::FileNotFound(_))));
    }

    #[test]
    fn test_request_for_session() {
        let dir = TempDir::new().unwrap();
        let session = Session::create_with_id(dir.path(), "9").unwrap();
        let request = DubRequest::for_session(&session, "te-IN", None, None);
        assert_eq!(request.video, session.input_video());
        assert_eq!(request.final_audio, session.final_audio());
        assert_eq!(request.output, session.output_video());
        assert!(request.show_progress);
    }

    #[test]
    fn test_services_require_elevenlabs_key() {
        let dir = TempDir::new().unwrap();
        assert!(DubServices::from_config(&Config::default(), dir.path()).is_err());

        let config = Config {
            elevenlabs_api_key: Some("el".to_string()),
            ..Default::default()
        };
        assert!(DubServices::from_config(&config, dir.path()).is_ok());
    }
}
