use crate::audio::AudioTools;
use crate::error::{DubError, Result};
use crate::segment::Speaker;
use crate::synth::{
    RouteTable, SpeechBackend, SpeechSynthesizer, SynthesisRoute, SynthesizedAudio, VoiceConverter,
};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Dispatches each request to the direct or the chained backends by language.
pub struct SynthesisRouter {
    routes: RouteTable,
    direct: Arc<dyn SpeechBackend>,
    first_stage: Arc<dyn SpeechBackend>,
    converter: Arc<dyn VoiceConverter>,
    tools: Arc<dyn AudioTools>,
}

impl SynthesisRouter {
    pub fn new(
        routes: RouteTable,
        direct: Arc<dyn SpeechBackend>,
        first_stage: Arc<dyn SpeechBackend>,
        converter: Arc<dyn VoiceConverter>,
        tools: Arc<dyn AudioTools>,
    ) -> Self {
        Self {
            routes,
            direct,
            first_stage,
            converter,
            tools,
        }
    }

    pub fn route(&self, language: &str) -> SynthesisRoute {
        self.routes.route(language)
    }

    async fn render(
        &self,
        text: &str,
        language: &str,
        speaker: Speaker,
        output: &Path,
    ) -> Result<Vec<u8>> {
        match self.route(language) {
            SynthesisRoute::Direct => {
                debug!("Direct synthesis with {} for {}", self.direct.name(), language);
                self.direct.synthesize(text, language, speaker).await
            }
            SynthesisRoute::Chain => {
                debug!(
                    "Chained synthesis with {} for {}",
                    self.first_stage.name(),
                    language
                );
                let first = self.first_stage.synthesize(text, language, speaker).await?;
                let intermediate = intermediate_path(output);
                tokio::fs::write(&intermediate, &first).await?;
                debug!("Intermediate audio written to {:?}", intermediate);

                self.converter.convert(first, speaker).await
            }
        }
    }
}

/// `{stem}_tts.mp3` next to `output`.
pub fn intermediate_path(output: &Path) -> PathBuf {
    let stem = output
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    output.with_file_name(format!("{stem}_tts.mp3"))
}

#[async_trait]
impl SpeechSynthesizer for SynthesisRouter {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        speaker: Speaker,
        output: &Path,
    ) -> Result<SynthesizedAudio> {
        let bytes = self
            .render(text, language, speaker, output)
            .await
            .map_err(|e| as_synthesis_failure(text, e))?;

        if bytes.is_empty() {
            return Err(DubError::synthesis(text, "backend returned no audio"));
        }

        tokio::fs::write(output, &bytes)
            .await
            .map_err(|e| DubError::synthesis(text, e))?;

        let natural_duration_ms = self
            .tools
            .duration_ms(output)
            .map_err(|e| DubError::synthesis(text, e))?;

        info!(
            "Synthesized {} bytes ({}ms) to {}",
            bytes.len(),
            natural_duration_ms,
            output.display()
        );

        Ok(SynthesizedAudio {
            bytes,
            natural_duration_ms,
            path: output.to_path_buf(),
        })
    }
}

fn as_synthesis_failure(text: &str, error: DubError) -> DubError {
    match error {
        DubError::SynthesisFailure { .. } => error,
        other => DubError::synthesis(text, other),
    }
}
