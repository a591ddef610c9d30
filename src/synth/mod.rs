//! Speech synthesis backends and language-based routing between them.
//!
//! Languages in the direct table are spoken by ElevenLabs text-to-speech.
//! Every other language goes through a chain: Google text-to-speech renders
//! the text, then ElevenLabs speech-to-speech re-voices it in the speaker's
//! voice.

pub mod elevenlabs;
pub mod google;
pub mod router;

pub use elevenlabs::{ElevenLabsClient, VoiceMap};
pub use google::{select_voice, GoogleTtsClient};
pub use router::SynthesisRouter;

use crate::error::Result;
use crate::segment::Speaker;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Languages spoken directly by the multilingual text-to-speech model.
pub const DIRECT_LANGUAGES: [&str; 3] = ["ta", "hi", "en"];

/// Audio produced for one piece of text.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub natural_duration_ms: u64,
    pub path: PathBuf,
}

/// Text in, encoded audio out.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn synthesize(&self, text: &str, language: &str, speaker: Speaker) -> Result<Vec<u8>>;
    fn name(&self) -> &'static str;
}

/// Audio in, the same speech in another voice out.
#[async_trait]
pub trait VoiceConverter: Send + Sync {
    async fn convert(&self, audio: Vec<u8>, speaker: Speaker) -> Result<Vec<u8>>;
}

/// Produces a playable audio file for a text and reports its natural duration.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(
        &self,
        text: &str,
        language: &str,
        speaker: Speaker,
        output: &Path,
    ) -> Result<SynthesizedAudio>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SynthesisRoute {
    /// One text-to-speech call.
    Direct,
    /// Text-to-speech followed by voice conversion.
    Chain,
}

/// Language membership table deciding the route for each language.
#[derive(Debug, Clone)]
pub struct RouteTable {
    direct: Vec<String>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new(DIRECT_LANGUAGES)
    }
}

impl RouteTable {
    pub fn new<I, S>(direct: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            direct: direct
                .into_iter()
                .map(|l| l.as_ref().trim().to_lowercase())
                .filter(|l| !l.is_empty())
                .collect(),
        }
    }

    pub fn route(&self, language: &str) -> SynthesisRoute {
        let language = language.trim().to_lowercase();
        if self.direct.iter().any(|l| *l == language) {
            SynthesisRoute::Direct
        } else {
            SynthesisRoute::Chain
        }
    }

    pub fn direct_languages(&self) -> &[String] {
        &self.direct
    }
}
