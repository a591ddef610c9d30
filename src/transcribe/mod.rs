pub mod elevenlabs;
pub mod openai;

pub use elevenlabs::ElevenLabsTranscriber;
pub use openai::OpenAiTranscriber;

use crate::error::Result;
use async_trait::async_trait;
use std::path::Path;

/// Speech to plain text.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, audio: &Path) -> Result<String>;
    fn name(&self) -> &'static str;
}
