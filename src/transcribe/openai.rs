use crate::error::{DubError, Result};
use crate::openai::{ChatClient, ChatMessage, ChatRequest};
use crate::transcribe::Transcriber;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::json;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "gpt-4o-audio-preview";

const SYSTEM_PROMPT: &str = "You are a transcription engine. Transcribe the spoken words in the \
audio exactly as spoken, in the language they are spoken in. Do not translate, summarize or add \
commentary. Return only the transcript text.";

/// Transcription through an audio-capable chat model.
pub struct OpenAiTranscriber {
    chat: ChatClient,
    model: String,
}

impl OpenAiTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            chat: ChatClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.chat = self.chat.with_base_url(base_url);
        self
    }

    fn build_request(&self, audio: &[u8], format: &str) -> ChatRequest {
        ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(json!([
                    {"type": "text", "text": "Transcribe this audio."},
                    {
                        "type": "input_audio",
                        "input_audio": {"data": STANDARD.encode(audio), "format": format}
                    }
                ])),
            ],
            modalities: Some(vec!["text"]),
            temperature: 0.0,
        }
    }
}

/// Trim whitespace and trailing or leading ellipsis dots from a transcript.
pub fn clean_transcript(raw: &str) -> String {
    raw.trim().trim_matches('.').trim().to_string()
}

fn audio_format(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("wav") => "wav",
        _ => "mp3",
    }
}

#[async_trait]
impl Transcriber for OpenAiTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        if !audio.exists() {
            return Err(DubError::FileNotFound(audio.display().to_string()));
        }
        info!("Transcribing audio file: {}", audio.display());

        let bytes = fs::read(audio).await?;
        debug!("Read {} bytes of audio", bytes.len());
        let request = self.build_request(&bytes, audio_format(audio));

        let transcript = clean_transcript(&self.chat.complete(&request).await?);
        if transcript.is_empty() {
            return Err(DubError::Api(format!(
                "Empty transcript for {}",
                audio.display()
            )));
        }

        info!("Transcription completed for audio file: {}", audio.display());
        Ok(transcript)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}
