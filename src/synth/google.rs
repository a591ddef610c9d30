//! Google Cloud Text-to-Speech over its REST interface.

use crate::error::{DubError, Result};
use crate::segment::Speaker;
use crate::synth::SpeechBackend;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const DEFAULT_BASE_URL: &str = "https://texttospeech.googleapis.com";

/// Pick a voice for `language` from the names Google lists for it.
///
/// Chirp3 HD voices are preferred (Puck for narrator and male, Aoede for
/// female), then Wavenet-B, then Standard-B.
pub fn select_voice(language: &str, speaker: Speaker, available: &[String]) -> Result<String> {
    if available.is_empty() {
        return Err(DubError::Api(format!(
            "No voices found for language: {language}"
        )));
    }

    let has = |name: &str| available.iter().any(|v| v == name);

    let puck = format!("{language}-Chirp3-HD-Puck");
    if has(&puck) {
        return Ok(match speaker {
            Speaker::Narrator | Speaker::Male => puck,
            Speaker::Female => format!("{language}-Chirp3-HD-Aoede"),
        });
    }

    warn!("{} does not have Chirp Voice! Using other voices.", language);
    for fallback in [
        format!("{language}-Wavenet-B"),
        format!("{language}-Standard-B"),
    ] {
        if has(&fallback) {
            return Ok(fallback);
        }
    }

    Err(DubError::Api(format!(
        "Only available voices for {language} are: {}",
        available.join(", ")
    )))
}

#[derive(Deserialize)]
struct VoicesResponse {
    #[serde(default)]
    voices: Vec<VoiceEntry>,
}

#[derive(Deserialize)]
struct VoiceEntry {
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeRequest<'a> {
    input: SynthesisInput<'a>,
    voice: VoiceSelection<'a>,
    audio_config: AudioConfig,
}

#[derive(Serialize)]
struct SynthesisInput<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceSelection<'a> {
    language_code: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AudioConfig {
    audio_encoding: &'static str,
    speaking_rate: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SynthesizeResponse {
    audio_content: String,
}

/// Google Cloud Text-to-Speech client authenticated with an API key.
pub struct GoogleTtsClient {
    client: Client,
    api_key: String,
    base_url: String,
}

impl GoogleTtsClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Names of every voice available for a language code.
    pub async fn list_voices(&self, language: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(format!("{}/v1/voices", self.base_url))
            .query(&[("languageCode", language), ("key", self.api_key.as_str())])
            .send()
            .await?;

        let body = checked_body(response).await?;
        let parsed: VoicesResponse = serde_json::from_str(&body)?;
        debug!("{} voices listed for {}", parsed.voices.len(), language);
        Ok(parsed.voices.into_iter().map(|v| v.name).collect())
    }
}

async fn checked_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(DubError::Api(format!(
            "Google TTS API error ({}): {}",
            status, body
        )));
    }
    Ok(body)
}

#[async_trait]
impl SpeechBackend for GoogleTtsClient {
    async fn synthesize(&self, text: &str, language: &str, speaker: Speaker) -> Result<Vec<u8>> {
        let voices = self.list_voices(language).await?;
        let voice_name = select_voice(language, speaker, &voices)?;
        info!("{} selected for {}", voice_name, language);

        let request = SynthesizeRequest {
            input: SynthesisInput { text },
            voice: VoiceSelection {
                language_code: language,
                name: &voice_name,
            },
            audio_config: AudioConfig {
                audio_encoding: "MP3",
                speaking_rate: 1.0,
            },
        };

        let response = self
            .client
            .post(format!("{}/v1/text:synthesize", self.base_url))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await?;

        let body = checked_body(response).await?;
        let parsed: SynthesizeResponse = serde_json::from_str(&body)?;
        STANDARD
            .decode(parsed.audio_content)
            .map_err(|e| DubError::Api(format!("Invalid audio content from Google TTS: {e}")))
    }

    fn name(&self) -> &'static str {
        "google"
    }
}
