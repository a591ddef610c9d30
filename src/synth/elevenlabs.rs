use crate::error::{DubError, Result};
use crate::segment::Speaker;
use crate::synth::{SpeechBackend, VoiceConverter};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub(crate) const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io";
const TTS_MODEL: &str = "eleven_multilingual_v2";
const STS_MODEL: &str = "eleven_multilingual_sts_v2";
const OUTPUT_FORMAT: &str = "mp3_44100_128";

/// Voice ids per speaker role.
///
/// The narrator has separate voices for text-to-speech and speech-to-speech;
/// the male and female voices serve both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceMap {
    #[serde(default)]
    pub narrator_tts: String,
    #[serde(default)]
    pub narrator_sts: String,
    #[serde(default)]
    pub male: String,
    #[serde(default)]
    pub female: String,
}

impl VoiceMap {
    pub fn tts_voice(&self, speaker: Speaker) -> Result<&str> {
        let (id, var) = match speaker {
            Speaker::Narrator => (&self.narrator_tts, "PVC_ID"),
            Speaker::Male => (&self.male, "RAJU_ID"),
            Speaker::Female => (&self.female, "MONIKA_ID"),
        };
        non_empty(id, speaker, var)
    }

    pub fn sts_voice(&self, speaker: Speaker) -> Result<&str> {
        let (id, var) = match speaker {
            Speaker::Narrator => (&self.narrator_sts, "IVC_ID"),
            Speaker::Male => (&self.male, "RAJU_ID"),
            Speaker::Female => (&self.female, "MONIKA_ID"),
        };
        non_empty(id, speaker, var)
    }
}

fn non_empty<'a>(id: &'a str, speaker: Speaker, var: &str) -> Result<&'a str> {
    if id.trim().is_empty() {
        return Err(DubError::Config(format!(
            "No voice configured for speaker {speaker}. Set {var}"
        )));
    }
    Ok(id)
}

#[derive(Debug, Clone, Serialize)]
struct VoiceSettings {
    stability: f64,
    similarity_boost: f64,
    style: f64,
    use_speaker_boost: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    speed: Option<f64>,
}

impl VoiceSettings {
    fn tts() -> Self {
        Self {
            stability: 0.5,
            similarity_boost: 1.0,
            style: 0.0,
            use_speaker_boost: true,
            speed: Some(1.0),
        }
    }

    fn sts() -> Self {
        Self {
            speed: None,
            ..Self::tts()
        }
    }
}

#[derive(Serialize)]
struct TextToSpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

#[derive(Deserialize)]
struct ApiErrorResponse {
    detail: serde_json::Value,
}

/// ElevenLabs text-to-speech and speech-to-speech client.
pub struct ElevenLabsClient {
    client: Client,
    api_key: String,
    base_url: String,
    voices: VoiceMap,
}

impl ElevenLabsClient {
    pub fn new(api_key: String, voices: VoiceMap) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            voices,
        }
    }

    /// Point the client at another host, e.g. a mock server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self, kind: &str, voice_id: &str) -> String {
        format!(
            "{}/v1/{}/{}?output_format={}&enable_logging=true",
            self.base_url, kind, voice_id, OUTPUT_FORMAT
        )
    }

    async fn read_audio(&self, response: reqwest::Response) -> Result<Vec<u8>> {
        let status = response.status();
        debug!("ElevenLabs API response status: {}", status);

        if status.is_success() {
            return Ok(response.bytes().await?.to_vec());
        }

        let body = response.text().await.unwrap_or_default();
        Err(api_error(status, &body))
    }
}

/// Turn a non-success ElevenLabs response body into an [`DubError::Api`].
pub(crate) fn api_error(status: reqwest::StatusCode, body: &str) -> DubError {
    match serde_json::from_str::<ApiErrorResponse>(body) {
        Ok(api_error) => DubError::Api(format!(
            "ElevenLabs API error ({}): {}",
            status, api_error.detail
        )),
        Err(_) => DubError::Api(format!("ElevenLabs API error ({}): {}", status, body)),
    }
}

#[async_trait]
impl SpeechBackend for ElevenLabsClient {
    async fn synthesize(&self, text: &str, _language: &str, speaker: Speaker) -> Result<Vec<u8>> {
        let voice_id = self.voices.tts_voice(speaker)?;
        info!("Using ElevenLabs text-to-speech with {} voice", speaker);

        let request = TextToSpeechRequest {
            text,
            model_id: TTS_MODEL,
            voice_settings: VoiceSettings::tts(),
        };
        let response = self
            .client
            .post(self.endpoint("text-to-speech", voice_id))
            .header("xi-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        self.read_audio(response).await
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[async_trait]
impl VoiceConverter for ElevenLabsClient {
    async fn convert(&self, audio: Vec<u8>, speaker: Speaker) -> Result<Vec<u8>> {
        let voice_id = self.voices.sts_voice(speaker)?;
        info!("Using ElevenLabs speech-to-speech with {} voice", speaker);

        let audio_part = Part::bytes(audio)
            .file_name("audio.mp3")
            .mime_str("audio/mpeg")?;
        let form = Form::new()
            .part("audio", audio_part)
            .text("model_id", STS_MODEL)
            .text("voice_settings", serde_json::to_string(&VoiceSettings::sts())?);

        let response = self
            .client
            .post(self.endpoint("speech-to-speech", voice_id))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        self.read_audio(response).await
    }
}
