use crate::error::{DubError, Result};
use crate::synth::{SynthesisRoute, VoiceMap, DIRECT_LANGUAGES};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What a command is about to do, for validating the keys it needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Transcribe,
    /// Diarized speech-to-text with word timestamps.
    SpeechToText,
    Translate,
    Ask,
    Dub(SynthesisRoute),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub openai_api_key: Option<String>,
    pub elevenlabs_api_key: Option<String>,
    pub google_api_key: Option<String>,
    pub voices: VoiceMap,
    /// Parent directory of session directories.
    pub work_dir: PathBuf,
    /// Languages synthesized directly instead of through the chain.
    pub direct_languages: Vec<String>,
    pub transcription_model: Option<String>,
    pub translation_model: Option<String>,
    pub assistant_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            elevenlabs_api_key: None,
            google_api_key: None,
            voices: VoiceMap::default(),
            work_dir: std::env::temp_dir(),
            direct_languages: DIRECT_LANGUAGES.iter().map(|l| l.to_string()).collect(),
            transcription_model: None,
            translation_model: None,
            assistant_id: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = Self::default();

        // Load from config file if it exists
        if let Some(config_path) = Self::config_file_path() {
            if config_path.exists() {
                let contents = std::fs::read_to_string(&config_path)?;
                config = toml::from_str::<Config>(&contents).map_err(|e| {
                    DubError::Config(format!("{}: {e}", config_path.display()))
                })?;
            }
        }

        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Override settings from environment variables, read through `var`.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let set = |slot: &mut Option<String>, name: &str| {
            if let Some(value) = var(name).filter(|v| !v.trim().is_empty()) {
                *slot = Some(value);
            }
        };
        set(&mut self.openai_api_key, "OPENAI_API_KEY");
        set(&mut self.elevenlabs_api_key, "ELEVENLABS_API_KEY");
        set(&mut self.google_api_key, "GOOGLE_API_KEY");
        set(&mut self.assistant_id, "ASSISTANT_ID");

        for (slot, name) in [
            (&mut self.voices.narrator_tts, "PVC_ID"),
            (&mut self.voices.narrator_sts, "IVC_ID"),
            (&mut self.voices.male, "RAJU_ID"),
            (&mut self.voices.female, "MONIKA_ID"),
        ] {
            if let Some(value) = var(name).filter(|v| !v.trim().is_empty()) {
                *slot = value;
            }
        }

        if let Some(dir) = var("WORKDIR").filter(|v| !v.trim().is_empty()) {
            self.work_dir = PathBuf::from(dir);
        }
        if let Some(languages) = var("AUTODUB_DIRECT_LANGUAGES") {
            self.direct_languages = languages
                .split(',')
                .map(|l| l.trim().to_string())
                .filter(|l| !l.is_empty())
                .collect();
        }
    }

    pub fn validate(&self, task: Task) -> Result<()> {
        match task {
            Task::Transcribe | Task::Translate => require(
                &self.openai_api_key,
                "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...",
            ),
            Task::SpeechToText => require(
                &self.elevenlabs_api_key,
                "ELEVENLABS_API_KEY not set. Get one at https://elevenlabs.io",
            ),
            Task::Ask => {
                require(
                    &self.openai_api_key,
                    "OPENAI_API_KEY not set. Export it with: export OPENAI_API_KEY=sk-...",
                )?;
                require(
                    &self.assistant_id,
                    "No assistant id. Pass --assistant-id or set ASSISTANT_ID",
                )
            }
            Task::Dub(route) => {
                require(
                    &self.elevenlabs_api_key,
                    "ELEVENLABS_API_KEY not set. Get one at https://elevenlabs.io",
                )?;
                if route == SynthesisRoute::Chain {
                    require(
                        &self.google_api_key,
                        "GOOGLE_API_KEY not set. It is needed for languages outside the direct list",
                    )?;
                }
                Ok(())
            }
        }
    }

    fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("autodub").join("config.toml"))
    }
}

fn require(value: &Option<String>, message: &str) -> Result<()> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(DubError::Config(message.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.direct_languages, vec!["ta", "hi", "en"]);
        assert!(config.openai_api_key.is_none());
        assert_eq!(config.voices, VoiceMap::default());
    }

    #[test]
    fn test_env_overrides() {
        let mut config = Config::default();
        config.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("PVC_ID", "pvc"),
            ("IVC_ID", "ivc"),
            ("RAJU_ID", "raju"),
            ("MONIKA_ID", "monika"),
            ("WORKDIR", "/data/dubs"),
            ("AUTODUB_DIRECT_LANGUAGES", "hi, en ,mr-IN,"),
        ]));

        assert_eq!(config.openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(config.voices.narrator_tts, "pvc");
        assert_eq!(config.voices.narrator_sts, "ivc");
        assert_eq!(config.voices.male, "raju");
        assert_eq!(config.voices.female, "monika");
        assert_eq!(config.work_dir, PathBuf::from("/data/dubs"));
        assert_eq!(config.direct_languages, vec!["hi", "en", "mr-IN"]);
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let mut config = Config {
            google_api_key: Some("from-file".to_string()),
            ..Default::default()
        };
        config.apply_env(env(&[("GOOGLE_API_KEY", "  ")]));
        assert_eq!(config.google_api_key.as_deref(), Some("from-file"));
    }

    #[test]
    fn test_file_config_parses() {
        let config: Config = toml::from_str(
            r#"
            elevenlabs_api_key = "el"
            work_dir = "/srv/autodub"

            [voices]
            narrator_tts = "pvc"
            male = "raju"
            "#,
        )
        .unwrap();
        assert_eq!(config.elevenlabs_api_key.as_deref(), Some("el"));
        assert_eq!(config.voices.male, "raju");
        assert_eq!(config.voices.female, "");
        assert_eq!(config.direct_languages.len(), 3);
    }

    #[test]
    fn test_validate_dub_routes() {
        let mut config = Config {
            elevenlabs_api_key: Some("el".to_string()),
            ..Default::default()
        };
        assert!(config.validate(Task::Dub(SynthesisRoute::Direct)).is_ok());
        assert!(config.validate(Task::Dub(SynthesisRoute::Chain)).is_err());

        config.google_api_key = Some("g".to_string());
        assert!(config.validate(Task::Dub(SynthesisRoute::Chain)).is_ok());
    }

    #[test]
    fn test_validate_missing_api_key() {
        let config = Config::default();
        assert!(config.validate(Task::Transcribe).is_err());
        assert!(config.validate(Task::SpeechToText).is_err());
        assert!(config.validate(Task::Ask).is_err());
        assert!(config.validate(Task::Dub(SynthesisRoute::Direct)).is_err());
    }
}
