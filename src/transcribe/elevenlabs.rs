//! ElevenLabs speech-to-text with speaker diarization and word timestamps.
//!
//! Besides plain transcripts this client produces timed segment records:
//! words are grouped into segments wherever the pause between them exceeds
//! a threshold, and each segment is attributed to its most frequent speaker.

use crate::error::{DubError, Result};
use crate::segment::SegmentRecord;
use crate::synth::elevenlabs::{api_error, DEFAULT_BASE_URL};
use crate::transcribe::Transcriber;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};

const DEFAULT_MODEL: &str = "scribe_v1";
const NUM_SPEAKERS: u32 = 4;

/// Pause (seconds) that starts a new segment.
pub const PAUSE_THRESHOLD: f64 = 0.5;

const UNKNOWN_SPEAKER: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScribeWord {
    pub text: String,
    #[serde(default)]
    pub start: f64,
    #[serde(default)]
    pub end: f64,
    /// `word`, `spacing` or `audio_event`.
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub speaker_id: Option<String>,
}

impl ScribeWord {
    fn is_word(&self) -> bool {
        self.kind == "word"
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ScribeTranscript {
    #[serde(default)]
    pub language_code: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub words: Vec<ScribeWord>,
}

impl ScribeTranscript {
    /// Spoken words joined by single spaces.
    pub fn word_text(&self) -> String {
        self.words
            .iter()
            .filter(|w| w.is_word())
            .map(|w| w.text.trim())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Group spoken words into segments split at pauses longer than `pause_threshold`.
pub fn identify_segments(words: &[ScribeWord], pause_threshold: f64) -> Vec<Vec<&ScribeWord>> {
    let mut segments: Vec<Vec<&ScribeWord>> = Vec::new();
    let mut current: Vec<&ScribeWord> = Vec::new();
    let mut last_end = 0.0;

    for word in words.iter().filter(|w| w.is_word()) {
        if !current.is_empty() && word.start - last_end > pause_threshold {
            segments.push(std::mem::take(&mut current));
        }
        current.push(word);
        last_end = word.end;
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

/// Most frequent speaker in a segment; the earliest one wins a tie.
fn dominant_speaker(words: &[&ScribeWord]) -> String {
    let mut counts: Vec<(&str, usize)> = Vec::new();
    for word in words {
        let speaker = word.speaker_id.as_deref().unwrap_or(UNKNOWN_SPEAKER);
        match counts.iter_mut().find(|(s, _)| *s == speaker) {
            Some((_, n)) => *n += 1,
            None => counts.push((speaker, 1)),
        }
    }

    let mut best: Option<(&str, usize)> = None;
    for (speaker, n) in counts {
        if best.map_or(true, |(_, top)| n > top) {
            best = Some((speaker, n));
        }
    }
    best.map_or(UNKNOWN_SPEAKER, |(s, _)| s).to_string()
}

/// Number segments from 1 and describe them as records.
pub fn to_records(segments: &[Vec<&ScribeWord>]) -> Vec<SegmentRecord> {
    segments
        .iter()
        .filter_map(|words| {
            let (first, last) = (words.first()?, words.last()?);
            Some((first.start, last.end, words))
        })
        .enumerate()
        .map(|(i, (start, end, words))| SegmentRecord {
            id: i as u64 + 1,
            start_time: start,
            end_time: end,
            duration: Some(end - start),
            text: words
                .iter()
                .map(|w| w.text.trim())
                .collect::<Vec<_>>()
                .join(" "),
            speaker: Some(dominant_speaker(words)),
        })
        .collect()
}

/// One paragraph per speaker turn, prefixed with the speaker.
pub fn speaker_transcript(records: &[SegmentRecord]) -> String {
    let mut turns: Vec<(String, String)> = Vec::new();
    for record in records {
        let speaker = record.speaker.as_deref().unwrap_or(UNKNOWN_SPEAKER);
        let text = record.text.trim();
        match turns.last_mut() {
            Some((current, body)) if current == speaker => {
                body.push(' ');
                body.push_str(text);
            }
            _ => turns.push((speaker.to_string(), text.to_string())),
        }
    }

    turns
        .iter()
        .map(|(speaker, body)| format!("{speaker}: {body}"))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// ElevenLabs Scribe client.
pub struct ElevenLabsTranscriber {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    language_code: Option<String>,
}

impl ElevenLabsTranscriber {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            language_code: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Pin the spoken language instead of letting the model detect it.
    pub fn with_language(mut self, language_code: impl Into<String>) -> Self {
        self.language_code = Some(language_code.into());
        self
    }

    /// Diarized transcript with word timestamps.
    pub async fn transcribe_words(&self, audio: &Path) -> Result<ScribeTranscript> {
        if !audio.exists() {
            return Err(DubError::FileNotFound(audio.display().to_string()));
        }
        info!("Transcribing with ElevenLabs: {}", audio.display());

        let bytes = fs::read(audio).await?;
        let file_name = audio
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "audio.mp3".to_string());

        let mut form = Form::new()
            .text("model_id", self.model.clone())
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("tag_audio_events", "false")
            .text("diarize", "true")
            .text("num_speakers", NUM_SPEAKERS.to_string())
            .text("timestamps_granularity", "word");
        if let Some(code) = &self.language_code {
            form = form.text("language_code", code.clone());
        }

        let response = self
            .client
            .post(format!("{}/v1/speech-to-text", self.base_url))
            .header("xi-api-key", &self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        debug!("ElevenLabs API response status: {}", status);
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error(status, &body));
        }

        let transcript: ScribeTranscript = serde_json::from_str(&body)?;
        info!(
            "Transcription completed: {} words",
            transcript.words.iter().filter(|w| w.is_word()).count()
        );
        Ok(transcript)
    }

    /// Timed segments split at pauses, ready for the gap report.
    pub async fn transcribe_segments(&self, audio: &Path) -> Result<Vec<SegmentRecord>> {
        let transcript = self.transcribe_words(audio).await?;
        Ok(to_records(&identify_segments(
            &transcript.words,
            PAUSE_THRESHOLD,
        )))
    }
}

#[async_trait]
impl Transcriber for ElevenLabsTranscriber {
    async fn transcribe(&self, audio: &Path) -> Result<String> {
        let transcript = self.transcribe_words(audio).await?;
        let text = transcript.word_text();
        if text.is_empty() {
            return Err(DubError::Api(format!(
                "Empty transcript for {}",
                audio.display()
            )));
        }
        Ok(text)
    }

    fn name(&self) -> &'static str {
        "elevenlabs"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(text: &str, start: f64, end: f64, speaker: &str) -> ScribeWord {
        ScribeWord {
            text: text.to_string(),
            start,
            end,
            kind: "word".to_string(),
            speaker_id: Some(speaker.to_string()),
        }
    }

    fn spacing(start: f64, end: f64) -> ScribeWord {
        ScribeWord {
            text: " ".to_string(),
            start,
            end,
            kind: "spacing".to_string(),
            speaker_id: None,
        }
    }

    #[test]
    fn test_segments_split_at_long_pauses() {
        let words = vec![
            word("ek", 0.0, 0.4, "speaker_0"),
            spacing(0.4, 0.5),
            word("do", 0.5, 0.9, "speaker_0"),
            spacing(0.9, 2.0),
            word("teen", 2.0, 2.5, "speaker_1"),
        ];
        let segments = identify_segments(&words, PAUSE_THRESHOLD);

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].len(), 2);
        assert_eq!(segments[1][0].text, "teen");
    }

    #[test]
    fn test_pause_at_threshold_keeps_segment() {
        let words = vec![word("a", 0.0, 1.0, "s"), word("b", 1.5, 2.0, "s")];
        assert_eq!(identify_segments(&words, 0.5).len(), 1);
    }

    #[test]
    fn test_no_words_no_segments() {
        assert!(identify_segments(&[spacing(0.0, 1.0)], PAUSE_THRESHOLD).is_empty());
    }

    #[test]
    fn test_records_carry_dominant_speaker() {
        let words = vec![
            word("haan", 1.0, 1.5, "speaker_1"),
            word("ji", 1.6, 2.0, "speaker_0"),
            word("bilkul", 2.1, 3.0, "speaker_0"),
            word("theek", 10.0, 10.5, "speaker_2"),
            word("hai", 10.6, 11.0, "speaker_3"),
        ];
        let records = to_records(&identify_segments(&words, PAUSE_THRESHOLD));

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id, 1);
        assert_eq!(records[0].text, "haan ji bilkul");
        assert_eq!((records[0].start_time, records[0].end_time), (1.0, 3.0));
        assert_eq!(records[0].duration, Some(2.0));
        assert_eq!(records[0].speaker.as_deref(), Some("speaker_0"));

        // A tie goes to the speaker heard first.
        assert_eq!(records[1].id, 2);
        assert_eq!(records[1].speaker.as_deref(), Some("speaker_2"));
    }

    #[test]
    fn test_missing_speaker_is_unknown() {
        let mut w = word("kaun", 0.0, 1.0, "x");
        w.speaker_id = None;
        let records = to_records(&identify_segments(&[w], PAUSE_THRESHOLD));
        assert_eq!(records[0].speaker.as_deref(), Some("unknown"));
    }

    #[test]
    fn test_speaker_transcript_merges_turns() {
        let words = vec![
            word("namaste", 0.0, 1.0, "speaker_0"),
            word("kaise", 3.0, 3.5, "speaker_0"),
            word("ho", 3.6, 4.0, "speaker_0"),
            word("theek", 6.0, 6.5, "speaker_1"),
        ];
        let records = to_records(&identify_segments(&words, PAUSE_THRESHOLD));
        assert_eq!(
            speaker_transcript(&records),
            "speaker_0: namaste kaise ho\n\nspeaker_1: theek"
        );
    }

    #[test]
    fn test_word_text_skips_spacing_and_events() {
        let mut laugh = word("(laughs)", 1.0, 1.2, "s");
        laugh.kind = "audio_event".to_string();
        let transcript = ScribeTranscript {
            language_code: Some("hin".to_string()),
            text: "ek (laughs) do".to_string(),
            words: vec![word("ek", 0.0, 0.5, "s"), spacing(0.5, 1.0), laugh, word("do", 1.3, 1.5, "s")],
        };
        assert_eq!(transcript.word_text(), "ek do");
    }

    #[tokio::test]
    async fn test_missing_file() {
        let transcriber = ElevenLabsTranscriber::new("k".to_string());
        let result = transcriber
            .transcribe_words(Path::new("/nonexistent/audio.mp3"))
            .await;
        assert!(matches!(result, Err(DubError::FileNotFound(_))));
    }
}
