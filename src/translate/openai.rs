//! Translation through an OpenAI chat model.

use crate::error::Result;
use crate::openai::{ChatClient, ChatMessage, ChatRequest};
use crate::translate::Translator;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

const DEFAULT_MODEL: &str = "gpt-4o";

/// Translator using OpenAI chat completions.
pub struct OpenAiTranslator {
    chat: ChatClient,
    model: String,
    temperature: f64,
}

impl OpenAiTranslator {
    pub fn new(api_key: String) -> Self {
        Self {
            chat: ChatClient::new(api_key),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.3,
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

    fn build_prompt(&self, language: &str) -> String {
        format!(
            r#"You are a professional translator for video dubbing.
Translate the user's text into {language}.
Keep every speaker tag in square brackets (for example [AP], [MALE], [FEMALE]) unchanged.
If the text is in SRT format, keep cue numbers and timing lines exactly as they are and translate only the spoken lines.
Keep the wording natural when spoken aloud and close in length to the original.
Return ONLY the translation wrapped in ```."#
        )
    }
}

/// Take the content of the first ``` fence when the reply has one.
pub fn unwrap_fence(reply: &str) -> String {
    let parts: Vec<&str> = reply.split("```").collect();
    if parts.len() >= 3 {
        parts[1].trim().to_string()
    } else {
        reply.trim().to_string()
    }
}

#[async_trait]
impl Translator for OpenAiTranslator {
    async fn translate(&self, text: &str, language: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(String::new());
        }
        info!("Translating {} characters to {}", text.len(), language);

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage::system(self.build_prompt(language)),
                ChatMessage::user(Value::String(text.to_string())),
            ],
            modalities: None,
            temperature: self.temperature,
        };

        let translation = unwrap_fence(&self.chat.complete(&request).await?);
        info!("{} translation complete", language);
        Ok(translation)
    }

    fn name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_unwrap_fence() {
        assert_eq!(unwrap_fence("```\nনমস্কার\n```"), "নমস্কার");
        assert_eq!(unwrap_fence("Here you go:\n```\nhola\n```\nEnjoy"), "hola");
        assert_eq!(unwrap_fence("  plain reply "), "plain reply");
        assert_eq!(unwrap_fence("```unterminated"), "```unterminated");
    }

    #[test]
    fn test_prompt_names_language() {
        let translator = OpenAiTranslator::new("k".to_string());
        let prompt = translator.build_prompt("Marathi");
        assert!(prompt.contains("into Marathi"));
        assert!(prompt.contains("[MALE]"));
    }

    #[tokio::test]
    async fn test_empty_text_skips_request() {
        // No server: a request would fail.
        let translator =
            OpenAiTranslator::new("k".to_string()).with_base_url("http://127.0.0.1:9");
        assert_eq!(translator.translate("   ", "Hindi").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_translate_against_mock() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(body_partial_json(serde_json::json!({
                "messages": [{"role": "system"}, {"role": "user", "content": "[MALE] Hello"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "```\n[MALE] नमस्ते\n```"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let translator = OpenAiTranslator::new("k".to_string()).with_base_url(server.uri());
        assert_eq!(
            translator.translate("[MALE] Hello", "Hindi").await.unwrap(),
            "[MALE] नमस्ते"
        );
    }
}
