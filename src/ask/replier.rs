//! Short replies to comments, either through the article assistant (with
//! cited sources rewritten as links) or through a plain chat model.

use crate::ask::{process_citations, ArticleIndex, AssistantApi};
use crate::error::{DubError, Result};
use crate::openai::{ChatClient, ChatMessage, ChatRequest};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};

static FILE_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<file>(.*?)</file>").expect("Invalid regex"));

/// Replace each `<file>name</file>` with ` (see {url})` or ` (see {url} or {video})`.
///
/// Files missing from the index are dropped from the text.
pub fn link_file_tags(text: &str, articles: &ArticleIndex) -> String {
    FILE_TAG
        .replace_all(text, |caps: &regex::Captures| {
            let file_name = &caps[1];
            let Some(article) = articles.get(file_name) else {
                warn!("Cited file {} is not in the article index", file_name);
                return String::new();
            };
            let url = article.url.as_deref().filter(|u| !u.is_empty());
            let video = article.youtube_url.as_deref().filter(|u| !u.is_empty());
            let replacement = match (url, video) {
                (Some(url), Some(video)) => format!(" (see {url} or {video})"),
                (Some(link), None) | (None, Some(link)) => format!(" (see {link})"),
                (None, None) => String::new(),
            };
            debug!("Replaced <file>{}</file> with {:?}", file_name, replacement);
            replacement
        })
        .into_owned()
}

/// Drop one pair of double quotes wrapping the whole reply.
pub fn strip_surrounding_quotes(text: &str) -> &str {
    text.strip_prefix('"')
        .and_then(|t| t.strip_suffix('"'))
        .unwrap_or(text)
}

/// Replies through the article assistant.
pub struct ReplierAssistant {
    api: Arc<dyn AssistantApi>,
    articles: ArticleIndex,
}

impl ReplierAssistant {
    pub fn new(api: Arc<dyn AssistantApi>, articles: ArticleIndex) -> Self {
        Self { api, articles }
    }

    pub async fn reply(&self, input: &str) -> Result<String> {
        info!("Replying to: {}", input);
        let thread_id = self.api.create_thread().await?;
        self.api.add_user_message(&thread_id, input).await?;
        self.api.run_and_wait(&thread_id).await?;

        let mut message = self
            .api
            .latest_reply(&thread_id)
            .await?
            .ok_or_else(|| DubError::Api("Assistant returned no reply".to_string()))?;
        process_citations(self.api.as_ref(), &mut message).await?;

        let reply = link_file_tags(&message.value, &self.articles);
        info!("Replier assistant output: {}", reply);
        Ok(reply)
    }
}

/// Chat-model settings for [`ReplierChat`], read from a TOML file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ReplierSettings {
    pub model: String,
    pub system_message: String,
    #[serde(default)]
    pub temperature: f64,
}

impl ReplierSettings {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DubError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| DubError::Config(format!("{}: {e}", path.display())))
    }
}

/// Replies through a chat model with a fixed system message.
pub struct ReplierChat {
    chat: ChatClient,
    settings: ReplierSettings,
}

impl ReplierChat {
    pub fn new(chat: ChatClient, settings: ReplierSettings) -> Self {
        Self { chat, settings }
    }

    pub async fn reply(&self, input: &str) -> Result<String> {
        info!("Generating reply for: {}", input);
        let request = ChatRequest {
            model: self.settings.model.clone(),
            messages: vec![
                ChatMessage::system(self.settings.system_message.clone()),
                ChatMessage::user(Value::String(input.to_string())),
            ],
            modalities: None,
            temperature: self.settings.temperature,
        };
        let output = self.chat.complete(&request).await?;
        let reply = strip_surrounding_quotes(&output).to_string();
        info!("Replier chat output: {}", reply);
        Ok(reply)
    }
}
