//! Question answering against a hosted retrieval assistant.
//!
//! A question is posted once to a fresh thread. Each attempt runs the
//! assistant on that thread, resolves file citations and checks that the
//! reply links at least one article. After `MAX_RETRIES` extra attempts the
//! default answer is returned instead.

pub mod citations;
pub mod client;
pub mod replier;

pub use citations::{
    embed_url_with_time, is_valid_answer, parse_answer, process_citations, ArticleIndex,
    ArticleMeta, Insight, ParsedAnswer,
};
pub use client::OpenAiAssistantClient;
pub use replier::{ReplierAssistant, ReplierChat, ReplierSettings};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info, warn};

pub const MAX_RETRIES: usize = 1;
pub const DEFAULT_ANSWER: &str = "Please elaborate or rephrase the question.";

/// A citation marker inside a reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Marker text as it appears in the reply.
    pub text: String,
    /// Cited file, when the marker is a file citation.
    pub file_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantMessage {
    pub value: String,
    pub annotations: Vec<Annotation>,
}

/// Thread-based assistant operations.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_thread(&self) -> Result<String>;
    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<String>;
    /// Run the assistant on the thread and wait for the run to finish.
    async fn run_and_wait(&self, thread_id: &str) -> Result<()>;
    /// Most recent assistant reply on the thread, if any.
    async fn latest_reply(&self, thread_id: &str) -> Result<Option<AssistantMessage>>;
    async fn file_name(&self, file_id: &str) -> Result<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Valid(ParsedAnswer),
    Exhausted { attempts: usize },
}

impl Outcome {
    pub fn into_answer(self) -> ParsedAnswer {
        match self {
            Outcome::Valid(answer) => answer,
            Outcome::Exhausted { .. } => ParsedAnswer {
                header: DEFAULT_ANSWER.to_string(),
                ..Default::default()
            },
        }
    }
}

pub struct Assistant {
    api: Arc<dyn AssistantApi>,
    articles: ArticleIndex,
}

impl Assistant {
    pub fn new(api: Arc<dyn AssistantApi>, articles: ArticleIndex) -> Self {
        Self { api, articles }
    }

    /// Ask `question`, retrying until a valid answer or the attempts run out.
    pub async fn ask(&self, question: &str) -> Result<Outcome> {
        info!("Question: {}", question);
        let thread_id = self.api.create_thread().await?;
        self.api.add_user_message(&thread_id, question).await?;

        for attempt in 0..=MAX_RETRIES {
            let retry_note = if attempt < MAX_RETRIES {
                format!("Retry {}/{}", attempt + 1, MAX_RETRIES)
            } else {
                "Max retries reached".to_string()
            };

            let reply = match self.attempt(&thread_id).await {
                Ok(Some(reply)) if !reply.value.trim().is_empty() => reply,
                Ok(_) => {
                    warn!("No response received for question: {}. {}", question, retry_note);
                    continue;
                }
                Err(e) => {
                    error!("Error retrieving response: {}. {}", e, retry_note);
                    continue;
                }
            };

            info!("Raw response: {}", reply.value);
            let answer = parse_answer(&reply.value, &self.articles);
            if is_valid_answer(&answer) {
                info!("Valid response with {} insights", answer.insights.len());
                return Ok(Outcome::Valid(answer));
            }
            warn!("Invalid response. {} for question: \"{}\"", retry_note, question);
        }

        Ok(Outcome::Exhausted {
            attempts: MAX_RETRIES + 1,
        })
    }

    /// Like [`Assistant::ask`], falling back to the default answer.
    pub async fn interact(&self, question: &str) -> Result<ParsedAnswer> {
        Ok(self.ask(question).await?.into_answer())
    }

    async fn attempt(&self, thread_id: &str) -> Result<Option<AssistantMessage>> {
        self.api.run_and_wait(thread_id).await?;
        let Some(mut reply) = self.api.latest_reply(thread_id).await? else {
            return Ok(None);
        };
        process_citations(self.api.as_ref(), &mut reply).await?;
        Ok(Some(reply))
    }
}
