use crate::ask::{Annotation, AssistantApi, AssistantMessage};
use crate::error::{DubError, Result};
use crate::openai::{api_error, DEFAULT_BASE_URL};
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Run statuses after which polling stops.
const TERMINAL_STATUSES: [&str; 6] = [
    "completed",
    "failed",
    "cancelled",
    "expired",
    "incomplete",
    "requires_action",
];

#[derive(Deserialize)]
struct IdResponse {
    id: String,
}

#[derive(Deserialize)]
struct RunResponse {
    id: String,
    status: String,
    #[serde(default)]
    last_error: Option<RunError>,
}

#[derive(Deserialize)]
struct RunError {
    message: String,
}

#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: String,
    #[serde(default)]
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
struct ContentPart {
    #[serde(default)]
    text: Option<TextContent>,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
    #[serde(default)]
    annotations: Vec<RawAnnotation>,
}

#[derive(Deserialize)]
struct RawAnnotation {
    text: String,
    #[serde(default)]
    file_citation: Option<FileCitation>,
}

#[derive(Deserialize)]
struct FileCitation {
    file_id: String,
}

#[derive(Deserialize)]
struct FileObject {
    filename: String,
}

/// OpenAI Assistants v2 over REST.
pub struct OpenAiAssistantClient {
    client: Client,
    api_key: String,
    assistant_id: String,
    base_url: String,
    poll_interval: Duration,
}

impl OpenAiAssistantClient {
    pub fn new(api_key: String, assistant_id: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            assistant_id,
            base_url: DEFAULT_BASE_URL.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .bearer_auth(&self.api_key)
            .header("OpenAI-Beta", "assistants=v2")
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        let response = self.authorized(request).send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(api_error("Assistants", status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.send(self.client.get(format!("{}{}", self.base_url, path)))
            .await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T> {
        self.send(
            self.client
                .post(format!("{}{}", self.base_url, path))
                .json(&body),
        )
        .await
    }
}

#[async_trait]
impl AssistantApi for OpenAiAssistantClient {
    async fn create_thread(&self) -> Result<String> {
        let thread: IdResponse = self.post("/threads", json!({})).await?;
        debug!("Created thread: {}", thread.id);
        Ok(thread.id)
    }

    async fn add_user_message(&self, thread_id: &str, content: &str) -> Result<String> {
        let message: IdResponse = self
            .post(
                &format!("/threads/{thread_id}/messages"),
                json!({"role": "user", "content": content}),
            )
            .await?;
        Ok(message.id)
    }

    async fn run_and_wait(&self, thread_id: &str) -> Result<()> {
        let mut run: RunResponse = self
            .post(
                &format!("/threads/{thread_id}/runs"),
                json!({"assistant_id": self.assistant_id}),
            )
            .await?;
        debug!("Started run {} ({})", run.id, run.status);

        while !TERMINAL_STATUSES.contains(&run.status.as_str()) {
            tokio::time::sleep(self.poll_interval).await;
            run = self
                .get(&format!("/threads/{thread_id}/runs/{}", run.id))
                .await?;
            debug!("Run {} is {}", run.id, run.status);
        }

        if run.status != "completed" {
            let reason = run
                .last_error
                .map(|e| e.message)
                .unwrap_or_else(|| "no error details".to_string());
            return Err(DubError::Api(format!(
                "Assistant run {} ended as {}: {}",
                run.id, run.status, reason
            )));
        }
        Ok(())
    }

    async fn latest_reply(&self, thread_id: &str) -> Result<Option<AssistantMessage>> {
        let list: MessageList = self
            .get(&format!("/threads/{thread_id}/messages?order=desc&limit=1"))
            .await?;

        let Some(message) = list.data.into_iter().next() else {
            return Ok(None);
        };
        if message.role != "assistant" {
            return Ok(None);
        }

        Ok(message
            .content
            .into_iter()
            .find_map(|part| part.text)
            .map(|text| AssistantMessage {
                value: text.value,
                annotations: text
                    .annotations
                    .into_iter()
                    .map(|a| Annotation {
                        text: a.text,
                        file_id: a.file_citation.map(|c| c.file_id),
                    })
                    .collect(),
            }))
    }

    async fn file_name(&self, file_id: &str) -> Result<String> {
        let file: FileObject = self.get(&format!("/files/{file_id}")).await?;
        Ok(file.filename)
    }
}
