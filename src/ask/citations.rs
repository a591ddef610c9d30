//! Turning an assistant reply with file citations into structured insights.

use crate::ask::{AssistantApi, AssistantMessage};
use crate::error::{DubError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;
use tracing::warn;

static INSIGHT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"(?s)"([^"]*?)"([^"]*?)<file>(.*?)</file>"#).expect("Invalid regex"));

static YOUTUBE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:https?://)?(?:www\.)?(?:youtube\.com/(?:watch\?v=|embed/)|youtu\.be/)([a-zA-Z0-9_-]{11})",
    )
    .expect("Invalid regex")
});

static START_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[?&](?:t|start)=(\d+)").expect("Invalid regex"));

/// Replies that are acceptable even without any cited article.
const NO_ANSWER_REPLIES: [&str; 4] = [
    "मुझे इस बारे में जानकारी नहीं हैं।",
    "I don't know about this.",
    "मैं इसका उत्तर देने में असमर्थ हूँ।",
    "I am unable to answer this question.",
];

/// Metadata for one indexed article file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ArticleMeta {
    #[serde(rename = "youtubeURL", default)]
    pub youtube_url: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Article metadata keyed by the file name the assistant cites.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct ArticleIndex(HashMap<String, ArticleMeta>);

impl ArticleIndex {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(DubError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    pub fn get(&self, file_name: &str) -> Option<&ArticleMeta> {
        self.0.get(file_name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, ArticleMeta)> for ArticleIndex {
    fn from_iter<T: IntoIterator<Item = (String, ArticleMeta)>>(iter: T) -> Self {
        ArticleIndex(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Insight {
    pub quote: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub article_title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ParsedAnswer {
    pub header: String,
    pub insights: Vec<Insight>,
    pub footer: String,
}

/// Replace every file-citation marker in the reply with `<file>{name}</file>`.
pub async fn process_citations(api: &dyn AssistantApi, message: &mut AssistantMessage) -> Result<()> {
    for annotation in &message.annotations {
        let Some(file_id) = &annotation.file_id else {
            warn!("Unprocessed citation: {}", annotation.text);
            continue;
        };
        let file_name = api.file_name(file_id).await?;
        if !message.value.contains(&annotation.text) {
            warn!("Citation not found in output: {}", annotation.text);
        }
        message.value = message
            .value
            .replace(&annotation.text, &format!("<file>{file_name}</file>"));
    }
    Ok(())
}

fn split_header(text: &str) -> (String, String) {
    match text.split_once(':') {
        Some((header, rest)) => (format!("{}:", header.trim()), rest.trim().to_string()),
        None => (text.trim().to_string(), String::new()),
    }
}

/// Split a cited reply into header, quoted insights and footer.
pub fn parse_answer(text: &str, articles: &ArticleIndex) -> ParsedAnswer {
    let text = text.replace(['\u{201c}', '\u{201d}'], "\"");
    let (header, body) = split_header(&text);

    let mut insights = Vec::new();
    for caps in INSIGHT.captures_iter(&body) {
        let file_name = &caps[3];
        let Some(article) = articles.get(file_name) else {
            warn!("Cited file {} is not in the article index", file_name);
            continue;
        };

        let mut insight = Insight {
            quote: format!("\"{}\"", caps[1].trim()),
            video_url: article.youtube_url.clone().filter(|u| !u.is_empty()),
            ..Default::default()
        };
        if let Some(url) = article.url.clone().filter(|u| !u.is_empty()) {
            insight.article_url = Some(url);
            insight.article_title =
                Some(article.title.clone().unwrap_or_else(|| "Article".to_string()));
        }
        insights.push(insight);
    }

    let mut footer = String::new();
    if let Some((_, tail)) = body.rsplit_once("</file>") {
        if let Some((_, last)) = tail.trim().rsplit_once('\n') {
            footer = last.trim().to_string();
        }
    }

    ParsedAnswer {
        header,
        insights,
        footer,
    }
}

/// Whether an answer is worth showing: an explicit "don't know", or at least
/// one insight linked to an article.
pub fn is_valid_answer(answer: &ParsedAnswer) -> bool {
    let says_no_answer = NO_ANSWER_REPLIES.iter().any(|reply| {
        answer.header.contains(reply)
            || answer.footer.contains(reply)
            || answer.insights.iter().any(|i| i.quote.contains(reply))
    });
    says_no_answer || answer.insights.iter().any(|i| i.article_url.is_some())
}

/// Embeddable player URL for a YouTube link, keeping its start time.
pub fn embed_url_with_time(youtube_url: &str) -> Result<String> {
    let video_id = YOUTUBE_ID
        .captures(youtube_url)
        .map(|caps| caps[1].to_string())
        .ok_or_else(|| DubError::InvalidInput(format!("Invalid YouTube URL: {youtube_url}")))?;

    let start = START_TIME
        .captures(youtube_url)
        .map(|caps| format!("?start={}", &caps[1]))
        .unwrap_or_default();

    Ok(format!("https://www.youtube.com/embed/{video_id}{start}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ask::Annotation;
    use async_trait::async_trait;

    fn index() -> ArticleIndex {
        [
            (
                "000000.json".to_string(),
                ArticleMeta {
                    youtube_url: Some("https://youtu.be/dQw4w9WgXcQ?t=42".to_string()),
                    url: Some("https://example.org/articles/gita".to_string()),
                    title: None,
                },
            ),
            (
                "000001.json".to_string(),
                ArticleMeta {
                    youtube_url: None,
                    url: Some("https://example.org/community".to_string()),
                    title: Some("Gita Community".to_string()),
                },
            ),
            ("000002.json".to_string(), ArticleMeta::default()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_parse_answer_with_insights_and_footer() {
        let text = "Acharya Ji has shared the following insights on your question: \n\
            1. \u{201c}Just begin.\u{201d} - Source: <file>000000.json</file>\n\
            2. \"Visit the community page.\" <file>000001.json</file>\n\n\
            Some closing remark.\nThese quotes reflect the idea.";
        let answer = parse_answer(text, &index());

        assert_eq!(
            answer.header,
            "Acharya Ji has shared the following insights on your question:"
        );
        assert_eq!(answer.insights.len(), 2);
        assert_eq!(answer.insights[0].quote, "\"Just begin.\"");
        assert_eq!(
            answer.insights[0].video_url.as_deref(),
            Some("https://youtu.be/dQw4w9WgXcQ?t=42")
        );
        assert_eq!(answer.insights[0].article_title.as_deref(), Some("Article"));
        assert_eq!(
            answer.insights[1].article_title.as_deref(),
            Some("Gita Community")
        );
        assert_eq!(answer.footer, "These quotes reflect the idea.");
        assert!(is_valid_answer(&answer));
    }

    #[test]
    fn test_single_line_tail_is_not_a_footer() {
        let text = "Header: \"quote\" <file>000000.json</file>. ";
        let answer = parse_answer(text, &index());
        assert_eq!(answer.insights.len(), 1);
        assert_eq!(answer.footer, "");
    }

    #[test]
    fn test_no_colon_means_all_header() {
        let answer = parse_answer("I don't know about this.", &index());
        assert_eq!(answer.header, "I don't know about this.");
        assert!(answer.insights.is_empty());
        assert!(is_valid_answer(&answer));
    }

    #[test]
    fn test_unknown_file_is_skipped() {
        let answer = parse_answer("Header: \"x\" <file>missing.json</file>", &index());
        assert!(answer.insights.is_empty());
        assert!(!is_valid_answer(&answer));
    }

    #[test]
    fn test_insights_without_articles_are_invalid() {
        let answer = parse_answer("Header: \"x\" <file>000002.json</file>", &index());
        assert_eq!(answer.insights.len(), 1);
        assert!(answer.insights[0].article_url.is_none());
        assert!(!is_valid_answer(&answer));
    }

    #[test]
    fn test_hindi_no_answer_is_valid() {
        let answer = parse_answer("मैं इसका उत्तर देने में असमर्थ हूँ।", &index());
        assert!(is_valid_answer(&answer));
    }

    #[test]
    fn test_embed_url() {
        assert_eq!(
            embed_url_with_time("https://www.youtube.com/watch?v=dQw4w9WgXcQ&t=90").unwrap(),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=90"
        );
        assert_eq!(
            embed_url_with_time("https://youtu.be/dQw4w9WgXcQ").unwrap(),
            "https://www.youtube.com/embed/dQw4w9WgXcQ"
        );
        assert_eq!(
            embed_url_with_time("youtube.com/embed/dQw4w9WgXcQ?start=5").unwrap(),
            "https://www.youtube.com/embed/dQw4w9WgXcQ?start=5"
        );
        assert!(matches!(
            embed_url_with_time("https://vimeo.com/123"),
            Err(DubError::InvalidInput(_))
        ));
    }

    struct FileNames;

    #[async_trait]
    impl AssistantApi for FileNames {
        async fn create_thread(&self) -> Result<String> {
            unreachable!()
        }
        async fn add_user_message(&self, _: &str, _: &str) -> Result<String> {
            unreachable!()
        }
        async fn run_and_wait(&self, _: &str) -> Result<()> {
            unreachable!()
        }
        async fn latest_reply(&self, _: &str) -> Result<Option<AssistantMessage>> {
            unreachable!()
        }
        async fn file_name(&self, file_id: &str) -> Result<String> {
            Ok(format!("{}.json", file_id.trim_start_matches("file-")))
        }
    }

    #[tokio::test]
    async fn test_process_citations() {
        let mut message = AssistantMessage {
            value: "Header: \"a\"【4:0†source】 and \"b\"【4:1†source】".to_string(),
            annotations: vec![
                Annotation {
                    text: "【4:0†source】".to_string(),
                    file_id: Some("file-000000".to_string()),
                },
                Annotation {
                    text: "【4:1†source】".to_string(),
                    file_id: Some("file-000001".to_string()),
                },
                Annotation {
                    text: "sandbox:/x".to_string(),
                    file_id: None,
                },
            ],
        };
        process_citations(&FileNames, &mut message).await.unwrap();
        assert_eq!(
            message.value,
            "Header: \"a\"<file>000000.json</file> and \"b\"<file>000001.json</file>"
        );

        let answer = parse_answer(&message.value, &index());
        assert_eq!(answer.insights.len(), 2);
    }
}
