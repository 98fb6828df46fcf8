//! AI suggestions for templates: chat-completion backend, reply parsing,
//! response cache and daily quota.

use std::num::NonZeroUsize;
use std::sync::{Arc, LazyLock, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Local, TimeDelta};
use lru::LruCache;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{PromptError, Result};
use crate::quota::{QuotaStatus, QuotaTracker};
use crate::render;
use crate::template::Template;

/// How long a suggestions reply stays cached, in seconds.
pub const DEFAULT_CACHE_TTL_SECS: i64 = 60 * 60;

const CACHE_CAPACITY: usize = 64;

const SUGGESTIONS_SYSTEM_PROMPT: &str = "You are an expert in AI prompts. Analyze the prompt and suggest improvements.
Your suggestions must be specific and actionable.
Answer with exactly this format, one line each:
1. Clarity: <suggestion> | <why it helps>
2. Structure: <suggestion> | <why it helps>
3. Variables: <suggestion> | <why it helps>";

const EXAMPLES_SYSTEM_PROMPT: &str = r#"Generate 3 usage examples for this prompt as JSON in this format:
{
  "examples": [
    {
      "input": "Example input",
      "output": "Example output",
      "explanation": "Short explanation"
    }
  ]
}"#;

const AUTOCOMPLETE_SYSTEM_PROMPT: &str = r#"Suggest 3 ways to complete this prompt as JSON in this format:
{
  "suggestions": [
    {
      "text": "Suggested text",
      "explanation": "Why this suggestion is useful"
    }
  ]
}"#;

static SUGGESTION_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*\d+[.)]\s*(?:\*\*)?(?P<label>[^:*]+?)(?:\*\*)?\s*:\s*(?P<body>.+)$").unwrap()
});

/// A chat-completion request: one system and one user message.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
}

/// Anything that can answer a chat-completion request with plain text.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<String>;
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionBody<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct CompletionReply {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: ApiMessage,
}

/// OpenAI-compatible `/chat/completions` client.
pub struct OpenAiBackend {
    client: Client,
    api_url: String,
    model: String,
    api_key: Option<String>,
    api_key_env: String,
}

impl OpenAiBackend {
    /// Build a client. The key is read from the environment variable `api_key_env`.
    pub fn new(
        api_url: impl Into<String>,
        model: impl Into<String>,
        api_key_env: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key_env = api_key_env.into();
        let api_key = std::env::var(&api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_url: api_url.into(),
            model: model.into(),
            api_key,
            api_key_env,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl ChatBackend for OpenAiBackend {
    async fn complete(&self, request: &ChatRequest) -> Result<String> {
        let api_key = self.api_key.as_deref().ok_or_else(|| {
            PromptError::adapter(format!(
                "No API key configured - set the {} environment variable",
                self.api_key_env
            ))
        })?;

        let body = CompletionBody {
            model: &self.model,
            messages: vec![
                ApiMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ApiMessage {
                    role: "user".to_string(),
                    content: request.user.clone(),
                },
            ],
            temperature: request.temperature,
        };

        let start = std::time::Instant::now();
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await?;
        let status = resp.status();
        debug!(
            status = status.as_u16(),
            latency_ms = start.elapsed().as_millis() as u64,
            "completion_response"
        );

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(PromptError::RateLimited);
        }
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %text, "completion_failed");
            return Err(PromptError::adapter(format!(
                "AI service returned HTTP {}",
                status.as_u16()
            )));
        }

        let reply: CompletionReply = resp.json().await?;
        reply
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| PromptError::adapter("AI service returned no choices"))
    }
}

/// Which aspect of the prompt a suggestion addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuggestionKind {
    Clarity,
    Structure,
    Variables,
    General,
}

impl SuggestionKind {
    fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        if label.contains("clar") {
            Self::Clarity
        } else if label.contains("struct") {
            Self::Structure
        } else if label.contains("variab") {
            Self::Variables
        } else {
            Self::General
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Clarity => "Clarity",
            Self::Structure => "Structure",
            Self::Variables => "Variables",
            Self::General => "General",
        }
    }
}

/// One improvement proposed for a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub kind: SuggestionKind,
    pub text: String,
    pub explanation: Option<String>,
}

/// Sample usage of a template.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Example {
    pub input: String,
    pub output: String,
    pub explanation: String,
}

/// A proposed continuation of partially typed text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default)]
pub struct Completion {
    pub text: String,
    pub explanation: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExamplesReply {
    examples: Vec<Example>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CompletionsReply {
    suggestions: Vec<Completion>,
}

/// Parse numbered `N. Label: text | explanation` lines.
///
/// A reply with no numbered lines becomes a single general suggestion.
pub fn parse_suggestions(reply: &str) -> Vec<Suggestion> {
    let mut suggestions: Vec<Suggestion> = reply
        .lines()
        .filter_map(|line| {
            let caps = SUGGESTION_LINE_RE.captures(line)?;
            let body = caps["body"].trim();
            let (text, explanation) = match body.split_once(" | ") {
                Some((text, explanation)) => (text.trim(), Some(explanation.trim())),
                None => (body, None),
            };
            Some(Suggestion {
                kind: SuggestionKind::from_label(&caps["label"]),
                text: text.to_string(),
                explanation: explanation
                    .filter(|e| !e.is_empty())
                    .map(|e| e.to_string()),
            })
        })
        .filter(|s| !s.text.is_empty())
        .collect();

    if suggestions.is_empty() && !reply.trim().is_empty() {
        suggestions.push(Suggestion {
            kind: SuggestionKind::General,
            text: reply.trim().to_string(),
            explanation: None,
        });
    }
    suggestions
}

/// The slice from the first `{` to the last `}`, so fenced replies parse.
pub fn extract_json(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn parse_embedded<T: serde::de::DeserializeOwned>(reply: &str) -> Result<T> {
    let json = extract_json(reply)
        .ok_or_else(|| PromptError::adapter("AI reply did not contain JSON"))?;
    Ok(serde_json::from_str(json)?)
}

pub fn parse_examples(reply: &str) -> Result<Vec<Example>> {
    Ok(parse_embedded::<ExamplesReply>(reply)?.examples)
}

pub fn parse_completions(reply: &str) -> Result<Vec<Completion>> {
    Ok(parse_embedded::<CompletionsReply>(reply)?
        .suggestions
        .into_iter()
        .filter(|c| !c.text.trim().is_empty())
        .collect())
}

fn describe_template(template: &Template) -> String {
    let categories = template
        .category
        .iter()
        .map(|c| c.label())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Analyze this prompt and suggest improvements:\nTitle: {}\nDescription: {}\nCategories: {}\nTags: {}\nPrompt: {}",
        template.title,
        template.description,
        categories,
        template.tags.join(", "),
        render::plain_text(template)
    )
}

struct CachedReply {
    stored_at: DateTime<Local>,
    suggestions: Vec<Suggestion>,
}

/// Quota-guarded, cached access to a [`ChatBackend`].
pub struct SuggestionService {
    backend: Arc<dyn ChatBackend>,
    quota: Mutex<QuotaTracker>,
    cache: Mutex<LruCache<String, CachedReply>>,
    clock: Arc<dyn Clock>,
    ttl: TimeDelta,
}

impl SuggestionService {
    pub fn new(
        backend: Arc<dyn ChatBackend>,
        quota: QuotaTracker,
        clock: Arc<dyn Clock>,
        ttl: TimeDelta,
    ) -> Self {
        Self {
            backend,
            quota: Mutex::new(quota),
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN),
            )),
            clock,
            ttl,
        }
    }

    fn consume_quota(&self) -> Result<u32> {
        self.quota
            .lock()
            .map_err(|_| PromptError::adapter("Quota state is unavailable"))?
            .try_consume()
    }

    pub fn quota_status(&self) -> Result<QuotaStatus> {
        self.quota
            .lock()
            .map_err(|_| PromptError::adapter("Quota state is unavailable"))?
            .status()
    }

    fn cached(&self, key: &str) -> Option<Vec<Suggestion>> {
        let mut cache = self.cache.lock().ok()?;
        let fresh = {
            let entry = cache.get(key)?;
            if self.clock.now() - entry.stored_at < self.ttl {
                Some(entry.suggestions.clone())
            } else {
                None
            }
        };
        if fresh.is_none() {
            cache.pop(key);
        }
        fresh
    }

    /// Improvement suggestions for a template.
    ///
    /// Replies are cached per exact template content; a cache hit costs no quota.
    pub async fn suggestions(&self, template: &Template) -> Result<Vec<Suggestion>> {
        let key = serde_json::to_string(template)?;
        if let Some(hit) = self.cached(&key) {
            debug!(count = hit.len(), "suggestions_cache_hit");
            return Ok(hit);
        }

        let used = self.consume_quota()?;
        info!(used, "suggestions_requested");
        let reply = self
            .backend
            .complete(&ChatRequest {
                system: SUGGESTIONS_SYSTEM_PROMPT.to_string(),
                user: describe_template(template),
                temperature: 0.7,
            })
            .await?;

        let suggestions = parse_suggestions(&reply);
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CachedReply {
                    stored_at: self.clock.now(),
                    suggestions: suggestions.clone(),
                },
            );
        }
        Ok(suggestions)
    }

    /// Sample inputs and outputs for a template.
    pub async fn related_examples(&self, template: &Template) -> Result<Vec<Example>> {
        let used = self.consume_quota()?;
        info!(used, "examples_requested");
        let reply = self
            .backend
            .complete(&ChatRequest {
                system: EXAMPLES_SYSTEM_PROMPT.to_string(),
                user: format!(
                    "Generate examples for this prompt:\n{}",
                    render::plain_text(template)
                ),
                temperature: 0.8,
            })
            .await?;
        parse_examples(&reply)
    }

    /// Ways to continue partially typed text. Blank input costs nothing.
    pub async fn autocomplete(&self, input: &str) -> Result<Vec<Completion>> {
        if input.trim().is_empty() {
            return Ok(Vec::new());
        }
        let used = self.consume_quota()?;
        debug!(used, chars = input.chars().count(), "autocomplete_requested");
        let reply = self
            .backend
            .complete(&ChatRequest {
                system: AUTOCOMPLETE_SYSTEM_PROMPT.to_string(),
                user: format!("Complete this prompt: {}", input),
                temperature: 0.6,
            })
            .await?;
        parse_completions(&reply)
    }
}
