//! Free text to structured records
//!
//! [`ChatStructurer`] asks an OpenAI-compatible chat-completions service to
//! return JSON and parses the outermost `{...}` block of the reply.
//! [`FixedStructurer`] returns canned results and is used in tests and
//! offline runs.

use crate::prompts::{PROFILE_SYSTEM_PROMPT, QUERY_SYSTEM_PROMPT};
use ahash::AHashMap;
use resumatch_core::{Error, Profile, Result, StructuredQuery};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub trait Structurer: Send + Sync {
    fn structure_query(&self, text: &str) -> impl Future<Output = Result<StructuredQuery>> + Send;

    fn structure_profile(&self, text: &str) -> impl Future<Output = Result<Profile>> + Send;
}

impl<T: Structurer> Structurer for Arc<T> {
    fn structure_query(&self, text: &str) -> impl Future<Output = Result<StructuredQuery>> + Send {
        (**self).structure_query(text)
    }

    fn structure_profile(&self, text: &str) -> impl Future<Output = Result<Profile>> + Send {
        (**self).structure_profile(text)
    }
}

/// Connection settings for [`ChatStructurer`]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatStructurerConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    /// Input is cut to this many characters before sending
    pub max_input_chars: usize,
    #[serde(skip)]
    pub api_key: Option<String>,
    pub request_timeout_ms: u64,
}

impl Default for ChatStructurerConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.groq.com/openai/v1/chat/completions".to_string(),
            model: "llama3-8b-8192".to_string(),
            temperature: 0.2,
            max_input_chars: 4000,
            api_key: None,
            request_timeout_ms: 30_000,
        }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: String,
}

/// Client for an OpenAI-compatible chat-completions endpoint
pub struct ChatStructurer {
    client: reqwest::Client,
    config: ChatStructurerConfig,
}

impl ChatStructurer {
    pub fn new(config: ChatStructurerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(|e| Error::InvalidConfig(format!("structuring client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ChatStructurerConfig {
        &self.config
    }

    async fn complete(&self, system_prompt: &str, text: &str) -> Result<String> {
        let input = truncate_chars(text, self.config.max_input_chars);
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            temperature: self.config.temperature,
        };

        let mut request = self.client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Structuring(format!("HTTP error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Structuring(format!("API returned {status}: {body}")));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Structuring(format!("JSON parse error: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| Error::Structuring("response contained no choices".to_string()))?;

        debug!(input_chars = input.chars().count(), reply_chars = content.len(), "chat completion");
        Ok(content)
    }
}

impl Structurer for ChatStructurer {
    async fn structure_query(&self, text: &str) -> Result<StructuredQuery> {
        let reply = self.complete(QUERY_SYSTEM_PROMPT, text).await?;
        parse_reply(&reply)
    }

    async fn structure_profile(&self, text: &str) -> Result<Profile> {
        let reply = self.complete(PROFILE_SYSTEM_PROMPT, text).await?;
        parse_reply(&reply)
    }
}

/// First `max_chars` characters of `text`, on a char boundary
fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}

/// The span from the first `{` to the last `}`
pub fn extract_json_block(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

/// Parse a model reply into `T`, tolerating nulls and non-string scalars.
pub fn parse_reply<T: DeserializeOwned>(reply: &str) -> Result<T> {
    let block = extract_json_block(reply).ok_or_else(|| {
        Error::Structuring(format!("could not find a JSON block in reply: {reply}"))
    })?;

    let mut value: Value = serde_json::from_str(block)
        .map_err(|e| Error::Structuring(format!("invalid JSON in reply: {e}")))?;
    coerce_scalars(&mut value);

    serde_json::from_value(value).map_err(|e| {
        warn!(error = %e, "reply did not match the expected shape");
        Error::Structuring(format!("unexpected reply shape: {e}"))
    })
}

// Every leaf field of the structured records is a string: nulls are dropped
// and numbers/booleans become strings.
fn coerce_scalars(value: &mut Value) {
    match value {
        Value::Object(map) => {
            map.retain(|_, v| !v.is_null());
            map.values_mut().for_each(coerce_scalars);
        }
        Value::Array(items) => {
            items.retain(|v| !v.is_null());
            items.iter_mut().for_each(coerce_scalars);
        }
        Value::Number(n) => *value = Value::String(n.to_string()),
        Value::Bool(b) => *value = Value::String(b.to_string()),
        Value::Null | Value::String(_) => {}
    }
}

/// Canned structuring results.
///
/// A configured query or a profile registered for the exact (trimmed) input
/// text wins; otherwise the input itself is parsed as JSON, so pre-structured
/// documents pass straight through.
#[derive(Debug, Clone, Default)]
pub struct FixedStructurer {
    query: Option<StructuredQuery>,
    profiles: AHashMap<String, Profile>,
}

impl FixedStructurer {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_query(mut self, query: StructuredQuery) -> Self {
        self.query = Some(query);
        self
    }

    #[must_use]
    pub fn with_profile(mut self, text: &str, profile: Profile) -> Self {
        self.profiles.insert(text.trim().to_string(), profile);
        self
    }
}

impl Structurer for FixedStructurer {
    async fn structure_query(&self, text: &str) -> Result<StructuredQuery> {
        match &self.query {
            Some(query) => Ok(query.clone()),
            None => parse_reply(text),
        }
    }

    async fn structure_profile(&self, text: &str) -> Result<Profile> {
        match self.profiles.get(text.trim()) {
            Some(profile) => Ok(profile.clone()),
            None => parse_reply(text),
        }
    }
}
