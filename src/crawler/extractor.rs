//! Structured extraction of news records from page markdown
//!
//! The built-in [`LlmExtractor`] talks to any OpenAI-compatible chat
//! completions endpoint (OpenAI itself, Gemini's OpenAI layer, local servers).

use crate::config::{resolve_api_key, ExtractionConfig};
use crate::crawler::fetcher::Page;
use crate::record::{NewsRecord, RecordSchema};
use crate::RippleError;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that end processing of one URL at the extraction step
///
/// Nothing is written for the URL, so a later run tries it again.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Extraction request failed: {0}")]
    Request(String),

    #[error("Provider returned {status}: {body}")]
    Provider { status: u16, body: String },

    #[error("Could not parse extraction reply: {0}")]
    Parse(String),

    #[error("Extraction produced an empty record")]
    EmptyResult,
}

/// Turns a fetched page into a typed record
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extracts one record from the page
    ///
    /// # Arguments
    ///
    /// * `page` - The fetched page with its markdown
    /// * `schema` - Shape the record must take
    /// * `instruction` - Natural-language extraction instruction
    async fn extract(
        &self,
        page: &Page,
        schema: &RecordSchema,
        instruction: &str,
    ) -> Result<NewsRecord, ExtractionError>;
}

/// Extractor backed by an OpenAI-compatible chat completions API
#[derive(Debug)]
pub struct LlmExtractor {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
}

impl LlmExtractor {
    /// Creates an extractor with an explicit API key
    pub fn new(config: &ExtractionConfig, api_key: String) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            top_p: config.top_p,
            frequency_penalty: config.frequency_penalty,
        })
    }

    /// Creates an extractor, reading the API key from the configured environment variable
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, RippleError> {
        let api_key = resolve_api_key(config)?;
        Ok(Self::new(config, api_key)?)
    }

    /// The full chat completions URL requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn headers(&self) -> Result<HeaderMap, ExtractionError> {
        let mut headers = HeaderMap::new();
        let auth = format!("Bearer {}", self.api_key);
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&auth)
                .map_err(|e| ExtractionError::Request(format!("invalid API key: {}", e)))?,
        );
        Ok(headers)
    }
}

#[async_trait]
impl Extractor for LlmExtractor {
    async fn extract(
        &self,
        page: &Page,
        schema: &RecordSchema,
        instruction: &str,
    ) -> Result<NewsRecord, ExtractionError> {
        let system_prompt = format!(
            "{}.\n\nReturn a single JSON object named {} that matches this JSON schema:\n{}",
            instruction.trim_end_matches('.'),
            schema.name,
            schema.to_prompt_string()
        );

        let body = ChatRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            top_p: self.top_p,
            frequency_penalty: self.frequency_penalty,
            response_format: ResponseFormat {
                kind: "json_object",
            },
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &page.markdown,
                },
            ],
        };

        let resp = self
            .client
            .post(&self.endpoint)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await
            .map_err(|e| ExtractionError::Request(e.to_string()))?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(ExtractionError::Provider { status, body });
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ExtractionError::Parse(format!("malformed provider response: {}", e)))?;

        let content = parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .ok_or(ExtractionError::EmptyResult)?;

        parse_record(&content, page.url.as_str())
    }
}

/// Parses a model reply into a record
///
/// Accepts a JSON object or an array of objects (the first is used),
/// optionally wrapped in a ```` ```json ```` fence. A blank `url` is filled
/// with `page_url`; a blank `date` becomes null.
pub fn parse_record(reply: &str, page_url: &str) -> Result<NewsRecord, ExtractionError> {
    let value: Value = serde_json::from_str(strip_code_fence(reply))
        .map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let object = match value {
        Value::Array(items) => items.into_iter().next().ok_or(ExtractionError::EmptyResult)?,
        other => other,
    };

    let raw: RawRecord =
        serde_json::from_value(object).map_err(|e| ExtractionError::Parse(e.to_string()))?;

    let record = NewsRecord {
        title: raw.title.trim().to_string(),
        content: raw.content.trim().to_string(),
        url: match raw.url.trim() {
            "" => page_url.to_string(),
            url => url.to_string(),
        },
        date: raw
            .date
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
    };

    if record.is_empty() {
        return Err(ExtractionError::EmptyResult);
    }

    Ok(record)
}

fn strip_code_fence(reply: &str) -> &str {
    let trimmed = reply.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let rest = rest.split_once('\n').map(|(_, body)| body).unwrap_or("");
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    response_format: ResponseFormat,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

/// Lenient view of a model reply; missing fields default to empty
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawRecord {
    title: String,
    content: String,
    url: String,
    date: Option<String>,
}
