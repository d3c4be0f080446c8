//! The structured article record and the schema handed to the extractor

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// One extracted news article, persisted as `result.json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// The title of the news
    pub title: String,

    /// The content of the news
    pub content: String,

    /// The URL of the news
    pub url: String,

    /// The date of the news, when the page states one
    pub date: Option<String>,
}

impl NewsRecord {
    /// Returns true when the record carries neither a title nor any content
    pub fn is_empty(&self) -> bool {
        self.title.trim().is_empty() && self.content.trim().is_empty()
    }
}

/// Description of a record shape, given to the extraction collaborator
///
/// The crawler never infers the shape from the model's reply; it hands this
/// schema over with every request and validates the reply against
/// [`NewsRecord`] when deserializing.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    /// Schema title, used as the record name in prompts
    pub name: &'static str,

    /// JSON Schema document for the record
    pub schema: Value,
}

impl RecordSchema {
    /// Schema for [`NewsRecord`]
    pub fn news() -> Self {
        Self {
            name: "NewsData",
            schema: json!({
                "title": "NewsData",
                "type": "object",
                "properties": {
                    "title": {"type": "string", "description": "The title of the news"},
                    "content": {"type": "string", "description": "The content of the news"},
                    "url": {"type": "string", "description": "The URL of the news"},
                    "date": {
                        "type": ["string", "null"],
                        "description": "The date of the news"
                    }
                },
                "required": ["title", "content", "url", "date"]
            }),
        }
    }

    /// Pretty-printed schema for embedding in a prompt
    pub fn to_prompt_string(&self) -> String {
        serde_json::to_string_pretty(&self.schema).unwrap_or_else(|_| self.schema.to_string())
    }
}
