use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

/// Pinned message as returned by the channel pins endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u8,
    pub content: String,
    pub channel_id: String,
    pub author: Author,
    #[serde(default)]
    pub mentions: Vec<Author>,
    #[serde(default)]
    pub pinned: bool,
    #[serde(default)]
    pub mention_everyone: bool,
    #[serde(default)]
    pub tts: bool,
    pub timestamp: DateTime<Utc>,
    /// `None` if the message was never edited.
    pub edited_timestamp: Option<DateTime<Utc>>,
    pub flags: u64,
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Author {
    pub id: String,
    pub username: String,
    /// Avatar hash. `None` for users on the default avatar.
    pub avatar: Option<String>,
    pub discriminator: String,
    #[serde(default)]
    pub public_flags: u64,
    #[serde(default)]
    pub global_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attachment {
    pub id: String,
    /// MIME type. Not every upload has one.
    #[serde(default)]
    pub content_type: Option<String>,
    pub filename: String,
    pub url: String,
    pub proxy_url: String,
}

/// Error object the API returns instead of a payload.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiError {
    pub code: i64,
    /// Seconds to wait before retrying. Only present on rate limits.
    #[serde(default)]
    pub retry_after: Option<f64>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A channel pins response: either a list of messages or an error.
#[derive(Debug)]
pub enum PinsResponse {
    Pins(Vec<Message>),
    Error(ApiError),
}

impl PinsResponse {
    /// Decodes a raw response body. An object carrying `code` is an error,
    /// anything else must be a list of messages.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(body)?;

        if raw.as_object().is_some_and(|obj| obj.contains_key("code")) {
            serde_json::from_value(raw).map(Self::Error)
        } else {
            serde_json::from_value(raw).map(Self::Pins)
        }
    }
}

impl Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "code {}: {message}", self.code),
            None => write!(f, "code {}", self.code),
        }
    }
}

impl Attachment {
    fn has_type(&self, prefix: &str) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|t| t.starts_with(prefix))
    }

    pub fn is_image(&self) -> bool {
        self.has_type("image")
    }

    pub fn is_video(&self) -> bool {
        self.has_type("video")
    }
}
