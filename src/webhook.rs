use reqwest::{header::CONTENT_TYPE, Client};
use serde::Serialize;
use tracing::warn;

use crate::embed::Card;

pub struct WebhookClient {
    client: Client,
    url: String,
}

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Scheme(#[from] serde_json::Error),
}

/// Body of a webhook execution. Either part may be left out.
#[derive(Debug, Default, Serialize)]
pub struct WebhookPayload<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    embeds: Option<Vec<&'a Card>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

impl<'a> WebhookPayload<'a> {
    pub fn embeds<I: IntoIterator<Item = &'a Card>>(mut self, embeds: I) -> Self {
        self.embeds = Some(embeds.into_iter().collect());
        self
    }

    pub fn content(mut self, content: String) -> Self {
        self.content = Some(content);
        self
    }

    pub fn to_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl WebhookClient {
    pub fn new(url: String) -> Self {
        Self {
            client: Client::new(),
            url,
        }
    }

    /// Posts the payload and hands back whatever the webhook answered.
    ///
    /// The response body is returned for every status code; a non-success
    /// status is only logged.
    pub async fn send(&self, payload: &WebhookPayload<'_>) -> Result<String, WebhookError> {
        let res = self
            .client
            .post(&self.url)
            .header(CONTENT_TYPE, "application/json")
            .body(serde_json::to_string(payload)?)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;

        if !status.is_success() {
            warn!("Webhook answered with {status}: {text}");
        }

        Ok(text)
    }
}
