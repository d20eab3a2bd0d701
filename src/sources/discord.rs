use std::time::Duration;

use reqwest::Client;
use tokio::time;
use tracing::{debug, info, warn};

use crate::config::{API_URL, RETRY_JITTER};

use super::schema::{ApiError, Message, PinsResponse};

pub struct DiscordClient {
    client: Client,
    api_url: String,
    token: String,
    /// `None` retries rate limits forever.
    max_retries: Option<u32>,
}
pub struct GetPins<'a> {
    discord: &'a DiscordClient,
    channel_id: &'a str,
}

#[derive(Debug, thiserror::Error)]
pub enum DiscordError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("malformed pins payload: {0}")]
    Scheme(#[from] serde_json::Error),
    #[error("channel {channel_id}: API returned error {cause}")]
    Api { channel_id: String, cause: ApiError },
    #[error("channel {channel_id}: still rate limited after {attempts} retries")]
    RateLimited { channel_id: String, attempts: u32 },
}

/// Pins of one channel, in API order.
#[derive(Debug)]
pub struct ChannelPins {
    pub id: String,
    pub pins: Vec<Message>,
}

impl DiscordClient {
    pub fn new(token: String) -> Self {
        Self {
            client: Client::new(),
            api_url: API_URL.to_owned(),
            token,
            max_retries: None,
        }
    }

    pub fn api_url(mut self, api_url: String) -> Self {
        self.api_url = api_url;
        self
    }

    pub fn max_retries(mut self, max_retries: Option<u32>) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn get_pins<'a>(&'a self, channel_id: &'a str) -> GetPins<'a> {
        GetPins {
            discord: self,
            channel_id,
        }
    }
}

impl<'a> GetPins<'a> {
    async fn request(&self) -> Result<PinsResponse, DiscordError> {
        let res = self
            .discord
            .client
            .get(format!(
                "{}/channels/{}/pins",
                self.discord.api_url, self.channel_id
            ))
            .header("authorization", &self.discord.token)
            .send()
            .await?
            .text()
            .await?;

        Ok(PinsResponse::parse(&res)?)
    }

    /// Fetches the pins, sleeping through rate limits.
    pub async fn send(self) -> Result<ChannelPins, DiscordError> {
        debug!("Fetching channel {}", self.channel_id);

        let mut attempts = 0;
        loop {
            let cause = match self.request().await? {
                PinsResponse::Pins(pins) => {
                    info!("Got {} pins from {}", pins.len(), self.channel_id);

                    return Ok(ChannelPins {
                        id: self.channel_id.to_owned(),
                        pins,
                    });
                }
                PinsResponse::Error(cause) => cause,
            };

            let Some(retry_after) = cause.retry_after else {
                return Err(DiscordError::Api {
                    channel_id: self.channel_id.to_owned(),
                    cause,
                });
            };

            if self.discord.max_retries.is_some_and(|max| attempts >= max) {
                return Err(DiscordError::RateLimited {
                    channel_id: self.channel_id.to_owned(),
                    attempts,
                });
            }
            attempts += 1;

            let delay =
                Duration::try_from_secs_f64(retry_after).unwrap_or_default() + RETRY_JITTER;
            warn!(
                "Rate limited on {}, sleeping for {:.1}s",
                self.channel_id,
                delay.as_secs_f64()
            );
            time::sleep(delay).await;
            debug!("Slept for {:.1}s, retrying", delay.as_secs_f64());
        }
    }
}
