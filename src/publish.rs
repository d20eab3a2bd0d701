use tracing::{error, info};

use crate::{
    config::BATCH_SIZE,
    embed::{clip_list, BuiltCards, Card, CardStrategy, Field, FlaggedCard},
    sources::{
        discord::{ChannelPins, DiscordClient},
        schema::Message,
    },
    webhook::{WebhookClient, WebhookPayload},
};

/// Where built payloads end up.
pub enum Publisher {
    /// Print every body instead of sending it.
    DryRun,
    Webhook(WebhookClient),
}

/// Filters applied to fetched pins before cards are built.
#[derive(Debug, Default, Clone)]
pub struct PinFilter {
    /// Only keep pins by this author id.
    pub user: Option<String>,
    /// Only keep the oldest `limit` cards.
    pub limit: Option<usize>,
}

impl Publisher {
    pub async fn publish(&self, label: &str, payload: &WebhookPayload<'_>) {
        match self {
            Self::DryRun => match payload.to_pretty() {
                Ok(body) => println!("Would have sent body ({label}): {body}"),
                Err(e) => error!("Failed to serialize {label} body: {e}"),
            },
            Self::Webhook(webhook) => match webhook.send(payload).await {
                Ok(res) => info!("{label} send: {res}"),
                Err(e) => error!("Failed to send {label}: {e}"),
            },
        }
    }
}

impl PinFilter {
    fn apply(&self, pins: Vec<Message>) -> Vec<Message> {
        match &self.user {
            Some(user) => {
                info!("Filtering pins by user {user}");
                pins.into_iter().filter(|p| &p.author.id == user).collect()
            }
            None => pins,
        }
    }
}

/// Fetches, builds and publishes every channel on its own.
pub async fn each_channel(
    discord: &DiscordClient,
    publisher: &Publisher,
    channels: &[String],
    filter: &PinFilter,
) {
    for id in channels {
        match discord.get_pins(id).send().await {
            Ok(ChannelPins { pins, .. }) => {
                let pins = filter.apply(pins);
                let built = CardStrategy::PerMessage.build(&pins);
                publish_built(publisher, built, filter.limit).await;
                info!("Finished processing {id}");
            }
            Err(e) => error!("Failed to fetch pins: {e}"),
        }
        info!("-- -- --");
    }
}

/// Fetches all channels first, then publishes one aggregate over them.
pub async fn all_channels(
    discord: &DiscordClient,
    publisher: &Publisher,
    channels: &[String],
    filter: &PinFilter,
    strategy: CardStrategy,
) {
    let pins = filter.apply(collect_pins(discord, channels).await);
    info!("Collected {} pins from {} channels", pins.len(), channels.len());

    publish_built(publisher, strategy.build(&pins), filter.limit).await;
}

/// Sends a single card counting the pins of `user` in every channel.
pub async fn user_count(
    discord: &DiscordClient,
    publisher: &Publisher,
    channels: &[String],
    user: &str,
) {
    let mut total = 0;
    let mut fields = Vec::new();

    for id in channels {
        match discord.get_pins(id).send().await {
            Ok(ChannelPins { pins, .. }) => {
                let count = pins.iter().filter(|p| p.author.id == user).count();
                total += count;
                fields.push(Field {
                    name: format!("{count} pins"),
                    value: format!("<#{id}>"),
                    inline: true,
                });
            }
            Err(e) => error!("Failed to fetch pins: {e}"),
        }
    }

    let card = user_count_card(user, total, fields);
    publisher
        .publish("user count", &WebhookPayload::default().embeds([&card]))
        .await;
}

fn user_count_card(user: &str, total: usize, fields: Vec<Field>) -> Card {
    Card {
        title: Some("Pin count".to_owned()),
        description: Some(format!("<@{user}> has **{total}** pins")),
        fields,
        ..Default::default()
    }
}

async fn collect_pins(discord: &DiscordClient, channels: &[String]) -> Vec<Message> {
    let mut all = Vec::new();

    for id in channels {
        match discord.get_pins(id).send().await {
            Ok(ChannelPins { pins, .. }) => all.extend(pins),
            Err(e) => error!("Failed to fetch pins: {e}"),
        }
    }

    all
}

async fn publish_built(publisher: &Publisher, built: BuiltCards<'_>, limit: Option<usize>) {
    let cards = match built {
        BuiltCards::Leaderboard(card) => {
            publisher
                .publish("leaderboard", &WebhookPayload::default().embeds([&card]))
                .await;
            return;
        }
        BuiltCards::Messages(cards) => cards,
        BuiltCards::FirstPin(firsts) => {
            let mut cards: Vec<FlaggedCard> = firsts.into_values().collect();
            cards.sort_by_key(|c| c.message.timestamp);
            cards
        }
    };

    publish_cards(publisher, &cards, limit).await;
}

/// Sends text cards in batches, then every video as one list of links.
async fn publish_cards(publisher: &Publisher, cards: &[FlaggedCard<'_>], limit: Option<usize>) {
    let limit = limit.unwrap_or(cards.len());
    let (videos, text) = split_videos(&cards[..limit.min(cards.len())]);

    info!(
        "Filtered {} videos, {} text posts out of {} cards, limited to {limit} cards",
        videos.len(),
        text.len(),
        cards.len()
    );

    for chunk in text.chunks(BATCH_SIZE) {
        let payload = WebhookPayload::default().embeds(chunk.iter().map(|c| &c.card));
        publisher.publish("text", &payload).await;
    }

    if !videos.is_empty() {
        let payload = WebhookPayload::default().content(clip_list(&videos));
        publisher.publish("clips", &payload).await;
    }
}

type Split<'c, 'm> = (Vec<&'c FlaggedCard<'m>>, Vec<&'c FlaggedCard<'m>>);

/// Videos first, text second.
fn split_videos<'c, 'm>(cards: &'c [FlaggedCard<'m>]) -> Split<'c, 'm> {
    cards.iter().partition(|c| c.has_video)
}
