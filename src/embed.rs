use std::collections::{BTreeMap, HashMap};

use chrono::SecondsFormat;
use serde::Serialize;

use crate::{
    config::{CDN_URL, CHANNELS_URL, GUILD_ID, ZWS},
    sources::schema::Message,
};

/// Webhook embed.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Card {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// ISO-8601, UTC.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Footer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<CardAuthor>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<Field>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Footer {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

/// Image, thumbnail or video.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct Media {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct CardAuthor {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_icon_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Card built from a single message.
#[derive(Debug)]
pub struct FlaggedCard<'a> {
    pub card: Card,
    /// Whether the card carries a video. Webhooks don't render embed videos,
    /// so these are posted as links instead.
    pub has_video: bool,
    /// Message permalink.
    pub source: String,
    pub message: &'a Message,
}

/// How a set of messages is turned into cards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CardStrategy {
    /// One card per message, oldest first.
    PerMessage,
    /// A single card ranking authors by pin count.
    Leaderboard,
    /// Each author's oldest pin.
    FirstPin,
}

#[derive(Debug)]
pub enum BuiltCards<'a> {
    Messages(Vec<FlaggedCard<'a>>),
    Leaderboard(Card),
    /// Keyed by author username.
    FirstPin(BTreeMap<String, FlaggedCard<'a>>),
}

impl CardStrategy {
    pub fn build(self, messages: &[Message]) -> BuiltCards<'_> {
        match self {
            Self::PerMessage => BuiltCards::Messages(build_cards(messages)),
            Self::Leaderboard => BuiltCards::Leaderboard(leaderboard(messages)),
            Self::FirstPin => BuiltCards::FirstPin(first_pins(messages)),
        }
    }
}

impl Media {
    fn new(url: &str) -> Self {
        Self {
            url: url.to_owned(),
            ..Default::default()
        }
    }
}

pub fn message_link(message: &Message) -> String {
    format!(
        "{CHANNELS_URL}/{GUILD_ID}/{}/{}",
        message.channel_id, message.id
    )
}

pub fn avatar_url(user_id: &str, hash: &str) -> String {
    format!("{CDN_URL}/avatars/{user_id}/{hash}.png")
}

pub fn build_card(message: &Message) -> FlaggedCard<'_> {
    let source = message_link(message);
    let mut card = Card {
        timestamp: Some(message.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)),
        footer: Some(Footer {
            text: "Sent at".to_owned(),
            ..Default::default()
        }),
        ..Default::default()
    };
    let mut has_video = false;
    let mut description = String::new();

    if !message.content.is_empty() {
        description.push_str(&message.content);
        description.push('\n');
    }

    if let Some(attachment) = message.attachments.first() {
        if attachment.is_image() {
            card.image = Some(Media::new(&attachment.url));
        } else if attachment.is_video() {
            has_video = true;
            card.video = Some(Media::new(&attachment.url));
        } else {
            description.push_str(&format!(
                "Unknown attachment [{}]({})",
                attachment.filename, attachment.url
            ));
        }
    }

    if let Some(hash) = &message.author.avatar {
        card.author = Some(CardAuthor {
            name: format!("@{}", message.author.username),
            icon_url: Some(avatar_url(&message.author.id, hash)),
            ..Default::default()
        });
    }

    if !description.is_empty() && !description.ends_with('\n') {
        description.push('\n');
    }
    description.push_str(&format!("[Jump]({source}) to <#{}>", message.channel_id));
    card.description = Some(description);

    FlaggedCard {
        card,
        has_video,
        source,
        message,
    }
}

/// Builds one card per message, oldest first.
pub fn build_cards(messages: &[Message]) -> Vec<FlaggedCard<'_>> {
    let mut sorted: Vec<&Message> = messages.iter().collect();
    sorted.sort_by_key(|m| m.timestamp);

    sorted.into_iter().map(build_card).collect()
}

/// Pin counts per username, most pins first. Ties keep the order in which
/// the authors first appear.
pub fn leaderboard_lines(messages: &[Message]) -> Vec<String> {
    let mut tally: Vec<(&str, usize)> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for message in messages {
        let name = message.author.username.as_str();
        match index.get(name) {
            Some(&i) => tally[i].1 += 1,
            None => {
                index.insert(name, tally.len());
                tally.push((name, 1));
            }
        }
    }

    tally.sort_by(|a, b| b.1.cmp(&a.1));
    tally
        .into_iter()
        .map(|(name, count)| format!("`@{ZWS}{name}` - **{count}** pins"))
        .collect()
}

pub fn leaderboard(messages: &[Message]) -> Card {
    let mut channels: Vec<&str> = Vec::new();
    for message in messages {
        if !channels.contains(&message.channel_id.as_str()) {
            channels.push(&message.channel_id);
        }
    }

    let lines = leaderboard_lines(messages);
    let description = if lines.is_empty() {
        "No pins found".to_owned()
    } else {
        let channels: Vec<String> = channels.iter().map(|c| format!("<#{c}>")).collect();
        format!("{}\n\nFrom {}", lines.join("\n"), channels.join(", "))
    };

    Card {
        title: Some("Leaderboard".to_owned()),
        description: Some(description),
        ..Default::default()
    }
}

/// Oldest pin of every author, keyed by username.
pub fn first_pins(messages: &[Message]) -> BTreeMap<String, FlaggedCard<'_>> {
    let mut firsts: BTreeMap<&str, &Message> = BTreeMap::new();

    for message in messages {
        firsts
            .entry(message.author.username.as_str())
            .and_modify(|first| {
                if message.timestamp < first.timestamp {
                    *first = message;
                }
            })
            .or_insert(message);
    }

    firsts
        .into_iter()
        .map(|(name, message)| (name.to_owned(), build_card(message)))
        .collect()
}

/// Markdown list linking every video, since webhooks won't embed them.
pub fn clip_list(videos: &[&FlaggedCard<'_>]) -> String {
    videos
        .iter()
        .filter_map(|v| Some((v.card.video.as_ref()?, v)))
        .enumerate()
        .map(|(i, (video, v))| {
            format!(
                "[Clip {}]({}) - [Jump]({}) to <#{}>",
                i + 1,
                video.url,
                v.source,
                v.message.channel_id
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
pub(crate) mod tests {
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::sources::schema::{Attachment, Author};

    pub(crate) fn message(id: &str, username: &str, timestamp: &str) -> Message {
        Message {
            id: id.to_owned(),
            kind: 0,
            content: String::new(),
            channel_id: "1137476424287125546".to_owned(),
            author: Author {
                id: format!("{username}-id"),
                username: username.to_owned(),
                avatar: None,
                discriminator: "0".to_owned(),
                public_flags: 0,
                global_name: None,
            },
            mentions: Vec::new(),
            pinned: true,
            mention_everyone: false,
            tts: false,
            timestamp: timestamp.parse::<DateTime<Utc>>().unwrap(),
            edited_timestamp: None,
            flags: 0,
            attachments: Vec::new(),
        }
    }

    fn with_attachment(mut message: Message, content_type: &str, filename: &str) -> Message {
        message.attachments.push(Attachment {
            id: "9".to_owned(),
            content_type: Some(content_type.to_owned()),
            filename: filename.to_owned(),
            url: format!("https://cdn.discordapp.com/attachments/1/9/{filename}"),
            proxy_url: format!("https://media.discordapp.net/attachments/1/9/{filename}"),
        });
        message
    }

    #[test]
    fn cards_are_sorted_by_timestamp() {
        let messages = vec![
            message("3", "a", "2023-03-01T00:00:00Z"),
            message("1", "b", "2023-01-01T00:00:00Z"),
            message("2", "a", "2023-02-01T00:00:00Z"),
        ];

        let cards = build_cards(&messages);
        let ids: Vec<&str> = cards.iter().map(|c| c.message.id.as_str()).collect();

        assert_eq!(ids, ["1", "2", "3"]);
        assert_eq!(
            cards[0].card.timestamp.as_deref(),
            Some("2023-01-01T00:00:00.000Z")
        );
    }

    #[test]
    fn bare_message_is_only_a_jump_link() {
        let msg = message("42", "a", "2023-01-01T00:00:00Z");
        let card = build_card(&msg);

        assert_eq!(
            card.card.description.as_deref(),
            Some(
                "[Jump](https://discord.com/channels/856662493778018335/1137476424287125546/42) \
                 to <#1137476424287125546>"
            )
        );
        assert_eq!(card.source, message_link(&msg));
        assert_eq!(card.card.footer.as_ref().unwrap().text, "Sent at");
        assert!(card.card.author.is_none());
    }

    #[test]
    fn content_precedes_jump_link() {
        let mut msg = message("42", "a", "2023-01-01T00:00:00Z");
        msg.content = "hello".to_owned();

        let description = build_card(&msg).card.description.unwrap();

        assert!(description.starts_with("hello\n[Jump]("));
    }

    #[test]
    fn image_attachment() {
        let msg = with_attachment(
            message("1", "a", "2023-01-01T00:00:00Z"),
            "image/png",
            "cat.png",
        );
        let card = build_card(&msg);

        assert!(!card.has_video);
        assert_eq!(card.card.image.as_ref().unwrap().url, msg.attachments[0].url);
        assert!(card.card.image.as_ref().unwrap().proxy_url.is_none());
        assert!(card.card.video.is_none());
    }

    #[test]
    fn video_attachment() {
        let msg = with_attachment(
            message("1", "a", "2023-01-01T00:00:00Z"),
            "video/mp4",
            "clip.mp4",
        );
        let card = build_card(&msg);

        assert!(card.has_video);
        assert_eq!(card.card.video.as_ref().unwrap().url, msg.attachments[0].url);
        assert!(card.card.image.is_none());
    }

    #[test]
    fn only_first_attachment_counts() {
        let msg = with_attachment(
            with_attachment(
                message("1", "a", "2023-01-01T00:00:00Z"),
                "image/png",
                "cat.png",
            ),
            "video/mp4",
            "clip.mp4",
        );
        let card = build_card(&msg);

        assert!(!card.has_video);
        assert!(card.card.image.is_some());
        assert!(card.card.video.is_none());
    }

    #[test]
    fn unknown_attachment() {
        let mut msg = with_attachment(
            message("1", "a", "2023-01-01T00:00:00Z"),
            "application/pdf",
            "notes.pdf",
        );
        msg.content = "read this".to_owned();

        let description = build_card(&msg).card.description.unwrap();

        assert!(description.starts_with(
            "read this\nUnknown attachment \
             [notes.pdf](https://cdn.discordapp.com/attachments/1/9/notes.pdf)\n[Jump]("
        ));
    }

    #[test]
    fn author_block_needs_avatar() {
        let mut msg = message("1", "alice", "2023-01-01T00:00:00Z");
        msg.author.avatar = Some("abc".to_owned());

        let author = build_card(&msg).card.author.unwrap();

        assert_eq!(author.name, "@alice");
        assert_eq!(
            author.icon_url.as_deref(),
            Some("https://cdn.discordapp.com/avatars/alice-id/abc.png")
        );
        assert!(author.url.is_none());
    }

    #[test]
    fn leaderboard_ranks_by_count() {
        let messages = vec![
            message("1", "b", "2023-01-01T00:00:00Z"),
            message("2", "a", "2023-01-02T00:00:00Z"),
            message("3", "a", "2023-01-03T00:00:00Z"),
            message("4", "a", "2023-01-04T00:00:00Z"),
        ];

        let lines = leaderboard_lines(&messages);

        assert_eq!(
            lines,
            [
                "`@\u{200B}a` - **3** pins".to_owned(),
                "`@\u{200B}b` - **1** pins".to_owned(),
            ]
        );

        let card = leaderboard(&messages);
        assert_eq!(card.title.as_deref(), Some("Leaderboard"));
        assert!(card
            .description
            .unwrap()
            .ends_with("\n\nFrom <#1137476424287125546>"));
    }

    #[test]
    fn leaderboard_counts_usernames_case_sensitively() {
        let messages = vec![
            message("1", "Alice", "2023-01-01T00:00:00Z"),
            message("2", "alice", "2023-01-02T00:00:00Z"),
        ];

        assert_eq!(leaderboard_lines(&messages).len(), 2);
    }

    #[test]
    fn first_pin_picks_oldest() {
        let messages = vec![
            message("late", "a", "2023-05-01T00:00:00Z"),
            message("early", "a", "2023-01-01T00:00:00Z"),
            message("only", "b", "2023-03-01T00:00:00Z"),
        ];

        let firsts = first_pins(&messages);

        assert_eq!(firsts.len(), 2);
        assert_eq!(firsts["a"].message.id, "early");
        assert_eq!(firsts["b"].message.id, "only");
    }

    #[test]
    fn strategies_pick_builders() {
        let messages = vec![message("1", "a", "2023-01-01T00:00:00Z")];

        assert!(matches!(
            CardStrategy::PerMessage.build(&messages),
            BuiltCards::Messages(cards) if cards.len() == 1
        ));
        assert!(matches!(
            CardStrategy::Leaderboard.build(&messages),
            BuiltCards::Leaderboard(_)
        ));
        assert!(matches!(
            CardStrategy::FirstPin.build(&messages),
            BuiltCards::FirstPin(firsts) if firsts.contains_key("a")
        ));
    }

    #[test]
    fn clip_list_numbers_videos() {
        let messages = vec![
            with_attachment(
                message("1", "a", "2023-01-01T00:00:00Z"),
                "video/mp4",
                "one.mp4",
            ),
            with_attachment(
                message("2", "a", "2023-01-02T00:00:00Z"),
                "video/webm",
                "two.webm",
            ),
        ];
        let cards = build_cards(&messages);
        let videos: Vec<&FlaggedCard> = cards.iter().collect();

        let list = clip_list(&videos);
        let lines: Vec<&str> = list.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[1],
            format!(
                "[Clip 2](https://cdn.discordapp.com/attachments/1/9/two.webm) - [Jump]({}) \
                 to <#1137476424287125546>",
                cards[1].source
            )
        );
    }
}
