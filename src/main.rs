use std::{path::PathBuf, process::ExitCode};

use clap::{CommandFactory, Parser};
use embed::CardStrategy;
use publish::{PinFilter, Publisher};
use sources::discord::DiscordClient;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;
use webhook::WebhookClient;

use crate::config::DEFAULT_CHANNELS;

mod config;
mod embed;
mod publish;
mod sources;
#[cfg(test)]
mod test_server;
mod webhook;

/// Collate and publish Discord pins.
#[derive(Parser, Debug)]
#[command(name = "pins", version, about)]
struct Args {
    /// Print webhook bodies instead of sending them.
    #[arg(long, env = "PIN_DRY_RUN")]
    dry_run: bool,

    /// Webhook the cards are posted to.
    #[arg(long, env = "PIN_WEBHOOK", required_unless_present = "dry_run")]
    webhook: Option<String>,

    /// Token sent as the `authorization` header.
    #[arg(long, env = "PIN_TOKEN", hide_env_values = true)]
    token: String,

    /// Channels to read pins from.
    #[arg(
        long,
        env = "PIN_CHANNELS",
        value_delimiter = ',',
        num_args = 1..,
        default_values_t = DEFAULT_CHANNELS.iter().map(|c| c.to_string()).collect::<Vec<_>>()
    )]
    channels: Vec<String>,

    /// Only publish pins by this user id.
    #[arg(long, env = "PIN_USER")]
    user: Option<String>,

    /// Post how many pins the user has instead of the pins themselves.
    #[arg(long, env = "PIN_USER_COUNT", requires = "user")]
    user_count: bool,

    /// Publish at most this many cards.
    #[arg(long, env = "PIN_LIMIT")]
    limit: Option<usize>,

    /// Post a leaderboard of pin counts across all channels.
    #[arg(long, env = "PIN_LEADERBOARD", conflicts_with_all = ["user", "user_count"])]
    leaderboard: bool,

    /// Post every user's first pin across all channels.
    #[arg(long, env = "PIN_FIRST_PIN", conflicts_with_all = ["leaderboard", "user_count"])]
    first_pin: bool,

    /// Give up on a channel after this many rate limits. Unbounded if unset.
    #[arg(long, env = "PIN_MAX_RETRIES")]
    max_retries: Option<u32>,

    /// Path to a `key=value` file with defaults for the flags above.
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,
}

/// Reads `--env-file` ahead of the real parse, which needs the file loaded.
fn env_file_path() -> PathBuf {
    Args::command()
        .ignore_errors(true)
        .get_matches()
        .get_one::<PathBuf>("env_file")
        .cloned()
        .unwrap_or_else(|| PathBuf::from(".env"))
}

/// clap counts `PIN_DRY_RUN=false` as the flag being present, so
/// `required_unless_present` alone lets a run without a webhook through.
fn publisher_for(dry_run: bool, webhook: Option<String>) -> Option<Publisher> {
    match (dry_run, webhook) {
        (true, _) => Some(Publisher::DryRun),
        (false, Some(url)) => Some(Publisher::Webhook(WebhookClient::new(url))),
        (false, None) => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let loaded = {
        let path = env_file_path();
        match config::load_env_file(&path) {
            Ok(n) => n,
            Err(e) => {
                error!("Failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        }
    };

    let Args {
        dry_run,
        webhook,
        token,
        channels,
        user,
        user_count,
        limit,
        leaderboard,
        first_pin,
        max_retries,
        env_file,
    } = Args::parse();

    if loaded > 0 {
        info!("Loaded {loaded} settings from {}", env_file.display());
    }

    let Some(publisher) = publisher_for(dry_run, webhook) else {
        error!("--webhook is required unless --dry-run is set");
        return ExitCode::FAILURE;
    };
    let discord = DiscordClient::new(token).max_retries(max_retries);
    let filter = PinFilter { user, limit };

    info!("Operating with {} channels: {channels:?}", channels.len());

    if leaderboard {
        publish::all_channels(&discord, &publisher, &channels, &filter, CardStrategy::Leaderboard)
            .await;
    } else if first_pin {
        publish::all_channels(&discord, &publisher, &channels, &filter, CardStrategy::FirstPin)
            .await;
    } else if user_count {
        let user = filter.user.as_deref().unwrap_or_default();
        publish::user_count(&discord, &publisher, &channels, user).await;
    } else {
        publish::each_channel(&discord, &publisher, &channels, &filter).await;
    }

    ExitCode::SUCCESS
}
