use std::{env, fs::File, io, io::Read, path::Path, time::Duration};

/// Channels fetched when none are given.
pub const DEFAULT_CHANNELS: &[&str] = &[
    "960951177212743680",  // #general-archived-1
    "1005593218466983957", // #general-archived-2
    "1077689138679119872", // #general-archived-3
    "1119380195758047252", // #general-archived-4
    "1137476424287125546", // #general
];

/// Guild every configured channel belongs to. Used for message permalinks.
pub const GUILD_ID: &str = "856662493778018335";

pub const API_URL: &str = "https://discord.com/api/v9";
pub const CDN_URL: &str = "https://cdn.discordapp.com";
pub const CHANNELS_URL: &str = "https://discord.com/channels";

/// Zero-width space, keeps `@name` from rendering as a mention.
pub const ZWS: &str = "\u{200B}";

/// Maximum number of embeds in one webhook message.
pub const BATCH_SIZE: usize = 10;

/// Added on top of every `retry_after` the API hands out.
pub const RETRY_JITTER: Duration = Duration::from_millis(500);

/// Prefix of environment variables read by the CLI.
pub const ENV_PREFIX: &str = "PIN_";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read env file: {0}")]
    Io(#[from] io::Error),
    #[error("failed to parse env file: {0}")]
    Parse(#[from] dotenvy::Error),
}

/// Reads `key=value` pairs and maps every key onto its `PIN_*` variable name.
///
/// Keys are case-insensitive, may already carry the prefix and may spell
/// flags with dashes, so `dry-run`, `DRY_RUN` and `pin_dry_run` all become
/// `PIN_DRY_RUN`.
pub fn parse_env_file<R: Read>(mut reader: R) -> Result<Vec<(String, String)>, ConfigError> {
    let mut contents = String::new();
    reader.read_to_string(&mut contents)?;

    dotenvy::from_read_iter(undash_keys(&contents).as_bytes())
        .map(|item| -> Result<_, ConfigError> {
            let (key, value) = item?;
            Ok((env_key(&key), value))
        })
        .collect()
}

/// dotenv keys can't hold dashes, flag names do.
fn undash_keys(contents: &str) -> String {
    contents
        .lines()
        .map(|line| match line.split_once('=') {
            Some((key, value)) if !line.trim_start().starts_with('#') => {
                format!("{}={}", key.trim().replace('-', "_"), value.trim_start())
            }
            _ => line.to_owned(),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn env_key(key: &str) -> String {
    let key = key.trim().to_uppercase();

    if key.starts_with(ENV_PREFIX) {
        key
    } else {
        format!("{ENV_PREFIX}{key}")
    }
}

/// Exports the env file into the process environment without overriding
/// variables that are already set. Returns the number of variables set.
pub fn load_env_file(path: &Path) -> Result<usize, ConfigError> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    let mut loaded = 0;
    for (key, value) in parse_env_file(file)? {
        if env::var_os(&key).is_none() {
            env::set_var(key, value);
            loaded += 1;
        }
    }

    Ok(loaded)
}
