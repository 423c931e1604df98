use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use crate::args::{flag_value, parse_season_range};
use crate::session::Credentials;

pub const DEFAULT_BASE_URL: &str = "https://www.ewrc-results.com";
const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_FIRST_SEASON: i32 = 2000;
const DEFAULT_LAST_SEASON: i32 = 2024;
const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/15.1 Safari/605.1.15";

#[derive(Debug, Clone)]
pub struct HttpConfig {
    pub base_url: String,
    pub timeout: Duration,
    /// Pause between consecutive requests on one session.
    pub request_delay: Duration,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            request_delay: Duration::from_millis(250),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub credentials: Option<Credentials>,
    pub data_dir: PathBuf,
    pub seasons: RangeInclusive<i32>,
    pub max_legs: u32,
}

impl AppConfig {
    /// Read settings from the environment (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let base_url = env_string("EWRC_BASE_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let timeout_secs = env_parse::<u64>("REQUEST_TIMEOUT_SECS").unwrap_or(30).max(5);
        let delay_ms = env_parse::<u64>("REQUEST_DELAY_MS").unwrap_or(250);
        let user_agent = env_string("EWRC_USER_AGENT").unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

        let credentials = match (env_string("EWRC_USERNAME"), env_string("EWRC_PASSWORD")) {
            (Some(username), Some(password)) => Some(Credentials { username, password }),
            _ => None,
        };

        let first = env_parse::<i32>("RALLY_FIRST_SEASON").unwrap_or(DEFAULT_FIRST_SEASON);
        let last = env_parse::<i32>("RALLY_LAST_SEASON").unwrap_or(DEFAULT_LAST_SEASON);

        Self {
            http: HttpConfig {
                base_url,
                timeout: Duration::from_secs(timeout_secs),
                request_delay: Duration::from_millis(delay_ms),
                user_agent,
            },
            credentials,
            data_dir: env_string("RALLY_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR)),
            seasons: first.min(last)..=first.max(last),
            max_legs: env_parse::<u32>("RALLY_MAX_LEGS").unwrap_or(16).max(1),
        }
    }

    /// Command-line overrides: `--data-dir`, `--seasons`, `--max-legs`.
    pub fn apply_args(&mut self, args: &[String]) {
        if let Some(dir) = flag_value(args, "--data-dir") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(seasons) = flag_value(args, "--seasons").and_then(|raw| parse_season_range(&raw)) {
            self.seasons = seasons;
        }
        if let Some(max_legs) = flag_value(args, "--max-legs").and_then(|raw| raw.parse::<u32>().ok()) {
            self.max_legs = max_legs.max(1);
        }
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|val| val.trim().to_string())
        .filter(|val| !val.is_empty())
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env_string(key).and_then(|val| val.parse::<T>().ok())
}
