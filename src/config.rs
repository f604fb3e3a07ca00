use std::path::PathBuf;

use serde::Deserialize;

use crate::modules::tracking::games::GameBounds;
use crate::types::Error;

pub(crate) const RATE_LIMIT: u32 = 40;

const DEFAULT_TIERS: &str = "1,2,3,10,20,50,100,200,300,400,500,1000,2000,3000,4000,5000,10000";

#[derive(Deserialize, Debug)]
pub(crate) struct BotConfig {
    pub(crate) token: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct DatabaseConfig {
    #[serde(default)]
    pub(crate) url: String,
}

#[derive(Deserialize, Debug)]
pub(crate) struct ApiConfig {
    pub(crate) base_url: String,
    pub(crate) accounts: String,
    #[serde(default = "default_poll_interval_ms")]
    pub(crate) poll_interval_ms: u64,
    #[serde(default = "default_rate_limit")]
    pub(crate) rate_limit: u32,
}

impl ApiConfig {
    pub(crate) fn account_tokens(&self) -> Vec<String> {
        split_list(&self.accounts)
    }
}

#[derive(Deserialize, Debug, Clone)]
pub(crate) struct TrackingConfig {
    #[serde(default = "default_tiers")]
    pub(crate) tiers: String,
    #[serde(default = "default_min_game_gain")]
    pub(crate) min_game_gain: i64,
    #[serde(default = "default_max_game_gain")]
    pub(crate) max_game_gain: i64,
    #[serde(default = "default_poll_seconds")]
    pub(crate) poll_seconds: u32,
}

impl TrackingConfig {
    pub(crate) fn tracked_tiers(&self) -> Result<Vec<u32>, Error> {
        split_list(&self.tiers)
            .into_iter()
            .map(|t| {
                t.parse::<u32>()
                    .map_err(|err| format!("invalid tier '{}' in TRACKING_TIERS: {}", t, err).into())
            })
            .collect()
    }

    pub(crate) fn game_bounds(&self) -> GameBounds {
        GameBounds {
            min_gain: self.min_game_gain,
            max_gain: self.max_game_gain,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
            min_game_gain: default_min_game_gain(),
            max_game_gain: default_max_game_gain(),
            poll_seconds: default_poll_seconds(),
        }
    }
}

fn default_poll_interval_ms() -> u64 {
    10
}

fn default_rate_limit() -> u32 {
    RATE_LIMIT
}

fn default_tiers() -> String {
    DEFAULT_TIERS.into()
}

fn default_min_game_gain() -> i64 {
    GameBounds::default().min_gain
}

fn default_max_game_gain() -> i64 {
    GameBounds::default().max_gain
}

fn default_poll_seconds() -> u32 {
    60
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

pub(crate) struct Config {
    pub(crate) bot: BotConfig,
    pub(crate) db: DatabaseConfig,
    pub(crate) api: ApiConfig,
    pub(crate) tracking: TrackingConfig,
}

pub(crate) fn load_config() -> Result<Config, Error> {
    let envfile = PathBuf::from(".env");

    let bot: BotConfig = serde_envfile::prefixed("TIERWATCH_").from_file(&envfile)?;
    let db: DatabaseConfig = serde_envfile::prefixed("DATABASE_").from_file(&envfile)?;
    let api: ApiConfig = serde_envfile::prefixed("API_").from_file(&envfile)?;
    let tracking: TrackingConfig = serde_envfile::prefixed("TRACKING_").from_file(&envfile)?;

    if api.account_tokens().is_empty() {
        return Err("API_ACCOUNTS must list at least one account".into());
    }

    Ok(Config {
        bot,
        db,
        api,
        tracking,
    })
}
