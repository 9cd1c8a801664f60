use std::{env, fmt::Display, path::PathBuf, str::FromStr};
use tracing::{info, warn};

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_DATA_PATH: &str = "data/state.json";
const DEFAULT_SAVE_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub data_path: PathBuf,
    /// How many times a tracker write is retried after a conflict.
    pub save_attempts: u32,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            port: try_load("PORT", DEFAULT_PORT),
            data_path: resolve_data_path(),
            save_attempts: try_load("TRACKER_SAVE_ATTEMPTS", DEFAULT_SAVE_ATTEMPTS).max(1),
        }
    }
}

pub fn resolve_data_path() -> PathBuf {
    match env::var("APP_DATA_PATH") {
        Ok(path) => PathBuf::from(path),
        Err(_) => PathBuf::from(DEFAULT_DATA_PATH),
    }
}

fn try_load<T>(key: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    let Ok(raw) = env::var(key) else {
        info!("{key} not set, using default: {default}");
        return default;
    };

    raw.trim().parse().unwrap_or_else(|err| {
        warn!("invalid {key} value {raw:?}: {err}, using default: {default}");
        default
    })
}
