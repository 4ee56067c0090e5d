use std::{env, fmt::Display, str::FromStr};

use tracing::info;

pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub max_connections: u32,
}

impl Config {
    /// Reads the configuration from the environment. Call after `dotenvy`
    /// has loaded `.env`.
    pub fn load() -> Self {
        Self {
            database_url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
            port: try_load("PORT", "3030"),
            max_connections: try_load("DATABASE_MAX_CONNECTIONS", "5"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}"))
}
