//! # yt-config
//!
//! Runtime settings: built-in defaults overridden by `YATUBE_*` environment
//! variables (the binary loads `.env` first).

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

pub const ENV_PREFIX: &str = "YATUBE";
pub const MIN_SECRET_CHARS: usize = 32;
/// Ten years; anything longer overflows session expiry arithmetic long
/// before it is useful.
pub const MAX_SESSION_TTL_HOURS: i64 = 87_600;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid setting `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub bind_addr: String,
    pub database_url: String,
    /// Page size of every post listing
    pub posts_per_page: i64,
    /// Magnitude added or subtracted by each accepted vote
    pub rating_delta: i64,
    pub index_cache_ttl_secs: u64,
    /// HMAC key for session cookies; has no default on purpose
    pub session_secret: SecretString,
    pub session_ttl_hours: i64,
    /// Directory that uploaded pictures are written to and served from
    pub media_dir: String,
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .try_parsing(true)
}

impl Settings {
    /// The builder with every default registered and no sources attached.
    pub fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Ok(Config::builder()
            .set_default("bind_addr", "127.0.0.1:8080")?
            .set_default("database_url", "sqlite:yatube.db")?
            .set_default("posts_per_page", 10_i64)?
            .set_default("rating_delta", 1_i64)?
            .set_default("index_cache_ttl_secs", 20_i64)?
            .set_default("session_ttl_hours", 336_i64)?
            .set_default("media_dir", "media")?)
    }

    /// Defaults overridden by the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(Self::defaults()?.add_source(environment()))
    }

    /// Just the database location, for tools that never issue sessions and
    /// so run without a `session_secret`.
    pub fn database_url() -> Result<String, ConfigError> {
        Self::database_url_from(Self::defaults()?.add_source(environment()))
    }

    pub fn database_url_from(builder: ConfigBuilder<DefaultState>) -> Result<String, ConfigError> {
        Ok(builder.build()?.get_string("database_url")?)
    }

    pub fn from_builder(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        log::debug!("loaded settings: {settings:?}");
        Ok(settings)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.posts_per_page < 1 {
            return Err(ConfigError::Invalid {
                key: "posts_per_page",
                reason: "must be at least 1".into(),
            });
        }
        if self.rating_delta <= 0 {
            return Err(ConfigError::Invalid {
                key: "rating_delta",
                reason: "must be a positive integer".into(),
            });
        }
        if !(1..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(ConfigError::Invalid {
                key: "session_ttl_hours",
                reason: format!("must be between 1 and {MAX_SESSION_TTL_HOURS}"),
            });
        }
        if self.session_secret.expose_secret().chars().count() < MIN_SECRET_CHARS {
            return Err(ConfigError::Invalid {
                key: "session_secret",
                reason: format!("must be at least {MIN_SECRET_CHARS} characters"),
            });
        }
        Ok(())
    }
}
