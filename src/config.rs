use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use tracing::info;

#[derive(Clone)]
pub struct Config {
    pub app_key: String,
    pub app_secret: String,
    /// Root of the cached profiles, timelines and mentions
    pub data_dir: PathBuf,
    pub token_path: PathBuf,
}

impl Config {
    /// Credentials come from the environment (a `.env` file counts, once loaded).
    pub fn from_env(data_dir: PathBuf, token_path: PathBuf) -> Result<Self> {
        let app_key = env::var("TWITTER_APP_KEY").context("TWITTER_APP_KEY is not set")?;
        let app_secret =
            env::var("TWITTER_APP_SECRET").context("TWITTER_APP_SECRET is not set")?;
        Ok(Self {
            app_key,
            app_secret,
            data_dir,
            token_path,
        })
    }

    pub fn log_redacted(&self) {
        info!(
            app_key = %redact(&self.app_key),
            data_dir = %self.data_dir.display(),
            token_path = %self.token_path.display(),
            "Loaded config"
        );
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("app_key", &redact(&self.app_key))
            .field("app_secret", &"***")
            .field("data_dir", &self.data_dir)
            .field("token_path", &self.token_path)
            .finish()
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}***")
}
