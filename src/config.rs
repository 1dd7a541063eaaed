use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct Config {
    pub username: Option<String>,
    pub token: Option<String>,
}

/// A bearer token saved by whatever tool performed the OAuth exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    pub expires_at: DateTime<Utc>,
}

impl StoredToken {
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

impl Config {
    pub fn load() -> Self {
        Config {
            username: std::env::var("GARMIN_USERNAME").ok(),
            token: std::env::var("GARMIN_TOKEN").ok(),
        }
    }

    pub fn data_dir() -> Result<PathBuf> {
        let dir = dirs::data_dir()
            .context("Failed to get data directory")?
            .join("garmin-sleep");

        fs::create_dir_all(&dir)?;
        Ok(dir)
    }

    pub fn save_token(&self, token: &StoredToken) -> Result<()> {
        let path = Self::data_dir()?.join("token.json");
        let json = serde_json::to_string_pretty(token)?;
        fs::write(path, json)?;
        Ok(())
    }

    pub fn load_token(&self) -> Result<StoredToken> {
        let path = Self::data_dir()?.join("token.json");
        let json = fs::read_to_string(path)?;
        let token: StoredToken = serde_json::from_str(&json)?;
        Ok(token)
    }

    /// The bearer token to use: environment first, then the saved token file.
    pub fn bearer_token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }

        let stored = self
            .load_token()
            .context("Not authenticated. Set GARMIN_TOKEN or save a token file")?;
        if stored.is_expired() {
            anyhow::bail!("Saved token has expired; refresh it and try again");
        }
        Ok(stored.access_token)
    }
}
