use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{str::FromStr, time::Duration};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    // Discord
    pub discord_token: String,
    pub guild_id: Option<u64>, // Para comandos de desarrollo
    pub support_url: Option<String>,

    // Audio
    pub default_volume: u8,
    pub max_queue_size: usize,

    // yt-dlp
    pub ytdlp_path: String,
    pub search_timeout_secs: u64,
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Construye la configuración desde cualquier fuente clave → valor.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();
        let get = |key: &str| get(key).filter(|value| !value.trim().is_empty());

        let config = Self {
            // Discord
            discord_token: get("DISCORD_TOKEN").context("DISCORD_TOKEN no configurado")?,
            guild_id: get("GUILD_ID").and_then(|s| s.trim().parse().ok()),
            support_url: get("SUPPORT_URL"),

            // Audio
            default_volume: parse_or(get("DEFAULT_VOLUME"), "DEFAULT_VOLUME", defaults.default_volume)?,
            max_queue_size: parse_or(get("MAX_QUEUE_SIZE"), "MAX_QUEUE_SIZE", defaults.max_queue_size)?,

            // yt-dlp
            ytdlp_path: get("YTDLP_PATH").unwrap_or(defaults.ytdlp_path),
            search_timeout_secs: parse_or(
                get("SEARCH_TIMEOUT_SECS"),
                "SEARCH_TIMEOUT_SECS",
                defaults.search_timeout_secs,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Validates configuration values for correctness.
    ///
    /// - Volume must be between 0 and 100
    /// - Queue capacity and search timeout must be greater than 0
    pub fn validate(&self) -> Result<()> {
        if self.discord_token.trim().is_empty() {
            anyhow::bail!("Discord token must not be empty");
        }

        if self.default_volume > 100 {
            anyhow::bail!("Default volume must be between 0 and 100, got: {}", self.default_volume);
        }

        if self.max_queue_size == 0 {
            anyhow::bail!("Max queue size must be greater than 0");
        }

        if self.search_timeout_secs == 0 {
            anyhow::bail!("Search timeout must be greater than 0");
        }

        Ok(())
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_secs(self.search_timeout_secs)
    }

    /// Returns a summary of the current configuration for logging, without
    /// the token.
    pub fn summary(&self) -> String {
        format!(
            "Config Summary:\n  \
            Discord: commands {}\n  \
            Audio: {}% vol, {} max queue\n  \
            Search: {} ({}s timeout)",
            self.guild_id
                .map_or("global".to_string(), |id| format!("in guild {}", id)),
            self.default_volume,
            self.max_queue_size,
            self.ytdlp_path,
            self.search_timeout_secs,
        )
    }
}

fn parse_or<T>(value: Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match value {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{} inválido: {}", key, raw)),
        None => Ok(default),
    }
}

/// Default configuration values.
///
/// Used as fallbacks when environment variables are not provided.
impl Default for Config {
    fn default() -> Self {
        Self {
            // Discord (no defaults - must be provided)
            discord_token: String::new(),
            guild_id: None,
            support_url: None,

            default_volume: 50,
            max_queue_size: 1000,

            ytdlp_path: "yt-dlp".to_string(),
            search_timeout_secs: 30,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[("DISCORD_TOKEN", "token")]).unwrap();
        assert_eq!(config.default_volume, 50);
        assert_eq!(config.max_queue_size, 1000);
        assert_eq!(config.search_timeout(), Duration::from_secs(30));
        assert_eq!(config.ytdlp_path, "yt-dlp");
        assert_eq!(config.guild_id, None);
    }

    #[test]
    fn token_is_required() {
        assert!(load(&[]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "  ")]).is_err());
    }

    #[test]
    fn rejects_out_of_range_values() {
        assert!(load(&[("DISCORD_TOKEN", "t"), ("DEFAULT_VOLUME", "150")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("DEFAULT_VOLUME", "loud")]).is_err());
        assert!(load(&[("DISCORD_TOKEN", "t"), ("MAX_QUEUE_SIZE", "0")]).is_err());
    }

    #[test]
    fn summary_hides_token() {
        let config = load(&[("DISCORD_TOKEN", "secret-token"), ("GUILD_ID", "42")]).unwrap();
        let summary = config.summary();
        assert!(!summary.contains("secret-token"));
        assert!(summary.contains("in guild 42"));
    }
}
