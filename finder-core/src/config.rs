use crate::{ConfigError, CoreError, ForumAllowList};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;

pub const CLIENT_SECRET_ENV: &str = "REDDIT_CLIENT_SECRET";
pub const REFRESH_TOKEN_ENV: &str = "REDDIT_REFRESH_TOKEN";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub reddit: RedditConfig,
    pub bot: BotConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedditConfig {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    pub user_agent: String,
    /// The bot's own account name, without `/u/`.
    pub username: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BotConfig {
    pub forums: Vec<String>,
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default = "default_flavor")]
    pub flavor: String,
    #[serde(default = "default_flavor_suffix")]
    pub flavor_suffix: String,
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_record_malformed")]
    pub record_malformed_requests: bool,
    /// Log retryable platform failures at debug. Off keeps routine outages out of the log.
    #[serde(default = "default_report_transient_errors")]
    pub report_transient_errors: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
    #[serde(default)]
    pub log_path: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            log_path: None,
        }
    }
}

fn default_flavor() -> String {
    "Chance of being a gunnut".to_string()
}

fn default_flavor_suffix() -> String {
    "%".to_string()
}

fn default_poll_interval_secs() -> u64 {
    120
}

fn default_history_limit() -> usize {
    1000
}

fn default_record_malformed() -> bool {
    true
}

fn default_report_transient_errors() -> bool {
    true
}

fn default_database_path() -> PathBuf {
    PathBuf::from("database.db")
}

impl AppConfig {
    /// Reads the TOML file at `path`, applies environment overrides and validates.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }

        let raw = std::fs::read_to_string(path)?;
        let mut config = Self::from_toml_str(&raw)?;
        config.apply_env_overrides(|name| std::env::var(name).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let mut config: AppConfig = toml::from_str(raw)?;
        config.bot.forums = config
            .bot
            .forums
            .iter()
            .map(|f| f.trim().to_lowercase())
            .filter(|f| !f.is_empty())
            .collect();
        config.bot.operator = config
            .bot
            .operator
            .take()
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty());
        Ok(config)
    }

    /// Secrets from the environment win over the file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(secret) = lookup(CLIENT_SECRET_ENV).filter(|s| !s.is_empty()) {
            debug!("Using client secret from {}", CLIENT_SECRET_ENV);
            self.reddit.client_secret = secret;
        }
        if let Some(token) = lookup(REFRESH_TOKEN_ENV).filter(|s| !s.is_empty()) {
            debug!("Using refresh token from {}", REFRESH_TOKEN_ENV);
            self.reddit.refresh_token = token;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let required = [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.refresh_token", &self.reddit.refresh_token),
            ("reddit.user_agent", &self.reddit.user_agent),
            ("reddit.username", &self.reddit.username),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.reddit.username.starts_with("/u/") || self.reddit.username.starts_with("u/") {
            return Err(ConfigError::InvalidValue {
                field: "reddit.username".to_string(),
                value: self.reddit.username.clone(),
            });
        }

        if self.bot.forums.is_empty() {
            return Err(ConfigError::ValidationFailed {
                reason: "bot.forums must list at least one forum".to_string(),
            });
        }

        if self.bot.poll_interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bot.poll_interval_secs".to_string(),
                value: "0".to_string(),
            });
        }

        if self.bot.history_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "bot.history_limit".to_string(),
                value: "0".to_string(),
            });
        }

        Ok(())
    }

    pub fn allow_list(&self) -> ForumAllowList {
        ForumAllowList::new(&self.bot.forums)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.bot.poll_interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
        [reddit]
        client_id = "abc"
        client_secret = "file-secret"
        user_agent = "linux:gunnut-finder:0.1 (by /u/someone)"
        username = "gunnutfinder"

        [bot]
        forums = ["Guns", " progun ", ""]
        operator = "  "
    "#;

    #[test]
    fn test_defaults_and_normalization() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        assert_eq!(config.bot.forums, vec!["guns", "progun"]);
        assert_eq!(config.bot.operator, None);
        assert_eq!(config.bot.flavor, "Chance of being a gunnut");
        assert_eq!(config.bot.flavor_suffix, "%");
        assert_eq!(config.poll_interval(), Duration::from_secs(120));
        assert_eq!(config.bot.history_limit, 1000);
        assert!(config.bot.record_malformed_requests);
        assert!(config.bot.report_transient_errors);
        assert_eq!(config.storage.database_path, PathBuf::from("database.db"));
        assert!(config.allow_list().contains("guns"));
    }

    #[test]
    fn test_missing_refresh_token_fails_validation() {
        let config = AppConfig::from_toml_str(SAMPLE).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::MissingField { ref field } if field == "reddit.refresh_token"
        ));
    }

    #[test]
    fn test_env_overrides_secrets() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.apply_env_overrides(|name| match name {
            REFRESH_TOKEN_ENV => Some("env-token".to_string()),
            CLIENT_SECRET_ENV => Some(String::new()),
            _ => None,
        });
        assert_eq!(config.reddit.refresh_token, "env-token");
        assert_eq!(config.reddit.client_secret, "file-secret");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_prefixed_bot_name_is_rejected() {
        let mut config = AppConfig::from_toml_str(SAMPLE).unwrap();
        config.reddit.refresh_token = "token".to_string();
        config.reddit.username = "/u/gunnutfinder".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn test_load_reports_missing_file() {
        let path = std::env::temp_dir().join(format!("missing_{}.toml", uuid::Uuid::new_v4()));
        let err = AppConfig::load(&path).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Config(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_reads_and_validates_file() {
        let path = std::env::temp_dir().join(format!("config_{}.toml", uuid::Uuid::new_v4()));
        let raw = SAMPLE.replace(
            "username = \"gunnutfinder\"",
            "username = \"gunnutfinder\"\n        refresh_token = \"file-token\"",
        );
        std::fs::write(&path, raw).unwrap();

        let config = AppConfig::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.reddit.username, "gunnutfinder");
        assert_eq!(config.bot.forums, vec!["guns", "progun"]);
        assert!(!config.reddit.refresh_token.is_empty());
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let err = AppConfig::from_toml_str("[reddit\nclient_id =").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
