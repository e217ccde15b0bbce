use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use chrono_tz::Tz;

use crate::error::BotError;
use crate::flow::session::Language;

pub const DEFAULT_LLM_API_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_CALCOM_API_URL: &str = "https://api.cal.com/v1";
pub const DEFAULT_DB_LOCATION: &str = "./data";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Raw `KEY=value` pairs read from a dotenv-style file.
#[derive(Debug, Default, Clone)]
pub struct AppConfig {
    values: HashMap<String, String>,
}

impl AppConfig {
    pub fn from_file(path: &str) -> Result<Self, BotError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    pub fn parse(content: &str) -> Result<Self, BotError> {
        let mut values = HashMap::new();
        for (idx, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
            let Some((key, value)) = trimmed.split_once('=') else {
                return Err(BotError::Config(format!(
                    "Invalid config line {}: {}",
                    idx + 1,
                    line
                )));
            };
            let key = key.trim();
            let mut value = value.trim().to_string();
            if value.len() >= 2
                && ((value.starts_with('"') && value.ends_with('"'))
                    || (value.starts_with('\'') && value.ends_with('\'')))
            {
                value = value[1..value.len() - 1].to_string();
            }
            values.insert(key.to_string(), value);
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.values.get(key).cloned()
    }

    /// File value first, then the process environment.
    pub fn lookup(&self, key: &str) -> Option<String> {
        self.get(key)
            .or_else(|| env::var(key).ok())
            .filter(|value| !value.trim().is_empty())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunMode {
    Api,
    Cli,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub run_mode: RunMode,
    pub discord_token: Option<String>,
    pub openai_api_key: String,
    pub llm_api_url: String,
    pub llm_model: String,
    pub calcom_api_key: Option<String>,
    pub calcom_api_url: String,
    pub admin_user_id: Option<String>,
    pub db_location: PathBuf,
    pub http_timeout: Duration,
    pub timezone: Tz,
    pub default_language: Language,
    pub digest_hour: Option<u32>,
}

impl Settings {
    /// Builds settings from any key lookup; `main` passes [`AppConfig::lookup`].
    pub fn from_lookup<F>(get: F) -> Result<Self, BotError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let run_mode = match get("RUN_MODE").as_deref() {
            None | Some("cli") => RunMode::Cli,
            Some("api") => RunMode::Api,
            Some(other) => {
                return Err(BotError::Config(format!("Invalid run mode {}", other)));
            }
        };

        let discord_token = get("DISCORD_CLIENT_SECRET");
        if run_mode == RunMode::Api && discord_token.is_none() {
            return Err(BotError::Config(
                "DISCORD_CLIENT_SECRET must be set for api mode".to_string(),
            ));
        }

        let openai_api_key = get("OPENAI_API_KEY").ok_or_else(|| {
            BotError::Config("OPENAI_API_KEY environment variable not set".to_string())
        })?;

        let http_timeout_secs = match get("HTTP_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                BotError::Config(format!("HTTP_TIMEOUT_SECS must be a number, got {}", raw))
            })?,
            None => DEFAULT_HTTP_TIMEOUT_SECS,
        };

        let timezone = match get("TIMEZONE") {
            Some(raw) => raw
                .trim()
                .parse::<Tz>()
                .map_err(|_| BotError::Config(format!("Unknown TIMEZONE {}", raw)))?,
            None => Tz::UTC,
        };

        let default_language = match get("DEFAULT_LANGUAGE") {
            Some(raw) => Language::from_code(raw.trim())
                .ok_or_else(|| BotError::Config(format!("Unsupported DEFAULT_LANGUAGE {}", raw)))?,
            None => Language::En,
        };

        let digest_hour = match get("DIGEST_HOUR") {
            Some(raw) => {
                let hour = raw.trim().parse::<u32>().ok().filter(|h| *h < 24).ok_or_else(|| {
                    BotError::Config(format!("DIGEST_HOUR must be 0-23, got {}", raw))
                })?;
                Some(hour)
            }
            None => None,
        };

        Ok(Self {
            run_mode,
            discord_token,
            openai_api_key,
            llm_api_url: get("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_API_URL.to_string()),
            llm_model: get("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            calcom_api_key: get("CALCOM_API_KEY"),
            calcom_api_url: get("CALCOM_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_CALCOM_API_URL.to_string()),
            admin_user_id: get("ADMIN_USER_ID"),
            db_location: PathBuf::from(
                get("DB_LOCATION").unwrap_or_else(|| DEFAULT_DB_LOCATION.to_string()),
            ),
            http_timeout: Duration::from_secs(http_timeout_secs),
            timezone,
            default_language,
            digest_hour,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn parses_dotenv_lines() {
        let config = AppConfig::parse(
            "# comment\nexport OPENAI_API_KEY=\"abc\"\nCALCOM_API_URL='https://cal.example/v1'\n\nRUN_MODE=api\n",
        )
        .unwrap();
        assert_eq!(config.get("OPENAI_API_KEY").as_deref(), Some("abc"));
        assert_eq!(config.get("CALCOM_API_URL").as_deref(), Some("https://cal.example/v1"));
        assert_eq!(config.get("RUN_MODE").as_deref(), Some("api"));
    }

    #[test]
    fn rejects_line_without_equals() {
        let err = AppConfig::parse("JUSTAKEY").unwrap_err();
        assert!(err.to_string().contains("Invalid config line 1"));
    }

    #[test]
    fn settings_apply_defaults() {
        let settings = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "k")])).unwrap();
        assert_eq!(settings.run_mode, RunMode::Cli);
        assert_eq!(settings.llm_model, DEFAULT_LLM_MODEL);
        assert_eq!(settings.calcom_api_url, DEFAULT_CALCOM_API_URL);
        assert_eq!(settings.http_timeout, Duration::from_secs(10));
        assert_eq!(settings.timezone, Tz::UTC);
        assert_eq!(settings.default_language, Language::En);
        assert!(settings.digest_hour.is_none());
        assert!(settings.admin_user_id.is_none());
    }

    #[test]
    fn api_mode_requires_discord_token() {
        let err = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "k"),
            ("RUN_MODE", "api"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains("DISCORD_CLIENT_SECRET"));
    }

    #[test]
    fn rejects_bad_timezone_and_digest_hour() {
        assert!(
            Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "k"), ("TIMEZONE", "Mars/Base")]))
                .is_err()
        );
        assert!(
            Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "k"), ("DIGEST_HOUR", "24")]))
                .is_err()
        );
    }

    #[test]
    fn parses_timezone_and_language() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "k"),
            ("TIMEZONE", "America/New_York"),
            ("DEFAULT_LANGUAGE", "fa"),
            ("DIGEST_HOUR", "7"),
        ]))
        .unwrap();
        assert_eq!(settings.timezone, chrono_tz::America::New_York);
        assert_eq!(settings.default_language, Language::Fa);
        assert_eq!(settings.digest_hour, Some(7));
    }
}
