use std::env;

use crate::config::watch_config::WatchConfig;
use crate::error::WatchError;

/// Credentials resolved at startup, before any request goes out.
#[derive(Debug, Clone)]
pub struct Secrets {
    pub runpod_api_key: String,
    pub pushover_app_token: Option<String>,
    pub pushover_user_key: Option<String>,
}

impl Secrets {
    /// Environment variables win; blank values fall back to the config file.
    pub fn resolve(config: &WatchConfig) -> Result<Self, WatchError> {
        let runpod_api_key = pick(env::var("RUNPOD_API_KEY").ok(), &config.runpod_api_key);
        let pushover_app_token =
            pick(env::var("PUSHOVER_APP_TOKEN").ok(), &config.pushover_app_token);
        let pushover_user_key = pick(env::var("PUSHOVER_USER_KEY").ok(), &config.pushover_user_key);

        let Some(runpod_api_key) = runpod_api_key else {
            return Err(WatchError::Configuration(
                "RUNPOD_API_KEY is not set and the config has no runpod_api_key fallback"
                    .to_string(),
            ));
        };

        Ok(Self {
            runpod_api_key,
            pushover_app_token,
            pushover_user_key,
        })
    }

    pub fn pushover_pair(&self) -> Option<(&str, &str)> {
        match (&self.pushover_app_token, &self.pushover_user_key) {
            (Some(token), Some(user)) => Some((token.as_str(), user.as_str())),
            _ => None,
        }
    }
}

fn pick(env_value: Option<String>, fallback: &str) -> Option<String> {
    let value = env_value
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    let value = value.trim();
    (!value.is_empty()).then(|| value.to_string())
}
