//! Configuration model loaded from external sources.

use config::Config;
use serde::Deserialize;
use thiserror::Error;
use validator::Validate;

fn default_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    concat!("travel-portal-admin/", env!("CARGO_PKG_VERSION")).to_string()
}

#[derive(Clone, Debug, Deserialize, Validate)]
/// Settings for talking to the external content API.
pub struct ClientConfig {
    /// Base URL of the REST API, e.g. `https://api.example.com/api`.
    #[validate(url)]
    pub api_base_url: String,
    #[serde(default = "default_timeout_secs")]
    #[validate(range(min = 1, max = 600))]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    #[validate(length(min = 1))]
    pub user_agent: String,
}

#[derive(Debug, Error)]
pub enum ConfigLoadError {
    #[error("error loading settings: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("invalid settings: {0}")]
    Validation(#[from] validator::ValidationErrors),
}

impl ClientConfig {
    /// Loads `config/default`, then `config/{app_env}`, then `APP_*` variables.
    pub fn load(app_env: &str) -> Result<Self, ConfigLoadError> {
        let settings = Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{app_env}")).required(false))
            .add_source(config::Environment::with_prefix("APP"))
            .build()?;

        let client_config = settings.try_deserialize::<ClientConfig>()?;
        client_config.validate()?;
        Ok(client_config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str, timeout_secs: u64) -> ClientConfig {
        ClientConfig {
            api_base_url: url.to_string(),
            timeout_secs,
            user_agent: default_user_agent(),
        }
    }

    #[test]
    fn accepts_valid_settings() {
        assert!(config("https://cms.example.com/api", 30).validate().is_ok());
    }

    #[test]
    fn rejects_invalid_url_and_timeout() {
        let errors = config("not a url", 0).validate().unwrap_err();
        let fields = errors.field_errors();

        assert!(fields.contains_key("api_base_url"));
        assert!(fields.contains_key("timeout_secs"));
    }
}
