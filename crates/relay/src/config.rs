use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::convert::ConverterConfig;
use crate::notify::telephone::{HttpClientConfig, TelephoneConfig, DEFAULT_COUNTRY_CODE};
use crate::{Error, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub converter: ConverterConfig,
    /// The telephone channel is disabled when absent.
    #[serde(default)]
    pub telephone: Option<TelephoneConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_addr")]
    pub addr: String,
}

fn default_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_addr(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from a variable lookup. Unset variables fall
    /// back to defaults; the telephone section needs `TELEPHONE_BASE_URL`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).unwrap_or_default();

        let converter = match lookup("CONVERTER_REQUIRED_LABELS") {
            Some(labels) => ConverterConfig {
                required_labels: split_list(&labels),
            },
            None => ConverterConfig::default(),
        };

        let telephone = match lookup("TELEPHONE_BASE_URL") {
            Some(base_url) => {
                let mut http = HttpClientConfig::default();
                if let Some(timeout) = lookup("TELEPHONE_HTTP_TIMEOUT_SECS") {
                    http.timeout_secs = timeout.trim().parse().map_err(|e| {
                        Error::Config(format!(
                            "TELEPHONE_HTTP_TIMEOUT_SECS must be a number of seconds: {}",
                            e
                        ))
                    })?;
                }
                if let Some(insecure) = lookup("TELEPHONE_HTTP_INSECURE") {
                    http.insecure_skip_verify = parse_bool("TELEPHONE_HTTP_INSECURE", &insecure)?;
                }

                let config = TelephoneConfig {
                    app_key: var("TELEPHONE_APP_KEY"),
                    app_secret: var("TELEPHONE_APP_SECRET"),
                    username: var("TELEPHONE_USERNAME"),
                    authorization: var("TELEPHONE_AUTHORIZATION"),
                    base_url,
                    display_number: var("TELEPHONE_DISPLAY_NUMBER"),
                    template_id: var("TELEPHONE_TEMPLATE_ID"),
                    operators: split_list(&var("TELEPHONE_OPERATORS")),
                    country_code: lookup("TELEPHONE_COUNTRY_CODE")
                        .unwrap_or_else(|| DEFAULT_COUNTRY_CODE.to_string()),
                    http,
                };

                if config.operators.is_empty() {
                    tracing::warn!("TELEPHONE_OPERATORS is empty. Voice notifications will not call anyone.");
                }
                Some(config)
            }
            None => None,
        };

        Ok(Config {
            server: ServerConfig {
                addr: lookup("SERVER_ADDR").unwrap_or_else(default_addr),
            },
            converter,
            telephone,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        tracing::info!(path = %path.display(), "Loading config from file");
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            converter: ConverterConfig::default(),
            telephone: None,
        }
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" | "" => Ok(false),
        other => Err(Error::Config(format!("{} must be a boolean, got {:?}", key, other))),
    }
}
