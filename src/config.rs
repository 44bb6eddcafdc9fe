use crate::constants::{
    DEFAULT_COMPANIES, DEFAULT_CONFIG_PATH, DEFAULT_SINK_TABLE, DEFAULT_TIMEOUT_SECONDS,
    GREENHOUSE_BASE_URL,
};
use crate::error::{ImporterError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub greenhouse: GreenhouseConfig,
    /// Board token -> company display name
    #[serde(default = "default_companies")]
    pub companies: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GreenhouseConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

/// A board token paired with the name stamped on its records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Company {
    pub token: String,
    pub display_name: String,
}

/// Destination credentials, read from the environment
#[derive(Debug, Clone)]
pub struct SinkConfig {
    pub url: String,
    pub key: String,
    pub table: String,
}

fn default_base_url() -> String {
    GREENHOUSE_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    DEFAULT_TIMEOUT_SECONDS
}

fn default_companies() -> BTreeMap<String, String> {
    DEFAULT_COMPANIES
        .iter()
        .map(|(token, name)| (token.to_string(), name.to_string()))
        .collect()
}

impl Default for GreenhouseConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            greenhouse: GreenhouseConfig::default(),
            companies: default_companies(),
        }
    }
}

impl Config {
    /// Loads the given file, or `config.toml` when none is named. Only the
    /// implicit default path may be absent, in which case built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if !default_path.exists() {
                    return Ok(Self::default());
                }
                default_path
            }
        };

        let config_content = fs::read_to_string(config_path).map_err(|e| {
            ImporterError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml_str(&config_content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.companies.is_empty() {
            return Err(ImporterError::Config("no companies configured".into()));
        }
        if let Some((token, _)) = self.companies.iter().find(|(_, name)| name.trim().is_empty()) {
            return Err(ImporterError::Config(format!(
                "company '{}' has an empty display name",
                token
            )));
        }
        Ok(())
    }

    /// Companies to import, optionally restricted to a comma-separated token list.
    pub fn select_companies(&self, filter: Option<&str>) -> Result<Vec<Company>> {
        let Some(filter) = filter else {
            return Ok(self
                .companies
                .iter()
                .map(|(token, name)| Company {
                    token: token.clone(),
                    display_name: name.clone(),
                })
                .collect());
        };

        filter
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                self.companies
                    .get(token)
                    .map(|name| Company {
                        token: token.to_string(),
                        display_name: name.clone(),
                    })
                    .ok_or_else(|| ImporterError::Config(format!("unknown company token '{}'", token)))
            })
            .collect()
    }
}

impl SinkConfig {
    /// Reads `SUPABASE_URL`, `SUPABASE_KEY` and optional `SUPABASE_TABLE`,
    /// loading a `.env` file first if present.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| ImporterError::Config(format!("{} must be set", name)))
        };

        Ok(Self {
            url: required("SUPABASE_URL")?,
            key: required("SUPABASE_KEY")?,
            table: lookup("SUPABASE_TABLE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_SINK_TABLE.to_string()),
        })
    }
}
