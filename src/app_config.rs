//! The config file: which repository to use and how to reach it.
//!
//! The access token may also come from the environment.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::{ExposeSecret as _, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use study_vault::host::DEFAULT_RAW_HOST;

const APP_DIR: &str = "study-vault";
const CONFIG_FILE: &str = "config.toml";

/// Environment variables consulted for the token, in priority order.
const TOKEN_ENV_VARS: [&str; 2] = ["STUDY_VAULT_TOKEN", "GITHUB_TOKEN"];

fn default_api_url() -> String {
    repo_host::DEFAULT_BASE_URL.to_owned()
}

fn default_raw_content_host() -> String {
    DEFAULT_RAW_HOST.to_owned()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// An `owner/repo` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    pub owner: String,
    pub repo: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("`{0}` is not a repository; expected <owner>/<repo>")]
pub struct InvalidRepositoryRef(String);

impl FromStr for RepositoryRef {
    type Err = InvalidRepositoryRef;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim().trim_end_matches(".git");
        match trimmed.split_once('/') {
            Some((owner, repo))
                if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') =>
            {
                Ok(Self {
                    owner: owner.to_owned(),
                    repo: repo.to_owned(),
                })
            }
            _ => Err(InvalidRepositoryRef(s.to_owned())),
        }
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl Serialize for RepositoryRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for RepositoryRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Everything the binary needs to build a host client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Config {
    /// The content repository, `owner/repo`.
    pub repository: RepositoryRef,

    /// Token used for the API. Public repositories can be read without one.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_token"
    )]
    pub token: Option<SecretString>,

    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Host that serves raw file downloads.
    #[serde(default = "default_raw_content_host")]
    pub raw_content_host: String,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn serialize_token<S>(_token: &Option<SecretString>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str("****")
}

/// The on-disk form, with the token in the clear.
#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct DangerousConfig<'a> {
    repository: &'a RepositoryRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    token: Option<&'a str>,
    api_url: &'a str,
    raw_content_host: &'a str,
    request_timeout_secs: u64,
}

impl<'a> From<&'a Config> for DangerousConfig<'a> {
    fn from(config: &'a Config) -> Self {
        Self {
            repository: &config.repository,
            token: config.token.as_ref().map(|t| t.expose_secret()),
            api_url: &config.api_url,
            raw_content_host: &config.raw_content_host,
            request_timeout_secs: config.request_timeout_secs,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {}", .0.join("; "))]
    ValidationErrors(Vec<String>),

    #[error("Could not write the config as TOML: {0}")]
    SerializationError(#[from] toml::ser::Error),

    #[error("Could not parse the config file: {0}")]
    DeserializationError(#[from] toml::de::Error),

    #[error("Could not access the config file: {0}")]
    IoError(#[from] std::io::Error),

    #[error("The config path has no parent directory.")]
    NoParentDir,

    #[error("Could not determine where to put the config file.")]
    NoSuitableConfigPath,

    #[error(
        "No configuration file found. Create one with `study-vault config init --repository \
         <owner>/<repo>`."
    )]
    Missing,

    #[error("A configuration file already exists at {0}.")]
    AlreadyExists(PathBuf),
}

impl Config {
    pub fn new(repository: RepositoryRef) -> Self {
        Self {
            repository,
            token: None,
            api_url: default_api_url(),
            raw_content_host: default_raw_content_host(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Every problem with the settings, not just the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (key, value) in [
            ("api-url", &self.api_url),
            ("raw-content-host", &self.raw_content_host),
        ] {
            if !(value.starts_with("https://") || value.starts_with("http://")) {
                errors.push(format!("{key} '{value}' is not an http(s) URL."));
            }
        }

        if self.request_timeout_secs == 0 {
            errors.push("request-timeout-secs must be greater than zero.".to_owned());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Replace the token with one from the environment, if set.
    #[must_use]
    pub fn with_env_token(mut self) -> Self {
        let from_env = TOKEN_ENV_VARS.iter().find_map(|var| {
            std::env::var(var)
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (*var, v))
        });
        if let Some((var, token)) = from_env {
            debug!(var, "Using token from the environment.");
            self.token = Some(SecretString::from(token));
        }
        self
    }

    /// Candidate config files, highest priority first. macOS skips `dirs::config_dir()`, which is
    /// Application Support there.
    pub fn config_search_paths() -> Vec<PathBuf> {
        let mut paths = Vec::new();

        #[cfg(not(target_os = "macos"))]
        if let Some(xdg) = dirs::config_dir() {
            paths.push(xdg.join(APP_DIR).join(CONFIG_FILE));
        }

        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".config").join(APP_DIR).join(CONFIG_FILE));
        }

        paths.push(PathBuf::from("/etc").join(APP_DIR).join(CONFIG_FILE));

        paths
    }

    fn find_config_file() -> Option<PathBuf> {
        Self::config_search_paths().into_iter().find(|p| p.exists())
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(path = %path.display(), "Reading config file.");
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load from `external_config_path`, or the first config file found on the search path.
    ///
    /// The environment token override is applied and the result validated.
    pub fn load(external_config_path: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match external_config_path {
            Some(path) => path.to_path_buf(),
            None => Self::find_config_file().ok_or(ConfigError::Missing)?,
        };
        let config = Self::load_from_file(&path)?.with_env_token();
        config.validate().map_err(ConfigError::ValidationErrors)?;
        debug!(repository = %config.repository, "Config loaded.");
        Ok(config)
    }

    /// Where `config init` writes: the explicit path, or the highest-priority search path.
    pub fn creation_path(external_config_path: Option<&Path>) -> Result<PathBuf, ConfigError> {
        match external_config_path {
            Some(path) => Ok(path.to_path_buf()),
            None => Self::config_search_paths()
                .into_iter()
                .next()
                .ok_or(ConfigError::NoSuitableConfigPath),
        }
    }

    /// Write a new config file. Refuses to overwrite unless `force` is set.
    pub fn init(&self, path: &Path, force: bool) -> Result<(), ConfigError> {
        if path.exists() && !force {
            return Err(ConfigError::AlreadyExists(path.to_path_buf()));
        }
        self.validate().map_err(ConfigError::ValidationErrors)?;
        self.dangerously_write_to_disk(path)?;
        info!(path = %path.display(), "Created configuration file.");
        Ok(())
    }

    /// The config as TOML with the token masked.
    pub fn to_masked_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn dangerously_write_to_disk(&self, path: &Path) -> Result<(), ConfigError> {
        let dangerous_config = DangerousConfig::from(self);
        let toml_str = toml::to_string_pretty(&dangerous_config)?;
        std::fs::create_dir_all(path.parent().ok_or(ConfigError::NoParentDir)?)?;
        std::fs::write(path, toml_str)?;
        Ok(())
    }
}
