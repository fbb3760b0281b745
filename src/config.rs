use crate::error::ConfigError;
use crate::llm_generator::Provider;
use dirs::home_dir;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub anthropic_api_key: Option<String>,
    #[serde(default)]
    pub openai_api_key: Option<String>,
    #[serde(default)]
    pub google_api_key: Option<String>,
    /// Model key used when `--model` is not given.
    #[serde(default)]
    pub default_model: Option<String>,
    /// Cached Google OAuth token file (JSON with an `access_token` field).
    #[serde(default)]
    pub google_token_path: Option<PathBuf>,
    /// Raw Google access token; only ever set from the environment.
    #[serde(skip)]
    pub google_access_token: Option<String>,
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
    #[serde(default)]
    pub use_mock: bool,
}

#[derive(Debug, Deserialize)]
struct CachedToken {
    access_token: String,
}

impl Config {
    /// Load configuration from file, environment variables, or create default
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match Self::load_from_file()? {
            Some(config) => config,
            None => {
                info!("No config file found, using defaults");
                Self::default()
            }
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Environment variables override config file values.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = non_empty("ANTHROPIC_API_KEY") {
            self.anthropic_api_key = Some(key);
        }
        if let Some(key) = non_empty("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(key) = non_empty("GOOGLE_API_KEY") {
            self.google_api_key = Some(key);
        }
        if let Some(model) = non_empty("DOCDRAFT_MODEL") {
            self.default_model = Some(model);
        }
        if let Some(token) = non_empty("DOCDRAFT_GOOGLE_TOKEN") {
            self.google_access_token = Some(token);
        }
        if let Some(path) = non_empty("DOCDRAFT_GOOGLE_TOKEN_FILE") {
            self.google_token_path = Some(PathBuf::from(path));
        }
        if lookup("DOCDRAFT_USE_MOCK").is_some() {
            self.use_mock = true;
        }
    }

    fn load_from_file() -> Result<Option<Self>, ConfigError> {
        Self::load_from_path(&Self::get_config_path()?)
    }

    /// Reads a config file; a missing file is not an error.
    pub fn load_from_path(path: &Path) -> Result<Option<Self>, ConfigError> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from: {}", path.display());
        Ok(Some(config))
    }

    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to_path(&Self::get_config_path()?)
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(io_err)?;
        info!("Saved config to: {}", path.display());
        Ok(())
    }

    fn get_config_path() -> Result<PathBuf, ConfigError> {
        Ok(Self::get_config_dir()?.join("config.toml"))
    }

    pub fn get_config_dir() -> Result<PathBuf, ConfigError> {
        let home = home_dir().ok_or(ConfigError::HomeDirUnavailable)?;
        Ok(home.join(".docdraft"))
    }

    /// Set the API key for `provider` and save config
    pub fn set_api_key(&mut self, provider: Provider, api_key: String) -> Result<(), ConfigError> {
        *self.api_key_slot(provider) = Some(api_key);
        self.save()?;
        info!("{} API key saved to config file", provider.display_name());
        Ok(())
    }

    fn api_key_slot(&mut self, provider: Provider) -> &mut Option<String> {
        match provider {
            Provider::Anthropic => &mut self.anthropic_api_key,
            Provider::OpenAi => &mut self.openai_api_key,
            Provider::Gemini => &mut self.google_api_key,
        }
    }

    pub fn get_api_key(&self, provider: Provider) -> Option<&str> {
        match provider {
            Provider::Anthropic => self.anthropic_api_key.as_deref(),
            Provider::OpenAi => self.openai_api_key.as_deref(),
            Provider::Gemini => self.google_api_key.as_deref(),
        }
    }

    pub fn is_mock_mode(&self) -> bool {
        self.use_mock
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    fn token_path(&self) -> Result<PathBuf, ConfigError> {
        match &self.google_token_path {
            Some(path) => Ok(crate::source::expand_home(&path.to_string_lossy())),
            None => Ok(Self::get_config_dir()?.join("google_token.json")),
        }
    }

    /// Returns the cached Google access token, if one is configured.
    ///
    /// `Ok(None)` means Drive integration is simply not set up.
    pub fn google_access_token(&self) -> Result<Option<String>, ConfigError> {
        if let Some(token) = &self.google_access_token {
            return Ok(Some(token.clone()));
        }

        let path = self.token_path()?;
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        let token: CachedToken = serde_json::from_str(&content).map_err(|e| ConfigError::Token {
            path: path.clone(),
            message: e.to_string(),
        })?;
        info!("Loaded Google access token from: {}", path.display());
        Ok(Some(token.access_token))
    }

    pub fn show_config_info(&self) -> Result<(), ConfigError> {
        let config_path = Self::get_config_path()?;
        println!("Configuration file: {}", config_path.display());
        println!(
            "Status: {}",
            if config_path.exists() { "Found" } else { "Not found (using defaults)" }
        );

        let set = |value: Option<&str>| if value.is_some() { "Set" } else { "Not set" };
        for provider in Provider::ALL {
            println!("{} API key: {}", provider.display_name(), set(self.get_api_key(provider)));
        }

        println!(
            "Default model: {}",
            self.default_model.as_deref().unwrap_or(crate::llm_generator::DEFAULT_MODEL)
        );
        println!("Request timeout: {}s", self.request_timeout().as_secs());
        println!("Google token file: {}", self.token_path()?.display());
        println!(
            "Google Drive: {}",
            match self.google_access_token() {
                Ok(Some(_)) => "Available",
                Ok(None) => "Not configured (optional)",
                Err(_) => "Token file unreadable",
            }
        );
        println!("Mock mode: {}", self.use_mock);

        println!("\nTo set an API key for the selected model's provider:");
        println!("  docdraft --model <model> --set-api-key <your-key>");
        println!("\nOr set environment variables (a .env file is also read):");
        for provider in Provider::ALL {
            println!("  export {}=<your-key>", provider.env_var());
        }

        Ok(())
    }
}
