use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

pub const APP_NAME: &str = "chatgpt";

pub const DEFAULT_API_BASE: &str = "https://chat.openai.com/api";
pub const DEFAULT_BACKEND_BASE: &str = "https://chat.openai.com/backend-api";
pub const DEFAULT_MODEL: &str = "text-davinci-002-render";
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/108.0.0.0 Safari/537.36";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub tui: TuiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Overrides both the auth and the conversation endpoint roots.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default = "default_true")]
    pub auto_refresh: bool,
    #[serde(default)]
    pub diagnostics: bool,
    /// Where raw request/response dumps go when diagnostics are on. Stderr when unset.
    #[serde(default)]
    pub diagnostics_file: Option<PathBuf>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub session_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TuiConfig {
    #[serde(default = "default_user_label")]
    pub user_label: String,
    #[serde(default = "default_assistant_label")]
    pub assistant_label: String,
}

fn default_true() -> bool {
    true
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_user_label() -> String {
    "You".to_string()
}

fn default_assistant_label() -> String {
    "GPT".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            user_agent: None,
            auto_refresh: true,
            diagnostics: false,
            diagnostics_file: None,
            model: default_model(),
            session_token: None,
        }
    }
}

impl Default for TuiConfig {
    fn default() -> Self {
        Self {
            user_label: default_user_label(),
            assistant_label: default_assistant_label(),
        }
    }
}

impl ClientConfig {
    pub fn api_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_API_BASE)
    }

    pub fn backend_base(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BACKEND_BASE)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }

    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    pub fn data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_NAME)
    }

    pub fn ensure_dirs() -> Result<()> {
        std::fs::create_dir_all(Self::config_dir())?;
        std::fs::create_dir_all(Self::data_dir())?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        Self::ensure_dirs()?;
        self.save_to(&Self::config_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content).context("Failed to write config file")?;
        Ok(())
    }

    /// Copy that is safe to print: the session token is masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.client.session_token.is_some() {
            copy.client.session_token = Some("<redacted>".to_string());
        }
        copy
    }
}
