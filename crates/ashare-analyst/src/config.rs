//! Settings for the analyst
//!
//! Values come from three layers, later layers winning:
//! built-in defaults, `config/settings.yaml`, then environment variables
//! (the process environment first, then `config/.env`).
//!
//! Every struct is `#[serde(default)]`, so a settings file only needs the
//! keys it wants to change.

use crate::error::{Result, StockError};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Default location of the settings file
pub const DEFAULT_SETTINGS_PATH: &str = "config/settings.yaml";

/// Default location of the secret env file
pub const DEFAULT_ENV_PATH: &str = "config/.env";

/// Value shipped in `.env.example`; treated as "no key"
pub const API_KEY_PLACEHOLDER: &str = "your_key_here";

/// Environment variable that enables and sets the Yahoo proxy
pub const PROXY_ENV_VAR: &str = "YFINANCE_PROXY";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub version: String,
    pub model: ModelSettings,
    pub yfinance: YFinanceSettings,
    pub akshare: AkshareSettings,
    pub report: ReportSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            model: ModelSettings::default(),
            yfinance: YFinanceSettings::default(),
            akshare: AkshareSettings::default(),
            report: ReportSettings::default(),
        }
    }
}

/// LLM provider settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSettings {
    pub provider: String,
    pub base_url: String,
    pub model_name: String,
    /// Name of the environment variable holding the API key
    pub api_key_env: String,
    /// Key written directly in the settings file; the environment wins over it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    /// Upper bound on tool-enabled model calls per report
    pub max_steps: usize,
    pub parameters: ModelParameters,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            provider: "openrouter".to_string(),
            base_url: "https://openrouter.ai/api/v1".to_string(),
            model_name: "deepseek/deepseek-chat".to_string(),
            api_key_env: "OPENROUTER_API_KEY".to_string(),
            api_key: None,
            max_steps: 15,
            parameters: ModelParameters::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    pub max_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            max_tokens: 4000,
            temperature: 0.1,
            top_p: 0.9,
        }
    }
}

/// Secondary provider (Yahoo Finance) settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YFinanceSettings {
    pub proxy: ProxySettings,
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxySettings {
    pub enabled: bool,
    pub http_proxy: String,
    pub https_proxy: String,
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            http_proxy: "http://127.0.0.1:10808".to_string(),
            https_proxy: "http://127.0.0.1:10808".to_string(),
        }
    }
}

impl ProxySettings {
    /// Proxy URL for HTTPS traffic when enabled
    pub fn active_url(&self) -> Option<&str> {
        if !self.enabled {
            return None;
        }
        [self.https_proxy.as_str(), self.http_proxy.as_str()]
            .into_iter()
            .find(|url| !url.trim().is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    pub max_retries: u32,
    /// Seconds between attempts
    pub retry_delay: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 5,
            retry_delay: 1.0,
        }
    }
}

/// Primary provider (Eastmoney) settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AkshareSettings {
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub retry_count: u32,
}

impl Default for AkshareSettings {
    fn default() -> Self {
        Self {
            timeout: 30,
            retry_count: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    pub output_dir: PathBuf,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("reports"),
        }
    }
}

impl Settings {
    /// Parse settings from YAML; absent keys keep their defaults
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml)
            .map_err(|e| StockError::ConfigError(format!("Invalid settings YAML: {e}")))
    }

    /// Load settings from `path`
    ///
    /// A missing file is created with the defaults. A file that cannot be
    /// parsed is reported and the defaults are used instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            info!(path = %path.display(), "Settings file not found, writing defaults");
            let settings = Self::default();
            settings.save(path)?;
            return Ok(settings);
        }

        let content = fs::read_to_string(path)?;
        match Self::from_yaml_str(&content) {
            Ok(settings) => {
                info!(path = %path.display(), "Loaded settings");
                Ok(settings)
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Could not parse settings, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Write the settings as YAML, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| StockError::ConfigError(format!("Cannot serialise settings: {e}")))?;
        fs::write(path, yaml)?;
        Ok(())
    }

    /// Apply environment overrides through `lookup`
    ///
    /// `lookup` resolves a variable name; the CLI passes one that checks the
    /// process environment and then the env file.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(&self.model.api_key_env).filter(|k| !k.trim().is_empty()) {
            self.model.api_key = Some(key.trim().to_string());
        }

        if let Some(proxy) = lookup(PROXY_ENV_VAR).filter(|p| !p.trim().is_empty()) {
            let proxy = proxy.trim().to_string();
            self.yfinance.proxy.enabled = true;
            self.yfinance.proxy.http_proxy.clone_from(&proxy);
            self.yfinance.proxy.https_proxy = proxy;
        }
    }

    /// The API key, or `MissingApiKey` when absent or still the placeholder
    pub fn api_key(&self) -> Result<&str> {
        self.model
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty() && *k != API_KEY_PLACEHOLDER)
            .ok_or_else(|| StockError::MissingApiKey {
                env_var: self.model.api_key_env.clone(),
            })
    }

    pub fn set_api_key(&mut self, key: impl Into<String>) {
        self.model.api_key = Some(key.into());
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.model.model_name.trim().is_empty() {
            return Err(StockError::ConfigError(
                "model.model_name must not be empty".to_string(),
            ));
        }
        if self.model.max_steps == 0 {
            return Err(StockError::ConfigError(
                "model.max_steps must be greater than 0".to_string(),
            ));
        }
        if self.yfinance.retry.max_retries == 0 {
            return Err(StockError::ConfigError(
                "yfinance.retry.max_retries must be greater than 0".to_string(),
            ));
        }
        if !self.yfinance.retry.retry_delay.is_finite() || self.yfinance.retry.retry_delay < 0.0 {
            return Err(StockError::ConfigError(
                "yfinance.retry.retry_delay must be a non-negative number".to_string(),
            ));
        }
        Ok(())
    }

    /// Retry policy for secondary-provider calls
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.yfinance.retry.max_retries,
            Duration::from_secs_f64(self.yfinance.retry.retry_delay.max(0.0)),
        )
    }

    pub fn primary_timeout(&self) -> Duration {
        Duration::from_secs(self.akshare.timeout.max(1))
    }

    /// Human-readable summary for the console
    pub fn summary(&self, settings_path: &Path) -> String {
        let proxy = if self.yfinance.proxy.enabled {
            "启用"
        } else {
            "禁用"
        };
        format!(
            "模型提供商: {}\n模型名称: {}\nAPI基础URL: {}\n雅虎财经代理: {}\n配置文件路径: {}",
            self.model.provider,
            self.model.model_name,
            self.model.base_url,
            proxy,
            settings_path.display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.model.model_name, "deepseek/deepseek-chat");
        assert_eq!(settings.model.parameters.max_tokens, 4000);
        assert_eq!(settings.yfinance.retry.max_retries, 5);
        assert!(!settings.yfinance.proxy.enabled);
        assert_eq!(settings.akshare.timeout, 30);
        assert_eq!(settings.report.output_dir, PathBuf::from("reports"));
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_merges_over_defaults() {
        let yaml = r"
model:
  model_name: qwen/qwen-2.5-72b-instruct
  parameters:
    temperature: 0.3
yfinance:
  retry:
    retry_delay: 0.5
";
        let settings = Settings::from_yaml_str(yaml).unwrap();
        assert_eq!(settings.model.model_name, "qwen/qwen-2.5-72b-instruct");
        assert!((settings.model.parameters.temperature - 0.3).abs() < f32::EPSILON);
        assert_eq!(settings.model.parameters.max_tokens, 4000);
        assert_eq!(settings.model.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(settings.yfinance.retry.max_retries, 5);
        assert_eq!(settings.retry_policy().delay, Duration::from_millis(500));
    }

    #[test]
    fn test_env_overrides_file_values() {
        let mut settings = Settings::from_yaml_str("model:\n  api_key: from-file\n").unwrap();
        assert_eq!(settings.api_key().unwrap(), "from-file");

        settings.apply_env_overrides(lookup(&[
            ("OPENROUTER_API_KEY", "sk-or-env"),
            ("YFINANCE_PROXY", "http://127.0.0.1:7890"),
        ]));
        assert_eq!(settings.api_key().unwrap(), "sk-or-env");
        assert!(settings.yfinance.proxy.enabled);
        assert_eq!(settings.yfinance.proxy.https_proxy, "http://127.0.0.1:7890");
        assert_eq!(
            settings.yfinance.proxy.active_url(),
            Some("http://127.0.0.1:7890")
        );
    }

    #[test]
    fn test_custom_api_key_env() {
        let mut settings =
            Settings::from_yaml_str("model:\n  api_key_env: MY_ROUTER_KEY\n").unwrap();
        settings.apply_env_overrides(lookup(&[("OPENROUTER_API_KEY", "ignored")]));
        assert!(settings.api_key().is_err());

        settings.apply_env_overrides(lookup(&[("MY_ROUTER_KEY", "sk-custom")]));
        assert_eq!(settings.api_key().unwrap(), "sk-custom");
    }

    #[test]
    fn test_missing_or_placeholder_key() {
        let mut settings = Settings::default();
        match settings.api_key() {
            Err(StockError::MissingApiKey { env_var }) => {
                assert_eq!(env_var, "OPENROUTER_API_KEY");
            }
            other => panic!("Expected MissingApiKey, got {other:?}"),
        }

        settings.apply_env_overrides(lookup(&[("OPENROUTER_API_KEY", "your_key_here")]));
        assert!(settings.api_key().is_err());

        settings.set_api_key("sk-or-typed");
        assert_eq!(settings.api_key().unwrap(), "sk-or-typed");
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config").join("settings.yaml");

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
        assert!(path.exists());

        let reloaded = Settings::load(&path).unwrap();
        assert_eq!(reloaded, settings);
    }

    #[test]
    fn test_load_invalid_yaml_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.yaml");
        fs::write(&path, "model: [unclosed").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_validation() {
        let mut settings = Settings::default();
        settings.model.max_steps = 0;
        assert!(settings.validate().is_err());

        let mut settings = Settings::default();
        settings.yfinance.retry.retry_delay = -1.0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn test_summary_mentions_model() {
        let summary = Settings::default().summary(Path::new("config/settings.yaml"));
        assert!(summary.contains("deepseek/deepseek-chat"));
        assert!(summary.contains("禁用"));
    }
}
