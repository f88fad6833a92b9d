//! Configuration management for ticketscope
//!
//! Stores settings in ~/.config/ticketscope/config.json

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;

/// Environment variable consulted before the stored LLM API key.
pub const LLM_API_KEY_ENV: &str = "TICKETSCOPE_LLM_API_KEY";

fn default_lookback_days() -> i64 {
    28
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Helpdesk subdomain, or a full `http(s)://` origin for a local mock.
    /// Empty means the local mock server.
    #[serde(default)]
    pub zendesk_subdomain: String,
    pub zendesk_email: Option<String>,
    pub zendesk_api_token: Option<String>,
    /// Full chat-completions URL, e.g. an OpenAI-compatible local server.
    pub llm_endpoint: Option<String>,
    pub llm_api_key: Option<String>,
    /// Model name to request; `None` lets the server pick its loaded model.
    pub llm_model: Option<String>,
    /// How many days back to fetch tickets from.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            zendesk_subdomain: String::new(),
            zendesk_email: None,
            zendesk_api_token: None,
            llm_endpoint: None,
            llm_api_key: None,
            llm_model: None,
            lookback_days: default_lookback_days(),
        }
    }
}

impl Config {
    /// Get the config directory path
    fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("ticketscope"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        if let Some(path) = Self::config_path() {
            if let Ok(content) = fs::read_to_string(&path) {
                match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(err) => {
                        preserve_corrupt_config(&path, &content);
                        eprintln!(
                            "  Warning: Config file was corrupted ({}). A backup was saved and defaults were loaded.",
                            err
                        );
                    }
                }
            }
        }
        Self::default()
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let dir = Self::config_dir().context("could not determine config directory")?;

        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create config directory {}", dir.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            if let Err(e) = fs::set_permissions(&dir, fs::Permissions::from_mode(0o700)) {
                eprintln!("  Warning: Failed to set config directory permissions: {}", e);
            }
        }

        let path = dir.join("config.json");
        let content =
            serde_json::to_string_pretty(self).context("failed to serialize config")?;

        #[cfg(unix)]
        {
            write_config_atomic(&path, &content)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, content)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }

        Ok(())
    }

    /// Get the LLM API key (environment variable takes precedence).
    pub fn llm_api_key(&self) -> Option<String> {
        if let Ok(key) = std::env::var(LLM_API_KEY_ENV) {
            if !key.trim().is_empty() {
                return Some(key);
            }
        }
        self.llm_api_key.clone()
    }

    /// Check whether the LLM side is ready to call.
    pub fn has_llm_credentials(&self) -> bool {
        self.llm_endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self.llm_api_key().is_some()
    }

    /// Check whether helpdesk credentials are present. The local mock server
    /// accepts any credentials, so only email and token are required.
    pub fn has_zendesk_credentials(&self) -> bool {
        self.zendesk_email.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self
                .zendesk_api_token
                .as_deref()
                .is_some_and(|t| !t.trim().is_empty())
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/ticketscope/config.json".to_string())
    }
}

fn preserve_corrupt_config(path: &std::path::Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

#[cfg(unix)]
fn write_config_atomic(path: &std::path::Path, content: &str) -> Result<()> {
    use std::fs::OpenOptions;
    use std::os::unix::fs::PermissionsExt;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)
        .with_context(|| format!("failed to open {}", tmp_path.display()))?;

    if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        eprintln!("  Warning: Failed to set temp config file permissions: {}", e);
    }

    file.write_all(content.as_bytes())
        .with_context(|| format!("failed to write {}", tmp_path.display()))?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert!(config.zendesk_subdomain.is_empty());
        assert_eq!(config.lookback_days, 28);
        assert!(!config.has_llm_credentials());
        assert!(!config.has_zendesk_credentials());
    }

    #[test]
    fn test_lookback_defaults_when_absent_from_json() {
        let config: Config = serde_json::from_str(r#"{"zendesk_subdomain": "acme"}"#).unwrap();
        assert_eq!(config.lookback_days, 28);
        assert_eq!(config.zendesk_subdomain, "acme");
    }

    #[test]
    fn test_credentials_require_non_blank_values() {
        let mut config = Config {
            zendesk_email: Some("  ".to_string()),
            zendesk_api_token: Some("tok".to_string()),
            ..Config::default()
        };
        assert!(!config.has_zendesk_credentials());
        config.zendesk_email = Some("agent@example.com".to_string());
        assert!(config.has_zendesk_credentials());
    }
}
