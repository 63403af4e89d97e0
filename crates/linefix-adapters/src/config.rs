//! Configuration management for linefix
//!
//! Stores settings in ~/.config/linefix/config.json

use crate::keyring;
use anyhow::{anyhow, Context, Result};
use linefix_core::AnalysisMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::warn;
use uuid::Uuid;

pub const DEFAULT_MODEL: &str = "google/gemini-2.5-flash";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 600;
const MAX_RETRIES_CAP: u32 = 10;

/// Environment variable consulted after the credential store.
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// OpenRouter model id.
    pub model: String,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub default_mode: AnalysisMode,
    /// Anonymous id sent as OpenRouter's `user` field.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub openrouter_user_id: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            max_retries: DEFAULT_MAX_RETRIES,
            default_mode: AnalysisMode::default(),
            openrouter_user_id: None,
        }
    }
}

impl Config {
    fn sanitize(&mut self) {
        let model = self.model.trim();
        self.model = if model.is_empty() {
            DEFAULT_MODEL.to_string()
        } else {
            model.to_string()
        };
        self.request_timeout_secs = self
            .request_timeout_secs
            .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS);
        self.max_retries = self.max_retries.min(MAX_RETRIES_CAP);
    }

    /// Get the config directory path
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("linefix"))
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        Self::config_dir().map(|p| p.join("config.json"))
    }

    /// Load config from disk, or return default
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load from an explicit path. Missing file means defaults; a corrupt file
    /// is moved aside to `config.json.corrupt` and defaults are used.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = fs::read_to_string(path) else {
            return Self::default();
        };
        match serde_json::from_str::<Config>(&content) {
            Ok(mut config) => {
                config.sanitize();
                config
            }
            Err(err) => {
                preserve_corrupt_config(path, &content);
                warn!(
                    path = %path.display(),
                    error = %err,
                    "config file was corrupted; a backup was saved and defaults were loaded"
                );
                Self::default()
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let mut sanitized = self.clone();
        sanitized.sanitize();

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).context("Failed to create config directory")?;

            #[cfg(unix)]
            {
                use std::os::unix::fs::PermissionsExt;
                if let Err(e) = fs::set_permissions(dir, fs::Permissions::from_mode(0o700)) {
                    warn!(error = %e, "failed to set config directory permissions");
                }
            }
        }

        let content =
            serde_json::to_string_pretty(&sanitized).context("Failed to serialize config")?;
        write_config_atomic(path, &content).context("Failed to write config")
    }

    /// Stable anonymous user id, created and persisted on first use.
    pub fn openrouter_user(&mut self) -> String {
        if let Some(id) = &self.openrouter_user_id {
            return id.clone();
        }
        let id = format!("linefix_{}", Uuid::new_v4());
        self.openrouter_user_id = Some(id.clone());
        if let Err(err) = self.save() {
            warn!(error = %err, "could not persist anonymous user id");
        }
        id
    }

    /// Get the OpenRouter API key (credential store first, environment fallback).
    pub fn get_api_key(&self) -> Option<String> {
        match keyring::get_api_key() {
            Ok(Some(key)) => return Some(key),
            Ok(None) => {}
            Err(err) => keyring::warn_keychain_error_once("API key", &err),
        }
        std::env::var(API_KEY_ENV)
            .ok()
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.get_api_key().is_some()
    }

    /// Store the API key and read it back to confirm it stuck.
    pub fn set_api_key(&self, key: &str) -> Result<()> {
        let store = keyring::credentials_store_label();
        keyring::set_api_key(key).map_err(|e| {
            anyhow!(
                "Failed to store API key in {}: {}. You can set the {} environment variable instead.",
                store,
                e,
                API_KEY_ENV
            )
        })?;

        match keyring::get_api_key() {
            Ok(Some(stored)) if stored == key => Ok(()),
            Ok(_) => Err(anyhow!(
                "API key verification failed: key was not persisted to {}. You can set the {} environment variable instead.",
                store,
                API_KEY_ENV
            )),
            Err(read_err) => Err(anyhow!(
                "API key verification failed: couldn't read back from {} ({}).",
                store,
                read_err
            )),
        }
    }

    /// OpenRouter keys look like `sk-or-...`.
    pub fn validate_api_key_format(key: &str) -> bool {
        let key = key.trim();
        !key.is_empty() && key.starts_with("sk-")
    }

    /// Get the config file location for display
    pub fn config_location() -> String {
        Self::config_path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "~/.config/linefix/config.json".to_string())
    }
}

/// Interactive prompt to set up the API key
pub fn setup_api_key_interactive() -> Result<String> {
    use std::io;

    println!();
    println!("  ┌─────────────────────────────────────────────────────────┐");
    println!("  │  LINEFIX SETUP                                          │");
    println!("  └─────────────────────────────────────────────────────────┘");
    println!();
    println!("  linefix sends the lines you select to a model on OpenRouter.");
    println!();
    println!("  Steps:");
    println!("    1) Create a key at https://openrouter.ai/keys");
    println!("    2) Paste the key below and press Enter");
    println!();
    println!(
        "  We'll store it in your {}.",
        keyring::credentials_store_label()
    );
    println!("  Prefer env vars? Set {} and rerun.", API_KEY_ENV);
    println!();
    print!("  API Key: ");
    io::stdout().flush()?;

    let mut key = String::new();
    io::stdin().read_line(&mut key)?;
    let key = key.trim().to_string();

    if key.is_empty() {
        return Err(anyhow!("No API key provided"));
    }

    if !Config::validate_api_key_format(&key) {
        println!();
        println!("  Warning: Key doesn't look like an OpenRouter key (usually starts with sk-or-)");
        println!("     Saving anyway...");
    }

    let config = Config::load();
    config.set_api_key(&key)?;

    println!();
    println!("  + API key saved to {}", keyring::credentials_store_label());
    println!();

    Ok(key)
}

fn preserve_corrupt_config(path: &Path, content: &str) {
    let corrupt_path = path.with_extension("json.corrupt");
    if fs::rename(path, &corrupt_path).is_err() {
        let _ = fs::write(&corrupt_path, content);
    }
}

fn write_config_atomic(path: &Path, content: &str) -> std::io::Result<()> {
    use std::fs::OpenOptions;

    let tmp_path = path.with_extension("tmp");
    let mut file = OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(&tmp_path)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if let Err(e) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
            warn!(error = %e, "failed to set temp config file permissions");
        }
    }

    file.write_all(content.as_bytes())?;

    if let Err(err) = fs::rename(&tmp_path, path) {
        let _ = fs::remove_file(&tmp_path);
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, 60);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.default_mode, AnalysisMode::Review);
    }

    #[test]
    fn test_config_partial_file_fills_defaults() {
        let parsed: Config = serde_json::from_str(r#"{"model":"openai/gpt-4o-mini"}"#).unwrap();
        assert_eq!(parsed.model, "openai/gpt-4o-mini");
        assert_eq!(parsed.max_retries, DEFAULT_MAX_RETRIES);
    }

    #[test]
    fn test_sanitize_clamps_values() {
        let mut config = Config {
            model: "   ".to_string(),
            request_timeout_secs: 0,
            max_retries: 99,
            ..Config::default()
        };
        config.sanitize();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.request_timeout_secs, MIN_TIMEOUT_SECS);
        assert_eq!(config.max_retries, MAX_RETRIES_CAP);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = Config {
            model: "anthropic/claude-3.5-haiku".to_string(),
            default_mode: AnalysisMode::EdgeCases,
            ..Config::default()
        };
        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);
        assert!(!path.with_extension("tmp").exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600);
        }
    }

    #[test]
    fn test_corrupt_config_is_preserved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{not json").unwrap();
        let config = Config::load_from(&path);
        assert_eq!(config, Config::default());
        assert!(!path.exists());
        assert_eq!(
            fs::read_to_string(path.with_extension("json.corrupt")).unwrap(),
            "{not json"
        );
    }

    #[test]
    fn test_validate_api_key_format() {
        assert!(Config::validate_api_key_format("sk-or-v1-abc"));
        assert!(!Config::validate_api_key_format("  "));
        assert!(!Config::validate_api_key_format("gsk_123"));
    }
}
