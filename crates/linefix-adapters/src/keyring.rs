//! Credential storage for linefix
//!
//! Credentials live as JSON in a single system keychain entry. When the
//! keychain is disabled (`LINEFIX_DISABLE_KEYRING=1`, tests, or a credentials
//! file already holding a key) a 0600 JSON file under the config dir is used.

use keyring::Entry;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, OnceLock};
use tracing::warn;

const KEYRING_SERVICE: &str = "linefix-credentials";
const KEYRING_USERNAME: &str = "default";

pub const DISABLE_KEYRING_ENV: &str = "LINEFIX_DISABLE_KEYRING";
pub const CREDENTIALS_FILE_ENV: &str = "LINEFIX_CREDENTIALS_FILE";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredCredentials {
    #[serde(skip_serializing_if = "Option::is_none")]
    openrouter_api_key: Option<String>,
}

type KeyringResult<T> = Result<T, String>;

#[derive(Debug, Default)]
struct CredentialsCache {
    cached: Option<StoredCredentials>,
}

static CREDENTIALS_CACHE: OnceLock<Mutex<CredentialsCache>> = OnceLock::new();
static KEYRING_ERROR_WARNED: AtomicBool = AtomicBool::new(false);

fn credentials_cache() -> &'static Mutex<CredentialsCache> {
    CREDENTIALS_CACHE.get_or_init(|| Mutex::new(CredentialsCache::default()))
}

fn keyring_disabled() -> bool {
    if cfg!(test) {
        return true;
    }

    let disabled_by_env = matches!(
        std::env::var(DISABLE_KEYRING_ENV)
            .unwrap_or_default()
            .to_lowercase()
            .as_str(),
        "1" | "true" | "yes"
    );
    if disabled_by_env {
        return true;
    }

    // A populated credentials file wins, so CI never hits a keychain prompt.
    matches!(
        read_fallback_credentials(),
        Ok(StoredCredentials {
            openrouter_api_key: Some(_)
        })
    )
}

/// Human-friendly credential backend label used in CLI messages.
pub fn credentials_store_label() -> &'static str {
    if keyring_disabled() {
        "local credentials file"
    } else {
        "system keychain"
    }
}

fn keyring_entry() -> Result<Entry, keyring::Error> {
    Entry::new(KEYRING_SERVICE, KEYRING_USERNAME)
}

fn fallback_credentials_path() -> KeyringResult<PathBuf> {
    if let Ok(path) = std::env::var(CREDENTIALS_FILE_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    if cfg!(test) {
        return Ok(std::env::temp_dir().join("linefix-test-credentials.json"));
    }

    dirs::config_dir()
        .map(|p| p.join("linefix").join("credentials.json"))
        .ok_or_else(|| "Could not determine credentials file path".to_string())
}

fn read_fallback_credentials() -> KeyringResult<StoredCredentials> {
    let path = fallback_credentials_path()?;
    if !path.exists() {
        return Ok(StoredCredentials::default());
    }
    let json = fs::read_to_string(&path)
        .map_err(|e| format!("Failed to read credentials file '{}': {}", path.display(), e))?;
    serde_json::from_str(&json)
        .map_err(|e| format!("Failed to parse credentials file '{}': {}", path.display(), e))
}

fn write_fallback_credentials(creds: &StoredCredentials) -> KeyringResult<()> {
    let path = fallback_credentials_path()?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            format!(
                "Failed to create credentials directory '{}': {}",
                parent.display(),
                e
            )
        })?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let _ = fs::set_permissions(parent, fs::Permissions::from_mode(0o700));
        }
    }

    let content = serde_json::to_string(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;

    let tmp_path = path.with_extension("json.tmp");
    let mut tmp_file = fs::File::create(&tmp_path).map_err(|e| {
        format!(
            "Failed to create temp credentials file '{}': {}",
            tmp_path.display(),
            e
        )
    })?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let _ = tmp_file.set_permissions(fs::Permissions::from_mode(0o600));
    }
    tmp_file
        .write_all(content.as_bytes())
        .map_err(|e| format!("Failed to write credentials file '{}': {}", tmp_path.display(), e))?;
    fs::rename(&tmp_path, &path).map_err(|e| {
        format!(
            "Failed to finalize credentials file '{}': {}",
            path.display(),
            e
        )
    })
}

/// Warn about keychain errors only once per process.
pub fn warn_keychain_error_once(context: &str, err: &str) {
    if KEYRING_ERROR_WARNED.swap(true, Ordering::Relaxed) {
        return;
    }
    warn!(
        context,
        error = err,
        "couldn't access system keychain; set {} or {}=1 to bypass it",
        crate::config::API_KEY_ENV,
        DISABLE_KEYRING_ENV
    );
}

fn read_credentials_uncached() -> KeyringResult<StoredCredentials> {
    if keyring_disabled() {
        return read_fallback_credentials();
    }
    let entry = keyring_entry().map_err(|e| e.to_string())?;
    match entry.get_password() {
        Ok(json) => {
            serde_json::from_str(&json).map_err(|e| format!("Failed to parse credentials: {}", e))
        }
        Err(keyring::Error::NoEntry) => Ok(StoredCredentials::default()),
        Err(err) => Err(err.to_string()),
    }
}

fn write_credentials(creds: &StoredCredentials) -> KeyringResult<()> {
    if keyring_disabled() {
        return write_fallback_credentials(creds);
    }
    let entry = keyring_entry().map_err(|e| e.to_string())?;
    let json = serde_json::to_string(creds)
        .map_err(|e| format!("Failed to serialize credentials: {}", e))?;
    entry.set_password(&json).map_err(|e| e.to_string())
}

fn read_credentials_cached() -> KeyringResult<StoredCredentials> {
    let mut guard = match credentials_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };

    if let Some(creds) = &guard.cached {
        return Ok(creds.clone());
    }

    let creds = read_credentials_uncached()?;
    guard.cached = Some(creds.clone());
    Ok(creds)
}

fn update_cache(creds: StoredCredentials) {
    let mut guard = match credentials_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.cached = Some(creds);
}

#[cfg(test)]
fn reset_for_tests() {
    let mut guard = match credentials_cache().lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    };
    guard.cached = None;
    KEYRING_ERROR_WARNED.store(false, Ordering::Relaxed);
}

/// Get the OpenRouter API key from the credential store.
pub fn get_api_key() -> KeyringResult<Option<String>> {
    Ok(read_credentials_cached()?.openrouter_api_key)
}

/// Set the OpenRouter API key in the credential store.
pub fn set_api_key(key: &str) -> KeyringResult<()> {
    let mut creds = read_credentials_cached().unwrap_or_default();
    creds.openrouter_api_key = Some(key.to_string());
    write_credentials(&creds)?;
    update_cache(creds);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_credentials_omits_missing_key() {
        let json = serde_json::to_string(&StoredCredentials::default()).unwrap();
        assert_eq!(json, "{}");
        let parsed: StoredCredentials = serde_json::from_str("{}").unwrap();
        assert!(parsed.openrouter_api_key.is_none());
    }

    #[test]
    fn test_credentials_store_label_uses_file_backend_in_tests() {
        assert_eq!(credentials_store_label(), "local credentials file");
    }

    #[test]
    fn test_file_backend_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::env::set_var(CREDENTIALS_FILE_ENV, &path);
        reset_for_tests();

        set_api_key("sk-or-test").unwrap();
        assert_eq!(get_api_key().unwrap(), Some("sk-or-test".to_string()));

        reset_for_tests();
        assert_eq!(get_api_key().unwrap(), Some("sk-or-test".to_string()));
        assert!(fs::read_to_string(&path).unwrap().contains("sk-or-test"));

        std::env::remove_var(CREDENTIALS_FILE_ENV);
        reset_for_tests();
    }
}
