//! SDK configuration loading
//!
//! Config precedence: explicit path > PAYDECK_CONFIG env var > default
//! filename. The API base URL can additionally be overridden with
//! PAYDECK_BASE_URL (useful for pointing a deployed frontend at a staging
//! backend without editing the file).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

/// Root configuration
#[derive(Debug, Deserialize)]
pub struct Config {
    pub api: ApiConfig,
    pub storage: StorageConfig,
    pub events: EventsConfig,
}

/// API host settings
#[derive(Debug, Deserialize)]
pub struct ApiConfig {
    pub base_url: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

/// Durable storage location for the credential slot and cooldown ledger
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub dir: PathBuf,
}

/// Push channel settings
#[derive(Debug, Deserialize)]
pub struct EventsConfig {
    pub url: String,
    #[serde(default = "default_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_secs: u64,
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

impl EventsConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

fn default_timeout() -> u64 {
    30
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_reconnect_delay() -> u64 {
    2
}

fn default_connect_timeout() -> u64 {
    10
}

impl Config {
    /// Load configuration from a TOML file, then overlay environment
    /// variables.
    pub fn load(path: &Path) -> common::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Config = toml::from_str(&contents)?;

        if let Ok(base_url) = std::env::var("PAYDECK_BASE_URL") {
            config.api.base_url = base_url;
        }

        if !config.api.base_url.starts_with("http://")
            && !config.api.base_url.starts_with("https://")
        {
            return Err(common::Error::Config(format!(
                "api.base_url must start with http:// or https://, got: {}",
                config.api.base_url
            )));
        }

        if !config.events.url.starts_with("ws://") && !config.events.url.starts_with("wss://") {
            return Err(common::Error::Config(format!(
                "events.url must start with ws:// or wss://, got: {}",
                config.events.url
            )));
        }

        if config.api.timeout_secs == 0 {
            return Err(common::Error::Config(
                "api.timeout_secs must be greater than 0".into(),
            ));
        }

        if config.events.connect_timeout_secs == 0 {
            return Err(common::Error::Config(
                "events.connect_timeout_secs must be greater than 0".into(),
            ));
        }

        Ok(config)
    }

    /// Resolve the config file path from an explicit argument or the
    /// PAYDECK_CONFIG env var.
    pub fn resolve_path(explicit: Option<&str>) -> PathBuf {
        if let Some(p) = explicit {
            return PathBuf::from(p);
        }
        if let Ok(p) = std::env::var("PAYDECK_CONFIG") {
            return PathBuf::from(p);
        }
        PathBuf::from("paydeck.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Serializes tests that mutate environment variables.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn valid_toml() -> &'static str {
        r#"
[api]
base_url = "https://pay.example.com/api"

[storage]
dir = "/var/lib/paydeck"

[events]
url = "wss://pay.example.com/events"
"#
    }

    fn write_config(dir: &tempfile::TempDir, contents: &str) -> PathBuf {
        let path = dir.path().join("paydeck.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn load_valid_config_applies_defaults() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PAYDECK_BASE_URL") };

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        let config = Config::load(&path).unwrap();
        assert_eq!(config.api.base_url, "https://pay.example.com/api");
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.events.max_reconnect_attempts, 5);
        assert_eq!(config.events.reconnect_delay(), Duration::from_secs(2));
        assert_eq!(config.events.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(Config::load(Path::new("/nonexistent/paydeck.toml")).is_err());
    }

    #[test]
    fn invalid_toml_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, "not {{ valid");
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn base_url_without_scheme_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PAYDECK_BASE_URL") };

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "pay.example.com"

[storage]
dir = "/tmp"

[events]
url = "wss://pay.example.com/events"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("base_url"), "got: {err}");
    }

    #[test]
    fn events_url_must_be_websocket() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PAYDECK_BASE_URL") };

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://pay.example.com/api"

[storage]
dir = "/tmp"

[events]
url = "https://pay.example.com/events"
"#,
        );

        let err = Config::load(&path).unwrap_err();
        assert!(err.to_string().contains("events.url"), "got: {err}");
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PAYDECK_BASE_URL") };

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(
            &dir,
            r#"
[api]
base_url = "https://pay.example.com/api"
timeout_secs = 0

[storage]
dir = "/tmp"

[events]
url = "wss://pay.example.com/events"
"#,
        );

        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn env_var_overrides_base_url() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = write_config(&dir, valid_toml());

        unsafe { set_env("PAYDECK_BASE_URL", "https://staging.example.com/api") };
        let config = Config::load(&path).unwrap();
        unsafe { remove_env("PAYDECK_BASE_URL") };

        assert_eq!(config.api.base_url, "https://staging.example.com/api");
    }

    #[test]
    fn resolve_path_explicit_wins_over_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env("PAYDECK_CONFIG", "/env/loses.toml") };
        let path = Config::resolve_path(Some("/explicit/wins.toml"));
        unsafe { remove_env("PAYDECK_CONFIG") };
        assert_eq!(path, PathBuf::from("/explicit/wins.toml"));
    }

    #[test]
    fn resolve_path_falls_back_to_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env("PAYDECK_CONFIG") };
        assert_eq!(Config::resolve_path(None), PathBuf::from("paydeck.toml"));
    }
}
