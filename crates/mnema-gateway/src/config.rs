//! Configuration vault – reads/writes `~/.mnema/config.toml`.

use mnema_store::StoreConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Persisted gateway configuration stored in `~/.mnema/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// TCP port the JSON gateway listens on.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum memory entries across all layers; 0 means unbounded.
    #[serde(default)]
    pub memory_capacity: usize,

    /// Blend retention for emotional updates.
    #[serde(default = "default_emotion_retention")]
    pub emotion_retention: f64,

    /// Per-second emotional decay factor.
    #[serde(default = "default_emotion_decay")]
    pub emotion_decay_per_sec: f64,

    /// Raw image payloads retained alongside visual records.
    #[serde(default = "default_payload_retention")]
    pub payload_retention: usize,

    /// Log rendering, `"compact"` or `"json"`.
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log filter directive used when `RUST_LOG` is absent.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
}

fn default_port() -> u16 {
    7977
}
fn default_log_format() -> String {
    "compact".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_emotion_retention() -> f64 {
    StoreConfig::default().emotion_retention
}
fn default_emotion_decay() -> f64 {
    StoreConfig::default().emotion_decay_per_sec
}
fn default_payload_retention() -> usize {
    StoreConfig::default().payload_retention
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            memory_capacity: 0,
            emotion_retention: default_emotion_retention(),
            emotion_decay_per_sec: default_emotion_decay(),
            payload_retention: default_payload_retention(),
            log_format: default_log_format(),
            log_filter: default_log_filter(),
        }
    }
}

impl GatewayConfig {
    /// The store parameters carried by this configuration.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            memory_capacity: self.memory_capacity,
            emotion_retention: self.emotion_retention,
            emotion_decay_per_sec: self.emotion_decay_per_sec,
            payload_retention: self.payload_retention,
        }
    }
}

/// Return the path to `~/.mnema/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
/// Extracted for testability without mutating environment variables.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".mnema").join("config.toml")
}

/// Load the config from disk. Returns `None` if the file does not exist.
pub fn load() -> Result<Option<GatewayConfig>, String> {
    load_from(&config_path())
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &PathBuf) -> Result<Option<GatewayConfig>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: GatewayConfig =
        toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg);
    Ok(Some(cfg))
}

/// Apply `MNEMA_*` environment variable overrides to `cfg`.
///
/// Supported variables:
///
/// | Variable | Config field |
/// |---|---|
/// | `MNEMA_PORT` | `port` |
/// | `MNEMA_MEMORY_CAPACITY` | `memory_capacity` |
/// | `MNEMA_EMOTION_DECAY` | `emotion_decay_per_sec` |
/// | `MNEMA_PAYLOAD_RETENTION` | `payload_retention` |
/// | `MNEMA_LOG_FORMAT` | `log_format` |
/// | `MNEMA_LOG_FILTER` | `log_filter` |
pub fn apply_env_overrides(cfg: &mut GatewayConfig) {
    if let Ok(v) = std::env::var("MNEMA_PORT")
        && let Ok(port) = v.parse::<u16>()
    {
        cfg.port = port;
    }
    if let Ok(v) = std::env::var("MNEMA_MEMORY_CAPACITY")
        && let Ok(capacity) = v.parse::<usize>()
    {
        cfg.memory_capacity = capacity;
    }
    if let Ok(v) = std::env::var("MNEMA_EMOTION_DECAY")
        && let Ok(decay) = v.parse::<f64>()
    {
        cfg.emotion_decay_per_sec = decay;
    }
    if let Ok(v) = std::env::var("MNEMA_PAYLOAD_RETENTION")
        && let Ok(retention) = v.parse::<usize>()
    {
        cfg.payload_retention = retention;
    }
    if let Ok(v) = std::env::var("MNEMA_LOG_FORMAT") {
        cfg.log_format = v;
    }
    if let Ok(v) = std::env::var("MNEMA_LOG_FILTER") {
        cfg.log_filter = v;
    }
}

/// Save the config to disk, creating `~/.mnema/` if necessary.
pub fn save(cfg: &GatewayConfig) -> Result<(), String> {
    save_to(cfg, &config_path())
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &GatewayConfig, path: &PathBuf) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| format!("Failed to create config directory: {}", e))?;
        // Restrict the config directory to the owner only (rwx------) on Unix.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(parent, fs::Permissions::from_mode(0o700))
                .map_err(|e| format!("Failed to set config directory permissions: {}", e))?;
        }
    }
    let raw =
        toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))?;
    // Write the file with owner-only read/write (rw-------) on Unix.
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(path)
            .and_then(|mut f| {
                use std::io::Write;
                f.write_all(raw.as_bytes())
            })
            .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    }
    #[cfg(not(unix))]
    fs::write(path, raw)
        .map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = GatewayConfig::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.port, 7977);
        assert_eq!(loaded.memory_capacity, 0);
        assert_eq!(loaded.payload_retention, 100);
    }

    #[test]
    fn config_path_points_to_mnema_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".mnema"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        let result = load_from(&path).expect("no error");
        assert!(result.is_none());
    }

    #[cfg(unix)]
    #[test]
    fn config_file_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = GatewayConfig::default();
        save_to(&cfg, &path).expect("save");

        let file_meta = std::fs::metadata(&path).expect("file metadata");
        let file_mode = file_meta.permissions().mode() & 0o777;
        assert_eq!(file_mode, 0o600, "config file must have 0o600 permissions");

        let dir_meta = std::fs::metadata(path.parent().unwrap()).expect("dir metadata");
        let dir_mode = dir_meta.permissions().mode() & 0o777;
        assert_eq!(dir_mode, 0o700, "config directory must have 0o700 permissions");
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        std::fs::create_dir_all(path.parent().unwrap()).expect("mkdir");
        std::fs::write(&path, "port = 9000\n").expect("write");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.port, 9000);
        assert_eq!(
            loaded.emotion_decay_per_sec,
            GatewayConfig::default().emotion_decay_per_sec
        );
    }

    #[test]
    fn apply_env_overrides_changes_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("MNEMA_PORT", "8123") };
        let mut cfg = GatewayConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, 8123);
        unsafe { std::env::remove_var("MNEMA_PORT") };
    }

    #[test]
    fn apply_env_overrides_ignores_invalid_port() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("MNEMA_PORT", "not-a-port") };
        let mut cfg = GatewayConfig::default();
        let original = cfg.port;
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.port, original);
        unsafe { std::env::remove_var("MNEMA_PORT") };
    }

    #[test]
    fn apply_env_overrides_changes_memory_capacity() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("MNEMA_MEMORY_CAPACITY", "512") };
        let mut cfg = GatewayConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.memory_capacity, 512);
        unsafe { std::env::remove_var("MNEMA_MEMORY_CAPACITY") };
    }

    #[test]
    fn apply_env_overrides_changes_log_settings() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe { std::env::set_var("MNEMA_LOG_FORMAT", "json") };
        unsafe { std::env::set_var("MNEMA_LOG_FILTER", "mnema_gateway=debug") };
        let mut cfg = GatewayConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.log_format, "json");
        assert_eq!(cfg.log_filter, "mnema_gateway=debug");
        unsafe { std::env::remove_var("MNEMA_LOG_FORMAT") };
        unsafe { std::env::remove_var("MNEMA_LOG_FILTER") };
    }

    #[test]
    fn store_config_carries_all_tunables() {
        let cfg = GatewayConfig {
            port: 1,
            memory_capacity: 42,
            emotion_retention: 0.4,
            emotion_decay_per_sec: 0.9,
            payload_retention: 7,
            ..GatewayConfig::default()
        };
        let store = cfg.store_config();
        assert_eq!(store.memory_capacity, 42);
        assert_eq!(store.emotion_retention, 0.4);
        assert_eq!(store.emotion_decay_per_sec, 0.9);
        assert_eq!(store.payload_retention, 7);
    }
}
