use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::app_dirs::AppDirs;
use crate::platform::Platform;
use crate::session::{Difficulty, SessionConfig};

/// Preferences remembered between runs. Scores are never stored.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub difficulty: Difficulty,
    pub challenge_count: usize,
    pub step_timeout_ms: u64,
    /// None means detect at startup.
    pub platform: Option<Platform>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::Standard,
            challenge_count: 5,
            step_timeout_ms: 1500,
            platform: None,
        }
    }
}

impl Config {
    pub fn platform(&self) -> Platform {
        self.platform.unwrap_or_else(Platform::detect)
    }

    /// Session configuration with an optional explicit time limit taking
    /// precedence over the difficulty tier.
    pub fn session_config(&self, time_limit: Option<Duration>) -> SessionConfig {
        let mut config = SessionConfig::from_difficulty(self.difficulty, self.platform());
        if let Some(limit) = time_limit {
            config.time_limit = limit;
        }
        config.step_timeout = Duration::from_millis(self.step_timeout_ms);
        config
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        let path = AppDirs::config_path().unwrap_or_else(|| PathBuf::from("keydrill_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn load(&self) -> Config {
        match fs::read(&self.path) {
            Ok(bytes) => serde_json::from_slice::<Config>(&bytes).unwrap_or_else(|err| {
                tracing::warn!(path = %self.path.display(), error = %err, "ignoring unreadable config");
                Config::default()
            }),
            Err(_) => Config::default(),
        }
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn roundtrip_default_config() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("config.json"));
        let cfg = Config::default();
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn save_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let store = FileConfigStore::with_path(dir.path().join("nested/deeper/config.json"));
        let cfg = Config {
            difficulty: Difficulty::Strict,
            challenge_count: 3,
            step_timeout_ms: 900,
            platform: Some(Platform::Mac),
        };
        store.save(&cfg).unwrap();
        assert_eq!(store.load(), cfg);
    }

    #[test]
    fn missing_or_corrupt_file_falls_back_to_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        let store = FileConfigStore::with_path(&path);
        assert_eq!(store.load(), Config::default());

        fs::write(&path, b"{ not json").unwrap();
        assert_eq!(store.load(), Config::default());
    }

    #[test]
    fn partial_file_keeps_defaults_for_missing_fields() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, br#"{ "difficulty": "relaxed" }"#).unwrap();
        let cfg = FileConfigStore::with_path(&path).load();
        assert_eq!(cfg.difficulty, Difficulty::Relaxed);
        assert_eq!(cfg.challenge_count, 5);
    }

    #[test]
    fn session_config_prefers_explicit_time_limit() {
        let cfg = Config {
            platform: Some(Platform::Other),
            ..Config::default()
        };
        let session = cfg.session_config(None);
        assert_eq!(session.time_limit, Duration::from_secs(10));
        assert_eq!(session.step_timeout, Duration::from_millis(1500));
        assert_eq!(session.platform, Platform::Other);

        let session = cfg.session_config(Some(Duration::from_secs(3)));
        assert_eq!(session.time_limit, Duration::from_secs(3));
    }
}
