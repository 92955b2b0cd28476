//! Environment-driven settings.
//!
//! A `.env` file in the working directory is honoured (via `dotenvy`), then the
//! process environment is read. CLI flags override whatever is found here.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::AppError;

const ENV_DATA_DIR: &str = "DIVES_DATA_DIR";
const ENV_HTTP_TIMEOUT: &str = "DIVES_HTTP_TIMEOUT_SECS";

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Directory holding cached raw dataset files.
    pub data_dir: PathBuf,
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let mut settings = Self::default();

        if let Some(dir) = lookup(ENV_DATA_DIR).filter(|v| !v.trim().is_empty()) {
            settings.data_dir = PathBuf::from(dir.trim());
        }

        if let Some(raw) = lookup(ENV_HTTP_TIMEOUT) {
            let secs = raw.trim().parse::<u64>().map_err(|e| {
                AppError::usage(format!("Invalid {ENV_HTTP_TIMEOUT} '{raw}': {e}"))
            })?;
            if secs == 0 {
                return Err(AppError::usage(format!("{ENV_HTTP_TIMEOUT} must be > 0.")));
            }
            settings.http_timeout = Duration::from_secs(secs);
        }

        Ok(settings)
    }

    /// Pick the explicit directory if given, else the configured one, and make sure it exists.
    pub fn resolve_data_dir(&self, explicit: Option<&Path>) -> Result<PathBuf, AppError> {
        let dir = explicit.map(Path::to_path_buf).unwrap_or_else(|| self.data_dir.clone());
        std::fs::create_dir_all(&dir).map_err(|e| {
            AppError::usage(format!("Failed to create data dir '{}': {e}", dir.display()))
        })?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_when_env_is_empty() {
        let settings = Settings::from_lookup(|_| None).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn reads_overrides() {
        let settings = Settings::from_lookup(|key| match key {
            ENV_DATA_DIR => Some("/tmp/dives".to_string()),
            ENV_HTTP_TIMEOUT => Some("5".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(settings.data_dir, PathBuf::from("/tmp/dives"));
        assert_eq!(settings.http_timeout, Duration::from_secs(5));
    }

    #[test]
    fn rejects_bad_timeout() {
        let err = Settings::from_lookup(|key| (key == ENV_HTTP_TIMEOUT).then(|| "soon".to_string()))
            .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn resolve_creates_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nested").join("cache");
        let dir = Settings::default().resolve_data_dir(Some(&target)).unwrap();
        assert!(dir.is_dir());
    }
}
