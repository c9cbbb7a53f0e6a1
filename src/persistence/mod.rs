//! JSON file persistence
//!
//! Saves go to a sibling temp file that is renamed over the target, so a
//! crash mid-write leaves the previous file intact. Everything here is best
//! effort: callers log failures and keep playing with defaults.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;

#[derive(Debug)]
pub enum PersistError {
    Io(io::Error),
    Json(serde_json::Error),
}

impl std::fmt::Display for PersistError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PersistError::Io(e) => write!(f, "I/O error: {}", e),
            PersistError::Json(e) => write!(f, "malformed JSON: {}", e),
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PersistError::Io(e) => Some(e),
            PersistError::Json(e) => Some(e),
        }
    }
}

impl From<io::Error> for PersistError {
    fn from(e: io::Error) -> Self {
        PersistError::Io(e)
    }
}

impl From<serde_json::Error> for PersistError {
    fn from(e: serde_json::Error) -> Self {
        PersistError::Json(e)
    }
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T, PersistError> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<(), PersistError> {
    let json = serde_json::to_string_pretty(value)?;
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    let tmp = tmp_path(path);
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Load `path`, falling back to `T::default()` when missing or unreadable
pub fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match load_json(path) {
        Ok(value) => value,
        Err(PersistError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {
            log::info!("No file at {}, using defaults", path.display());
            T::default()
        }
        Err(e) => {
            log::warn!("Failed to load {}: {}; using defaults", path.display(), e);
            T::default()
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        value: u32,
    }

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("echo-runner-test-{}", std::process::id()));
        dir.join(name)
    }

    #[test]
    fn test_save_then_load() {
        let path = scratch("sample.json");
        let sample = Sample {
            name: "echo".into(),
            value: 7,
        };
        save_json(&path, &sample).unwrap();
        let back: Sample = load_json(&path).unwrap();
        assert_eq!(back, sample);
        assert!(!tmp_path(&path).exists());
        let _ = fs::remove_file(&path);
    }

    #[test]
    fn test_missing_file_defaults() {
        let path = scratch("does-not-exist.json");
        let loaded: Sample = load_or_default(&path);
        assert_eq!(loaded, Sample::default());
    }

    #[test]
    fn test_corrupt_file_reports_json_error() {
        let path = scratch("corrupt.json");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(load_json::<Sample>(&path), Err(PersistError::Json(_))));
        let loaded: Sample = load_or_default(&path);
        assert_eq!(loaded, Sample::default());
        let _ = fs::remove_file(&path);
    }
}
