//! Environment variable utilities for roomsim
//!
//! This module provides utilities for handling environment variables,
//! particularly the ROOMSIM_DATA_DIR variable that points to the room description files.

use crate::constants::{DATA_DIR_VAR, DEFAULT_DATA_DIR};
use std::env;
use std::path::{Path, PathBuf};

/// Error type for environment variable issues
#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(
        "ROOMSIM_DATA_DIR environment variable is not set and no ./data directory was found. Please set it to the directory holding the room files (e.g., export ROOMSIM_DATA_DIR=/path/to/rooms)"
    )]
    DataDirNotSet,

    #[error("ROOMSIM_DATA_DIR points to a non-existent directory: {0}")]
    DataDirNotFound(PathBuf),

    #[error("Failed to create output directory {0}: {1}")]
    OutputDirCreationFailed(PathBuf, std::io::Error),
}

/// Resolve the data directory from an optional environment value and a base directory.
///
/// An explicit value must point to an existing directory. Without one, `<base>/data`
/// is used when it exists.
pub fn resolve_data_dir(env_value: Option<&str>, base: &Path) -> Result<PathBuf, EnvError> {
    if let Some(value) = env_value.filter(|v| !v.is_empty()) {
        let path = PathBuf::from(value);
        if !path.is_dir() {
            return Err(EnvError::DataDirNotFound(path));
        }
        return Ok(path);
    }

    let fallback = base.join(DEFAULT_DATA_DIR);
    if fallback.is_dir() {
        Ok(fallback)
    } else {
        Err(EnvError::DataDirNotSet)
    }
}

/// Get the room data directory
///
/// Reads `ROOMSIM_DATA_DIR` first and falls back to `./data`.
///
/// # Errors
///
/// Returns an error if:
/// - ROOMSIM_DATA_DIR is set but does not point to a directory
/// - ROOMSIM_DATA_DIR is not set and `./data` does not exist
///
/// # Example
///
/// ```no_run
/// use roomsim_env::env_utils::get_data_dir;
///
/// let data_dir = get_data_dir()?;
/// println!("Room files: {}", data_dir.display());
/// # Ok::<(), roomsim_env::env_utils::EnvError>(())
/// ```
pub fn get_data_dir() -> Result<PathBuf, EnvError> {
    let value = env::var(DATA_DIR_VAR).ok();
    let base = env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    resolve_data_dir(value.as_deref(), &base)
}

/// Get an output directory, creating it if necessary
pub fn get_output_dir(path: &Path) -> Result<PathBuf, EnvError> {
    if !path.exists() {
        std::fs::create_dir_all(path)
            .map_err(|e| EnvError::OutputDirCreationFailed(path.to_path_buf(), e))?;
    }
    Ok(path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_explicit_data_dir() {
        let dir = TempDir::new().unwrap();
        let value = dir.path().to_str().unwrap();
        let resolved = resolve_data_dir(Some(value), Path::new("/nonexistent")).unwrap();
        assert_eq!(resolved, dir.path());
    }

    #[test]
    fn test_explicit_data_dir_missing() {
        let result = resolve_data_dir(Some("/definitely/not/here"), Path::new("."));
        assert!(matches!(result, Err(EnvError::DataDirNotFound(_))));
    }

    #[test]
    fn test_fallback_data_dir() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join(DEFAULT_DATA_DIR)).unwrap();

        let resolved = resolve_data_dir(None, dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join(DEFAULT_DATA_DIR));

        // Empty values behave like an unset variable
        let resolved = resolve_data_dir(Some(""), dir.path()).unwrap();
        assert_eq!(resolved, dir.path().join(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_no_data_dir() {
        let dir = TempDir::new().unwrap();
        let result = resolve_data_dir(None, dir.path());
        assert!(matches!(result, Err(EnvError::DataDirNotSet)));
    }

    #[test]
    fn test_output_dir_created() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("reports").join("rooms");
        let created = get_output_dir(&out).unwrap();
        assert!(created.is_dir());
    }
}
