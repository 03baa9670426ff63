use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Saves a serializable object to a file atomically.
///
/// The JSON is written to a sibling temporary file, flushed to disk, and then
/// renamed over the target. A crash at any point leaves either the previous
/// contents or the new contents, never a mix.
///
/// # Arguments
///
/// * `path` - The target file path.
/// * `state` - The object to serialize and save.
///
/// # Returns
///
/// * `Ok(())` on success.
/// * `Err` on serialization or IO failure.
pub fn save_state<T: Serialize>(path: &Path, state: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).context("Failed to create parent directory")?;
        }
    }

    let json = serde_json::to_string_pretty(state).context("Failed to serialize state")?;

    // Same directory as the target so the rename stays on one filesystem.
    let temp_path = temp_path_for(path);
    let mut temp_file = std::fs::File::create(&temp_path)
        .with_context(|| format!("Failed to create temp file {}", temp_path.display()))?;

    temp_file
        .write_all(json.as_bytes())
        .context("Failed to write to temp file")?;
    temp_file.sync_all().context("Failed to sync temp file")?;
    drop(temp_file);

    std::fs::rename(&temp_path, path)
        .with_context(|| format!("Failed to rename temp file to {}", path.display()))?;

    Ok(())
}

/// Loads a deserializable object from a file.
///
/// # Returns
///
/// * `Ok(T)` containing the deserialized object.
/// * `Err` if the file doesn't exist, cannot be read, or deserialization fails.
pub fn load_state<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open state file {}", path.display()))?;
    let reader = std::io::BufReader::new(file);
    let state = serde_json::from_reader(reader)
        .with_context(|| format!("Failed to deserialize state from {}", path.display()))?;
    Ok(state)
}

/// Like `load_state`, but a missing file yields `None` instead of an error.
pub fn load_state_if_exists<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    load_state(path).map(Some)
}

fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Sample {
        name: String,
        value: f64,
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("state.json");
        let sample = Sample {
            name: "ledger".into(),
            value: 42.5,
        };

        save_state(&path, &sample).unwrap();
        let loaded: Sample = load_state(&path).unwrap();
        assert_eq!(loaded, sample);
        assert!(!dir.path().join("nested").join("state.json.tmp").exists());
    }

    #[test]
    fn test_save_replaces_previous_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        save_state(&path, &Sample { name: "a".into(), value: 1.0 }).unwrap();
        save_state(&path, &Sample { name: "b".into(), value: 2.0 }).unwrap();
        let loaded: Sample = load_state(&path).unwrap();
        assert_eq!(loaded.name, "b");
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.json");
        assert!(load_state::<Sample>(&path).is_err());
        assert!(load_state_if_exists::<Sample>(&path).unwrap().is_none());
    }
}
