use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;

/// Replaces `path` with `content` in one step.
/// The content goes to a temporary file in the same directory first, which is then renamed,
/// so a reader never sees a partially written file.
pub fn write_atomic(path: &Path, content: &[u8]) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir).with_context(|| format!("creating directory {}", dir.display()))?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    file.flush()?;
    file.persist(path).with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value)?;
    write_atomic(path, &json)
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    let value = serde_json::from_slice(&content).with_context(|| format!("decoding {}", path.display()))?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Probe {
        name: String,
        values: Vec<f32>,
    }

    #[test]
    fn test_write_then_read_json() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("nested/probe.json");
        let probe = Probe {
            name: "probe".to_string(),
            values: vec![0.5, -1.0],
        };

        write_json(&path, &probe)?;
        let read: Probe = read_json(&path)?;
        assert_eq!(read, probe);
        Ok(())
    }

    #[test]
    fn test_write_atomic_replaces_content() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("file.txt");
        write_atomic(&path, b"first")?;
        write_atomic(&path, b"second")?;
        assert_eq!(fs::read(&path)?, b"second");
        assert_eq!(fs::read_dir(dir.path())?.count(), 1);
        Ok(())
    }

    #[test]
    fn test_read_json_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Probe> = read_json(&dir.path().join("absent.json"));
        assert!(result.is_err());
    }
}
