// ============================================================
// Layer 6 — Config Store
// ============================================================
// JSON persistence for ReaderConfig and for the per-run read
// report.
//
// The report's config block holds every field, so saved on its
// own it repeats a scoring run exactly:
//
//   {
//     "interaction": "dot",
//     "glimpse": "fix_hard",
//     "glimpse_fix_size": 10,
//     ...
//   }
//
// Loading accepts partial files: missing fields take their
// defaults (ReaderConfig is #[serde(default)]).
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::{fs, path::Path};

use crate::ml::config::ReaderConfig;

pub fn load_config(path: impl AsRef<Path>) -> Result<ReaderConfig> {
    read_json(path)
}

/// Pretty-print any serialisable value to `path`.
pub fn write_json<T: Serialize>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json).with_context(|| format!("Cannot write '{}'", path.display()))?;
    tracing::debug!("Wrote '{}'", path.display());
    Ok(())
}

pub fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("Cannot read '{}'", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid JSON in '{}'", path.display()))
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_config_survives_disk() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("reader.json");
        let cfg = ReaderConfig { jump: "all".into(), max_jump_step: 3, ..ReaderConfig::default() };
        write_json(&path, &cfg).unwrap();
        assert_eq!(load_config(&path).unwrap(), cfg);
    }

    #[test]
    fn test_partial_config_takes_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("partial.json");
        fs::write(&path, r#"{"represent": "interaction_copy_hard", "max_jump_offset": 5}"#).unwrap();
        let cfg = load_config(&path).unwrap();
        assert_eq!(cfg.represent, "interaction_copy_hard");
        assert_eq!(cfg.max_jump_offset, Some(5));
        assert_eq!(cfg.glimpse, ReaderConfig::default().glimpse);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_config("/definitely/not/here.json").is_err());
    }
}
