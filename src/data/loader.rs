// ============================================================
// Layer 4 — File Loaders
// ============================================================
// Reads the three kinds of input files the CLI works with:
//
//   queries.tsv    qid<TAB>query text, one per line
//   samples.json   encoded, padded ReadSamples as a JSON
//                  array or one JSON object per line
//   corpus dir     plain .txt documents, one per file, used to
//                  build a vocabulary
//
// Malformed lines are skipped with a warning rather than failing
// the whole file; unreadable files are errors.
//
// Reference: Rust Book §9 (Error Handling)
//            Rust Book §12 (Reading a File)

use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::{fs, path::Path};

use crate::data::dataset::ReadSample;

/// Load a `qid\tquery` file into an ordered map.
pub fn load_queries(path: impl AsRef<Path>) -> Result<BTreeMap<String, String>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read query file '{}'", path.display()))?;

    let mut queries = BTreeMap::new();
    for (n, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match line.split_once('\t') {
            Some((qid, query)) => {
                queries.insert(qid.trim().to_string(), query.trim_end().to_string());
            }
            None => tracing::warn!("Skipping line {} of '{}': no tab separator", n + 1, path.display()),
        }
    }
    tracing::debug!("Loaded {} queries from '{}'", queries.len(), path.display());
    Ok(queries)
}

/// Load samples from a JSON array or a JSON-lines file.
pub fn load_samples(path: impl AsRef<Path>) -> Result<Vec<ReadSample>> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .with_context(|| format!("Cannot read sample file '{}'", path.display()))?;

    if text.trim_start().starts_with('[') {
        return serde_json::from_str(&text)
            .with_context(|| format!("Invalid sample array in '{}'", path.display()));
    }

    let mut samples = Vec::new();
    for (n, line) in text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty()) {
        match serde_json::from_str::<ReadSample>(line) {
            Ok(sample) => samples.push(sample),
            Err(e) => tracing::warn!("Skipping line {} of '{}': {}", n + 1, path.display(), e),
        }
    }
    Ok(samples)
}

/// Read every `.txt` file in `dir` as (file name, contents).
/// A missing directory yields an empty corpus.
pub fn load_text_files(dir: impl AsRef<Path>) -> Result<Vec<(String, String)>> {
    let dir = dir.as_ref();
    if !dir.exists() {
        tracing::warn!("Corpus directory '{}' does not exist, returning an empty corpus", dir.display());
        return Ok(Vec::new());
    }

    let mut docs = Vec::new();
    for entry in fs::read_dir(dir).with_context(|| format!("Cannot read directory '{}'", dir.display()))? {
        let path = entry?.path();
        if path.extension().and_then(|e| e.to_str()) != Some("txt") {
            continue;
        }
        match fs::read_to_string(&path) {
            Ok(text) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or("unknown")
                    .to_string();
                docs.push((name, text));
            }
            Err(e) => tracing::warn!("Skipping '{}': {}", path.display(), e),
        }
    }
    docs.sort_by(|a, b| a.0.cmp(&b.0));
    tracing::info!("Loaded {} documents from '{}'", docs.len(), dir.display());
    Ok(docs)
}
