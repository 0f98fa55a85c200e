// ============================================================
// Layer 6 — Score Logger
// ============================================================
// Records one CSV row per scored example.
//
// Columns:
//   - id:           sample identifier from the input file
//   - signal:       the aggregated signal, features separated by
//                   spaces (one value for scalar states)
//   - steps:        jump steps taken before stopping
//   - stopped:      whether the example stopped before the budget
//   - total_offset: document tokens read across all steps
//   - complete:     min((d_start + d_offset) / doc_len, 1) at the
//                   last location, as in the batch complete ratio
//
// Example CSV output:
//   id,signal,steps,stopped,total_offset,complete
//   q1-d7,2.000000,3,true,5,1.000000
//   q1-d9,0.500000 1.250000,1,false,2,0.400000
//
// The header is written once; later runs append.
//
// Reference: Rust Book §12 (I/O and File Handling)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

const HEADER: &str = "id,signal,steps,stopped,total_offset,complete";

/// One row of the score log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleScore {
    pub id: String,
    pub signal: Vec<f32>,
    pub steps: usize,
    pub stopped: bool,
    pub total_offset: usize,
    pub complete: f32,
}

impl ExampleScore {
    fn csv_row(&self) -> String {
        let signal: Vec<String> = self.signal.iter().map(|v| format!("{v:.6}")).collect();
        format!(
            "{},{},{},{},{},{:.6}",
            self.id.replace(',', ";"),
            signal.join(" "),
            self.steps,
            self.stopped,
            self.total_offset,
            self.complete,
        )
    }
}

pub struct ScoreLogger {
    csv_path: PathBuf,
}

impl ScoreLogger {
    /// Create the parent directory and write the header if the file
    /// is new.
    pub fn new(csv_path: impl AsRef<Path>) -> Result<Self> {
        let csv_path = csv_path.as_ref().to_path_buf();
        if let Some(dir) = csv_path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("Cannot create '{}'", dir.display()))?;
        }

        if !csv_path.exists() {
            let mut f = fs::File::create(&csv_path)
                .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
            writeln!(f, "{HEADER}")?;
            tracing::debug!("Created score CSV: '{}'", csv_path.display());
        }
        Ok(Self { csv_path })
    }

    pub fn log(&self, scores: &[ExampleScore]) -> Result<()> {
        let mut f = OpenOptions::new().append(true).open(&self.csv_path)?;
        for score in scores {
            writeln!(f, "{}", score.csv_row())?;
        }
        tracing::debug!("Logged {} scores to '{}'", scores.len(), self.csv_path.display());
        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn score(id: &str, signal: Vec<f32>) -> ExampleScore {
        ExampleScore { id: id.into(), signal, steps: 3, stopped: true, total_offset: 5, complete: 1.0 }
    }

    #[test]
    fn test_header_written_once_and_rows_appended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("scores.csv");

        ScoreLogger::new(&path).unwrap().log(&[score("a", vec![2.0])]).unwrap();
        ScoreLogger::new(&path).unwrap().log(&[score("b,c", vec![0.5, 1.25])]).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                HEADER,
                "a,2.000000,3,true,5,1.000000",
                "b;c,0.500000 1.250000,3,true,5,1.000000",
            ]
        );
    }
}
