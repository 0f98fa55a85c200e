// ============================================================
// Layer 2 — ScoreUseCase
// ============================================================
// Runs the selective-jump reader over a file of encoded
// query/document samples:
//
//   Step 1: Resolve the reader config   (Layer 6 - infra, Layer 5 - ml)
//   Step 2: Load the embedding table    (Layer 6 - infra)
//   Step 3: Load and check the samples  (Layer 4 - data)
//   Step 4: Read batch by batch         (Layer 5 - ml)
//   Step 5: Log scores, write report    (Layer 6 - infra)
//
// The backend is chosen once in execute(); everything below it is
// generic over Backend.
//
// Reference: Rust Book §10 (Generic Types)
//            Burn Book §2 (Backends)

use anyhow::{bail, Context, Result};
use burn::data::dataset::Dataset;
use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::data::{batcher::ReadBatcher, dataset::ReadDataset, dataset::ReadSample, loader::load_samples};
use crate::domain::location::Location;
use crate::domain::traits::Persistable;
use crate::infra::{
    config_store::{load_config, write_json},
    metrics::{ExampleScore, ScoreLogger},
    word_vectors::WordVectors,
};
use crate::ml::config::ReaderConfig;
use crate::ml::reader::SelectiveJumpReader;

// ─── Configuration ────────────────────────────────────────────────────────────
/// Field-by-field overrides applied on top of the loaded ReaderConfig.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReaderOverrides {
    pub interaction:      Option<String>,
    pub glimpse:          Option<String>,
    pub glimpse_fix_size: Option<usize>,
    pub jump:             Option<String>,
    pub min_density:      Option<f32>,
    pub use_ratio:        Option<bool>,
    pub min_jump_offset:  Option<usize>,
    pub represent:        Option<String>,
    pub separate:         Option<bool>,
    pub aggregate:        Option<String>,
    pub rnn_size:         Option<usize>,
    pub max_jump_offset:  Option<usize>,
    pub max_jump_offset2: Option<usize>,
    pub keep_prob:        Option<f64>,
    pub max_jump_step:    Option<usize>,
    pub mask_sampling:    Option<bool>,
    pub mask_seed:        Option<u64>,
}

impl ReaderOverrides {
    pub fn apply(&self, cfg: &mut ReaderConfig) {
        fn set<T: Clone>(target: &mut T, value: &Option<T>) {
            if let Some(v) = value {
                *target = v.clone();
            }
        }
        fn set_some<T: Clone>(target: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *target = value.clone();
            }
        }

        set(&mut cfg.interaction, &self.interaction);
        set(&mut cfg.glimpse, &self.glimpse);
        set_some(&mut cfg.glimpse_fix_size, &self.glimpse_fix_size);
        set(&mut cfg.jump, &self.jump);
        set_some(&mut cfg.min_density, &self.min_density);
        set(&mut cfg.use_ratio, &self.use_ratio);
        set(&mut cfg.min_jump_offset, &self.min_jump_offset);
        set(&mut cfg.represent, &self.represent);
        set(&mut cfg.separate, &self.separate);
        set(&mut cfg.aggregate, &self.aggregate);
        set_some(&mut cfg.rnn_size, &self.rnn_size);
        set_some(&mut cfg.max_jump_offset, &self.max_jump_offset);
        set_some(&mut cfg.max_jump_offset2, &self.max_jump_offset2);
        set(&mut cfg.keep_prob, &self.keep_prob);
        set(&mut cfg.max_jump_step, &self.max_jump_step);
        set(&mut cfg.mask_sampling, &self.mask_sampling);
        set(&mut cfg.mask_seed, &self.mask_seed);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreConfig {
    /// Encoded samples, JSON array or JSON lines
    pub samples_path: String,
    /// Word vectors aligned to the vocabulary ids
    pub vectors_path: String,
    /// Optional ReaderConfig JSON; defaults otherwise
    pub config_path:  Option<String>,
    pub overrides:    ReaderOverrides,
    pub batch_size:   usize,
    pub scores_csv:   String,
    /// Optional JSON report with per-example jump locations
    pub report_path:  Option<String>,
    /// NdArray instead of Wgpu
    pub cpu:          bool,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            samples_path: "data/samples.jsonl".to_string(),
            vectors_path: "data/vectors.txt".to_string(),
            config_path:  None,
            overrides:    ReaderOverrides::default(),
            batch_size:   32,
            scores_csv:   "output/scores.csv".to_string(),
            report_path:  None,
            cpu:          false,
        }
    }
}

// ─── Report ───────────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExampleTrace {
    pub id:        String,
    pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub stop_ratio:     f32,
    pub complete_ratio: f32,
    pub examples:       Vec<ExampleTrace>,
}

/// What a scoring run produced, also written as the JSON report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreSummary {
    pub config:     ReaderConfig,
    pub examples:   usize,
    pub mean_steps: f32,
    pub stop_ratio: f32,
    pub batches:    Vec<BatchReport>,
}

// ─── ScoreUseCase ─────────────────────────────────────────────────────────────
pub struct ScoreUseCase {
    config: ScoreConfig,
}

impl ScoreUseCase {
    pub fn new(config: ScoreConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<ScoreSummary> {
        if self.config.cpu {
            let device = burn::backend::ndarray::NdArrayDevice::default();
            tracing::info!("Using NdArray device: {:?}", device);
            self.run::<burn::backend::NdArray>(&device)
        } else {
            let device = burn::backend::wgpu::WgpuDevice::default();
            tracing::info!("Using WGPU device: {:?}", device);
            self.run::<burn::backend::Wgpu>(&device)
        }
    }

    pub fn run<B: Backend>(&self, device: &B::Device) -> Result<ScoreSummary> {
        let cfg = &self.config;

        // ── Step 1: Reader config ─────────────────────────────────────────────
        let mut reader_cfg = match &cfg.config_path {
            Some(path) => load_config(path)?,
            None => ReaderConfig::default(),
        };
        cfg.overrides.apply(&mut reader_cfg);
        let plan = reader_cfg.resolve().context("Invalid reader configuration")?;
        tracing::info!(
            "Reader: glimpse={} jump={} represent={} aggregate={} max_jump_step={}",
            reader_cfg.glimpse,
            reader_cfg.jump,
            reader_cfg.represent,
            reader_cfg.aggregate,
            reader_cfg.max_jump_step
        );

        // ── Step 2: Embedding table ───────────────────────────────────────────
        let vectors = WordVectors::load(&cfg.vectors_path)?;
        if vectors.is_empty() {
            bail!("Word vector file '{}' has no entries", cfg.vectors_path);
        }

        // ── Step 3: Samples ───────────────────────────────────────────────────
        let samples = load_samples(&cfg.samples_path)?;
        check_ids(&samples, vectors.len())?;
        let dataset = ReadDataset::new(samples);
        tracing::info!("Scoring {} samples in batches of {}", dataset.len(), cfg.batch_size);

        // ── Step 4: Read ──────────────────────────────────────────────────────
        let reader  = SelectiveJumpReader::<B>::new(plan, vectors.to_tensor::<B>(device), device);
        let batcher = ReadBatcher::<B>::new(device.clone());
        let logger  = ScoreLogger::new(&cfg.scores_csv)?;

        let mut batches     = Vec::new();
        let mut total_steps = 0usize;
        let mut stopped     = 0usize;
        for (n, chunk) in dataset.chunks(cfg.batch_size).enumerate() {
            let batch  = batcher.batch(chunk).with_context(|| format!("Batch {n} is malformed"))?;
            let output = reader.read(&batch).with_context(|| format!("Reading batch {n} failed"))?;
            let diag   = &output.diagnostics;

            let [rows, features] = output.signal.dims();
            tracing::debug!(
                match_dims = ?diag.match_matrix.dims(),
                embed_dims = ?diag.doc_emb.dims(),
                "batch {n} read"
            );
            let values: Vec<f32> = output.signal.clone().into_data().iter::<f32>().collect();

            // ── Step 5: Log ───────────────────────────────────────────────────
            let scores: Vec<ExampleScore> = (0..rows)
                .map(|i| ExampleScore {
                    id:           chunk[i].id.clone(),
                    signal:       values[i * features..(i + 1) * features].to_vec(),
                    steps:        diag.steps[i],
                    stopped:      diag.stopped[i],
                    total_offset: diag.total_offset[i] as usize,
                    complete:     diag.complete[i],
                })
                .collect();
            logger.log(&scores)?;

            total_steps += diag.steps.iter().sum::<usize>();
            stopped     += diag.stopped.iter().filter(|&&s| s).count();
            tracing::info!(
                "Batch {}: {} examples, stop ratio {:.3}, complete ratio {:.3}",
                n,
                rows,
                diag.stop_ratio,
                diag.complete_ratio
            );

            batches.push(BatchReport {
                stop_ratio:     diag.stop_ratio,
                complete_ratio: diag.complete_ratio,
                examples: chunk
                    .iter()
                    .zip(&diag.locations)
                    .map(|(s, locs)| ExampleTrace { id: s.id.clone(), locations: locs.clone() })
                    .collect(),
            });
        }

        let examples = dataset.len();
        let summary = ScoreSummary {
            config:     reader_cfg,
            examples,
            mean_steps: if examples == 0 { 0.0 } else { total_steps as f32 / examples as f32 },
            stop_ratio: if examples == 0 { 0.0 } else { stopped as f32 / examples as f32 },
            batches,
        };
        if let Some(path) = &cfg.report_path {
            write_json(path, &summary)?;
            tracing::info!("Report written to '{}'", path);
        }
        tracing::info!("Scores written to '{}'", logger.csv_path().display());
        Ok(summary)
    }
}

// Every id must index a row of the embedding table
fn check_ids(samples: &[ReadSample], vocab_rows: usize) -> Result<()> {
    for s in samples {
        if let Some(&bad) = s.doc.iter().chain(&s.query).find(|&&id| id as usize >= vocab_rows) {
            bail!(
                "Sample '{}' uses token id {} but the embedding table has {} rows",
                s.id,
                bad,
                vocab_rows
            );
        }
    }
    Ok(())
}
