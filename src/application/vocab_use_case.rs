// ============================================================
// Layer 2 — Vocabulary Use Cases
// ============================================================
// Prepares the two files the scorer's embedding table comes from:
//
//   build-vocab:    corpus .txt files + query file
//                     → TextCleaner → Vocab::add → build → save
//                   (encodes the corpus once to report UNK coverage)
//
//   align-vectors:  vocab file + pre-trained vectors
//                     → WordVectors::transform → save
//
// After align-vectors, row i of the vector file belongs to vocab
// id i, which is what ScoreUseCase expects.

use anyhow::{bail, Result};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::data::{
    loader::{load_queries, load_text_files},
    preprocessor::TextCleaner,
};
use crate::domain::traits::{Persistable, TokenCodec};
use crate::infra::{vocab::Vocab, word_vectors::WordVectors};

// ─── build-vocab ──────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildVocabConfig {
    pub corpus_dir:   String,
    pub queries_path: Option<String>,
    pub out_path:     String,
    /// Keep only the most frequent words
    pub max_size:     Option<usize>,
    /// Word tokenisation instead of clean-and-split
    pub tokenize:     bool,
}

pub struct BuildVocabUseCase {
    config: BuildVocabConfig,
}

impl BuildVocabUseCase {
    pub fn new(config: BuildVocabConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<Vocab> {
        let cfg     = &self.config;
        let cleaner = TextCleaner::new();
        let split   = |text: &str| -> Result<Vec<String>> {
            if cfg.tokenize {
                cleaner.tokenize(text)
            } else {
                Ok(cleaner.clean_split(text))
            }
        };

        let mut texts: Vec<String> = load_text_files(&cfg.corpus_dir)?.into_iter().map(|(_, t)| t).collect();
        if let Some(path) = &cfg.queries_path {
            texts.extend(load_queries(path)?.into_values());
        }
        if texts.is_empty() {
            bail!("No text found in '{}' to build a vocabulary from", cfg.corpus_dir);
        }

        let tokenised: Vec<Vec<String>> = texts.iter().map(|t| split(t)).collect::<Result<_>>()?;
        let mut vocab = Vocab::new();
        for token in tokenised.iter().flatten() {
            vocab.add(token);
        }
        vocab.build(cfg.max_size);

        let unknown = tokenised.iter().flat_map(|t| vocab.encode(t)).filter(|&id| id == 0).count();
        let total   = tokenised.iter().map(Vec::len).sum::<usize>();
        tracing::info!("{} of {} corpus tokens map to {}", unknown, total, vocab.decode(&[0]).join(""));
        vocab.save(&cfg.out_path)?;
        tracing::info!("Saved vocabulary of {} entries to '{}'", vocab.len(), cfg.out_path);
        Ok(vocab)
    }
}

// ─── align-vectors ────────────────────────────────────────────────────────────
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignVectorsConfig {
    pub vocab_path:   String,
    pub vectors_path: String,
    pub out_path:     String,
    /// Seed for out-of-vocabulary initialisation
    pub seed:         u64,
}

pub struct AlignVectorsUseCase {
    config: AlignVectorsConfig,
}

impl AlignVectorsUseCase {
    pub fn new(config: AlignVectorsConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<WordVectors> {
        let cfg   = &self.config;
        let vocab = Vocab::load(&cfg.vocab_path)?;
        let raw   = WordVectors::load(&cfg.vectors_path)?;

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let aligned = raw.transform(vocab.words(), &mut rng);
        aligned.save(&cfg.out_path)?;
        tracing::info!(
            "Saved {} vectors of dimension {} to '{}'",
            aligned.len(),
            aligned.dim(),
            cfg.out_path
        );
        Ok(aligned)
    }
}
