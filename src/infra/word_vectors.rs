// ============================================================
// Layer 6 — Word Vectors
// ============================================================
// Pre-trained embeddings in the plain-text word2vec layout:
//
//   <count> <dim>
//   <word> v1 v2 ... vdim
//   ...
//
// transform() realigns the table to a vocabulary's word order so
// that row i is the vector for vocab id i. Words the file does not
// know get a fresh row drawn uniformly from [-0.1, 0.1].
//
// Reference: Rust Book §9 (Error Handling)
//            Burn Book §3 (Tensors)

use anyhow::{bail, Context, Result};
use burn::prelude::*;
use rand::rngs::StdRng;
use rand::Rng;
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;

use crate::domain::traits::Persistable;

const OOV_RANGE: f32 = 0.1;

#[derive(Debug, Clone, PartialEq)]
pub struct WordVectors {
    words:   Vec<String>,
    /// Row-major `[words.len(), dim]`
    vectors: Vec<f32>,
    dim:     usize,
}

impl WordVectors {
    pub fn new(words: Vec<String>, vectors: Vec<f32>, dim: usize) -> Result<Self> {
        if vectors.len() != words.len() * dim {
            bail!(
                "{} values cannot form {} vectors of dimension {}",
                vectors.len(),
                words.len(),
                dim
            );
        }
        Ok(Self { words, vectors, dim })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn vector(&self, row: usize) -> Option<&[f32]> {
        self.vectors.get(row * self.dim..(row + 1) * self.dim)
    }

    /// Reorder to `vocab_words`. Known words keep their vector;
    /// unknown ones are initialised uniformly in [-0.1, 0.1].
    pub fn transform(&self, vocab_words: &[String], rng: &mut StdRng) -> WordVectors {
        let index: HashMap<&str, usize> =
            self.words.iter().enumerate().map(|(i, w)| (w.as_str(), i)).collect();

        let mut vectors = Vec::with_capacity(vocab_words.len() * self.dim);
        let mut missing = 0usize;
        for word in vocab_words {
            match index.get(word.as_str()).and_then(|&row| self.vector(row)) {
                Some(v) => vectors.extend_from_slice(v),
                None => {
                    missing += 1;
                    vectors.extend((0..self.dim).map(|_| rng.gen_range(-OOV_RANGE..=OOV_RANGE)));
                }
            }
        }
        tracing::info!(
            "Aligned {} words to pre-trained vectors, {} initialised randomly",
            vocab_words.len() - missing,
            missing
        );
        WordVectors { words: vocab_words.to_vec(), vectors, dim: self.dim }
    }

    /// The embedding table as a `[len, dim]` tensor.
    pub fn to_tensor<B: Backend>(&self, device: &B::Device) -> Tensor<B, 2> {
        Tensor::<B, 1>::from_floats(self.vectors.as_slice(), device).reshape([self.len(), self.dim])
    }
}

impl Persistable for WordVectors {
    fn save(&self, path: &str) -> Result<()> {
        let mut out = String::new();
        writeln!(out, "{} {}", self.len(), self.dim)?;
        for (word, row) in self.words.iter().zip(self.vectors.chunks(self.dim.max(1))) {
            let values: Vec<String> = row.iter().map(f32::to_string).collect();
            writeln!(out, "{} {}", word, values.join(" "))?;
        }
        fs::write(path, out).with_context(|| format!("Cannot write word vectors to '{path}'"))?;
        Ok(())
    }

    fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("Cannot read word vectors '{path}'"))?;
        let mut lines = text.lines();

        let header = lines.next().context("Word vector file is empty")?;
        let (count, dim) = match header.split_whitespace().collect::<Vec<_>>()[..] {
            [c, d] => (
                c.parse::<usize>().context("Bad vector count in header")?,
                d.parse::<usize>().context("Bad dimension in header")?,
            ),
            _ => bail!("Header of '{}' must be '<count> <dim>'", path),
        };

        let mut words   = Vec::with_capacity(count);
        let mut vectors = Vec::with_capacity(count * dim);
        for n in 0..count {
            let line = lines
                .next()
                .with_context(|| format!("'{path}' promises {count} vectors but has {n}"))?;
            let mut fields = line.trim_end().split(' ');
            let word = fields.next().unwrap_or_default().to_string();
            let values = fields
                .map(str::parse::<f32>)
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("Bad number in vector for '{word}'"))?;
            if values.len() != dim {
                bail!("Vector for '{}' has {} values, expected {}", word, values.len(), dim);
            }
            words.push(word);
            vectors.extend(values);
        }
        tracing::info!("Loaded {} word vectors of dimension {} from '{}'", count, dim, path);
        Ok(Self { words, vectors, dim })
    }
}
