// ============================================================
// Layer 6 — Vocabulary
// ============================================================
// Word ↔ id mapping built from corpus word counts.
//
// Id layout after build():
//
//   0            UNK (named "<UNK>", wrapped in more angle
//                brackets while it collides with a real word)
//   1..=n        words by descending count, ties by first sight
//
// File format, one entry per line in id order:
//
//   <UNK>\t0
//   the\t1532
//   of\t871
//
// Reference: Rust Book §8 (HashMap)
//            Rust Book §9 (Error Handling)

use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;

use crate::domain::traits::{Persistable, TokenCodec};

const DEFAULT_UNK: &str = "<UNK>";

#[derive(Debug, Clone)]
pub struct Vocab {
    unk:        String,
    counts:     HashMap<String, usize>,
    // Insertion order keeps ties stable across runs
    first_seen: Vec<String>,
    ids:        HashMap<String, u32>,
    words:      Vec<String>,
}

impl Default for Vocab {
    fn default() -> Self {
        Self::new()
    }
}

impl Vocab {
    pub fn new() -> Self {
        Self {
            unk:        DEFAULT_UNK.to_string(),
            counts:     HashMap::new(),
            first_seen: Vec::new(),
            ids:        HashMap::new(),
            words:      Vec::new(),
        }
    }

    /// Count one occurrence of `word`.
    pub fn add(&mut self, word: &str) {
        match self.counts.get_mut(word) {
            Some(count) => *count += 1,
            None => {
                self.counts.insert(word.to_string(), 1);
                self.first_seen.push(word.to_string());
            }
        }
    }

    /// Assign ids to the `max_size` most frequent words (all of them
    /// when `None`). Id 0 is reserved for UNK.
    pub fn build(&mut self, max_size: Option<usize>) {
        let mut ranked: Vec<&String> = self.first_seen.iter().collect();
        // sort_by is stable, so equal counts keep first-seen order
        ranked.sort_by(|a, b| self.counts[*b].cmp(&self.counts[*a]));
        ranked.truncate(max_size.unwrap_or(usize::MAX));

        let mut unk = DEFAULT_UNK.to_string();
        while ranked.iter().any(|w| **w == unk) {
            unk = format!("<{unk}>");
        }

        let mut words = Vec::with_capacity(ranked.len() + 1);
        words.push(unk.clone());
        words.extend(ranked.into_iter().cloned());

        self.ids = words.iter().enumerate().map(|(i, w)| (w.clone(), i as u32)).collect();
        self.unk = unk;
        tracing::info!("Vocab size: {}, distinct words seen: {}", words.len(), self.counts.len());
        self.words = words;
    }

    /// Words in id order, UNK first.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn id(&self, word: &str) -> u32 {
        if word == self.unk {
            return 0;
        }
        self.ids.get(word).copied().unwrap_or(0)
    }

    pub fn count(&self, word: &str) -> usize {
        self.counts.get(word).copied().unwrap_or(0)
    }
}

impl TokenCodec for Vocab {
    fn encode(&self, tokens: &[String]) -> Vec<u32> {
        tokens.iter().map(|t| self.id(t)).collect()
    }

    /// Ids past the end decode to UNK.
    fn decode(&self, ids: &[u32]) -> Vec<String> {
        ids.iter()
            .map(|&i| self.words.get(i as usize).unwrap_or(&self.unk).clone())
            .collect()
    }

    fn len(&self) -> usize {
        self.words.len()
    }
}

impl Persistable for Vocab {
    fn save(&self, path: &str) -> Result<()> {
        let mut out = String::new();
        for (i, w) in self.words.iter().enumerate() {
            let count = if i == 0 { 0 } else { self.count(w) };
            writeln!(out, "{w}\t{count}")?;
        }
        fs::write(path, out).with_context(|| format!("Cannot write vocab to '{path}'"))?;
        tracing::debug!("Saved {} vocab entries to '{}'", self.words.len(), path);
        Ok(())
    }

    /// The first line names the UNK token.
    fn load(path: &str) -> Result<Self> {
        let text = fs::read_to_string(path).with_context(|| format!("Cannot read vocab '{path}'"))?;

        let mut vocab = Vocab::new();
        for (n, line) in text.lines().enumerate() {
            let Some((word, count)) = line.split_once('\t') else {
                bail!("Line {} of '{}' is not 'word<TAB>count'", n + 1, path);
            };
            let count: usize = count
                .trim()
                .parse()
                .with_context(|| format!("Bad count on line {} of '{}'", n + 1, path))?;
            if n == 0 {
                vocab.unk = word.to_string();
            } else {
                vocab.counts.insert(word.to_string(), count);
                vocab.first_seen.push(word.to_string());
            }
            vocab.ids.insert(word.to_string(), n as u32);
            vocab.words.push(word.to_string());
        }
        Ok(vocab)
    }
}
