// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `score`, `build-vocab` and
// `align-vectors`, and all their flags.
//
// Reader flags are all optional: anything given on the command
// line overrides the --config file, anything omitted keeps the
// file's (or the default) value.
//
// Reference: Rust Book §12 (Building a CLI Program)

use clap::{Args, Subcommand};

use crate::application::score_use_case::{ReaderOverrides, ScoreConfig};
use crate::application::vocab_use_case::{AlignVectorsConfig, BuildVocabConfig};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Score encoded query/document samples with the reader
    Score(ScoreArgs),

    /// Build a vocabulary from a text corpus and query file
    BuildVocab(BuildVocabArgs),

    /// Realign pre-trained word vectors to a vocabulary
    AlignVectors(AlignVectorsArgs),
}

// ─── score ────────────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Encoded samples (JSON array or JSON lines)
    #[arg(long, default_value = "data/samples.jsonl")]
    pub samples: String,

    /// Word vectors aligned to the vocabulary
    #[arg(long, default_value = "data/vectors.txt")]
    pub vectors: String,

    /// ReaderConfig JSON file
    #[arg(long)]
    pub config: Option<String>,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Per-example score CSV (appended to if it exists)
    #[arg(long, default_value = "output/scores.csv")]
    pub scores_csv: String,

    /// JSON report with per-example jump locations
    #[arg(long)]
    pub report: Option<String>,

    /// Run on the CPU (NdArray) instead of WGPU
    #[arg(long)]
    pub cpu: bool,

    #[command(flatten)]
    pub reader: ReaderArgs,
}

/// Reader settings that override the config file.
#[derive(Args, Debug, Default)]
pub struct ReaderArgs {
    /// dot | cosine | indicator
    #[arg(long)]
    pub interaction: Option<String>,

    /// fix_hard | all_next_hard
    #[arg(long)]
    pub glimpse: Option<String>,

    #[arg(long)]
    pub glimpse_fix_size: Option<usize>,

    /// max_hard | min_density_hard | all | test
    #[arg(long)]
    pub jump: Option<String>,

    #[arg(long)]
    pub min_density: Option<f32>,

    /// Treat min_density as a fraction of the best row density
    #[arg(long)]
    pub use_ratio: Option<bool>,

    #[arg(long)]
    pub min_jump_offset: Option<usize>,

    /// sum_hard | interaction_copy_hard | interaction_cnn_hard |
    /// interaction_cnn_hard_resize | rnn_hard | cnn_hard | test
    #[arg(long)]
    pub represent: Option<String>,

    /// Separate query convolution for cnn_hard
    #[arg(long)]
    pub separate: Option<bool>,

    /// max | sum | interaction_concat
    #[arg(long)]
    pub aggregate: Option<String>,

    #[arg(long)]
    pub rnn_size: Option<usize>,

    #[arg(long)]
    pub max_jump_offset: Option<usize>,

    #[arg(long)]
    pub max_jump_offset2: Option<usize>,

    #[arg(long)]
    pub keep_prob: Option<f64>,

    #[arg(long)]
    pub max_jump_step: Option<usize>,

    #[arg(long)]
    pub mask_sampling: Option<bool>,

    #[arg(long)]
    pub mask_seed: Option<u64>,
}

impl From<ReaderArgs> for ReaderOverrides {
    fn from(a: ReaderArgs) -> Self {
        ReaderOverrides {
            interaction:      a.interaction,
            glimpse:          a.glimpse,
            glimpse_fix_size: a.glimpse_fix_size,
            jump:             a.jump,
            min_density:      a.min_density,
            use_ratio:        a.use_ratio,
            min_jump_offset:  a.min_jump_offset,
            represent:        a.represent,
            separate:         a.separate,
            aggregate:        a.aggregate,
            rnn_size:         a.rnn_size,
            max_jump_offset:  a.max_jump_offset,
            max_jump_offset2: a.max_jump_offset2,
            keep_prob:        a.keep_prob,
            max_jump_step:    a.max_jump_step,
            mask_sampling:    a.mask_sampling,
            mask_seed:        a.mask_seed,
        }
    }
}

/// The application layer never sees clap types.
impl From<ScoreArgs> for ScoreConfig {
    fn from(a: ScoreArgs) -> Self {
        ScoreConfig {
            samples_path: a.samples,
            vectors_path: a.vectors,
            config_path:  a.config,
            overrides:    a.reader.into(),
            batch_size:   a.batch_size,
            scores_csv:   a.scores_csv,
            report_path:  a.report,
            cpu:          a.cpu,
        }
    }
}

// ─── build-vocab ──────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct BuildVocabArgs {
    /// Directory of .txt documents
    #[arg(long, default_value = "data/corpus")]
    pub corpus_dir: String,

    /// qid<TAB>query file whose words are added too
    #[arg(long)]
    pub queries: Option<String>,

    #[arg(long, default_value = "data/vocab.tsv")]
    pub out: String,

    /// Keep only the N most frequent words
    #[arg(long)]
    pub max_size: Option<usize>,

    /// Word tokenisation instead of clean-and-split
    #[arg(long)]
    pub tokenize: bool,
}

impl From<BuildVocabArgs> for BuildVocabConfig {
    fn from(a: BuildVocabArgs) -> Self {
        BuildVocabConfig {
            corpus_dir:   a.corpus_dir,
            queries_path: a.queries,
            out_path:     a.out,
            max_size:     a.max_size,
            tokenize:     a.tokenize,
        }
    }
}

// ─── align-vectors ────────────────────────────────────────────────────────────
#[derive(Args, Debug)]
pub struct AlignVectorsArgs {
    #[arg(long, default_value = "data/vocab.tsv")]
    pub vocab: String,

    /// Pre-trained vectors in "<count> <dim>" text format
    #[arg(long)]
    pub vectors: String,

    #[arg(long, default_value = "data/vectors.txt")]
    pub out: String,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<AlignVectorsArgs> for AlignVectorsConfig {
    fn from(a: AlignVectorsArgs) -> Self {
        AlignVectorsConfig {
            vocab_path:   a.vocab,
            vectors_path: a.vectors,
            out_path:     a.out,
            seed:         a.seed,
        }
    }
}
