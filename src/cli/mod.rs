// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// The entry point for all user interaction, parsed with clap.
// All work is delegated to Layer 2 (application).
//
// Three commands are supported:
//   1. `score`         — runs the reader over encoded samples
//   2. `build-vocab`   — counts corpus words into a vocabulary
//   3. `align-vectors` — lines word vectors up with vocab ids
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{AlignVectorsArgs, BuildVocabArgs, Commands, ScoreArgs};

#[derive(Parser, Debug)]
#[command(
    name = "selective-reader",
    version = "0.1.0",
    about = "Score query/document pairs by selectively jumping through the document."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Dispatch to the matching use case. Routing only.
    pub fn run(self) -> Result<()> {
        match self.command {
            Commands::Score(args)        => run_score(args),
            Commands::BuildVocab(args)   => run_build_vocab(args),
            Commands::AlignVectors(args) => run_align_vectors(args),
        }
    }
}

fn run_score(args: ScoreArgs) -> Result<()> {
    use crate::application::score_use_case::ScoreUseCase;

    tracing::info!("Scoring samples from: {}", args.samples);
    let summary = ScoreUseCase::new(args.into()).execute()?;

    println!(
        "Scored {} examples: mean steps {:.2}, stop ratio {:.3}",
        summary.examples, summary.mean_steps, summary.stop_ratio
    );
    Ok(())
}

fn run_build_vocab(args: BuildVocabArgs) -> Result<()> {
    use crate::application::vocab_use_case::BuildVocabUseCase;
    use crate::domain::traits::TokenCodec;

    let out = args.out.clone();
    let vocab = BuildVocabUseCase::new(args.into()).execute()?;
    println!("Vocabulary of {} entries saved to {}", vocab.len(), out);
    Ok(())
}

fn run_align_vectors(args: AlignVectorsArgs) -> Result<()> {
    use crate::application::vocab_use_case::AlignVectorsUseCase;

    let out = args.out.clone();
    let aligned = AlignVectorsUseCase::new(args.into()).execute()?;
    println!("{} vectors of dimension {} saved to {}", aligned.len(), aligned.dim(), out);
    Ok(())
}
