// ============================================================
// Layer 3 — Strategy Variant Names
// ============================================================
// The reader has four pluggable stages plus the interaction
// function used to build the match matrix. Each stage is picked
// by name in the configuration; the names are parsed here, once,
// into enums. Anything unknown is rejected with
// ReaderError::Unimplemented before a single tensor is touched.

use std::fmt;
use std::str::FromStr;

use crate::domain::error::ReaderError;

/// How a query token and a document token are scored against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionKind {
    Dot,
    Cosine,
    Indicator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlimpseKind {
    FixHard,
    AllNextHard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JumpKind {
    MaxHard,
    MinDensityHard,
    All,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepresentKind {
    SumHard,
    InteractionCopyHard,
    InteractionCnnHardResize,
    RnnHard,
    CnnHard,
    InteractionCnnHard,
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregateKind {
    Max,
    Sum,
    InteractionConcat,
}

// Each enum maps to a fixed table of names. The macro keeps
// FromStr and Display in sync so a name round-trips exactly.
macro_rules! named_variants {
    ($ty:ty, $stage:literal, { $($name:literal => $variant:expr),+ $(,)? }) => {
        impl FromStr for $ty {
            type Err = ReaderError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($name => Ok($variant),)+
                    other => Err(ReaderError::unimplemented($stage, other)),
                }
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                let name = match self {
                    $(v if *v == $variant => $name,)+
                    _ => unreachable!(),
                };
                f.write_str(name)
            }
        }
    };
}

named_variants!(InteractionKind, "interaction", {
    "dot"       => InteractionKind::Dot,
    "cosine"    => InteractionKind::Cosine,
    "indicator" => InteractionKind::Indicator,
});

named_variants!(GlimpseKind, "glimpse", {
    "fix_hard"      => GlimpseKind::FixHard,
    "all_next_hard" => GlimpseKind::AllNextHard,
});

named_variants!(JumpKind, "jump", {
    "max_hard"         => JumpKind::MaxHard,
    "min_density_hard" => JumpKind::MinDensityHard,
    "all"              => JumpKind::All,
    "test"             => JumpKind::Test,
});

named_variants!(RepresentKind, "represent", {
    "sum_hard"                    => RepresentKind::SumHard,
    "interaction_copy_hard"       => RepresentKind::InteractionCopyHard,
    "interaction_cnn_hard_resize" => RepresentKind::InteractionCnnHardResize,
    "rnn_hard"                    => RepresentKind::RnnHard,
    "cnn_hard"                    => RepresentKind::CnnHard,
    "interaction_cnn_hard"        => RepresentKind::InteractionCnnHard,
    "test"                        => RepresentKind::Test,
});

named_variants!(AggregateKind, "aggregate", {
    "max"                => AggregateKind::Max,
    "sum"                => AggregateKind::Sum,
    "interaction_concat" => AggregateKind::InteractionConcat,
});
