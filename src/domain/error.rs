// ============================================================
// Layer 3 — Reader Errors
// ============================================================
// Every failure the reader can report. Configuration problems
// are raised once, when a ReaderConfig is resolved into a plan,
// so nothing fails half-way through a read because of a typo
// in a variant name.
//
// The outer layers (application, CLI) wrap these in anyhow
// with extra context. The ml layer returns them typed so tests
// can match on the exact variant.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReaderError {
    /// A glimpse / jump / represent / aggregate / interaction name
    /// outside the supported set.
    #[error("{stage} variant '{variant}' is not implemented")]
    Unimplemented { stage: &'static str, variant: String },

    /// A variant was selected without one of its mandatory parameters.
    #[error("'{parameter}' must be set when {context} is used")]
    MissingParameter { parameter: &'static str, context: String },

    #[error("invalid value for '{parameter}': {reason}")]
    InvalidParameter { parameter: &'static str, reason: String },

    /// A history slot was written with a different shape than the
    /// slots before it. interaction_copy_hard hits this when the
    /// document offset changes between steps.
    #[error("{stream} history shape changed between steps: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        stream:   &'static str,
        expected: [usize; 3],
        actual:   [usize; 3],
    },

    #[error("inconsistent batch: {0}")]
    Batch(String),
}

impl ReaderError {
    pub fn unimplemented(stage: &'static str, variant: impl Into<String>) -> Self {
        Self::Unimplemented { stage, variant: variant.into() }
    }

    pub fn missing(parameter: &'static str, context: impl Into<String>) -> Self {
        Self::MissingParameter { parameter, context: context.into() }
    }

    pub fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter { parameter, reason: reason.into() }
    }
}

pub type ReaderResult<T> = std::result::Result<T, ReaderError>;
