// ============================================================
// Layer 4 — Text Cleaner
// ============================================================
// Turns raw query / document text into tokens for the vocabulary.
//
// Two modes:
//
//   clean()     regex-free cleaning for plain splitting
//               1. anything outside [a-zA-Z0-9 \n.-] → space
//               2. whitespace runs → one space
//               3. lowercase
//
//   tokenize()  word tokenisation
//               1. '+', '=', '/' and non-ASCII characters → space
//               2. whitespace runs → one space, lowercase
//               3. BERT pre-tokenizer from the tokenizers crate:
//                  splits on whitespace and makes every
//                  punctuation character its own token
//                  "(hello," → "(", "hello", ","
//
// Reference: Rust Book §8 (Strings in Rust)
//            HuggingFace tokenizers (pre_tokenizers::bert)

use anyhow::{anyhow, Result};
use tokenizers::pre_tokenizers::bert::BertPreTokenizer;
use tokenizers::{OffsetReferential, OffsetType, PreTokenizedString, PreTokenizer};

#[derive(Debug, Clone, Copy, Default)]
pub struct TextCleaner;

impl TextCleaner {
    pub fn new() -> Self {
        Self
    }

    /// Keep letters, digits, space, newline, '.' and '-'; collapse
    /// whitespace and lowercase.
    pub fn clean(&self, text: &str) -> String {
        let kept: String = text
            .chars()
            .map(|c| match c {
                c if c.is_ascii_alphanumeric() => c,
                ' ' | '\n' | '.' | '-' => c,
                _ => ' ',
            })
            .collect();
        collapse_whitespace(&kept).to_lowercase()
    }

    /// Split cleaned text on spaces, as the plain (non-tokenizer)
    /// path does.
    pub fn clean_split(&self, text: &str) -> Vec<String> {
        self.clean(text).split(' ').filter(|t| !t.is_empty()).map(str::to_string).collect()
    }

    pub fn tokenize(&self, text: &str) -> Result<Vec<String>> {
        let ascii: String = text
            .chars()
            .map(|c| match c {
                '+' | '=' | '/' => ' ',
                c if !c.is_ascii() => ' ',
                c => c,
            })
            .collect();
        let normalised = collapse_whitespace(&ascii).to_lowercase();
        if normalised.is_empty() {
            return Ok(Vec::new());
        }

        let mut pretokenized = PreTokenizedString::from(normalised.as_str());
        BertPreTokenizer
            .pre_tokenize(&mut pretokenized)
            .map_err(|e| anyhow!("Pre-tokenisation error: {e}"))?;
        Ok(pretokenized
            .get_splits(OffsetReferential::Original, OffsetType::Byte)
            .into_iter()
            .map(|(piece, _, _)| piece.to_string())
            .collect())
    }
}

// Any run of whitespace becomes a single space; ends are trimmed
fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_drops_symbols_and_lowercases() {
        let c = TextCleaner::new();
        assert_eq!(c.clean("Hello,   World! e-mail v2.0"), "hello world e-mail v2.0");
    }

    #[test]
    fn test_clean_collapses_newlines() {
        let c = TextCleaner::new();
        assert_eq!(c.clean("line1\n\n\tline2"), "line1 line2");
    }

    #[test]
    fn test_clean_split() {
        let c = TextCleaner::new();
        assert_eq!(c.clean_split("  a  b "), vec!["a", "b"]);
    }

    #[test]
    fn test_tokenize_replaces_operators_and_unicode() {
        let c = TextCleaner::new();
        assert_eq!(c.tokenize("C++ a/b x=y café").unwrap(), vec!["c", "a", "b", "x", "y", "caf"]);
    }

    #[test]
    fn test_tokenize_splits_punctuation() {
        let c = TextCleaner::new();
        assert_eq!(
            c.tokenize("(Hello, world!) \"quoted\"").unwrap(),
            vec!["(", "hello", ",", "world", "!", ")", "\"", "quoted", "\""]
        );
    }

    #[test]
    fn test_tokenize_splits_inner_punctuation() {
        let c = TextCleaner::new();
        assert_eq!(c.tokenize("e-mail it.").unwrap(), vec!["e", "-", "mail", "it", "."]);
    }

    #[test]
    fn test_empty_string() {
        let c = TextCleaner::new();
        assert_eq!(c.clean(""), "");
        assert!(c.tokenize("   ").unwrap().is_empty());
    }
}
