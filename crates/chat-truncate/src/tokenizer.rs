//! Character-ratio token estimation.
//!
//! Stands in for a real tokenizer when none is loaded. Most tokenizers
//! average 3-4 characters per token on English text; the default of 3.5
//! sits in the middle. Estimates round up, so any non-empty prompt counts
//! as at least one token.

use crate::context::TokenCounter;

/// Default characters per token.
pub const DEFAULT_CHARS_PER_TOKEN: f64 = 3.5;

/// Estimates token counts from character counts.
#[derive(Debug, Clone, Copy)]
pub struct CharRatioTokenizer {
    chars_per_token: f64,
}

impl Default for CharRatioTokenizer {
    fn default() -> Self {
        Self {
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
        }
    }
}

impl CharRatioTokenizer {
    /// Create an estimator with a calibrated ratio.
    pub fn new(chars_per_token: f64) -> Result<Self, String> {
        if !(chars_per_token.is_finite() && chars_per_token > 0.0) {
            return Err(format!(
                "chars per token must be a positive number, got {chars_per_token}"
            ));
        }
        Ok(Self { chars_per_token })
    }

    pub fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }

    /// Estimated token count of `text`.
    pub fn estimate(&self, text: &str) -> usize {
        let chars = text.chars().count();
        (chars as f64 / self.chars_per_token).ceil() as usize
    }
}

impl TokenCounter for CharRatioTokenizer {
    fn count_tokens(&self, text: &str) -> Result<usize, String> {
        Ok(self.estimate(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_text_is_zero_tokens() {
        assert_eq!(CharRatioTokenizer::default().estimate(""), 0);
    }

    #[test]
    fn rounds_up() {
        let tok = CharRatioTokenizer::new(4.0).unwrap();
        assert_eq!(tok.estimate("a"), 1);
        assert_eq!(tok.estimate("abcd"), 1);
        assert_eq!(tok.estimate("abcde"), 2);
    }

    #[test]
    fn counts_chars_not_bytes() {
        let tok = CharRatioTokenizer::new(1.0).unwrap();
        assert_eq!(tok.estimate("héllo"), 5);
    }

    #[test]
    fn default_ratio() {
        let tok = CharRatioTokenizer::default();
        assert_eq!(tok.chars_per_token(), DEFAULT_CHARS_PER_TOKEN);
        assert_eq!(tok.count_tokens(&"x".repeat(35)).unwrap(), 10);
    }

    #[test]
    fn rejects_non_positive_ratio() {
        assert!(CharRatioTokenizer::new(0.0).is_err());
        assert!(CharRatioTokenizer::new(-1.0).is_err());
        assert!(CharRatioTokenizer::new(f64::NAN).is_err());
        assert!(CharRatioTokenizer::new(f64::INFINITY).is_err());
    }
}
