//! Truncation configuration with sensible defaults.
//!
//! [`TruncateConfig`] captures the context parameters a serving loop knows
//! about and converts them into the types the core works with via
//! [`limits`](TruncateConfig::limits), [`build_template`](TruncateConfig::build_template)
//! and [`build_tokenizer`](TruncateConfig::build_tokenizer).

use crate::context::{ContextLimits, DEFAULT_TARGET_FRACTION, UNBOUNDED_PREDICTION};
use crate::template::ChatMlTemplate;
use crate::tokenizer::{CharRatioTokenizer, DEFAULT_CHARS_PER_TOKEN};

/// Default context window in tokens.
pub const DEFAULT_CONTEXT_SIZE: u32 = 4096;

/// Configuration for a truncation pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncateConfig {
    /// Total token window. Default: `4096`.
    pub context_size: u32,
    /// Tokens reserved for generation, `-1` for unbounded. Default: `-1`.
    pub predicted_length: i64,
    /// Target fraction of the window for unbounded generation. `None`
    /// disables truncation: oversized prompts are reported, not shortened.
    /// Default: `Some(0.8)`.
    pub target_fraction: Option<f64>,
    /// Characters per token for the built-in estimator. Default: `3.5`.
    pub chars_per_token: f64,
    /// Append the assistant generation header when rendering. Default: `true`.
    pub generation_prompt: bool,
}

impl Default for TruncateConfig {
    fn default() -> Self {
        Self {
            context_size: DEFAULT_CONTEXT_SIZE,
            predicted_length: UNBOUNDED_PREDICTION,
            target_fraction: Some(DEFAULT_TARGET_FRACTION),
            chars_per_token: DEFAULT_CHARS_PER_TOKEN,
            generation_prompt: true,
        }
    }
}

impl TruncateConfig {
    pub fn new(context_size: u32) -> Self {
        Self {
            context_size,
            ..Self::default()
        }
    }

    /// Reserve `tokens` for generation (`-1` for unbounded).
    pub fn with_predicted_length(mut self, tokens: i64) -> Self {
        self.predicted_length = tokens;
        self
    }

    /// Enable truncation with the given target fraction.
    pub fn with_target_fraction(mut self, fraction: f64) -> Self {
        self.target_fraction = Some(fraction);
        self
    }

    /// Disable truncation.
    pub fn without_truncation(mut self) -> Self {
        self.target_fraction = None;
        self
    }

    pub fn with_chars_per_token(mut self, ratio: f64) -> Self {
        self.chars_per_token = ratio;
        self
    }

    pub fn with_generation_prompt(mut self, enabled: bool) -> Self {
        self.generation_prompt = enabled;
        self
    }

    /// Whether oversized conversations should be truncated.
    pub fn truncation_enabled(&self) -> bool {
        self.target_fraction.is_some()
    }

    /// Context limits for the budget calculator.
    pub fn limits(&self) -> ContextLimits {
        ContextLimits::new(
            self.context_size,
            self.predicted_length,
            self.target_fraction.unwrap_or(DEFAULT_TARGET_FRACTION),
        )
    }

    /// Check every field is inside its documented domain.
    pub fn validate(&self) -> Result<(), String> {
        self.limits().validate()?;
        self.build_tokenizer().map(|_| ())
    }

    pub fn build_template(&self) -> ChatMlTemplate {
        ChatMlTemplate::new().with_generation_prompt(self.generation_prompt)
    }

    pub fn build_tokenizer(&self) -> Result<CharRatioTokenizer, String> {
        CharRatioTokenizer::new(self.chars_per_token)
    }
}
