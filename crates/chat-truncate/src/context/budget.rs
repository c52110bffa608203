//! Token budget calculation: turns context parameters into the ceiling the
//! rendered conversation must fit under.
//!
//! When the generation length is known the prompt may use everything the
//! reply does not reserve. When it is unbounded (`-1`), the prompt is capped
//! at a fraction of the window instead, leaving a cushion for the reply.

/// Predicted generation length meaning "unknown / unbounded".
pub const UNBOUNDED_PREDICTION: i64 = -1;

/// Default fraction of the context window the prompt may use when the
/// generation length is unbounded.
pub const DEFAULT_TARGET_FRACTION: f64 = 0.8;

/// Compute the token ceiling for a prompt.
///
/// - `predicted_length >= 0`: `context_size - predicted_length`.
/// - `predicted_length < 0` (only `-1` is meaningful): `floor(target_fraction * context_size)`.
///
/// Never fails. Degenerate inputs can produce a zero or negative ceiling,
/// which [`truncate`](super::truncate) treats as "always over budget".
pub fn compute_budget(context_size: u32, predicted_length: i64, target_fraction: f64) -> i64 {
    if predicted_length >= 0 {
        i64::from(context_size) - predicted_length
    } else {
        (target_fraction * f64::from(context_size)).floor() as i64
    }
}

/// The three context parameters a budget is derived from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextLimits {
    /// Total token window.
    pub context_size: u32,
    /// Tokens reserved for generation, or [`UNBOUNDED_PREDICTION`].
    pub predicted_length: i64,
    /// Fraction of the window used as ceiling when generation is unbounded.
    pub target_fraction: f64,
}

impl ContextLimits {
    pub fn new(context_size: u32, predicted_length: i64, target_fraction: f64) -> Self {
        Self {
            context_size,
            predicted_length,
            target_fraction,
        }
    }

    /// Budget the rendered prompt must fit. Exceeding it triggers
    /// truncation in the serving flow.
    pub fn ceiling(&self) -> i64 {
        compute_budget(
            self.context_size,
            self.predicted_length,
            self.target_fraction,
        )
    }

    /// Token count a triggered truncation works towards:
    /// `floor(target_fraction * context_size)`, whatever the reservation.
    ///
    /// Keeping it below [`ceiling`](Self::ceiling) frees more than the bare
    /// minimum, so the next few turns fit without evicting again.
    pub fn target(&self) -> i64 {
        compute_budget(
            self.context_size,
            UNBOUNDED_PREDICTION,
            self.target_fraction,
        )
    }

    /// Largest prompt that still leaves room for the reserved generation.
    ///
    /// A prompt above this cannot be served at all, truncated or not.
    pub fn hard_limit(&self) -> i64 {
        if self.predicted_length >= 0 {
            i64::from(self.context_size) - self.predicted_length
        } else {
            i64::from(self.context_size)
        }
    }

    /// Reject parameters outside their documented domains.
    pub fn validate(&self) -> Result<(), String> {
        if self.context_size == 0 {
            return Err("context size must be greater than 0".to_string());
        }
        if self.predicted_length < UNBOUNDED_PREDICTION {
            return Err(format!(
                "predicted length must be -1 (unbounded) or >= 0, got {}",
                self.predicted_length
            ));
        }
        if !(self.target_fraction > 0.0 && self.target_fraction <= 1.0) {
            return Err(format!(
                "target fraction must be in (0, 1], got {}",
                self.target_fraction
            ));
        }
        Ok(())
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "ctx={} n_predict={} fraction={:.2} ceiling={} target={}",
            self.context_size,
            self.predicted_length,
            self.target_fraction,
            self.ceiling(),
            self.target(),
        )
    }
}

impl Default for ContextLimits {
    fn default() -> Self {
        Self::new(4096, UNBOUNDED_PREDICTION, DEFAULT_TARGET_FRACTION)
    }
}
