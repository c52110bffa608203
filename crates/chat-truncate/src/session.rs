//! Caller-side prompt preparation.
//!
//! Wires the core into a serving loop: truncate when the prompt exceeds the
//! ceiling, evicting down to the fraction-based target, re-render, tell the caller whether the prompt text changed (so
//! any cache keyed on the previous prompt can be dropped), and refuse
//! prompts that still do not leave room for the reserved generation.

use crate::Message;
use crate::config::TruncateConfig;
use crate::context::{PromptRenderer, TokenCounter, TruncationReport, truncate_with_report};
use std::fmt;
use tracing::{debug, info};

/// A prompt ready for inference.
#[derive(Debug, Clone)]
pub struct PreparedPrompt {
    /// Rendered prompt of the surviving conversation.
    pub prompt: String,
    /// Token count of `prompt`.
    pub n_tokens: usize,
    /// What truncation did, or `None` when it is disabled or the prompt
    /// already fit the ceiling.
    pub truncation: Option<TruncationReport>,
    /// The prompt differs from the one the untouched conversation renders
    /// to. State computed from the old prompt (e.g. a prefix cache) is stale.
    pub prompt_changed: bool,
}

/// Why a prompt could not be prepared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptError {
    /// The renderer or tokenizer failed; the message is theirs, unchanged.
    Backend(String),
    /// The prompt does not fit the context even after truncation.
    ExceedContextSize { n_prompt_tokens: usize, n_ctx: i64 },
}

impl PromptError {
    /// Stable error type string for API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            PromptError::Backend(_) => "server_error",
            PromptError::ExceedContextSize { .. } => "exceed_context_size_error",
        }
    }
}

impl fmt::Display for PromptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PromptError::Backend(e) => write!(f, "{e}"),
            PromptError::ExceedContextSize {
                n_prompt_tokens,
                n_ctx,
            } => write!(
                f,
                "request ({n_prompt_tokens} tokens) exceeds the available context size ({n_ctx} tokens)"
            ),
        }
    }
}

impl std::error::Error for PromptError {}

fn fits(n_tokens: usize, limit: i64) -> bool {
    i64::try_from(n_tokens).is_ok_and(|n| n <= limit)
}

/// Prepare `messages` for inference under `config`.
///
/// Truncation is triggered when the prompt exceeds
/// [`ceiling`](crate::context::ContextLimits::ceiling). Once triggered, the
/// oldest turns are evicted in place until the prompt fits the lower
/// [`target`](crate::context::ContextLimits::target), so a reserved reply
/// length does not cancel out the target fraction. Either way, the final
/// prompt must fit [`hard_limit`](crate::context::ContextLimits::hard_limit)
/// or [`PromptError::ExceedContextSize`] is returned.
pub fn prepare_prompt<R, T>(
    messages: &mut Vec<Message>,
    config: &TruncateConfig,
    renderer: &R,
    tokenizer: &T,
) -> Result<PreparedPrompt, PromptError>
where
    R: PromptRenderer + ?Sized,
    T: TokenCounter + ?Sized,
{
    let limits = config.limits();
    debug!("Preparing prompt: {}", limits.to_log_string());

    let original = renderer.render(messages).map_err(PromptError::Backend)?;
    let original_tokens = tokenizer
        .count_tokens(&original)
        .map_err(PromptError::Backend)?;

    let triggered = config.truncation_enabled() && !fits(original_tokens, limits.ceiling());
    let truncation = if triggered {
        debug!(
            "Prompt of {} tokens exceeds ceiling {}; truncating towards {}",
            original_tokens,
            limits.ceiling(),
            limits.target(),
        );
        Some(
            truncate_with_report(messages, limits.target(), renderer, tokenizer)
                .map_err(PromptError::Backend)?,
        )
    } else {
        None
    };

    let (prompt, n_tokens) = match &truncation {
        Some(report) if report.changed() => (
            renderer.render(messages).map_err(PromptError::Backend)?,
            report.final_tokens,
        ),
        _ => (original.clone(), original_tokens),
    };

    let prompt_changed = prompt != original;
    if prompt_changed {
        info!("Prompt changed by truncation; cached prompt state must be refreshed");
    }

    let n_ctx = limits.hard_limit();
    if !fits(n_tokens, n_ctx) {
        return Err(PromptError::ExceedContextSize {
            n_prompt_tokens: n_tokens,
            n_ctx,
        });
    }

    Ok(PreparedPrompt {
        prompt,
        n_tokens,
        truncation,
        prompt_changed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(messages: &[Message]) -> Result<String, String> {
        Ok(messages
            .iter()
            .map(|m| m.text())
            .collect::<Vec<_>>()
            .join(" "))
    }

    /// One token per whitespace-separated word.
    fn words(text: &str) -> Result<usize, String> {
        Ok(text.split_whitespace().count())
    }

    fn conversation() -> Vec<Message> {
        vec![
            Message::system("sys"),
            Message::user("one two three"),
            Message::assistant_text("four five six"),
            Message::user("seven"),
        ]
    }

    #[test]
    fn fitting_prompt_is_unchanged() {
        let mut messages = conversation();
        let config = TruncateConfig::new(100);
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        assert!(!prepared.prompt_changed);
        assert_eq!(prepared.n_tokens, 8);
        assert_eq!(messages.len(), 4);
        assert!(prepared.truncation.is_none());
    }

    #[test]
    fn truncation_changes_prompt() {
        let mut messages = conversation();
        // ceiling = floor(0.5 * 10) = 5 < 8
        let config = TruncateConfig::new(10).with_target_fraction(0.5);
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        assert!(prepared.prompt_changed);
        assert_eq!(prepared.prompt, "sys seven");
        assert_eq!(prepared.n_tokens, 2);
        assert_eq!(prepared.truncation.unwrap().turns_removed, 1);
    }

    fn five_turns() -> Vec<Message> {
        let mut messages = vec![Message::system("sys")];
        for i in 1..=5 {
            messages.push(Message::user(format!("u{i}")));
            messages.push(Message::assistant_text(format!("a{i}")));
        }
        messages
    }

    #[test]
    fn reserved_reply_triggers_but_fraction_sets_target() {
        // 11 tokens; ceiling = 12 - 2 = 10 triggers truncation.
        let mut messages = five_turns();
        let config = TruncateConfig::new(12)
            .with_predicted_length(2)
            .with_target_fraction(0.5);
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        let report = prepared.truncation.unwrap();
        assert_eq!(report.ceiling, 6);
        assert_eq!(report.turns_removed, 3);
        assert_eq!(prepared.n_tokens, 5);

        let mut messages = five_turns();
        let config = config.with_target_fraction(0.75);
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        assert_eq!(prepared.truncation.unwrap().turns_removed, 1);
        assert_eq!(prepared.n_tokens, 9);
    }

    #[test]
    fn below_ceiling_is_not_truncated_towards_target() {
        // 11 tokens fit the ceiling of 11 even though the target is 6.
        let mut messages = five_turns();
        let config = TruncateConfig::new(12)
            .with_predicted_length(1)
            .with_target_fraction(0.5);
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        assert!(prepared.truncation.is_none());
        assert!(!prepared.prompt_changed);
        assert_eq!(messages.len(), 11);
    }

    #[test]
    fn disabled_truncation_reports_overflow() {
        let mut messages = conversation();
        let config = TruncateConfig::new(10)
            .with_predicted_length(5)
            .without_truncation();
        let err = prepare_prompt(&mut messages, &config, &render, &words).unwrap_err();
        assert_eq!(
            err,
            PromptError::ExceedContextSize {
                n_prompt_tokens: 8,
                n_ctx: 5
            }
        );
        assert_eq!(err.kind(), "exceed_context_size_error");
        assert_eq!(messages.len(), 4);
    }

    #[test]
    fn disabled_truncation_passes_fitting_prompt() {
        let mut messages = conversation();
        let config = TruncateConfig::new(8).without_truncation();
        let prepared = prepare_prompt(&mut messages, &config, &render, &words).unwrap();
        assert!(prepared.truncation.is_none());
        assert_eq!(prepared.n_tokens, 8);
    }

    #[test]
    fn oversized_last_turn_still_overflows() {
        let mut messages = vec![Message::system("sys"), Message::user("a b c d e f")];
        let config = TruncateConfig::new(4).with_predicted_length(1);
        let err = prepare_prompt(&mut messages, &config, &render, &words).unwrap_err();
        assert!(matches!(err, PromptError::ExceedContextSize { .. }));
        assert_eq!(messages.len(), 2);
    }

    #[test]
    fn backend_errors_are_wrapped_verbatim() {
        let failing = |_: &[Message]| -> Result<String, String> { Err("bad template".into()) };
        let mut messages = conversation();
        let err = prepare_prompt(&mut messages, &TruncateConfig::default(), &failing, &words)
            .unwrap_err();
        assert_eq!(err, PromptError::Backend("bad template".into()));
        assert_eq!(err.to_string(), "bad template");
    }
}
