//! Turn-preserving truncation: evict the oldest complete turn until the
//! rendered conversation fits its token ceiling.
//!
//! Each iteration renders the whole conversation, tokenizes it, and either
//! stops or removes one turn with a single `drain`. Rendering is the
//! dominant cost, so a call pays one render + tokenize per evicted turn plus
//! one for the initial check.
//!
//! The loop stops, possibly still over budget, when:
//! - the conversation has no user message (nothing is a turn), or
//! - only one turn is left (hard floor).
//!
//! A conversation whose last turn alone exceeds the ceiling is therefore
//! returned over budget. Structural validity wins over budget compliance;
//! callers that cannot serve such a prompt must check the final count
//! themselves (see [`prepare_prompt`](crate::session::prepare_prompt)).

use super::turns::{first_user_index, oldest_evictable_turn};
use crate::Message;
use tracing::{debug, info, warn};

/// Renders a message list into a single prompt string.
///
/// Implementations may reject structurally invalid sequences with `Err`.
/// Implemented for any `Fn(&[Message]) -> Result<String, String>`.
pub trait PromptRenderer {
    fn render(&self, messages: &[Message]) -> Result<String, String>;
}

impl<F> PromptRenderer for F
where
    F: Fn(&[Message]) -> Result<String, String>,
{
    fn render(&self, messages: &[Message]) -> Result<String, String> {
        self(messages)
    }
}

/// Counts the tokens of a rendered prompt.
///
/// Implemented for any `Fn(&str) -> Result<usize, String>`.
pub trait TokenCounter {
    fn count_tokens(&self, text: &str) -> Result<usize, String>;
}

impl<F> TokenCounter for F
where
    F: Fn(&str) -> Result<usize, String>,
{
    fn count_tokens(&self, text: &str) -> Result<usize, String> {
        self(text)
    }
}

/// Outcome of a [`truncate_with_report`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationReport {
    /// Ceiling the loop worked towards.
    pub ceiling: i64,
    /// Token count before any eviction.
    pub initial_tokens: usize,
    /// Token count of the surviving conversation.
    pub final_tokens: usize,
    /// Whole turns evicted.
    pub turns_removed: usize,
    /// Messages evicted across all turns.
    pub messages_removed: usize,
}

impl TruncationReport {
    /// Whether any message was removed.
    pub fn changed(&self) -> bool {
        self.messages_removed > 0
    }

    /// Whether the surviving conversation fits the ceiling.
    pub fn within_budget(&self) -> bool {
        fits(self.final_tokens, self.ceiling)
    }

    /// Format as a short log-friendly string.
    pub fn to_log_string(&self) -> String {
        format!(
            "truncation: {} -> {} tokens (ceiling {}), {} turn(s) / {} message(s) removed",
            self.initial_tokens,
            self.final_tokens,
            self.ceiling,
            self.turns_removed,
            self.messages_removed,
        )
    }
}

fn fits(n_tokens: usize, ceiling: i64) -> bool {
    i64::try_from(n_tokens).is_ok_and(|n| n <= ceiling)
}

fn count_rendered<R, T>(messages: &[Message], renderer: &R, tokenizer: &T) -> Result<usize, String>
where
    R: PromptRenderer + ?Sized,
    T: TokenCounter + ?Sized,
{
    let prompt = renderer.render(messages)?;
    tokenizer.count_tokens(&prompt)
}

/// Evict the oldest turns of `messages` until the rendered prompt fits
/// `ceiling`. Returns `true` if anything was removed.
///
/// See [`truncate_with_report`] for the details.
pub fn truncate<R, T>(
    messages: &mut Vec<Message>,
    ceiling: i64,
    renderer: &R,
    tokenizer: &T,
) -> Result<bool, String>
where
    R: PromptRenderer + ?Sized,
    T: TokenCounter + ?Sized,
{
    truncate_with_report(messages, ceiling, renderer, tokenizer).map(|r| r.changed())
}

/// Evict the oldest turns of `messages` until the rendered prompt fits
/// `ceiling`, reporting what was done.
///
/// Messages are only ever removed, whole turns at a time; survivors keep
/// their content and order. The leading system message and the most recent
/// turn always survive, even for a zero or negative ceiling.
///
/// Renderer and tokenizer errors are returned unchanged. Turns evicted
/// before the failing call stay evicted.
pub fn truncate_with_report<R, T>(
    messages: &mut Vec<Message>,
    ceiling: i64,
    renderer: &R,
    tokenizer: &T,
) -> Result<TruncationReport, String>
where
    R: PromptRenderer + ?Sized,
    T: TokenCounter + ?Sized,
{
    let initial_tokens = count_rendered(messages, renderer, tokenizer)?;
    let mut report = TruncationReport {
        ceiling,
        initial_tokens,
        final_tokens: initial_tokens,
        turns_removed: 0,
        messages_removed: 0,
    };

    while !fits(report.final_tokens, ceiling) {
        let Some(turn) = oldest_evictable_turn(messages) else {
            if first_user_index(messages).is_none() {
                debug!(
                    "No user turn to evict ({} messages, {} tokens > ceiling {})",
                    messages.len(),
                    report.final_tokens,
                    ceiling,
                );
            } else {
                warn!(
                    "Conversation still over budget after keeping only the last turn: \
                     {} tokens > ceiling {}",
                    report.final_tokens, ceiling,
                );
            }
            break;
        };

        let removed = turn.len();
        debug!(
            "Evicting oldest turn: messages {}..{} ({} message(s))",
            turn.start, turn.end, removed,
        );
        messages.drain(turn);
        report.turns_removed += 1;
        report.messages_removed += removed;
        report.final_tokens = count_rendered(messages, renderer, tokenizer)?;
    }

    if report.changed() {
        info!("{}", report.to_log_string());
    }
    Ok(report)
}
