//! Turn segmentation over a live message list.
//!
//! A turn is a user message plus every following non-user message up to the
//! next user message (or the end). Turns are never materialized; every
//! helper here is a scan over the current slice, so there is nothing to keep
//! in sync when messages are removed.
//!
//! The leading system message belongs to no turn. Since no turn can start
//! before the first user message, anything in front of it (the system
//! message, or stray assistant output) is outside every eviction unit.

use crate::{Message, MessageRole};
use std::ops::Range;

/// Index of the first user message at or after `from`.
fn user_index_from(messages: &[Message], from: usize) -> Option<usize> {
    messages
        .get(from..)?
        .iter()
        .position(|m| m.role == MessageRole::User)
        .map(|offset| from + offset)
}

/// Index of the first user message, i.e. the start of the oldest turn.
pub fn first_user_index(messages: &[Message]) -> Option<usize> {
    user_index_from(messages, 0)
}

/// Index of the next user message strictly after `after`.
pub fn next_user_index(messages: &[Message], after: usize) -> Option<usize> {
    user_index_from(messages, after.checked_add(1)?)
}

/// Range of the oldest turn, if it can be evicted.
///
/// Returns `None` when there is no user message at all, or when the oldest
/// turn is also the most recent one (hard floor).
pub fn oldest_evictable_turn(messages: &[Message]) -> Option<Range<usize>> {
    let start = first_user_index(messages)?;
    let end = next_user_index(messages, start)?;
    Some(start..end)
}

/// Ranges of every turn, oldest first.
pub fn turn_ranges(messages: &[Message]) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = first_user_index(messages);
    while let Some(s) = start {
        let next = next_user_index(messages, s);
        ranges.push(s..next.unwrap_or(messages.len()));
        start = next;
    }
    ranges
}

/// Number of turns in the conversation, i.e. its user messages.
pub fn turn_count(messages: &[Message]) -> usize {
    messages
        .iter()
        .filter(|m| m.role == MessageRole::User)
        .count()
}

/// Index of the first tool message with no tool-invoking assistant message
/// directly before it (looking back through other tool messages).
///
/// This is a validator for renderers and tests. Truncation never calls it:
/// whole-turn removal cannot create an orphan from a valid input.
pub fn find_orphaned_tool(messages: &[Message]) -> Option<usize> {
    messages.iter().enumerate().find_map(|(i, msg)| {
        if msg.role != MessageRole::Tool {
            return None;
        }
        let initiator = messages[..i]
            .iter()
            .rev()
            .find(|m| m.role != MessageRole::Tool);
        match initiator {
            Some(m) if m.invokes_tools() => None,
            _ => Some(i),
        }
    })
}
