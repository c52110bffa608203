//! Turn-preserving chat history truncation for fixed-size context windows.
//!
//! `chat-truncate` keeps an OpenAI-shaped conversation within a model's
//! context-token budget by evicting whole turns, oldest first, while
//! guaranteeing the result is still a structurally valid dialogue. The two
//! core entry points are:
//!
//! - [`compute_budget`](context::compute_budget) — maps a context size, a
//!   predicted generation length and a target fraction to a token ceiling.
//! - [`truncate`](context::truncate) — repeatedly renders and tokenizes the
//!   conversation, dropping the oldest complete turn until it fits the
//!   ceiling or only the last turn is left.
//!
//! How prompts are rendered and how tokens are counted is left to the
//! caller through the [`PromptRenderer`](context::PromptRenderer) and
//! [`TokenCounter`](context::TokenCounter) traits. Both are implemented for
//! plain closures, and the crate ships a ChatML renderer
//! ([`ChatMlTemplate`](template::ChatMlTemplate)) and a character-ratio
//! estimator ([`CharRatioTokenizer`](tokenizer::CharRatioTokenizer)) for
//! use without a model.
//!
//! # Example
//!
//! ```
//! use chat_truncate::prelude::*;
//!
//! let mut messages = vec![
//!     Message::system("Be helpful."),
//!     Message::user("Turn one."),
//!     Message::assistant_text("Answer one."),
//!     Message::user("Turn two."),
//! ];
//!
//! let ceiling = compute_budget(4096, 512, DEFAULT_TARGET_FRACTION);
//! let template = ChatMlTemplate::new();
//! let tokenizer = CharRatioTokenizer::default();
//!
//! let changed = truncate(&mut messages, ceiling, &template, &tokenizer).unwrap();
//! assert!(!changed);
//! assert_eq!(messages.len(), 4);
//! ```
//!
//! # Invariants
//!
//! 1. **Removal only.** Surviving messages are never edited or reordered.
//! 2. **Whole turns.** A turn (a user message and everything up to the next
//!    user message) is removed in one `drain`, so a tool result can never
//!    outlive the assistant call that produced it.
//! 3. **Hard floor.** The leading system message and the most recent turn
//!    are never evicted, even when the conversation stays over budget.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`context`] | Budget calculator, turn segmentation, truncation loop |
//! | [`template`] | ChatML prompt renderer |
//! | [`tokenizer`] | Character-ratio token estimator |
//! | [`session`] | Caller-side prompt preparation with overflow checks |
//! | [`config`] | [`TruncateConfig`](config::TruncateConfig) |

pub mod config;
pub mod context;
pub mod prelude;
pub mod session;
pub mod template;
pub mod tokenizer;

use serde::{Deserialize, Serialize};
use std::path::Path;

// ── Message types ──────────────────────────────────────────────────

/// Role of a message in the conversation.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
    Assistant,
    Tool,
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MessageRole::System => write!(f, "system"),
            MessageRole::User => write!(f, "user"),
            MessageRole::Assistant => write!(f, "assistant"),
            MessageRole::Tool => write!(f, "tool"),
        }
    }
}

/// A message in the conversation.
///
/// `tool_calls` is only meaningful on assistant messages; `tool_call_id`
/// and `tool_name` only on tool results.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Message {
    pub role: MessageRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(
        default,
        rename = "name",
        skip_serializing_if = "Option::is_none"
    )]
    pub tool_name: Option<String>,
}

impl Message {
    fn with_role(role: MessageRole, content: Option<String>) -> Self {
        Self {
            role,
            content,
            tool_calls: None,
            tool_call_id: None,
            tool_name: None,
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::System, Some(content.into()))
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, Some(content.into()))
    }

    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, Some(content.into()))
    }

    pub fn assistant_tool_calls(calls: Vec<ToolCall>) -> Self {
        Self {
            tool_calls: Some(calls),
            ..Self::with_role(MessageRole::Assistant, None)
        }
    }

    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(call_id.into()),
            ..Self::with_role(MessageRole::Tool, Some(content.into()))
        }
    }

    /// Attach the name of the tool that produced this result.
    pub fn with_tool_name(mut self, name: impl Into<String>) -> Self {
        self.tool_name = Some(name.into());
        self
    }

    /// Message text, or `""` when absent.
    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }

    /// Whether this is an assistant message carrying at least one tool call.
    pub fn invokes_tools(&self) -> bool {
        self.role == MessageRole::Assistant
            && self.tool_calls.as_ref().is_some_and(|c| !c.is_empty())
    }
}

// ── Tool call types ────────────────────────────────────────────────

/// The type of a tool call. Currently always `Function`.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub enum CallType {
    #[serde(rename = "function")]
    Function,
}

/// A tool call issued by the model.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ToolCall {
    pub id: String,
    #[serde(rename = "type")]
    pub call_type: CallType,
    pub function: FunctionCallData,
}

impl ToolCall {
    /// Create a function tool call. `arguments` is the raw JSON payload.
    pub fn function(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            call_type: CallType::Function,
            function: FunctionCallData {
                name: name.into(),
                arguments: arguments.into(),
            },
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FunctionCallData {
    pub name: String,
    pub arguments: String,
}

// ── Conversation I/O ───────────────────────────────────────────────

/// Parse a JSON array of messages.
pub fn parse_messages(json: &str) -> Result<Vec<Message>, String> {
    serde_json::from_str(json).map_err(|e| format!("failed to parse conversation: {e}"))
}

/// Load a JSON array of messages from `path`.
pub fn load_messages(path: &Path) -> Result<Vec<Message>, String> {
    let data = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read conversation '{}': {e}", path.display()))?;
    parse_messages(&data)
}
