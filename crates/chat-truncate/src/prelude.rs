//! Convenience re-exports for common `chat-truncate` types.
//!
//! Meant to be glob-imported:
//!
//! ```ignore
//! use chat_truncate::prelude::*;
//! ```
//!
//! Turn-level helpers (`turn_ranges`, `oldest_evictable_turn`, ...) are
//! intentionally excluded; import those from [`context::turns`](crate::context::turns).

// ── Core types ──────────────────────────────────────────────────────
pub use crate::{Message, MessageRole, ToolCall};

// ── Budget and truncation ───────────────────────────────────────────
pub use crate::context::{
    ContextLimits, DEFAULT_TARGET_FRACTION, PromptRenderer, TokenCounter, TruncationReport,
    UNBOUNDED_PREDICTION, compute_budget, truncate, truncate_with_report,
};

// ── Reference collaborators ─────────────────────────────────────────
pub use crate::template::ChatMlTemplate;
pub use crate::tokenizer::CharRatioTokenizer;

// ── Serving ─────────────────────────────────────────────────────────
pub use crate::config::TruncateConfig;
pub use crate::session::{PreparedPrompt, PromptError, prepare_prompt};
