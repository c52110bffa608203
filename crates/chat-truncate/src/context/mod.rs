//! Context window management: token budgets, turn segmentation, and
//! turn-preserving truncation.
//!
//! 1. **[`budget`]** — [`compute_budget`] turns the context size, predicted
//!    generation length and target fraction into a token ceiling.
//!
//! 2. **[`turns`]** — index-finding helpers that segment a live message list
//!    into turns without materializing them.
//!
//! 3. **[`truncate`](mod@truncate)** — the eviction loop. Renders and
//!    tokenizes through caller-supplied [`PromptRenderer`] / [`TokenCounter`]
//!    implementations and drops the oldest whole turn until the prompt fits.

pub mod budget;
pub mod truncate;
pub mod turns;

// Re-export commonly used items at the module level.
pub use budget::{ContextLimits, DEFAULT_TARGET_FRACTION, UNBOUNDED_PREDICTION, compute_budget};
pub use truncate::{
    PromptRenderer, TokenCounter, TruncationReport, truncate, truncate_with_report,
};
pub use turns::find_orphaned_tool;
