//! ChatML prompt rendering.
//!
//! Each message becomes `<|im_start|>{role}\n{content}<|im_end|>\n`.
//! Assistant tool calls are appended to the assistant's content as
//! `<tool_call>` blocks holding `{"name": ..., "arguments": ...}`, the way
//! Hermes-style ChatML templates emit them. With the generation prompt
//! enabled an open `<|im_start|>assistant\n` header is appended.
//!
//! Like real chat templates, rendering refuses sequences it cannot express:
//! a system message anywhere but first, or a tool result with no
//! tool-invoking assistant message before it.

use crate::context::PromptRenderer;
use crate::context::turns::find_orphaned_tool;
use crate::{Message, MessageRole, ToolCall};

const IM_START: &str = "<|im_start|>";
const IM_END: &str = "<|im_end|>";

/// ChatML renderer.
#[derive(Debug, Clone)]
pub struct ChatMlTemplate {
    add_generation_prompt: bool,
}

impl Default for ChatMlTemplate {
    fn default() -> Self {
        Self {
            add_generation_prompt: true,
        }
    }
}

impl ChatMlTemplate {
    /// Create a renderer that appends the assistant generation header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enable or disable the trailing `<|im_start|>assistant\n` header.
    pub fn with_generation_prompt(mut self, enabled: bool) -> Self {
        self.add_generation_prompt = enabled;
        self
    }

    fn check_structure(messages: &[Message]) -> Result<(), String> {
        if let Some(pos) = messages
            .iter()
            .skip(1)
            .position(|m| m.role == MessageRole::System)
        {
            return Err(format!(
                "system message at index {} (only allowed at index 0)",
                pos + 1
            ));
        }
        if let Some(idx) = find_orphaned_tool(messages) {
            return Err(format!(
                "tool message at index {idx} does not follow an assistant tool call"
            ));
        }
        Ok(())
    }
}

fn render_tool_call(out: &mut String, call: &ToolCall) {
    let arguments = serde_json::from_str::<serde_json::Value>(&call.function.arguments)
        .unwrap_or_else(|_| serde_json::Value::String(call.function.arguments.clone()));
    let payload = serde_json::json!({
        "name": call.function.name,
        "arguments": arguments,
    });
    out.push_str(&format!("\n<tool_call>\n{payload}\n</tool_call>"));
}

impl PromptRenderer for ChatMlTemplate {
    fn render(&self, messages: &[Message]) -> Result<String, String> {
        Self::check_structure(messages)?;

        let mut out = String::new();
        for msg in messages {
            out.push_str(&format!("{IM_START}{}\n{}", msg.role, msg.text()));
            for call in msg.tool_calls.iter().flatten() {
                render_tool_call(&mut out, call);
            }
            out.push_str(IM_END);
            out.push('\n');
        }
        if self.add_generation_prompt {
            out.push_str(&format!("{IM_START}assistant\n"));
        }
        Ok(out)
    }
}
