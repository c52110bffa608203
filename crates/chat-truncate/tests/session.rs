//! Serving-path tests: a long multi-turn chat against a 256-token window,
//! with and without truncation enabled.

use chat_truncate::prelude::*;

const SYSTEM: &str = "You are a helpful assistant.";
const FINAL_USER: &str = "This is the most recent question.";

/// Per-slot window used throughout: 512 tokens shared by two slots.
const N_CTX: u32 = 256;

fn user_msg(i: usize) -> String {
    format!("[U{i:02}] Please explain topic {i} in detail.")
}

fn asst_msg(i: usize) -> String {
    format!("[A{i:02}] Here is my explanation of topic {i}.")
}

fn long_messages(n_turns: usize) -> Vec<Message> {
    let mut messages = vec![Message::system(SYSTEM)];
    for i in 1..=n_turns {
        messages.push(Message::user(user_msg(i)));
        messages.push(Message::assistant_text(asst_msg(i)));
    }
    messages.push(Message::user(FINAL_USER));
    messages
}

fn short_messages() -> Vec<Message> {
    vec![
        Message::system(SYSTEM),
        Message::user("[U01] Hi"),
        Message::assistant_text("[A01] Hello!"),
        Message::user(FINAL_USER),
    ]
}

fn prepare(
    messages: &mut Vec<Message>,
    config: &TruncateConfig,
) -> Result<PreparedPrompt, PromptError> {
    let template = config.build_template();
    let tokenizer = config.build_tokenizer().unwrap();
    prepare_prompt(messages, config, &template, &tokenizer)
}

#[test]
fn overflows_without_truncation() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX)
        .with_predicted_length(5)
        .without_truncation();

    let err = prepare(&mut messages, &config).unwrap_err();

    assert_eq!(err.kind(), "exceed_context_size_error");
    assert!(matches!(err, PromptError::ExceedContextSize { n_ctx: 251, .. }));
    assert_eq!(messages.len(), 32);
}

#[test]
fn truncation_prevents_overflow() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX)
        .with_predicted_length(5)
        .with_target_fraction(0.8);

    let prepared = prepare(&mut messages, &config).unwrap();

    // threshold = 256 - 5 = 251 triggers; target = floor(0.8 * 256) = 204.
    assert!(prepared.n_tokens < 204, "prompt_tokens {}", prepared.n_tokens);
    assert!(prepared.prompt_changed);
    assert!(messages.len() < 32);
}

#[test]
fn fraction_sets_target_with_reserved_reply() {
    let config = TruncateConfig::new(N_CTX).with_predicted_length(5);

    let mut loose = long_messages(15);
    let loose_prepared = prepare(&mut loose, &config.clone().with_target_fraction(0.9)).unwrap();
    let mut tight = long_messages(15);
    let tight_prepared = prepare(&mut tight, &config.with_target_fraction(0.2)).unwrap();

    assert!(loose_prepared.n_tokens <= 230);
    assert!(tight_prepared.n_tokens <= 51);
    assert!(tight.len() < loose.len());
    assert_eq!(tight, vec![Message::system(SYSTEM), Message::user(FINAL_USER)]);
}

#[test]
fn short_conversation_is_left_alone() {
    let mut messages = short_messages();
    let config = TruncateConfig::new(N_CTX)
        .with_predicted_length(5)
        .with_target_fraction(0.8);

    let prepared = prepare(&mut messages, &config).unwrap();

    assert!(!prepared.prompt_changed);
    assert!(prepared.prompt.contains("[U01]"), "only turn should not be dropped");
    assert!(prepared.prompt.contains(FINAL_USER));
    assert_eq!(messages, short_messages());
}

#[test]
fn unbounded_generation_respects_fraction() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX)
        .with_predicted_length(-1)
        .with_target_fraction(0.8);
    let target = compute_budget(N_CTX, -1, 0.8);
    assert_eq!(target, 204);

    let prepared = prepare(&mut messages, &config).unwrap();

    assert!(prepared.n_tokens as i64 <= target);
    let report = prepared.truncation.unwrap();
    assert!(report.turns_removed > 0);
    assert_eq!(report.final_tokens, prepared.n_tokens);
}

#[test]
fn system_message_survives() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX).with_predicted_length(5);

    let prepared = prepare(&mut messages, &config).unwrap();

    assert!(prepared.prompt.contains(SYSTEM));
    assert_eq!(messages[0], Message::system(SYSTEM));
}

#[test]
fn drops_oldest_keeps_newest() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX).with_predicted_length(5);

    let prepared = prepare(&mut messages, &config).unwrap();

    assert!(
        !prepared.prompt.contains(&user_msg(1)),
        "oldest user turn should be removed"
    );
    assert!(prepared.prompt.contains(&user_msg(15)));
    assert!(prepared.prompt.contains(FINAL_USER));
    assert_eq!(messages.last(), Some(&Message::user(FINAL_USER)));
}

#[test]
fn prompt_matches_rerender_of_survivors() {
    let mut messages = long_messages(15);
    let config = TruncateConfig::new(N_CTX).with_predicted_length(5);

    let prepared = prepare(&mut messages, &config).unwrap();

    let rerendered = config.build_template().render(&messages).unwrap();
    assert_eq!(prepared.prompt, rerendered);
}
