//! Prompt composition with trailing conversation context.

use crate::session::core::conversation::Message;

/// Build the prompt sent to the agent.
///
/// `history` is the context window, oldest first. When it is empty the
/// user text is sent verbatim.
#[must_use]
pub fn build_prompt(history: &[Message], text: &str) -> String {
    if history.is_empty() {
        return text.to_string();
    }

    let mut out = String::with_capacity(estimate_len(history, text));
    out.push_str("Previous conversation:\n");
    for (i, message) in history.iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        render_message(&mut out, message);
    }
    out.push_str("\n\nUser: ");
    out.push_str(text);
    out
}

fn render_message(out: &mut String, message: &Message) {
    out.push_str(message.role.label());
    out.push_str(": ");
    out.push_str(&message.content);
}

fn estimate_len(history: &[Message], text: &str) -> usize {
    history
        .iter()
        .map(|m| m.content.len() + 12)
        .sum::<usize>()
        + text.len()
        + 32
}
