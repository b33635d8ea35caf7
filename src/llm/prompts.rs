// ABOUTME: Prompt text used when talking to the external model endpoint
// ABOUTME: Holds the consultant system prompt, title prompts, and the fallback reply
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Gutcheck

//! Prompt construction for model conversations

/// Built-in system prompt used when neither the conversation nor the user
/// settings provide one
pub const DEFAULT_SYSTEM_PROMPT: &str = "\
You are a professional gut health consultant. You can have friendly \
conversations with users, answer questions about gut health, and provide \
professional advice.

If the user shares gut-health journal data, please analyze and provide \
suggestions based on this data.

Please maintain a professional yet friendly tone.";

/// Assistant reply persisted verbatim when the model endpoint is unavailable
pub const FALLBACK_REPLY: &str = "\
Sorry, the AI assistant is currently unavailable. Please check your model \
API settings and try again later.";

/// System prompt for the short title-generation call
pub const TITLE_SYSTEM_PROMPT: &str =
    "You are a helpful assistant that generates concise conversation titles.";

/// Append rendered journal entries to a system prompt as grounding context
#[must_use]
pub fn with_grounding(system_prompt: &str, entries_context: &str) -> String {
    format!("{system_prompt}\n\nHere is the user's journal data for reference:\n{entries_context}")
}

/// Build the user prompt for the title-generation call
///
/// Only the first 200 characters of the assistant reply are included; the
/// title model does not need the full text.
#[must_use]
pub fn title_prompt(user_message: &str, assistant_reply: &str) -> String {
    let reply_preview: String = assistant_reply.chars().take(200).collect();
    format!(
        "Based on the following conversation, generate a concise title \
         (maximum 20 characters) that summarizes the main topic.\n\n\
         User: {user_message}\n\n\
         Assistant: {reply_preview}...\n\n\
         Please provide only the title without any explanation or punctuation."
    )
}

/// Normalize a raw title reply: strip quotes and label prefixes, cap at 20 chars
#[must_use]
pub fn clean_title(raw: &str) -> Option<String> {
    let mut title: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, '"' | '\'' | '\u{300c}' | '\u{300d}'))
        .collect();
    for prefix in ["Title: ", "Title:"] {
        if let Some(stripped) = title.strip_prefix(prefix) {
            title = stripped.to_owned();
        }
    }
    let title: String = title.trim().chars().take(20).collect();
    (!title.is_empty()).then_some(title)
}
