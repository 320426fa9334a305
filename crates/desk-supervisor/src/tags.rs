//! Name/content tagging for inter-agent attribution.
//!
//! Assistant messages that carry an agent name are wrapped in explicit
//! `<name>` and `<content>` tags before being shown to a model, so the model
//! can tell which agent said what. The inverse strips the tags from model
//! output when the declared name matches the message's attribution; any
//! mismatch or missing tag passes the message through untouched.

use std::sync::LazyLock;

use desk_llm::{ContentBlock, Message, MessageContent, Role};
use regex::Regex;

static NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<name>(.*?)</name>").expect("valid name pattern"));
static CONTENT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<content>(.*?)</content>").expect("valid content pattern"));

/// Wraps a named assistant message's text content in name/content tags.
/// Other messages pass through unchanged.
pub fn process_input_message(message: &Message) -> Message {
    if message.role != Role::Assistant {
        return message.clone();
    }
    let Some(name) = &message.name else {
        return message.clone();
    };
    let Some(MessageContent::Text(text)) = &message.content else {
        return message.clone();
    };

    message
        .clone()
        .with_content(MessageContent::Text(format!(
            "<name>{name}</name><content>{text}</content>"
        )))
}

/// Strips name/content tags from a model message when the tagged name
/// matches the message's attribution.
///
/// For block content, the first text block holds the tagged text; on a match
/// it is rewritten and re-appended after the non-text blocks.
pub fn process_output_message(message: &Message) -> Message {
    let Some(content) = &message.content else {
        return message.clone();
    };

    match content {
        MessageContent::Text(text) => {
            if text.is_empty() {
                return message.clone();
            }
            match extract_tagged(text, message.name.as_deref()) {
                Some(inner) => message.clone().with_content(MessageContent::Text(inner)),
                None => message.clone(),
            }
        }
        MessageContent::Blocks(blocks) => {
            let Some(first_text) = blocks.iter().find_map(|b| match b {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            }) else {
                return message.clone();
            };
            let Some(inner) = extract_tagged(first_text, message.name.as_deref()) else {
                return message.clone();
            };

            let mut rewritten: Vec<ContentBlock> = blocks
                .iter()
                .filter(|b| !matches!(b, ContentBlock::Text { .. }))
                .cloned()
                .collect();
            rewritten.push(ContentBlock::Text { text: inner });
            message
                .clone()
                .with_content(MessageContent::Blocks(rewritten))
        }
    }
}

/// Returns the inner content when both tags are present and the tagged name
/// matches the expected one.
fn extract_tagged(text: &str, expected_name: Option<&str>) -> Option<String> {
    let name_match = NAME_PATTERN.captures(text)?;
    let content_match = CONTENT_PATTERN.captures(text)?;
    let tagged_name = name_match.get(1)?.as_str();
    if Some(tagged_name) != expected_name {
        return None;
    }
    Some(content_match.get(1)?.as_str().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_leaves_user_messages_unchanged() {
        let message = Message::user("Hello");
        assert_eq!(process_input_message(&message), message);
    }

    #[test]
    fn input_leaves_unnamed_assistant_messages_unchanged() {
        let message = Message::assistant("Hello world");
        assert_eq!(process_input_message(&message), message);
    }

    #[test]
    fn input_wraps_named_assistant_messages() {
        let message = Message::assistant_named("assistant", "Hello world");
        let result = process_input_message(&message);
        assert_eq!(
            result.text(),
            Some("<name>assistant</name><content>Hello world</content>")
        );
        assert_eq!(result.name.as_deref(), Some("assistant"));
    }

    #[test]
    fn output_leaves_empty_content_unchanged() {
        let message = Message::assistant_named("assistant", "");
        assert_eq!(process_output_message(&message), message);
    }

    #[test]
    fn output_leaves_untagged_content_unchanged() {
        let message = Message::assistant_named("assistant", "Hello world");
        assert_eq!(process_output_message(&message), message);
    }

    #[test]
    fn output_leaves_mismatched_name_unchanged() {
        let message = Message::assistant_named(
            "assistant",
            "<name>different_name</name><content>Hello world</content>",
        );
        assert_eq!(process_output_message(&message), message);
    }

    #[test]
    fn output_strips_matching_tags() {
        let message = Message::assistant_named(
            "assistant",
            "<name>assistant</name><content>Hello world</content>",
        );
        let result = process_output_message(&message);
        assert_eq!(result.text(), Some("Hello world"));
        assert_eq!(result.name.as_deref(), Some("assistant"));
    }

    #[test]
    fn output_rewrites_first_text_block_after_non_text_blocks() {
        let message = Message {
            role: Role::Assistant,
            content: Some(MessageContent::Blocks(vec![
                ContentBlock::Text {
                    text: "<name>assistant</name><content>Hello world</content>".to_string(),
                },
                ContentBlock::ToolUse {
                    id: "call_1".to_string(),
                    name: "get_econ_data".to_string(),
                    input: json!({"indicator": "cpi"}),
                },
            ])),
            name: Some("assistant".to_string()),
        };
        let result = process_output_message(&message);
        let Some(MessageContent::Blocks(blocks)) = &result.content else {
            panic!("expected block content");
        };
        assert_eq!(blocks.len(), 2);
        assert!(matches!(&blocks[0], ContentBlock::ToolUse { .. }));
        assert_eq!(
            blocks[1],
            ContentBlock::Text {
                text: "Hello world".to_string()
            }
        );
    }

    #[test]
    fn output_handles_multiline_content() {
        let message = Message::assistant_named(
            "assistant",
            "<name>assistant</name><content>This is\na multiline\nmessage</content>",
        );
        let result = process_output_message(&message);
        assert_eq!(result.text(), Some("This is\na multiline\nmessage"));
    }
}
