//! The uniform response envelope every invocation returns.
//!
//! Exactly two shapes exist: success and error. Downstream failures, schema
//! rejections, and permission denials all arrive here as the error shape —
//! callers never see a raw Rust error cross this boundary.

use serde::Serialize;

use crate::error::CommandError;

/// One block of renderable content. Only text today; the tag field keeps the
/// wire shape open for richer block kinds.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContentBlock {
    Text { text: String },
}

impl ContentBlock {
    pub fn text(text: impl Into<String>) -> Self {
        ContentBlock::Text { text: text.into() }
    }

    /// The inner text of the block.
    pub fn as_text(&self) -> &str {
        match self {
            ContentBlock::Text { text } => text,
        }
    }
}

/// Closed two-variant result shape. Serializes as `{"content": [...]}` on
/// success and `{"content": [...], "isError": true}` on error.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Envelope {
    Success {
        content: Vec<ContentBlock>,
    },
    Error {
        content: Vec<ContentBlock>,
        #[serde(rename = "isError")]
        is_error: bool,
    },
}

impl Envelope {
    /// Wrap a rendered message in a success envelope.
    pub fn ok(message: impl Into<String>) -> Self {
        Envelope::Success {
            content: vec![ContentBlock::text(message)],
        }
    }

    /// Wrap a failure in an error envelope. `label` is the command (or
    /// command.action) being invoked; the error's own message is preserved.
    pub fn fail(label: &str, error: &CommandError) -> Self {
        Envelope::Error {
            content: vec![ContentBlock::text(format!("❌ {label}: {error}"))],
            is_error: true,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Envelope::Error { .. })
    }

    /// Concatenated text of all content blocks. Used by the CLI and tests.
    pub fn message(&self) -> String {
        let blocks = match self {
            Envelope::Success { content } | Envelope::Error { content, .. } => content,
        };
        blocks
            .iter()
            .map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn success_serializes_without_error_flag() {
        let env = Envelope::ok("done");
        let json = serde_json::to_value(&env).unwrap();
        assert!(json.get("isError").is_none());
        assert_eq!(json["content"][0]["type"], "text");
        assert_eq!(json["content"][0]["text"], "done");
    }

    #[test]
    fn error_serializes_with_error_flag() {
        let err = CommandError::UnknownCommand {
            name: "does_not_exist".into(),
        };
        let env = Envelope::fail("does_not_exist", &err);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["isError"], true);
        assert!(json["content"][0]["text"]
            .as_str()
            .unwrap()
            .contains("Unknown command"));
    }

    #[test]
    fn message_joins_blocks() {
        let env = Envelope::Success {
            content: vec![ContentBlock::text("a"), ContentBlock::text("b")],
        };
        assert_eq!(env.message(), "a\nb");
    }
}
