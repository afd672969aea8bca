//! Inbound chat transport.
//!
//! Delivers `(group_name, text)` pairs from the source groups to the
//! [`Ingestor`](crate::engine::classifier::Ingestor).

pub mod telegram;

use crate::types::UNKNOWN_GROUP;

/// One inbound message, normalised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub group_name: String,
    pub text: String,
}

impl InboundMessage {
    /// Build from raw transport fields. Returns `None` when there is no
    /// text to look at.
    pub fn from_parts(chat_title: Option<&str>, text: Option<&str>) -> Option<Self> {
        let text = text?.trim();
        if text.is_empty() {
            return None;
        }
        let group_name = chat_title
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(UNKNOWN_GROUP);
        Some(Self {
            group_name: group_name.to_string(),
            text: text.to_string(),
        })
    }
}
