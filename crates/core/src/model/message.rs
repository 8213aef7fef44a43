use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::MessageId;

//
// ─── SPEAKER ───────────────────────────────────────────────────────────────────
//

/// Who produced a transcript message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The assistant side of the conversation.
    Bot,
    /// The person being verified.
    User,
}

//
// ─── MESSAGE META ──────────────────────────────────────────────────────────────
//

/// Annotations attached to bot messages tied to a question/answer exchange.
///
/// Question messages carry the ordinal and total; grading feedback carries
/// the confidence and correctness of the answer just checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct MessageMeta {
    pub question_number: Option<u32>,
    pub total_questions: Option<u32>,
    pub confidence: Option<f64>,
    pub was_correct: Option<bool>,
}

impl MessageMeta {
    /// Meta for a delivered question.
    #[must_use]
    pub fn question(number: u32, total: u32) -> Self {
        Self {
            question_number: Some(number),
            total_questions: Some(total),
            ..Self::default()
        }
    }

    /// Meta for grading feedback on a submitted answer.
    #[must_use]
    pub fn grading(confidence: f64, was_correct: bool) -> Self {
        Self {
            confidence: Some(confidence),
            was_correct: Some(was_correct),
            ..Self::default()
        }
    }
}

//
// ─── MESSAGE ───────────────────────────────────────────────────────────────────
//

/// A single entry in the visible conversation. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    id: MessageId,
    speaker: Speaker,
    text: String,
    created_at: DateTime<Utc>,
    is_placeholder: bool,
    meta: Option<MessageMeta>,
}

impl Message {
    #[must_use]
    pub fn bot(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            speaker: Speaker::Bot,
            text: text.into(),
            created_at: at,
            is_placeholder: false,
            meta: None,
        }
    }

    #[must_use]
    pub fn user(text: impl Into<String>, at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            speaker: Speaker::User,
            text: text.into(),
            created_at: at,
            is_placeholder: false,
            meta: None,
        }
    }

    /// A transient "the bot is composing a reply" entry.
    #[must_use]
    pub fn placeholder(at: DateTime<Utc>) -> Self {
        Self {
            id: MessageId::generate(),
            speaker: Speaker::Bot,
            text: String::new(),
            created_at: at,
            is_placeholder: true,
            meta: None,
        }
    }

    /// Attaches annotations to this message.
    #[must_use]
    pub fn with_meta(mut self, meta: MessageMeta) -> Self {
        self.meta = Some(meta);
        self
    }

    #[must_use]
    pub fn id(&self) -> &MessageId {
        &self.id
    }

    #[must_use]
    pub fn speaker(&self) -> Speaker {
        self.speaker
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.is_placeholder
    }

    #[must_use]
    pub fn meta(&self) -> Option<&MessageMeta> {
        self.meta.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::fixed_now;

    #[test]
    fn question_meta_carries_ordinals_only() {
        let meta = MessageMeta::question(2, 5);
        assert_eq!(meta.question_number, Some(2));
        assert_eq!(meta.total_questions, Some(5));
        assert_eq!(meta.confidence, None);
        assert_eq!(meta.was_correct, None);
    }

    #[test]
    fn placeholder_is_an_empty_bot_message() {
        let msg = Message::placeholder(fixed_now());
        assert!(msg.is_placeholder());
        assert_eq!(msg.speaker(), Speaker::Bot);
        assert!(msg.text().is_empty());
    }

    #[test]
    fn messages_get_distinct_ids() {
        let now = fixed_now();
        let a = Message::bot("hello", now);
        let b = Message::bot("hello", now);
        assert_ne!(a.id(), b.id());
    }
}
