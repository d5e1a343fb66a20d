//! UI-agnostic conversation state types
//!
//! These structures are shared by every front end and don't depend on any
//! specific UI framework.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Model turns longer than this many characters are collapsed behind "Read More"
pub const TRUNCATION_LIMIT: usize = 400;

/// Who authored a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

/// A reference to a scripture story offered by the model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExampleChoice {
    pub source: String,
    pub summary: String,
}

/// Thumbs-up / thumbs-down on a model turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Feedback {
    Positive,
    Negative,
}

impl Feedback {
    pub fn as_str(&self) -> &'static str {
        match self {
            Feedback::Positive => "positive",
            Feedback::Negative => "negative",
        }
    }
}

impl fmt::Display for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub choices: Option<Vec<ExampleChoice>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<Feedback>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestions: Option<Vec<String>>,
}

impl Message {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            is_error: false,
            choices: None,
            feedback: None,
            suggestions: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self::new(Role::Model, content)
    }

    pub fn error(content: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::new(Role::Model, content)
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == Role::User
    }

    pub fn has_choices(&self) -> bool {
        self.choices.as_ref().is_some_and(|c| !c.is_empty())
    }

    pub fn has_suggestions(&self) -> bool {
        self.suggestions.as_ref().is_some_and(|s| !s.is_empty())
    }

    /// Feedback controls are shown on model turns that aren't errors and
    /// aren't waiting on a story choice
    pub fn accepts_feedback(&self) -> bool {
        !self.is_user() && !self.is_error && !self.has_choices()
    }

    /// Whether the turn gets a "Read More" toggle
    pub fn is_long(&self) -> bool {
        !self.is_user() && !self.is_error && self.content.chars().count() > TRUNCATION_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_is_model_turn() {
        let msg = Message::error("boom");
        assert_eq!(msg.role, Role::Model);
        assert!(msg.is_error);
        assert!(!msg.accepts_feedback());
    }

    #[test]
    fn test_empty_choices_are_not_pending() {
        let mut msg = Message::model("Here are some stories");
        msg.choices = Some(Vec::new());
        assert!(!msg.has_choices());
        assert!(msg.accepts_feedback());
    }

    #[test]
    fn test_is_long_counts_characters() {
        let short = Message::model("ॐ".repeat(TRUNCATION_LIMIT));
        assert!(!short.is_long());

        let long = Message::model("a".repeat(TRUNCATION_LIMIT + 1));
        assert!(long.is_long());

        let user = Message::user("a".repeat(TRUNCATION_LIMIT + 1));
        assert!(!user.is_long());
    }

    #[test]
    fn test_serializes_with_camel_case_field_names() {
        let json = serde_json::to_value(Message::error("oops")).unwrap();
        assert_eq!(json["role"], "model");
        assert_eq!(json["isError"], true);
        assert!(json.get("choices").is_none());

        let plain = serde_json::to_value(Message::user("hi")).unwrap();
        assert!(plain.get("isError").is_none());
    }
}
