//! The send dispatcher
//!
//! `Conversation` owns the ordered turn list and the single in-flight guard.
//! A send is split in two halves so front ends can run the network call on a
//! background task: [`Conversation::begin_send`] records the user turn and
//! yields the prompt, [`Conversation::complete_send`] records the outcome and
//! always releases the guard.

use anyhow::{anyhow, Result};
use serde::Deserialize;

use crate::ai::gemini::{FunctionCall, ModelReply, PRESENT_EXAMPLES, PRESENT_SUGGESTIONS};
use crate::prompts::{choice_display_text, choice_prompt, ERROR_TEXT, GREETING};
use crate::state::{ExampleChoice, Feedback, Message};

/// What the user asked to send
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendPayload {
    Text(String),
    Choice(ExampleChoice),
}

#[derive(Deserialize)]
struct ExamplesArgs {
    introductory_sentence: String,
    examples: Vec<ExampleChoice>,
}

#[derive(Deserialize)]
struct SuggestionsArgs {
    suggestions: Vec<String>,
}

fn parse_args<T: for<'de> Deserialize<'de>>(call: &FunctionCall) -> Result<T> {
    serde_json::from_value(call.args.clone())
        .map_err(|e| anyhow!("Malformed {} arguments: {}", call.name, e))
}

/// Build the model turn for a reply. Story choices win over plain text.
pub fn message_from_reply(reply: ModelReply) -> Result<Message> {
    if let Some(call) = reply.function_call(PRESENT_EXAMPLES) {
        let args: ExamplesArgs = parse_args(call)?;
        let mut message = Message::model(args.introductory_sentence);
        message.choices = Some(args.examples);
        return Ok(message);
    }

    let suggestions = match reply.function_call(PRESENT_SUGGESTIONS) {
        Some(call) => Some(parse_args::<SuggestionsArgs>(call)?.suggestions),
        None => None,
    };

    let mut message = Message::model(reply.text);
    message.suggestions = suggestions;
    Ok(message)
}

#[derive(Debug, Clone)]
pub struct Conversation {
    messages: Vec<Message>,
    is_loading: bool,
    last_error: Option<String>,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

impl Conversation {
    pub fn new() -> Self {
        Self {
            messages: vec![Message::model(GREETING)],
            is_loading: false,
            last_error: None,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Example prompts are offered until the user says something
    pub fn show_example_prompts(&self) -> bool {
        self.messages.len() <= 1
    }

    /// Record the user turn and return the prompt to send, or `None` when
    /// the send is rejected (blank text, or a request already in flight).
    pub fn begin_send(&mut self, payload: SendPayload) -> Option<String> {
        if self.is_loading {
            tracing::debug!("Send rejected: a request is already in flight");
            return None;
        }

        let (shown, prompt) = match payload {
            SendPayload::Text(text) => {
                if text.trim().is_empty() {
                    return None;
                }
                (text.clone(), text)
            }
            SendPayload::Choice(choice) => (choice_display_text(&choice), choice_prompt(&choice)),
        };

        // Only the newest model turn may offer choices, and any send retires them
        for message in &mut self.messages {
            message.choices = None;
        }
        self.messages.push(Message::user(shown));
        self.is_loading = true;
        self.last_error = None;

        Some(prompt)
    }

    /// Record the outcome of the in-flight request and release the guard
    pub fn complete_send(&mut self, result: Result<ModelReply>) {
        match result.and_then(message_from_reply) {
            Ok(message) => {
                tracing::info!(
                    choices = message.choices.as_ref().map_or(0, Vec::len),
                    suggestions = message.suggestions.as_ref().map_or(0, Vec::len),
                    "Model turn received"
                );
                self.messages.push(message);
            }
            Err(e) => {
                tracing::error!("Request failed: {:#}", e);
                self.last_error = Some(ERROR_TEXT.to_string());
                self.messages.push(Message::error(ERROR_TEXT));
            }
        }
        self.is_loading = false;
    }

    /// Set feedback on a turn. Only the first click counts.
    pub fn set_feedback(&mut self, index: usize, feedback: Feedback) -> bool {
        let Some(message) = self.messages.get_mut(index) else {
            return false;
        };
        if message.feedback.is_some() || !message.accepts_feedback() {
            return false;
        }

        message.feedback = Some(feedback);
        tracing::info!("Feedback received for message {}: {}", index, feedback);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::gemini::FunctionCall;
    use crate::state::Role;
    use serde_json::json;

    fn choice(source: &str, summary: &str) -> ExampleChoice {
        ExampleChoice {
            source: source.to_string(),
            summary: summary.to_string(),
        }
    }

    fn examples_reply() -> ModelReply {
        ModelReply {
            text: String::new(),
            function_calls: vec![FunctionCall {
                name: PRESENT_EXAMPLES.to_string(),
                args: json!({
                    "introductory_sentence": "These stories speak to your question.",
                    "examples": [
                        { "source": "Mahabharata", "summary": "Yudhishthira answers the Yaksha" },
                        { "source": "Ramayana", "summary": "Rama honours his father's word" }
                    ]
                }),
            }],
        }
    }

    #[test]
    fn test_starts_with_greeting() {
        let convo = Conversation::new();
        assert_eq!(convo.len(), 1);
        assert_eq!(convo.messages()[0].role, Role::Model);
        assert_eq!(convo.messages()[0].content, GREETING);
        assert!(convo.show_example_prompts());
    }

    #[test]
    fn test_blank_send_is_a_no_op() {
        let mut convo = Conversation::new();
        assert_eq!(convo.begin_send(SendPayload::Text(String::new())), None);
        assert_eq!(convo.begin_send(SendPayload::Text("  \n\t ".to_string())), None);
        assert_eq!(convo.len(), 1);
        assert!(!convo.is_loading());
    }

    #[test]
    fn test_text_send_appends_user_turn() {
        let mut convo = Conversation::new();
        let prompt = convo.begin_send(SendPayload::Text("What is Dharma?".to_string()));

        assert_eq!(prompt.as_deref(), Some("What is Dharma?"));
        assert_eq!(convo.len(), 2);
        assert_eq!(convo.last().unwrap(), &Message::user("What is Dharma?"));
        assert!(convo.is_loading());
        assert!(!convo.show_example_prompts());
    }

    #[test]
    fn test_second_send_while_pending_is_rejected() {
        let mut convo = Conversation::new();
        assert!(convo.begin_send(SendPayload::Text("first".to_string())).is_some());
        let len = convo.len();

        assert_eq!(convo.begin_send(SendPayload::Text("second".to_string())), None);
        assert_eq!(
            convo.begin_send(SendPayload::Choice(choice("Gita", "Arjuna's doubt"))),
            None
        );
        assert_eq!(convo.len(), len);
    }

    #[test]
    fn test_choice_send_clears_previous_choices() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("Teach me loyalty".to_string()));
        convo.complete_send(Ok(examples_reply()));
        assert!(convo.last().unwrap().has_choices());
        let before = convo.len();

        let picked = choice("Ramayana", "Rama honours his father's word");
        let prompt = convo.begin_send(SendPayload::Choice(picked)).unwrap();

        assert_eq!(convo.len(), before + 1);
        assert!(prompt.contains("**Ramayana**"));
        assert!(prompt.contains("Rama honours his father's word"));

        let user_turn = convo.last().unwrap();
        assert_eq!(user_turn.role, Role::User);
        assert!(user_turn.content.contains("Ramayana"));

        let offered = &convo.messages()[before - 1];
        assert!(offered.choices.is_none());
        assert!(convo.messages().iter().all(|m| !m.has_choices()));
    }

    #[test]
    fn test_text_send_retires_pending_choices() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("Teach me loyalty".to_string()));
        convo.complete_send(Ok(examples_reply()));
        convo.begin_send(SendPayload::Text("Actually, teach me patience".to_string()));
        convo.complete_send(Ok(examples_reply()));

        let pending: Vec<usize> = convo
            .messages()
            .iter()
            .enumerate()
            .filter(|(_, m)| m.has_choices())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(pending, vec![convo.len() - 1]);
    }

    #[test]
    fn test_failure_appends_one_error_turn_and_releases_guard() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("hello".to_string()));
        convo.complete_send(Err(anyhow!("connection refused")));

        assert_eq!(convo.len(), 3);
        let last = convo.last().unwrap();
        assert!(last.is_error);
        assert_eq!(last.role, Role::Model);
        assert_eq!(last.content, ERROR_TEXT);
        assert_eq!(convo.last_error(), Some(ERROR_TEXT));
        assert!(!convo.is_loading());

        // Guard released, so the user can try again
        assert!(convo.begin_send(SendPayload::Text("again".to_string())).is_some());
        assert_eq!(convo.last_error(), None);
    }

    #[test]
    fn test_text_reply_with_suggestions() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("Tell me of Karna".to_string()));
        convo.complete_send(Ok(ModelReply {
            text: "Karna was generous to a fault.".to_string(),
            function_calls: vec![FunctionCall {
                name: PRESENT_SUGGESTIONS.to_string(),
                args: json!({ "suggestions": ["Why did Karna side with Duryodhana?", "What is daana?"] }),
            }],
        }));

        let last = convo.last().unwrap();
        assert_eq!(last.content, "Karna was generous to a fault.");
        assert_eq!(last.suggestions.as_ref().map(Vec::len), Some(2));
        assert!(last.choices.is_none());
    }

    #[test]
    fn test_examples_take_precedence_over_text() {
        let mut reply = examples_reply();
        reply.text = "ignored".to_string();
        let message = message_from_reply(reply).unwrap();

        assert_eq!(message.content, "These stories speak to your question.");
        assert_eq!(message.choices.as_ref().map(Vec::len), Some(2));
    }

    #[test]
    fn test_malformed_arguments_become_error_turn() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("hi".to_string()));
        convo.complete_send(Ok(ModelReply {
            text: String::new(),
            function_calls: vec![FunctionCall {
                name: PRESENT_EXAMPLES.to_string(),
                args: json!({ "examples": "not a list" }),
            }],
        }));

        assert!(convo.last().unwrap().is_error);
        assert!(!convo.is_loading());
    }

    #[test]
    fn test_feedback_is_set_once() {
        let mut convo = Conversation::new();
        assert!(convo.set_feedback(0, Feedback::Positive));
        assert!(!convo.set_feedback(0, Feedback::Negative));
        assert_eq!(convo.messages()[0].feedback, Some(Feedback::Positive));
    }

    #[test]
    fn test_feedback_rejected_on_user_error_and_missing_turns() {
        let mut convo = Conversation::new();
        convo.begin_send(SendPayload::Text("hi".to_string()));
        convo.complete_send(Err(anyhow!("boom")));

        assert!(!convo.set_feedback(1, Feedback::Positive));
        assert!(!convo.set_feedback(2, Feedback::Positive));
        assert!(!convo.set_feedback(99, Feedback::Positive));
    }
}
