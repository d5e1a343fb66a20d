use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::prompts::SYSTEM_INSTRUCTION;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

pub const PRESENT_EXAMPLES: &str = "present_examples";
pub const PRESENT_SUGGESTIONS: &str = "present_suggestions";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_call: Option<FunctionCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_response: Option<FunctionResponse>,
    /// Fields this client doesn't interpret (e.g. `thoughtSignature`),
    /// echoed back untouched in the history
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Part {
    fn text(text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::default()
        }
    }
}

/// A structured invocation emitted by the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    pub name: String,
    pub response: Value,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Value,
    contents: &'a [Content],
    tools: Value,
    generation_config: Value,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// The model's answer to one send: free text plus any function calls
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelReply {
    pub text: String,
    pub function_calls: Vec<FunctionCall>,
}

impl ModelReply {
    pub fn from_content(content: &Content) -> Self {
        let text = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect::<String>();
        let function_calls = content
            .parts
            .iter()
            .filter_map(|p| p.function_call.clone())
            .collect();

        Self { text, function_calls }
    }

    pub fn function_call(&self, name: &str) -> Option<&FunctionCall> {
        self.function_calls.iter().find(|fc| fc.name == name)
    }
}

/// Conversation handle. Holds the running history sent with every request.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    history: Vec<Content>,
}

impl ChatSession {
    pub fn history(&self) -> &[Content] {
        &self.history
    }

    /// Build the next user turn, answering any calls the model made last time
    fn user_turn(&self, text: &str) -> Content {
        let mut parts: Vec<Part> = self
            .history
            .last()
            .filter(|c| c.role == "model")
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.function_call.as_ref())
                    .map(|fc| Part {
                        function_response: Some(FunctionResponse {
                            name: fc.name.clone(),
                            response: json!({ "status": "presented to the user" }),
                        }),
                        ..Part::default()
                    })
                    .collect()
            })
            .unwrap_or_default();
        parts.push(Part::text(text));

        Content {
            role: "user".to_string(),
            parts,
        }
    }
}

/// Declarations for the two structured payloads the interface knows how to render
pub fn function_declarations() -> Value {
    json!([{
        "functionDeclarations": [
            {
                "name": PRESENT_EXAMPLES,
                "description": "Offer the user a short list of scripture stories relevant to their question so they can choose one to hear in full.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "introductory_sentence": {
                            "type": "STRING",
                            "description": "One empathetic sentence introducing the stories."
                        },
                        "examples": {
                            "type": "ARRAY",
                            "items": {
                                "type": "OBJECT",
                                "properties": {
                                    "source": {
                                        "type": "STRING",
                                        "description": "The scripture the story comes from, e.g. Mahabharata."
                                    },
                                    "summary": {
                                        "type": "STRING",
                                        "description": "A one-sentence summary of the story."
                                    }
                                },
                                "required": ["source", "summary"]
                            }
                        }
                    },
                    "required": ["introductory_sentence", "examples"]
                }
            },
            {
                "name": PRESENT_SUGGESTIONS,
                "description": "Offer two or three short follow-up questions the user might ask next.",
                "parameters": {
                    "type": "OBJECT",
                    "properties": {
                        "suggestions": {
                            "type": "ARRAY",
                            "items": { "type": "STRING" }
                        }
                    },
                    "required": ["suggestions"]
                }
            }
        ]
    }])
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: &str) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    pub fn with_model(mut self, model: &str) -> Self {
        self.model = model.to_string();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn start_chat(&self) -> ChatSession {
        ChatSession::default()
    }

    /// Send one user turn. History is only extended when the call succeeds.
    pub async fn send_message(&self, session: &mut ChatSession, text: &str) -> Result<ModelReply> {
        let user_turn = session.user_turn(text);
        let mut contents = session.history.clone();
        contents.push(user_turn.clone());

        let request = GenerateRequest {
            system_instruction: json!({ "parts": [{ "text": SYSTEM_INSTRUCTION }] }),
            contents: &contents,
            tools: function_declarations(),
            generation_config: json!({ "temperature": 0.7 }),
        };

        // The key travels in a header so it never shows up in error URLs
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        tracing::debug!(model = %self.model, turns = contents.len(), "Sending request to Gemini");

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("x-goog-api-key", self.api_key.as_str())
            .json(&request)
            .send()
            .await
            .context("Failed to send request to Gemini")?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(anyhow!("Gemini API error {}: {}", status, text));
        }

        let gemini_response: GenerateResponse = response
            .json()
            .await
            .context("Failed to parse Gemini response")?;

        let content = gemini_response
            .candidates
            .into_iter()
            .find_map(|c| c.content)
            .ok_or_else(|| anyhow!("Gemini returned no candidates"))?;

        let reply = ModelReply::from_content(&content);

        session.history.push(user_turn);
        session.history.push(Content {
            role: "model".to_string(),
            parts: content.parts,
        });

        Ok(reply)
    }

    pub fn list_models() -> Vec<String> {
        vec![
            "gemini-2.5-flash".to_string(),
            "gemini-2.5-pro".to_string(),
            "gemini-2.5-flash-lite".to_string(),
            "gemini-2.0-flash".to_string(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/models/gemini-2.5-flash:generateContent";

    fn client_for(server: &MockServer) -> GeminiClient {
        GeminiClient::new("test-key").with_base_url(&server.uri())
    }

    fn candidate(parts: Value) -> Value {
        json!({ "candidates": [{ "content": { "role": "model", "parts": parts }, "finishReason": "STOP" }] })
    }

    #[tokio::test]
    async fn test_text_reply_extends_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .and(header("x-goog-api-key", "test-key"))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(json!([
                { "text": "The **Bhagavad Gita** " },
                { "text": "teaches detachment." }
            ]))))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        let reply = client.send_message(&mut session, "What is duty?").await.unwrap();

        assert_eq!(reply.text, "The **Bhagavad Gita** teaches detachment.");
        assert!(reply.function_calls.is_empty());
        assert_eq!(session.history().len(), 2);
        assert_eq!(session.history()[0].role, "user");
        assert_eq!(session.history()[1].role, "model");
    }

    #[tokio::test]
    async fn test_function_call_reply() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(json!([{
                "functionCall": {
                    "name": "present_examples",
                    "args": {
                        "introductory_sentence": "Here are two stories.",
                        "examples": [{ "source": "Ramayana", "summary": "Bharata rules as regent" }]
                    }
                }
            }]))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        let reply = client.send_message(&mut session, "Loyalty?").await.unwrap();

        let call = reply.function_call(PRESENT_EXAMPLES).unwrap();
        assert_eq!(call.args["introductory_sentence"], "Here are two stories.");
        assert!(reply.function_call(PRESENT_SUGGESTIONS).is_none());
        assert_eq!(reply.text, "");
    }

    #[tokio::test]
    async fn test_next_turn_answers_previous_function_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(json!([{
                "functionCall": { "name": "present_suggestions", "args": { "suggestions": ["Why?"] } }
            }]))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        client.send_message(&mut session, "first").await.unwrap();

        let next = session.user_turn("second");
        assert_eq!(next.parts.len(), 2);
        assert_eq!(
            next.parts[0].function_response.as_ref().map(|r| r.name.as_str()),
            Some(PRESENT_SUGGESTIONS)
        );
        assert_eq!(next.parts[1].text.as_deref(), Some("second"));
    }

    #[tokio::test]
    async fn test_error_status_leaves_history_untouched() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        let err = client.send_message(&mut session, "hello").await.unwrap_err();

        assert!(err.to_string().contains("500"));
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_does_not_reveal_key() {
        // Nothing listens on the discard port
        let client = GeminiClient::new("SECRET-KEY-123").with_base_url("http://127.0.0.1:9");
        let mut session = client.start_chat();
        let err = client.send_message(&mut session, "hello").await.unwrap_err();

        let logged = format!("{:#}", err);
        assert!(logged.contains("Failed to send request to Gemini"));
        assert!(!logged.contains("SECRET-KEY-123"), "{}", logged);
    }

    #[tokio::test]
    async fn test_no_candidates_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "candidates": [] })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        assert!(client.send_message(&mut session, "hello").await.is_err());
        assert!(session.history().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_part_fields_are_kept_in_history() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(candidate(json!([{
                "functionCall": { "name": "present_suggestions", "args": { "suggestions": ["Why?"] } },
                "thoughtSignature": "c2lnbmF0dXJl"
            }]))))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let mut session = client.start_chat();
        client.send_message(&mut session, "first").await.unwrap();

        let model_turn = serde_json::to_value(&session.history()[1]).unwrap();
        assert_eq!(model_turn["parts"][0]["thoughtSignature"], "c2lnbmF0dXJl");
        assert_eq!(model_turn["parts"][0]["functionCall"]["name"], PRESENT_SUGGESTIONS);
    }

    #[test]
    fn test_first_turn_has_only_text() {
        let session = ChatSession::default();
        let turn = session.user_turn("hello");
        assert_eq!(turn.role, "user");
        assert_eq!(turn.parts, vec![Part::text("hello")]);
    }

    #[test]
    fn test_declarations_name_both_payloads() {
        let decls = function_declarations();
        let names: Vec<&str> = decls[0]["functionDeclarations"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|d| d["name"].as_str())
            .collect();
        assert_eq!(names, vec![PRESENT_EXAMPLES, PRESENT_SUGGESTIONS]);
    }
}
