pub mod gemini;

pub use gemini::{ChatSession, FunctionCall, GeminiClient, ModelReply};
