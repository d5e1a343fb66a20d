pub mod ai;
pub mod config;
pub mod conversation;
pub mod format;
pub mod prompts;
pub mod state;
pub mod theme;

// Re-export main types for convenience
pub use ai::{ChatSession, FunctionCall, GeminiClient, ModelReply};
pub use config::Config;
pub use conversation::{Conversation, SendPayload};
pub use format::Segment;
pub use state::{ExampleChoice, Feedback, Message, Role};
pub use theme::Theme;
