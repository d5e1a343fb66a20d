use std::collections::HashSet;
use std::path::PathBuf;
use anyhow::anyhow;
use ratatui::layout::Rect;
use ratatui::widgets::ListState;
use tokio::task::JoinHandle;
use vyasa_core::ai::gemini::DEFAULT_MODEL;
use vyasa_core::prompts::random_example_prompts;
use vyasa_core::{
    ChatSession, Config, Conversation, Feedback, GeminiClient, ModelReply, SendPayload, Theme,
};

use crate::palette::Palette;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// The background request hands the session back along with the outcome
pub type QueryTask = JoinHandle<(ChatSession, anyhow::Result<ModelReply>)>;

pub struct App {
    // Core state
    pub should_quit: bool,
    pub input_mode: InputMode,

    // Conversation
    pub conversation: Conversation,
    pub example_prompts: Vec<&'static str>,
    pub expanded: HashSet<usize>, // turns showing "Read Less"
    pub selected_message: usize,
    pub follow_latest: bool,       // keep the newest turn selected and in view
    pub scroll_to_selected: bool,  // set by selection moves, consumed by render

    // Input box
    pub input: String,
    pub input_cursor: usize, // cursor position in input, in chars

    // Chat viewport (updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,
    pub chat_area: Option<Rect>,

    // Request state
    pub client: Option<GeminiClient>,
    pub session: Option<ChatSession>,
    pub query_task: Option<QueryTask>,
    pub selected_model: String,
    pub base_url: Option<String>,     // endpoint override from config
    pub config_path: Option<PathBuf>, // where key and model choices are saved

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation

    // Theme picker state
    pub theme: Theme,
    pub show_theme_picker: bool,
    pub theme_picker_state: ListState,

    // Model picker state
    pub show_model_picker: bool,
    pub available_models: Vec<String>,
    pub model_picker_state: ListState,

    // API key input state
    pub show_api_key_input: bool,
    pub api_key_input: String,
    pub api_key_input_cursor: usize,
    pub pending_payload: Option<SendPayload>, // send waiting on a key
}

impl App {
    pub fn new(config: &Config) -> Self {
        let selected_model = config
            .resolved_model()
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        match config.key_source() {
            Some(source) => tracing::info!("Using API key from {}", source),
            None => tracing::info!("No API key configured, will prompt on first send"),
        }

        let mut app = Self::with_client(None, selected_model, random_example_prompts());
        app.base_url = config.base_url.clone();
        app.config_path = Config::config_path().ok();
        app.client = config.resolved_api_key().map(|key| app.build_client(&key));
        app
    }

    /// A client for `key` using the selected model and configured endpoint
    fn build_client(&self, key: &str) -> GeminiClient {
        let client = GeminiClient::new(key).with_model(&self.selected_model);
        match self.base_url.as_deref() {
            Some(url) => client.with_base_url(url),
            None => client,
        }
    }

    fn persist(&self, what: &str, update: impl FnOnce(&mut Config)) {
        let Some(path) = self.config_path.as_deref() else {
            return;
        };
        if let Err(e) = Config::update_at(path, update) {
            tracing::warn!("Could not save {} to config: {:#}", what, e);
        }
    }

    pub fn with_client(
        client: Option<GeminiClient>,
        selected_model: String,
        example_prompts: Vec<&'static str>,
    ) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation: Conversation::new(),
            example_prompts,
            expanded: HashSet::new(),
            selected_message: 0,
            follow_latest: true,
            scroll_to_selected: false,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            chat_area: None,

            client,
            session: None,
            query_task: None,
            selected_model,
            base_url: None,
            config_path: None,

            animation_frame: 0,

            theme: Theme::default(),
            show_theme_picker: false,
            theme_picker_state: ListState::default(),

            show_model_picker: false,
            available_models: Vec::new(),
            model_picker_state: ListState::default(),

            show_api_key_input: false,
            api_key_input: String::new(),
            api_key_input_cursor: 0,
            pending_payload: None,
        }
    }

    pub fn palette(&self) -> Palette {
        Palette::for_theme(self.theme)
    }

    pub fn is_loading(&self) -> bool {
        self.conversation.is_loading()
    }

    // Sending

    /// Dispatch a send. The network call runs on a background task that
    /// `poll_query_task` collects.
    pub fn submit(&mut self, payload: SendPayload) {
        if self.is_loading() {
            return;
        }
        if let SendPayload::Text(text) = &payload {
            if text.trim().is_empty() {
                return;
            }
        }

        let Some(client) = self.client.clone() else {
            // Ask for a key first, then resume this send
            self.pending_payload = Some(payload);
            self.open_api_key_input();
            return;
        };

        let is_text = matches!(payload, SendPayload::Text(_));
        let Some(prompt) = self.conversation.begin_send(payload) else {
            return;
        };

        if is_text {
            self.input.clear();
            self.input_cursor = 0;
        }
        self.follow_latest = true;
        self.input_mode = InputMode::Normal;

        // The session is created lazily on the first send
        let mut session = self.session.take().unwrap_or_else(|| client.start_chat());
        tracing::info!(model = client.model(), "Sending message");

        self.query_task = Some(tokio::spawn(async move {
            let result = client.send_message(&mut session, &prompt).await;
            (session, result)
        }));
    }

    /// Collect the background request once it has finished
    pub async fn poll_query_task(&mut self) {
        let finished = self.query_task.as_ref().is_some_and(|t| t.is_finished());
        if !finished {
            return;
        }

        if let Some(task) = self.query_task.take() {
            match task.await {
                Ok((session, result)) => {
                    self.session = Some(session);
                    self.conversation.complete_send(result);
                }
                Err(e) => {
                    // The session went down with the task; a fresh one starts next send
                    self.conversation
                        .complete_send(Err(anyhow!("Request task failed: {}", e)));
                }
            }
            self.follow_latest = true;
        }
    }

    pub fn send_example_prompt(&mut self, n: usize) {
        if !self.conversation.show_example_prompts() {
            return;
        }
        if let Some(prompt) = self.example_prompts.get(n) {
            self.submit(SendPayload::Text(prompt.to_string()));
        }
    }

    /// Pick the n-th choice, or failing that the n-th suggestion, of the selected turn
    pub fn pick_option(&mut self, n: usize) {
        let Some(message) = self.conversation.messages().get(self.selected_message) else {
            return;
        };

        let payload = if message.has_choices() {
            message
                .choices
                .as_ref()
                .and_then(|c| c.get(n))
                .cloned()
                .map(SendPayload::Choice)
        } else if message.accepts_feedback() && message.has_suggestions() {
            message
                .suggestions
                .as_ref()
                .and_then(|s| s.get(n))
                .cloned()
                .map(SendPayload::Text)
        } else {
            None
        };

        if let Some(payload) = payload {
            self.submit(payload);
        }
    }

    pub fn give_feedback(&mut self, feedback: Feedback) -> bool {
        self.conversation.set_feedback(self.selected_message, feedback)
    }

    pub fn toggle_expanded(&mut self) {
        let idx = self.selected_message;
        let is_long = self
            .conversation
            .messages()
            .get(idx)
            .is_some_and(|m| m.is_long());
        if !is_long {
            return;
        }
        if !self.expanded.remove(&idx) {
            self.expanded.insert(idx);
        }
        self.scroll_to_selected = true;
    }

    // Selection

    /// Keep the selection pinned to the newest turn while following
    pub fn sync_selection(&mut self) {
        if self.follow_latest {
            self.selected_message = self.conversation.len().saturating_sub(1);
        }
    }

    pub fn select_next_message(&mut self) {
        let last = self.conversation.len().saturating_sub(1);
        self.selected_message = (self.selected_message + 1).min(last);
        self.follow_latest = self.selected_message == last;
        self.scroll_to_selected = true;
    }

    pub fn select_prev_message(&mut self) {
        self.selected_message = self.selected_message.saturating_sub(1);
        self.follow_latest = false;
        self.scroll_to_selected = true;
    }

    pub fn select_first_message(&mut self) {
        self.selected_message = 0;
        self.follow_latest = false;
        self.chat_scroll = 0;
    }

    pub fn select_last_message(&mut self) {
        self.follow_latest = true;
        self.sync_selection();
    }

    // Scrolling

    pub fn scroll_down(&mut self, lines: u16) {
        self.follow_latest = false;
        self.chat_scroll = self.chat_scroll.saturating_add(lines);
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.follow_latest = false;
        self.chat_scroll = self.chat_scroll.saturating_sub(lines);
    }

    pub fn scroll_half_page_down(&mut self) {
        self.scroll_down((self.chat_height / 2).max(1));
    }

    pub fn scroll_half_page_up(&mut self) {
        self.scroll_up((self.chat_height / 2).max(1));
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_loading() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Theme picker methods
    pub fn open_theme_picker(&mut self) {
        let current_idx = Theme::all()
            .iter()
            .position(|t| *t == self.theme)
            .unwrap_or(0);
        self.theme_picker_state.select(Some(current_idx));
        self.show_theme_picker = true;
    }

    pub fn theme_picker_nav_down(&mut self) {
        let len = Theme::all().len();
        let i = self.theme_picker_state.selected().unwrap_or(0);
        self.theme_picker_state.select(Some((i + 1).min(len - 1)));
    }

    pub fn theme_picker_nav_up(&mut self) {
        let i = self.theme_picker_state.selected().unwrap_or(0);
        self.theme_picker_state.select(Some(i.saturating_sub(1)));
    }

    pub fn select_theme(&mut self) {
        if let Some(theme) = self
            .theme_picker_state
            .selected()
            .and_then(|i| Theme::all().get(i).copied())
        {
            self.theme = theme;
            tracing::info!("Theme changed to {}", theme.id());
        }
        self.show_theme_picker = false;
    }

    // Model picker methods
    pub fn open_model_picker(&mut self) {
        self.available_models = GeminiClient::list_models();
        if !self.available_models.iter().any(|m| m == &self.selected_model) {
            self.available_models.insert(0, self.selected_model.clone());
        }
        let current_idx = self
            .available_models
            .iter()
            .position(|m| m == &self.selected_model)
            .unwrap_or(0);
        self.model_picker_state.select(Some(current_idx));
        self.show_model_picker = true;
    }

    pub fn model_picker_nav_down(&mut self) {
        let len = self.available_models.len();
        if len > 0 {
            let i = self.model_picker_state.selected().unwrap_or(0);
            self.model_picker_state.select(Some((i + 1).min(len - 1)));
        }
    }

    pub fn model_picker_nav_up(&mut self) {
        let i = self.model_picker_state.selected().unwrap_or(0);
        self.model_picker_state.select(Some(i.saturating_sub(1)));
    }

    /// Switching models keeps the conversation history
    pub fn select_model(&mut self) {
        if let Some(model) = self
            .model_picker_state
            .selected()
            .and_then(|i| self.available_models.get(i))
            .cloned()
        {
            self.client = self.client.take().map(|c| c.with_model(&model));
            tracing::info!("Model changed to {}", model);
            self.persist("model", |c| c.model = Some(model.clone()));
            self.selected_model = model;
        }
        self.show_model_picker = false;
    }

    // API key popup

    pub fn open_api_key_input(&mut self) {
        self.show_api_key_input = true;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
    }

    pub fn cancel_api_key_input(&mut self) {
        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;
        self.pending_payload = None;
    }

    /// Install the typed key, save it, and resume the send that asked for it
    pub fn confirm_api_key(&mut self) {
        let key = self.api_key_input.trim().to_string();
        if key.is_empty() {
            return;
        }

        self.persist("API key", |c| c.api_key = Some(key.clone()));
        self.client = Some(self.build_client(&key));

        self.show_api_key_input = false;
        self.api_key_input.clear();
        self.api_key_input_cursor = 0;

        if let Some(payload) = self.pending_payload.take() {
            self.submit(payload);
        }
    }
}
