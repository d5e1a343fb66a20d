use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use vyasa_core::{Feedback, SendPayload};

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Line editing shared by the chat input and the API key popup.
/// Returns false when the key isn't an editing key.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => *cursor = cursor.saturating_sub(1),
        KeyCode::Right => *cursor = (*cursor + 1).min(text.chars().count()),
        KeyCode::Home => *cursor = 0,
        KeyCode::End => *cursor = text.chars().count(),
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

fn insert_str(text: &mut String, cursor: &mut usize, pasted: &str) {
    // Single-line inputs: fold newlines into spaces
    let clean: String = pasted
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert_str(byte_pos, &clean);
    *cursor += clean.chars().count();
}

pub fn handle_event(app: &mut App, event: AppEvent) {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take every key while open (in order of priority)
    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return;
    }
    if app.show_theme_picker {
        handle_theme_picker(app, key);
        return;
    }
    if app.show_model_picker {
        handle_model_picker(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_api_key_input(),
        KeyCode::Enter => app.confirm_api_key(),
        _ => {
            edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key);
        }
    }
}

fn handle_theme_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_theme_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.theme_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.theme_picker_nav_up(),
        KeyCode::Enter => app.select_theme(),
        _ => {}
    }
}

fn handle_model_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_model_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.model_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.model_picker_nav_up(),
        KeyCode::Enter => app.select_model(),
        _ => {}
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to the input box
        KeyCode::Tab | KeyCode::Char('i') | KeyCode::Char('/') => {
            app.input_mode = InputMode::Editing;
            app.input_cursor = app.input.chars().count();
        }

        // Half-page scroll (before plain 'd'/'u' would match)
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_down();
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_half_page_up();
        }

        // Turn selection
        KeyCode::Char('j') | KeyCode::Down => app.select_next_message(),
        KeyCode::Char('k') | KeyCode::Up => app.select_prev_message(),
        KeyCode::Char('g') | KeyCode::Home => app.select_first_message(),
        KeyCode::Char('G') | KeyCode::End => app.select_last_message(),

        // Read More / Read Less
        KeyCode::Enter | KeyCode::Char('e') => app.toggle_expanded(),

        // Numbered options: example prompts on a fresh conversation,
        // otherwise the selected turn's story choices or suggestions
        KeyCode::Char(c @ '1'..='9') => {
            let n = (c as usize) - ('1' as usize);
            if app.conversation.show_example_prompts() {
                app.send_example_prompt(n);
            } else {
                app.pick_option(n);
            }
        }

        // Feedback
        KeyCode::Char('+') | KeyCode::Char('y') => {
            app.give_feedback(Feedback::Positive);
        }
        KeyCode::Char('-') | KeyCode::Char('n') => {
            app.give_feedback(Feedback::Negative);
        }

        // Pickers
        KeyCode::Char('t') => app.open_theme_picker(),
        KeyCode::Char('M') => app.open_model_picker(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            let text = app.input.clone();
            app.submit(SendPayload::Text(text));
        }
        // The input is disabled while a request is in flight
        _ if app.is_loading() => {}
        _ => {
            edit_line(&mut app.input, &mut app.input_cursor, key);
        }
    }
}

fn handle_paste(app: &mut App, text: &str) {
    if app.show_api_key_input {
        insert_str(&mut app.api_key_input, &mut app.api_key_input_cursor, text.trim());
    } else if app.input_mode == InputMode::Editing && !app.is_loading() {
        insert_str(&mut app.input, &mut app.input_cursor, text);
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let in_chat = app
        .chat_area
        .map(|r| point_in_rect(mouse.column, mouse.row, r))
        .unwrap_or(false);
    if !in_chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}
