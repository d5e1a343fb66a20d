use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{
        Block, Borders, Clear, List, ListItem, Paragraph, Scrollbar, ScrollbarOrientation,
        ScrollbarState,
    },
};
use vyasa_core::format::{self, Segment};
use vyasa_core::{Feedback, Message, Theme};

use crate::app::{App, InputMode};
use crate::palette::Palette;

const INDENT: &str = "  ";

/// Word-wrap styled spans to a width, keeping each span's style.
/// Pieces not separated by whitespace stay glued together on one line.
fn wrap_spans(spans: Vec<Span<'static>>, width: usize, indent: &str) -> Vec<Line<'static>> {
    let avail = width.saturating_sub(indent.chars().count()).max(1);
    let mut lines = Vec::new();
    let mut current: Vec<Span<'static>> = Vec::new();
    let mut current_len = 0;
    let mut space_pending = false;
    let mut space_style = Style::default();

    let finish = |spans: Vec<Span<'static>>| {
        let mut all = Vec::with_capacity(spans.len() + 1);
        all.push(Span::raw(indent.to_string()));
        all.extend(spans);
        Line::from(all)
    };

    for span in spans {
        let style = span.style;
        for (i, word) in span.content.split(char::is_whitespace).enumerate() {
            if i > 0 {
                space_pending = true;
                space_style = style;
            }
            if word.is_empty() {
                continue;
            }

            let word_len = word.chars().count();
            let at_boundary = space_pending && current_len > 0;
            if at_boundary && current_len + 1 + word_len > avail {
                lines.push(finish(std::mem::take(&mut current)));
                current_len = 0;
            } else if at_boundary {
                current.push(Span::styled(" ", space_style));
                current_len += 1;
            }

            current.push(Span::styled(word.to_string(), style));
            current_len += word_len;
            space_pending = false;
        }
    }

    if !current.is_empty() {
        lines.push(finish(current));
    }

    lines
}

fn segment_spans(paragraph: &str, message: &Message, palette: &Palette) -> Vec<Span<'static>> {
    let base = if message.is_error {
        Style::default().fg(palette.error)
    } else {
        Style::default().fg(palette.text)
    };

    format::segments(paragraph, !message.is_user())
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => Span::styled(text.to_string(), base),
            Segment::Bold(text) => Span::styled(text.to_string(), base.add_modifier(Modifier::BOLD)),
            Segment::Sacred(text) => Span::styled(
                text.to_string(),
                Style::default()
                    .fg(palette.sacred_fg)
                    .bg(palette.sacred_bg)
                    .add_modifier(Modifier::ITALIC | Modifier::BOLD),
            ),
        })
        .collect()
}

/// Lay out every turn. Also returns the line each turn starts on.
fn chat_lines(app: &App, width: usize) -> (Vec<Line<'static>>, Vec<usize>) {
    let palette = app.palette();
    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut starts = Vec::with_capacity(app.conversation.len());

    for (idx, msg) in app.conversation.messages().iter().enumerate() {
        starts.push(lines.len());
        let selected = idx == app.selected_message && app.input_mode == InputMode::Normal;

        // Role line
        let (label, label_color) = if msg.is_user() {
            ("You", palette.user_label)
        } else if msg.is_error {
            ("Veda Vyasa", palette.error)
        } else {
            ("Veda Vyasa", palette.model_label)
        };
        let marker = if selected { "▌" } else { " " };
        lines.push(Line::from(vec![
            Span::styled(marker, Style::default().fg(palette.accent)),
            Span::styled(label, Style::default().fg(label_color).add_modifier(Modifier::BOLD)),
        ]));

        // Body
        let expanded = app.expanded.contains(&idx);
        let content = format::display_content(msg, expanded);
        for (p, paragraph) in format::paragraphs(&content).into_iter().enumerate() {
            if p > 0 {
                lines.push(Line::default());
            }
            lines.extend(wrap_spans(segment_spans(paragraph, msg, &palette), width, INDENT));
        }

        if msg.is_long() {
            let hint = if expanded { "Read Less" } else { "Read More" };
            lines.push(Line::from(vec![
                Span::raw(INDENT),
                Span::styled(
                    format!("[e] {}", hint),
                    Style::default().fg(palette.header_text).add_modifier(Modifier::BOLD),
                ),
            ]));
        }

        // Story choices
        if let Some(choices) = msg.choices.as_ref().filter(|c| !c.is_empty()) {
            lines.push(Line::default());
            for (i, choice) in choices.iter().enumerate() {
                let spans = vec![
                    Span::styled(format!("[{}]", i + 1), Style::default().fg(palette.accent).bold()),
                    Span::styled(
                        format!(" {}:", choice.source),
                        Style::default().fg(palette.sacred_fg).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(format!(" {}", choice.summary), Style::default().fg(palette.text)),
                ];
                lines.extend(wrap_spans(spans, width, "    "));
            }
        }

        if msg.accepts_feedback() {
            lines.push(feedback_line(msg.feedback, &palette));
        }

        // Suggestion chips
        if !msg.is_user() && !msg.is_error {
            if let Some(suggestions) = msg.suggestions.as_ref().filter(|s| !s.is_empty()) {
                for (i, suggestion) in suggestions.iter().enumerate() {
                    let spans = vec![
                        Span::styled(format!("({})", i + 1), Style::default().fg(palette.accent)),
                        Span::styled(format!(" {}", suggestion), Style::default().fg(palette.suggestion)),
                    ];
                    lines.extend(wrap_spans(spans, width, "    "));
                }
            }
        }

        lines.push(Line::default());
    }

    if app.is_loading() {
        lines.push(Line::from(vec![
            Span::raw(" "),
            Span::styled(
                "Veda Vyasa",
                Style::default().fg(palette.model_label).add_modifier(Modifier::BOLD),
            ),
        ]));
        // Animated ellipsis: cycles through ".", "..", "..."
        let dots = ".".repeat((app.animation_frame as usize) + 1);
        lines.push(Line::from(Span::styled(
            format!("{}Reflecting{}", INDENT, dots),
            Style::default().fg(palette.muted).add_modifier(Modifier::ITALIC),
        )));
    }

    (lines, starts)
}

fn feedback_line(feedback: Option<Feedback>, palette: &Palette) -> Line<'static> {
    let style_for = |which: Feedback| match feedback {
        Some(f) if f == which => Style::default().fg(palette.accent).add_modifier(Modifier::BOLD),
        Some(_) => Style::default().fg(palette.muted).add_modifier(Modifier::DIM),
        None => Style::default().fg(palette.muted),
    };

    Line::from(vec![
        Span::raw(INDENT),
        Span::styled("[+] helpful", style_for(Feedback::Positive)),
        Span::raw("  "),
        Span::styled("[-] not helpful", style_for(Feedback::Negative)),
    ])
}

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();
    let palette = app.palette();

    frame.render_widget(
        Block::default().style(Style::default().bg(palette.bg).fg(palette.text)),
        area,
    );

    let examples_height = if app.conversation.show_example_prompts() && !app.example_prompts.is_empty() {
        app.example_prompts.len() as u16 + 2
    } else {
        0
    };

    // Main layout: header, chat, example prompts, input, footer
    let [header_area, chat_area, examples_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(examples_height),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    if examples_height > 0 {
        render_example_prompts(app, frame, examples_area);
    }
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_theme_picker {
        render_theme_picker(app, frame, area);
    } else if app.show_model_picker {
        render_model_picker(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();

    let title = Line::from(vec![
        Span::styled(" ॐ Veda Vyasa AI ", Style::default().fg(palette.header_text).bold()),
        Span::styled("Your guide to Vedic Wisdom", Style::default().fg(palette.muted)),
        Span::raw("  "),
        Span::styled(
            format!("{} · {}", app.theme.display_name(), app.selected_model),
            Style::default().fg(palette.accent),
        ),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(palette.muted),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(palette.header_bg));
    frame.render_widget(header, area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();
    app.chat_area = Some(area);
    app.sync_selection();

    let focused = app.input_mode == InputMode::Normal;
    let border_color = if focused { palette.accent } else { palette.border };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));

    let inner = block.inner(area);
    app.chat_height = inner.height;
    app.chat_width = inner.width;

    // One column is left for the scrollbar
    let (lines, starts) = chat_lines(app, inner.width.saturating_sub(1) as usize);
    let total = lines.len();
    let height = inner.height as usize;
    let max_scroll = total.saturating_sub(height);

    let mut scroll = app.chat_scroll as usize;
    if app.follow_latest {
        scroll = max_scroll;
    } else if app.scroll_to_selected {
        if let Some(&start) = starts.get(app.selected_message) {
            let end = starts.get(app.selected_message + 1).copied().unwrap_or(total);
            if start < scroll {
                scroll = start;
            } else if end > scroll + height {
                scroll = start.min(end.saturating_sub(height));
            }
        }
    }
    app.scroll_to_selected = false;
    scroll = scroll.min(max_scroll);
    app.chat_scroll = u16::try_from(scroll).unwrap_or(u16::MAX);

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if total > height {
        let mut scrollbar_state = ScrollbarState::new(max_scroll).position(scroll);
        frame.render_stateful_widget(
            Scrollbar::new(ScrollbarOrientation::VerticalRight)
                .style(Style::default().fg(palette.muted)),
            area,
            &mut scrollbar_state,
        );
    }
}

fn render_example_prompts(app: &App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.border))
        .title(Span::styled(" Try asking ", Style::default().fg(palette.header_text)));

    let style = if app.is_loading() {
        Style::default().fg(palette.muted)
    } else {
        Style::default().fg(palette.text)
    };

    let lines: Vec<Line> = app
        .example_prompts
        .iter()
        .enumerate()
        .map(|(i, prompt)| {
            Line::from(vec![
                Span::styled(format!(" [{}] ", i + 1), Style::default().fg(palette.accent).bold()),
                Span::styled(*prompt, style),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();
    let editing = app.input_mode == InputMode::Editing;

    let border_color = if editing { palette.accent } else { palette.border };
    let title = if app.is_loading() {
        " Waiting for Veda Vyasa... "
    } else {
        " Ask (Enter to send, Tab for chat) "
    };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(Span::styled(title, Style::default().fg(palette.header_text)));

    // Calculate visible portion of input with horizontal scrolling
    // Inner width = total width - 2 (for borders)
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let input = if app.input.is_empty() {
        Paragraph::new("Ask a question about life and dharma...")
            .style(Style::default().fg(palette.muted))
    } else {
        let visible_text: String = app
            .input
            .chars()
            .skip(scroll_offset)
            .take(inner_width)
            .collect();
        let color = if app.is_loading() { palette.muted } else { palette.text };
        Paragraph::new(visible_text).style(Style::default().fg(color))
    };

    frame.render_widget(input.block(input_block), area);

    // Show cursor when editing
    if editing && !app.is_loading() && !app.show_api_key_input {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();

    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (
            " CHAT ",
            Style::default().bg(palette.accent).fg(palette.highlight_fg).bold(),
        ),
        InputMode::Editing => (
            " ASK ",
            Style::default().bg(palette.header_text).fg(palette.bg).bold(),
        ),
    };

    let hints = match app.input_mode {
        InputMode::Editing if app.conversation.show_example_prompts() => {
            " Enter send · Tab then 1-4 to try an example · Ctrl-C quit"
        }
        InputMode::Editing => " Enter send · Tab/Esc chat · Ctrl-C quit",
        InputMode::Normal => {
            " j/k select · e read more · 1-9 choose · +/- feedback · t theme · M model · i ask · q quit"
        }
    };

    let footer = Line::from(vec![
        Span::styled(mode_text, mode_style),
        Span::styled(hints, Style::default().fg(palette.muted)),
    ]);

    frame.render_widget(Paragraph::new(footer).style(Style::default().bg(palette.header_bg)), area);
}

/// Centered popup rectangle, clamped to the screen
fn popup_area(area: Rect, width: u16, height: u16) -> Rect {
    let popup_width = width.min(area.width.saturating_sub(4));
    let popup_height = height.min(area.height.saturating_sub(4));

    let popup_x = area.x + (area.width.saturating_sub(popup_width)) / 2;
    let popup_y = area.y + (area.height.saturating_sub(popup_height)) / 2;

    Rect::new(popup_x, popup_y, popup_width, popup_height)
}

fn render_theme_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();
    let themes = Theme::all();
    let popup = popup_area(area, 36, themes.len() as u16 + 2);

    // Clear the area behind the popup
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.bg))
        .title(" Select Theme ");

    let items: Vec<ListItem> = themes
        .iter()
        .map(|theme| {
            let [swatch_a, swatch_b] = theme.colors();
            let is_current = *theme == app.theme;
            let name_style = if is_current {
                Style::default().fg(palette.text).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled("█", Style::default().fg(Color::Rgb(swatch_a.0, swatch_a.1, swatch_a.2))),
                Span::styled("█ ", Style::default().fg(Color::Rgb(swatch_b.0, swatch_b.1, swatch_b.2))),
                Span::styled(theme.display_name(), name_style),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(palette.highlight_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.theme_picker_state);
}

fn render_model_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();
    let popup = popup_area(area, 40, app.available_models.len() as u16 + 2);

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.bg))
        .title(" Select Model (Enter to select, Esc to cancel) ");

    let items: Vec<ListItem> = app
        .available_models
        .iter()
        .map(|model| {
            let style = if model == &app.selected_model {
                Style::default().fg(palette.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(palette.text)
            };
            ListItem::new(format!(" {} ", model)).style(style)
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(palette.accent)
                .fg(palette.highlight_fg)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.model_picker_state);
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let palette = app.palette();
    let popup = popup_area(area, 60, 7);

    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(palette.accent))
        .style(Style::default().bg(palette.bg))
        .title(" Enter Gemini API Key ");

    let inner = block.inner(popup);
    frame.render_widget(block, popup);

    let instructions = Paragraph::new("Paste your API key below. Press Enter to save, Esc to cancel.")
        .style(Style::default().fg(palette.muted));
    frame.render_widget(instructions, Rect::new(inner.x, inner.y, inner.width, 1));

    let input_area = Rect::new(inner.x, inner.y + 2, inner.width, 1);

    // Mask the key with asterisks (show last 4 chars)
    let char_count = app.api_key_input.chars().count();
    let display_text = if char_count <= 4 {
        "*".repeat(char_count)
    } else {
        let masked_len = char_count - 4;
        let last_four: String = app.api_key_input.chars().skip(masked_len).collect();
        format!("{}...{}", "*".repeat(masked_len.min(20)), last_four)
    };
    let display_len = display_text.chars().count();

    frame.render_widget(
        Paragraph::new(display_text).style(Style::default().fg(palette.text)),
        input_area,
    );

    // Cursor sits at the end of the masked text
    let cursor_x = display_len.min(input_area.width as usize) as u16;
    frame.set_cursor_position((input_area.x + cursor_x, input_area.y));

    let status = Paragraph::new(format!("{} characters", char_count))
        .style(Style::default().fg(palette.muted));
    frame.render_widget(status, Rect::new(inner.x, inner.y + 4, inner.width, 1));
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use vyasa_core::ai::gemini::DEFAULT_MODEL;
    use vyasa_core::prompts::FULL_PROMPT_LIST;
    use vyasa_core::{ModelReply, SendPayload};

    fn line_text(line: &Line) -> String {
        line.spans.iter().map(|s| s.content.as_ref()).collect()
    }

    fn test_app() -> App {
        App::with_client(None, DEFAULT_MODEL.to_string(), FULL_PROMPT_LIST[..4].to_vec())
    }

    #[test]
    fn test_wrap_spans_respects_width() {
        let spans = vec![Span::raw("the quick brown fox jumps over the lazy dog")];
        let lines = wrap_spans(spans, 12, INDENT);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line_text(line).chars().count() <= 12, "{:?}", line_text(line));
            assert!(line_text(line).starts_with(INDENT));
        }
    }

    #[test]
    fn test_wrap_spans_keeps_punctuation_glued() {
        let spans = vec![
            Span::raw("see the "),
            Span::styled("Ramayana", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw(", then rest"),
        ];
        let lines = wrap_spans(spans, 80, "");
        assert_eq!(lines.len(), 1);
        assert_eq!(line_text(&lines[0]), "see the Ramayana, then rest");
    }

    #[test]
    fn test_sacred_segments_get_their_own_style() {
        let palette = Palette::for_theme(Theme::Surya);
        let msg = Message::model("Read the **Mahabharata** and **rest**.");
        let spans = segment_spans(&msg.content, &msg, &palette);

        let sacred = spans.iter().find(|s| s.content == "Mahabharata").unwrap();
        assert_eq!(sacred.style.bg, Some(palette.sacred_bg));

        let bold = spans.iter().find(|s| s.content == "rest").unwrap();
        assert_eq!(bold.style.bg, None);
        assert!(bold.style.add_modifier.contains(Modifier::BOLD));
    }

    #[test]
    fn test_user_turns_are_not_highlighted() {
        let palette = Palette::for_theme(Theme::Vana);
        let msg = Message::user("What does the **Ramayana** say?");
        let spans = segment_spans(&msg.content, &msg, &palette);
        assert!(spans.iter().all(|s| s.style.bg.is_none()));
    }

    #[test]
    fn test_long_reply_is_truncated_until_expanded() {
        let mut app = test_app();
        app.conversation.begin_send(SendPayload::Text("Who was Dhruva?".to_string()));
        app.conversation.complete_send(Ok(ModelReply {
            text: "Dhruva sat in meditation on the banks of the Yamuna. ".repeat(12),
            function_calls: Vec::new(),
        }));

        let (collapsed, starts) = chat_lines(&app, 60);
        assert_eq!(starts.len(), 3);
        let collapsed_text: Vec<String> = collapsed.iter().map(line_text).collect();
        assert!(collapsed_text.iter().any(|l| l.contains("Read More")));

        app.expanded.insert(2);
        let (expanded, _) = chat_lines(&app, 60);
        let expanded_text: Vec<String> = expanded.iter().map(line_text).collect();
        assert!(expanded_text.iter().any(|l| l.contains("Read Less")));
        assert!(expanded.len() > collapsed.len());
    }

    #[test]
    fn test_render_smoke_for_every_theme() {
        let backend = TestBackend::new(80, 30);
        let mut terminal = Terminal::new(backend).unwrap();
        let mut app = test_app();

        for theme in Theme::all() {
            app.theme = theme;
            terminal.draw(|frame| render(&mut app, frame)).unwrap();
        }

        app.open_theme_picker();
        terminal.draw(|frame| render(&mut app, frame)).unwrap();
        assert!(app.chat_area.is_some());
    }
}
