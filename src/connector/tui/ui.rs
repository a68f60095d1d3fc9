use ratatui::layout::{Constraint, Layout, Position, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap};
use ratatui::Frame;

use super::app::{App, Focus, NoticeLevel};
use super::markdown::{self, Highlighter};
use crate::domain::Role;

const SIDEBAR_WIDTH: u16 = 32;
const INPUT_HEIGHT: u16 = 5;
const SPINNER: [&str; 4] = ["|", "/", "-", "\\"];

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan)
    } else {
        Style::default().fg(Color::DarkGray)
    }
}

pub fn draw(frame: &mut Frame, app: &App, highlighter: &Highlighter) {
    let [sidebar, main] =
        Layout::horizontal([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(20)])
            .areas(frame.area());
    draw_sidebar(frame, app, sidebar);

    let [header, transcript, input, status] = Layout::vertical([
        Constraint::Length(3),
        Constraint::Min(3),
        Constraint::Length(INPUT_HEIGHT),
        Constraint::Length(1),
    ])
    .areas(main);

    draw_header(frame, app, header);
    if app.session().is_connected() {
        draw_transcript(frame, app, highlighter, transcript);
    } else {
        draw_welcome(frame, transcript);
    }
    draw_input(frame, app, input);
    draw_status(frame, app, status);
}

fn draw_sidebar(frame: &mut Frame, app: &App, area: Rect) {
    let [models_area, history_area] =
        Layout::vertical([Constraint::Percentage(40), Constraint::Percentage(60)]).areas(area);

    let selected = app.session().selected_model();
    let models: Vec<ListItem> = app
        .session()
        .models()
        .iter()
        .map(|model| {
            let marker = if Some(model.id()) == selected { "● " } else { "  " };
            ListItem::new(format!("{marker}{}", model.name()))
        })
        .collect();
    let models_list = List::new(models)
        .block(
            Block::default()
                .title(" Models ")
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::Models)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut models_state = ListState::default().with_selected(
        (app.focus == Focus::Models && !app.session().models().is_empty())
            .then_some(app.model_cursor),
    );
    frame.render_stateful_widget(models_list, models_area, &mut models_state);

    let history: Vec<ListItem> = app
        .history
        .iter()
        .map(|conversation| ListItem::new(conversation.title().to_string()))
        .collect();
    let history_list = List::new(history)
        .block(
            Block::default()
                .title(" History (Ctrl+N new) ")
                .borders(Borders::ALL)
                .border_style(border_style(app.focus == Focus::History)),
        )
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED));
    let mut history_state = ListState::default().with_selected(
        (app.focus == Focus::History && !app.history.is_empty()).then_some(app.history_cursor),
    );
    frame.render_stateful_widget(history_list, history_area, &mut history_state);
}

fn draw_header(frame: &mut Frame, app: &App, area: Rect) {
    let state = if app.connecting {
        Span::styled(
            format!(" {} Connecting ", SPINNER[app.spinner % SPINNER.len()]),
            Style::default().fg(Color::Yellow),
        )
    } else if app.session().is_connected() {
        Span::styled(" Connected ", Style::default().fg(Color::Green))
    } else {
        Span::styled(" Enter to connect ", Style::default().fg(Color::DarkGray))
    };

    let focused = app.focus == Focus::Endpoint;
    let block = Block::default()
        .title(" Endpoint ")
        .title_bottom(Line::from(state).right_aligned())
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let endpoint = Paragraph::new(app.endpoint_input.as_str()).block(block);
    frame.render_widget(endpoint, area);

    if focused {
        let x = area.x.saturating_add(1).saturating_add(text_width(&app.endpoint_input));
        frame.set_cursor_position(Position::new(x.min(area.right().saturating_sub(2)), area.y + 1));
    }
}

fn draw_welcome(frame: &mut Frame, area: Rect) {
    let text = Text::from(vec![
        Line::default(),
        Line::styled(
            "Welcome to lmchat",
            Style::default().add_modifier(Modifier::BOLD),
        )
        .centered(),
        Line::default(),
        Line::from("Enter the address of your OpenAI-compatible server above").centered(),
        Line::from("(for example http://192.168.1.10:1234) and press Enter.").centered(),
    ]);
    frame.render_widget(
        Paragraph::new(text).block(Block::default().borders(Borders::ALL)),
        area,
    );
}

fn role_header(role: Role) -> Line<'static> {
    let (label, color) = match role {
        Role::User => ("You", Color::Green),
        Role::Assistant => ("Assistant", Color::Cyan),
        Role::System => ("System", Color::Magenta),
    };
    Line::styled(
        label,
        Style::default().fg(color).add_modifier(Modifier::BOLD),
    )
}

fn draw_transcript(frame: &mut Frame, app: &App, highlighter: &Highlighter, area: Rect) {
    let session = app.session();
    let mut lines: Vec<Line> = Vec::new();

    for message in session.conversation().messages() {
        lines.push(role_header(message.role()));
        if message.is_user() {
            lines.extend(message.content().lines().map(|l| Line::raw(l.to_string())));
        } else {
            lines.extend(markdown::render(message.content(), highlighter));
        }
        lines.push(Line::default());
    }

    if session.is_generating() {
        lines.push(role_header(Role::Assistant));
        if session.streamed().is_empty() {
            lines.push(Line::styled(
                SPINNER[app.spinner % SPINNER.len()],
                Style::default().fg(Color::DarkGray),
            ));
        } else {
            lines.extend(markdown::render(session.streamed(), highlighter));
        }
    }

    let title = format!(" {} ", session.conversation().title());
    let block = Block::default().title(title).borders(Borders::ALL);
    let inner_width = area.width.saturating_sub(2).max(1) as usize;
    let inner_height = area.height.saturating_sub(2) as usize;

    let wrapped: usize = lines
        .iter()
        .map(|line| line.width().max(1).div_ceil(inner_width))
        .sum();
    let bottom = wrapped.saturating_sub(inner_height);
    let offset = bottom.saturating_sub(app.scroll_back as usize);

    let transcript = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset.min(u16::MAX as usize) as u16, 0));
    frame.render_widget(transcript, area);
}

fn draw_input(frame: &mut Frame, app: &App, area: Rect) {
    let focused = app.focus == Focus::Input;
    let hint = if app.session().is_generating() {
        " Generating... (Esc to cancel) "
    } else if app.session().selected_model().is_none() {
        " Select a model first "
    } else {
        " Enter send | Alt+Enter newline "
    };
    let block = Block::default()
        .title(" Message ")
        .title_bottom(Line::from(hint).right_aligned())
        .borders(Borders::ALL)
        .border_style(border_style(focused));

    let style = if app.session().is_generating() {
        Style::default().fg(Color::DarkGray)
    } else {
        Style::default()
    };
    let input = Paragraph::new(app.input.as_str())
        .style(style)
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(input, area);

    if focused && !app.session().is_generating() {
        let line_count = u16::try_from(app.input.split('\n').count()).unwrap_or(u16::MAX);
        let last_width = text_width(app.input.rsplit('\n').next().unwrap_or_default());
        let x = area
            .x
            .saturating_add(1)
            .saturating_add(last_width)
            .min(area.right().saturating_sub(2));
        let y = area
            .y
            .saturating_add(line_count)
            .min(area.bottom().saturating_sub(2));
        frame.set_cursor_position(Position::new(x, y));
    }
}

/// Character count clamped to what a terminal coordinate can hold.
fn text_width(text: &str) -> u16 {
    u16::try_from(text.chars().count()).unwrap_or(u16::MAX)
}

fn draw_status(frame: &mut Frame, app: &App, area: Rect) {
    let line = match app.notice() {
        Some(notice) => {
            let color = match notice.level {
                NoticeLevel::Info => Color::Gray,
                NoticeLevel::Success => Color::Green,
                NoticeLevel::Error => Color::Red,
            };
            Line::styled(notice.text.clone(), Style::default().fg(color))
        }
        None => Line::styled(
            "Tab focus | Ctrl+R models | Ctrl+S export | Ctrl+Q quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use tokio::sync::mpsc;

    use super::*;
    use crate::application::{ConnectUseCase, ConversationHistoryUseCase};
    use crate::connector::tui::app::AppConfig;
    use crate::connector::{InMemoryConversationRepository, MockInferenceClient};
    use crate::domain::ChatSession;

    fn render_to_string(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let highlighter = Highlighter::new();
        terminal.draw(|frame| draw(frame, app, &highlighter)).unwrap();
        let buffer = terminal.backend().buffer();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn idle_app() -> App {
        let (tx, _rx) = mpsc::unbounded_channel();
        let client = Arc::new(MockInferenceClient::new());
        App::new(
            AppConfig {
                endpoint: "http://localhost:1234".to_string(),
                auto_connect: false,
                session: ChatSession::new(),
                connect: Arc::new(ConnectUseCase::new(client)),
                history: Arc::new(ConversationHistoryUseCase::new(Arc::new(
                    InMemoryConversationRepository::new(),
                ))),
                export_dir: std::env::temp_dir(),
            },
            tx,
        )
    }

    #[test]
    fn test_text_width_clamps_long_lines() {
        assert_eq!(text_width("héllo"), 5);
        assert_eq!(text_width(&"x".repeat(70_000)), u16::MAX);
    }

    #[tokio::test]
    async fn test_huge_pasted_line_keeps_cursor_inside_input() {
        let mut app = idle_app();
        app.focus = Focus::Input;
        app.input = "x".repeat(70_000);
        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        let highlighter = Highlighter::new();

        terminal.draw(|frame| draw(frame, &app, &highlighter)).unwrap();

        let cursor = terminal.get_cursor_position().unwrap();
        assert!(cursor.x < 100);
        assert!(cursor.y < 30);
    }

    #[tokio::test]
    async fn test_disconnected_screen_shows_welcome() {
        let app = idle_app();

        let screen = render_to_string(&app);

        assert!(screen.contains("Welcome to lmchat"));
        assert!(screen.contains("http://localhost:1234"));
        assert!(screen.contains("Select a model first"));
    }
}
