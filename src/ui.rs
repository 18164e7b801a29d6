//! Terminal chat UI.
//!
//! Layout, top to bottom: conversation (with an optional debug panel on the
//! right), a single-line input, and a controls bar. The session is owned by
//! the UI loop; each submitted query is awaited inline, so the loop is busy
//! until the reply arrives.

use std::io;

use anyhow::Result;
use crossterm::event::{Event, EventStream, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Margin, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};
use ratatui::widgets::{Block, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap};
use ratatui::Terminal;
use tracing::{info, warn};

use crate::config::Config;
use crate::render::GREETING;
use crate::session::{Reply, ReplyKind, Session};
use crate::stats::{collect_stats, StatsReport};

type Term = Terminal<CrosstermBackend<io::Stdout>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Speaker {
    User,
    Assistant,
}

struct Entry {
    speaker: Speaker,
    text: String,
    hint: Option<String>,
    is_error: bool,
}

struct App {
    config: Config,
    session: Session,
    entries: Vec<Entry>,
    input: String,
    /// Cursor position in characters, not bytes.
    cursor: usize,
    scroll: usize,
    content_len: usize,
    view_height: usize,
    auto_scroll: bool,
    show_debug: bool,
    stats: Option<StatsReport>,
    busy: bool,
}

impl App {
    fn new(config: Config, session: Session) -> Self {
        Self {
            config,
            session,
            entries: vec![greeting()],
            input: String::new(),
            cursor: 0,
            scroll: 0,
            content_len: 0,
            view_height: 0,
            auto_scroll: true,
            show_debug: false,
            stats: None,
            busy: false,
        }
    }

    fn byte_index(&self) -> usize {
        self.input
            .char_indices()
            .nth(self.cursor)
            .map(|(i, _)| i)
            .unwrap_or(self.input.len())
    }

    fn insert_char(&mut self, c: char) {
        let at = self.byte_index();
        self.input.insert(at, c);
        self.cursor += 1;
    }

    fn delete_char(&mut self) {
        if self.cursor == 0 {
            return;
        }
        self.cursor -= 1;
        let at = self.byte_index();
        self.input.remove(at);
    }

    fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    fn move_right(&mut self) {
        if self.cursor < self.input.chars().count() {
            self.cursor += 1;
        }
    }

    fn take_input(&mut self) -> Option<String> {
        if self.input.trim().is_empty() {
            return None;
        }
        self.cursor = 0;
        Some(std::mem::take(&mut self.input))
    }

    fn push_reply(&mut self, reply: Reply) {
        if reply.kind == ReplyKind::Ignored {
            return;
        }
        self.entries.push(Entry {
            speaker: Speaker::Assistant,
            text: reply.content,
            hint: reply.hint,
            is_error: reply.kind == ReplyKind::Error,
        });
        self.auto_scroll = true;
    }

    fn toggle_mode(&mut self) {
        let next = self.session.mode().toggle();
        self.session.set_mode(next);
    }

    fn reset(&mut self) {
        self.session.reset();
        self.entries = vec![greeting()];
        self.scroll = 0;
        self.auto_scroll = true;
    }

    async fn refresh_stats(&mut self) {
        let retriever = self.session.retriever();
        match collect_stats(
            &self.config,
            retriever.store().as_ref(),
            retriever.embedding_model(),
            self.session.generator_model(),
        )
        .await
        {
            Ok(stats) => self.stats = Some(stats),
            Err(e) => warn!(error = %e, "failed to collect statistics"),
        }
    }

    fn scroll_up(&mut self, by: usize) {
        self.scroll = self.scroll.saturating_sub(by);
    }

    fn scroll_down(&mut self, by: usize) {
        let max = self.content_len.saturating_sub(self.view_height);
        self.scroll = (self.scroll + by).min(max);
    }

    fn scroll_to_end(&mut self) {
        self.scroll = self.content_len.saturating_sub(self.view_height);
    }
}

fn greeting() -> Entry {
    Entry {
        speaker: Speaker::Assistant,
        text: GREETING.to_string(),
        hint: None,
        is_error: false,
    }
}

/// Run the chat UI until the user quits. The terminal is restored on every exit path.
pub async fn run_chat(config: Config, session: Session) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config, session);
    info!(session = %app.session.id(), "chat started");
    let res = run_app(&mut terminal, &mut app).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    info!(session = %app.session.id(), turns = app.session.history().len(), "chat ended");
    res
}

async fn run_app(terminal: &mut Term, app: &mut App) -> Result<()> {
    let mut events = EventStream::new();
    app.refresh_stats().await;
    draw_ui(terminal, app)?;

    while let Some(event) = events.next().await {
        let key = match event {
            Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => key,
            Ok(Event::Resize(_, _)) => {
                draw_ui(terminal, app)?;
                continue;
            }
            Ok(_) => continue,
            Err(e) => {
                warn!(error = %e, "terminal event error");
                continue;
            }
        };

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => return Ok(()),
            KeyCode::Esc => return Ok(()),
            KeyCode::Enter => {
                if let Some(input) = app.take_input() {
                    app.entries.push(Entry {
                        speaker: Speaker::User,
                        text: input.trim().to_string(),
                        hint: None,
                        is_error: false,
                    });
                    app.busy = true;
                    app.auto_scroll = true;
                    draw_ui(terminal, app)?;

                    let reply = app.session.handle(&input).await;
                    app.busy = false;
                    app.push_reply(reply);
                    if app.show_debug {
                        app.refresh_stats().await;
                    }
                }
            }
            KeyCode::Tab => app.toggle_mode(),
            KeyCode::F(3) => {
                app.show_debug = !app.show_debug;
                if app.show_debug {
                    app.refresh_stats().await;
                }
            }
            KeyCode::F(5) => {
                app.reset();
                app.refresh_stats().await;
            }
            KeyCode::Up => app.scroll_up(1),
            KeyCode::Down => app.scroll_down(1),
            KeyCode::PageUp => app.scroll_up(app.view_height.max(1)),
            KeyCode::PageDown => app.scroll_down(app.view_height.max(1)),
            KeyCode::Home => app.scroll = 0,
            KeyCode::End => app.scroll_to_end(),
            KeyCode::Left => app.move_left(),
            KeyCode::Right => app.move_right(),
            KeyCode::Backspace => app.delete_char(),
            KeyCode::Char(ch) => app.insert_char(ch),
            _ => {}
        }
        draw_ui(terminal, app)?;
    }

    Ok(())
}

fn inner_width(area: Rect) -> usize {
    area.width.saturating_sub(2) as usize
}

fn inner_height(area: Rect) -> usize {
    area.height.saturating_sub(2) as usize
}

/// Rows a block of text occupies once wrapped to `width` columns.
fn wrapped_rows(text: &str, width: usize) -> usize {
    if width == 0 {
        return 0;
    }
    text.lines()
        .map(|line| line.chars().count().max(1).div_ceil(width))
        .sum::<usize>()
        .max(1)
}

fn transcript(app: &App) -> (Text<'static>, String) {
    let user_style = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD);
    let assistant_style = Style::default()
        .fg(Color::Green)
        .add_modifier(Modifier::BOLD);
    let error_style = Style::default().fg(Color::Red);
    let hint_style = Style::default().fg(Color::Yellow);

    let mut lines: Vec<Line<'static>> = Vec::new();
    let mut plain = String::new();

    for entry in &app.entries {
        let (label, style) = match entry.speaker {
            Speaker::User => ("You", user_style),
            Speaker::Assistant => ("Assistant", assistant_style),
        };
        lines.push(Line::from(Span::styled(label, style)));
        plain.push_str(label);
        plain.push('\n');

        let body_style = if entry.is_error {
            error_style
        } else {
            Style::default()
        };
        for line in entry.text.lines() {
            lines.push(Line::from(Span::styled(line.to_string(), body_style)));
            plain.push_str(line);
            plain.push('\n');
        }
        if let Some(hint) = &entry.hint {
            lines.push(Line::from(Span::styled(hint.clone(), hint_style)));
            plain.push_str(hint);
            plain.push('\n');
        }
        lines.push(Line::from(""));
        plain.push('\n');
    }

    if app.busy {
        let label = match app.session.mode() {
            crate::models::Mode::Search => "Searching documents...",
            crate::models::Mode::Qa => "Generating an answer...",
        };
        lines.push(Line::from(Span::styled(label, hint_style)));
        plain.push_str(label);
        plain.push('\n');
    }

    (Text::from(lines), plain)
}

fn debug_lines(app: &App) -> Vec<Line<'static>> {
    let mut lines = vec![
        Line::from(format!("Mode: {}", app.session.mode().label())),
        Line::from(format!("History: {} turns", app.session.history().len())),
        Line::from(format!("Session: {}", &app.session.id().to_string()[..8])),
        Line::from(""),
    ];
    match &app.stats {
        Some(stats) => lines.extend(stats.panel_lines().into_iter().map(Line::from)),
        None => lines.push(Line::from("Statistics unavailable")),
    }
    lines
}

fn draw_ui(terminal: &mut Term, app: &mut App) -> io::Result<()> {
    terminal.draw(|frame| {
        let title_style = Style::default().add_modifier(Modifier::BOLD);
        let border = Style::default().fg(Color::DarkGray);

        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(6),
                Constraint::Length(3),
                Constraint::Length(3),
            ])
            .split(area);

        let (conversation_area, debug_area) = if app.show_debug {
            let cols = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
                .split(rows[0]);
            (cols[0], Some(cols[1]))
        } else {
            (rows[0], None)
        };

        let (text, plain) = transcript(app);
        app.view_height = inner_height(conversation_area);
        app.content_len = wrapped_rows(&plain, inner_width(conversation_area));
        let max_scroll = app.content_len.saturating_sub(app.view_height);
        if app.auto_scroll {
            app.scroll = max_scroll;
            app.auto_scroll = false;
        } else if app.scroll > max_scroll {
            app.scroll = max_scroll;
        }

        let conversation_block = Block::bordered()
            .title(format!("Conversation  [{}]", app.session.mode().label()))
            .title_style(title_style)
            .border_style(border);
        let conversation = Paragraph::new(text)
            .scroll((app.scroll as u16, 0))
            .wrap(Wrap { trim: false })
            .block(conversation_block);
        frame.render_widget(conversation, conversation_area);

        let mut scrollbar_state = ScrollbarState::new(app.content_len).position(app.scroll);
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .track_style(Style::default().fg(Color::DarkGray))
            .thumb_style(Style::default().fg(Color::Blue));
        frame.render_stateful_widget(
            scrollbar,
            conversation_area.inner(Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );

        if let Some(debug_area) = debug_area {
            let debug_block = Block::bordered()
                .title("Debug")
                .title_style(title_style)
                .border_style(border);
            let debug = Paragraph::new(debug_lines(app))
                .style(Style::default().fg(Color::Blue))
                .wrap(Wrap { trim: true })
                .block(debug_block);
            frame.render_widget(debug, debug_area);
        }

        let input_title = match app.session.mode() {
            crate::models::Mode::Search => "Search the company documents",
            crate::models::Mode::Qa => "Ask a question",
        };
        let input_block = Block::bordered()
            .title(input_title)
            .title_style(title_style)
            .border_style(border);
        let width = inner_width(rows[1]);
        let start = app.cursor.saturating_sub(width.saturating_sub(1));
        let visible: String = app.input.chars().skip(start).take(width).collect();
        let input = Paragraph::new(visible).block(input_block);
        frame.render_widget(input, rows[1]);

        let x = rows[1].x + 1 + (app.cursor - start) as u16;
        let y = rows[1].y + 1;
        frame.set_cursor_position((x, y));

        let help_block = Block::bordered()
            .title("Controls")
            .title_style(title_style)
            .border_style(border);
        let help = Paragraph::new(
            "Enter: Send | Tab: Switch mode | F3: Debug | F5: New session | Up/Down/PgUp/PgDn/Home/End: Scroll | Esc/Ctrl+C: Quit",
        )
        .style(Style::default().fg(Color::DarkGray))
        .wrap(Wrap { trim: true })
        .block(help_block);
        frame.render_widget(help, rows[2]);
    })?;

    Ok(())
}
