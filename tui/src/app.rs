//! Main Application
//!
//! The App struct manages the TUI lifecycle as a thin display client:
//! - Event loop (keyboard, mouse, resize)
//! - EngineClient for session/stream orchestration
//! - DisplayState for rendering
//!
//! # Architecture
//!
//! The App is a thin client that:
//! 1. Converts terminal events into engine calls
//! 2. Receives `EngineMessage`s and updates DisplayState
//! 3. Renders based on DisplayState

use std::io;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, Event, EventStream, KeyCode, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};
use futures::StreamExt;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::Frame;
use ratatui::Terminal;

use engine_core::{Content, EngineState, NotifyKind, Role, SUGGESTIONS};

use crate::display::DisplayState;
use crate::engine_client::EngineClient;
use crate::markdown;
use crate::theme;
use crate::widgets::{Transcript, TranscriptState};

/// Maximum input box height (lines) before the draft scrolls
const MAX_INPUT_HEIGHT: u16 = 5;

/// Marker shown at the end of a streaming message
const STREAM_CURSOR: &str = "▌";

/// Main application state
pub struct App {
    /// Is the app still running?
    running: bool,
    /// Client for the embedded engine
    client: EngineClient,
    /// Display state derived from engine messages
    display: DisplayState,
    /// Transcript scroll state
    transcript: TranscriptState,
    /// Highlighted prompt suggestion (catalog view)
    catalog_index: usize,
    /// Screen row -> suggestion index mapping from the last render
    catalog_rows: Vec<(u16, usize)>,
    /// Last frame time (for notice timers)
    last_frame: Instant,
    /// Terminal size
    size: (u16, u16),
}

impl App {
    /// Create a new App instance
    pub fn new() -> anyhow::Result<Self> {
        let size = crossterm::terminal::size()?;

        Ok(Self {
            running: true,
            client: EngineClient::new(),
            display: DisplayState::new(),
            transcript: TranscriptState::default(),
            catalog_index: 0,
            catalog_rows: Vec::new(),
            last_frame: Instant::now(),
            size,
        })
    }

    /// Main event loop
    pub async fn run(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        // ~10 FPS is plenty for streamed text
        let frame_duration = Duration::from_millis(100);

        let mut event_stream = EventStream::new();

        self.client.start().await;
        self.process_engine_messages();
        self.render(terminal)?;

        while self.running {
            let frame_start = Instant::now();

            tokio::select! {
                biased;

                // Terminal events - highest priority
                maybe_event = event_stream.next() => {
                    if let Some(Ok(event)) = maybe_event {
                        match event {
                            // Only handle Press events (not Release or Repeat)
                            Event::Key(key) if key.kind == KeyEventKind::Press => {
                                self.handle_key(key).await;
                            }
                            Event::Mouse(mouse) => self.handle_mouse(mouse),
                            Event::Resize(w, h) => self.size = (w, h),
                            _ => {}
                        }
                    }
                }

                // Frame tick
                _ = tokio::time::sleep(Duration::from_millis(16)) => {}
            }

            // Drain stream chunks and engine messages
            self.client.poll_streaming().await;
            self.process_engine_messages();

            self.update();
            self.render(terminal)?;

            // Frame rate limiting
            let elapsed = frame_start.elapsed();
            if elapsed < frame_duration {
                tokio::time::sleep(frame_duration - elapsed).await;
            }
        }

        Ok(())
    }

    /// Apply all pending messages from the engine
    fn process_engine_messages(&mut self) {
        for msg in self.client.recv_all() {
            self.display.apply_message(msg);
        }
    }

    /// Handle keyboard input
    async fn handle_key(&mut self, key: event::KeyEvent) {
        match key.code {
            // Quit
            KeyCode::Esc => {
                self.running = false;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.running = false;
            }

            // Enter: newline with shift, otherwise pick/submit
            KeyCode::Enter => {
                if key.modifiers.contains(KeyModifiers::SHIFT) {
                    self.client.push_draft_newline();
                } else if self.catalog_visible() && self.client.draft().is_empty() {
                    self.apply_selected_suggestion();
                } else {
                    // The engine silently skips empty or mid-stream submits.
                    self.client.submit().await;
                    self.transcript.scroll_to_bottom();
                }
            }

            // Typing
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.client.push_draft_char(c);
            }

            KeyCode::Backspace => {
                self.client.pop_draft_char();
            }

            // Catalog navigation / transcript scrolling
            KeyCode::Up => {
                if self.catalog_visible() {
                    self.catalog_index = self.catalog_index.saturating_sub(1);
                } else {
                    self.transcript.scroll_up(1);
                }
            }
            KeyCode::Down => {
                if self.catalog_visible() {
                    self.catalog_index = (self.catalog_index + 1).min(SUGGESTIONS.len() - 1);
                } else {
                    self.transcript.scroll_down(1);
                }
            }
            KeyCode::PageUp => {
                let page = (self.size.1 / 2) as usize;
                self.transcript.scroll_up(page);
            }
            KeyCode::PageDown => {
                let page = (self.size.1 / 2) as usize;
                self.transcript.scroll_down(page);
            }
            KeyCode::Home if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.transcript.scroll_up(usize::MAX / 2);
            }
            KeyCode::End if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.transcript.scroll_to_bottom();
            }

            _ => {}
        }
    }

    /// Handle mouse input
    fn handle_mouse(&mut self, mouse: event::MouseEvent) {
        match mouse.kind {
            MouseEventKind::ScrollUp => {
                if self.catalog_visible() {
                    self.catalog_index = self.catalog_index.saturating_sub(1);
                } else {
                    self.transcript.scroll_up(3);
                }
            }
            MouseEventKind::ScrollDown => {
                if self.catalog_visible() {
                    self.catalog_index = (self.catalog_index + 1).min(SUGGESTIONS.len() - 1);
                } else {
                    self.transcript.scroll_down(3);
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                if self.catalog_visible() {
                    let clicked = self
                        .catalog_rows
                        .iter()
                        .find(|(row, _)| *row == mouse.row)
                        .map(|(_, index)| *index);
                    if let Some(index) = clicked {
                        self.catalog_index = index;
                        self.apply_selected_suggestion();
                    }
                }
            }
            _ => {}
        }
    }

    /// Whether the catalog is on screen instead of the transcript
    fn catalog_visible(&self) -> bool {
        self.display.is_empty()
    }

    /// Put the highlighted suggestion into the draft and focus the input
    fn apply_selected_suggestion(&mut self) {
        if let Some(suggestion) = SUGGESTIONS.get(self.catalog_index) {
            self.client.set_draft(suggestion.draft_text());
            // Key input always lands in the draft; with text in it, Enter
            // now submits instead of re-picking.
        }
    }

    /// Advance timers
    fn update(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame;
        self.last_frame = now;

        self.display.update(delta);
    }

    /// Render the UI
    fn render(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> anyhow::Result<()> {
        terminal.draw(|frame| {
            let area = frame.area();
            self.size = (area.width, area.height);
            if area.width < 20 || area.height < 7 {
                frame.render_widget(
                    Line::styled("terminal too small", Style::default().fg(theme::ERROR_RED)),
                    area,
                );
                return;
            }
            Self::draw(
                frame,
                &self.display,
                &mut self.transcript,
                &mut self.catalog_rows,
                self.catalog_index,
                self.client.draft(),
                self.client.is_awaiting(),
            );
        })?;
        Ok(())
    }

    /// Draw one frame
    fn draw(
        frame: &mut Frame,
        display: &DisplayState,
        transcript: &mut TranscriptState,
        catalog_rows: &mut Vec<(u16, usize)>,
        catalog_index: usize,
        draft: &str,
        awaiting: bool,
    ) {
        let area = frame.area();
        let input_height = Self::input_height(draft, area.width);

        let [header_area, body_area, separator_area, input_area, status_area] =
            Layout::vertical([
                Constraint::Length(1),
                Constraint::Min(1),
                Constraint::Length(1),
                Constraint::Length(input_height),
                Constraint::Length(1),
            ])
            .areas(area);

        Self::draw_header(frame, header_area);

        if display.is_empty() {
            Self::draw_catalog(frame, body_area, catalog_index, catalog_rows);
        } else {
            catalog_rows.clear();
            Self::draw_transcript(frame, body_area, display, transcript);
        }

        Self::draw_separator(frame, separator_area, draft, awaiting);
        Self::draw_input(frame, input_area, draft);
        Self::draw_status(frame, status_area, display, transcript);
    }

    /// Input box height for the current draft (grows up to a cap)
    fn input_height(draft: &str, width: u16) -> u16 {
        let text_width = width.saturating_sub(2).max(10) as usize;
        let full_input = format!("> {draft}{STREAM_CURSOR}");
        let mut lines = 0u16;
        for raw_line in full_input.split('\n') {
            lines += textwrap::wrap(raw_line, text_width).len().max(1) as u16;
        }
        lines.clamp(1, MAX_INPUT_HEIGHT)
    }

    fn draw_header(frame: &mut Frame, area: Rect) {
        let header = Line::from(vec![
            Span::styled(
                " Postmuse",
                Style::default()
                    .fg(theme::BRAND)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                "  ·  Your Social Media Content Assistant",
                Style::default().fg(theme::DIM_GRAY),
            ),
        ]);
        frame.render_widget(header, area);
    }

    /// Prompt catalog: shown only while the conversation is empty
    fn draw_catalog(
        frame: &mut Frame,
        area: Rect,
        selected: usize,
        catalog_rows: &mut Vec<(u16, usize)>,
    ) {
        catalog_rows.clear();
        let width = area.width.saturating_sub(4) as usize;
        let mut lines: Vec<Line> = Vec::new();

        lines.push(Line::from(Span::styled(
            "Pick a starting point, or just type:",
            Style::default().add_modifier(Modifier::BOLD),
        )));
        lines.push(Line::default());

        let list_start = lines.len() as u16;
        for (i, suggestion) in SUGGESTIONS.iter().enumerate() {
            let (marker, style) = if i == selected {
                (
                    "▸ ",
                    Style::default()
                        .fg(theme::ACCENT_VIOLET)
                        .add_modifier(Modifier::BOLD),
                )
            } else {
                ("  ", Style::default())
            };
            lines.push(Line::from(vec![
                Span::styled(marker, Style::default().fg(theme::ACCENT_VIOLET)),
                Span::styled(suggestion.name, style),
            ]));

            let row = area.y + list_start + i as u16;
            if row < area.y + area.height {
                catalog_rows.push((row, i));
            }
        }

        lines.push(Line::default());
        if let Some(suggestion) = SUGGESTIONS.get(selected) {
            for wrapped in textwrap::wrap(suggestion.description, width.max(20)) {
                lines.push(Line::from(Span::styled(
                    wrapped.to_string(),
                    Style::default().fg(theme::DIM_GRAY),
                )));
            }
        }

        for (i, line) in lines.iter().enumerate() {
            let y = area.y + i as u16;
            if y >= area.y + area.height {
                break;
            }
            frame
                .buffer_mut()
                .set_line(area.x + 1, y, line, area.width.saturating_sub(1));
        }
    }

    /// The message transcript
    fn draw_transcript(
        frame: &mut Frame,
        area: Rect,
        display: &DisplayState,
        transcript: &mut TranscriptState,
    ) {
        let width = area.width.saturating_sub(2) as usize;
        let mut lines: Vec<Line> = Vec::new();

        for msg in &display.messages {
            match (&msg.role, &msg.content) {
                (Role::User, content) => {
                    let text = format!("{}: {}", msg.prefix(), content.to_display_string());
                    lines.extend(markdown::render_plain(
                        &text,
                        width,
                        Style::default().fg(theme::USER_GREEN),
                    ));
                }
                (Role::Assistant, Content::Text(text)) => {
                    lines.push(Line::from(Span::styled(
                        format!("{}:", msg.prefix()),
                        Style::default()
                            .fg(theme::ACCENT_VIOLET)
                            .add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(markdown::render_markdown(text, width));
                }
                (Role::Assistant, Content::Structured(value)) => {
                    lines.extend(markdown::render_structured(value, width));
                }
                (Role::System, content) => {
                    lines.extend(markdown::render_plain(
                        &content.to_display_string(),
                        width,
                        Style::default().fg(theme::DIM_GRAY),
                    ));
                }
                (Role::Function, Content::Structured(value)) => {
                    lines.push(Line::from(Span::styled(
                        format!("{}:", msg.prefix()),
                        Style::default()
                            .fg(theme::FUNCTION_BLUE)
                            .add_modifier(Modifier::BOLD),
                    )));
                    lines.extend(markdown::render_structured(value, width));
                }
                (Role::Function, Content::Text(text)) => {
                    lines.extend(markdown::render_plain(
                        text,
                        width,
                        Style::default().fg(theme::FUNCTION_BLUE),
                    ));
                }
            }

            if msg.streaming {
                match lines.last_mut() {
                    Some(last) => last.spans.push(Span::styled(
                        STREAM_CURSOR,
                        Style::default().fg(theme::ACCENT_VIOLET),
                    )),
                    None => lines.push(Line::from(Span::styled(
                        STREAM_CURSOR,
                        Style::default().fg(theme::ACCENT_VIOLET),
                    ))),
                }
            }

            lines.push(Line::default());
        }

        let inner = Rect::new(area.x + 1, area.y, area.width.saturating_sub(1), area.height);
        frame.render_stateful_widget(Transcript::new(&lines), inner, transcript);
    }

    /// Separator between transcript and input, carrying the send affordance
    fn draw_separator(frame: &mut Frame, area: Rect, draft: &str, awaiting: bool) {
        let disabled = draft.is_empty() || awaiting;
        let hint = if awaiting {
            " waiting... "
        } else if draft.is_empty() {
            " send "
        } else {
            " Enter = send "
        };
        let hint_style = if disabled {
            Style::default().fg(theme::DIM_GRAY)
        } else {
            Style::default()
                .fg(theme::ACCENT_VIOLET)
                .add_modifier(Modifier::BOLD)
        };

        let dash_count = (area.width as usize).saturating_sub(hint.len() + 2);
        let line = Line::from(vec![
            Span::styled("─".repeat(dash_count), Style::default().fg(theme::DIM_GRAY)),
            Span::styled(hint, hint_style),
            Span::styled("──", Style::default().fg(theme::DIM_GRAY)),
        ]);
        frame.render_widget(line, area);
    }

    /// Draft input box, bottom-anchored when the draft overflows
    fn draw_input(frame: &mut Frame, area: Rect, draft: &str) {
        let text_width = area.width.saturating_sub(2).max(10) as usize;
        let full_input = format!("> {draft}{STREAM_CURSOR}");

        let mut wrapped: Vec<String> = Vec::new();
        for raw_line in full_input.split('\n') {
            if raw_line.is_empty() {
                wrapped.push(String::new());
                continue;
            }
            for piece in textwrap::wrap(raw_line, text_width) {
                wrapped.push(piece.to_string());
            }
        }

        let height = area.height as usize;
        let skip = wrapped.len().saturating_sub(height);
        for (i, line) in wrapped.iter().skip(skip).enumerate() {
            let y = area.y + i as u16;
            if y >= area.y + area.height {
                break;
            }
            frame.buffer_mut().set_string(
                area.x + 1,
                y,
                line,
                Style::default().fg(theme::USER_GREEN),
            );
        }
    }

    /// Status line: engine state, notices, scroll hint, key help
    fn draw_status(
        frame: &mut Frame,
        area: Rect,
        display: &DisplayState,
        transcript: &TranscriptState,
    ) {
        let mut spans: Vec<Span> = Vec::new();

        let state_style = match display.engine_state {
            EngineState::Ready => Style::default().fg(theme::DIM_GRAY),
            EngineState::Thinking | EngineState::Responding => {
                Style::default().fg(theme::ACCENT_VIOLET)
            }
        };
        spans.push(Span::styled(
            format!(" {}", display.engine_state.description()),
            state_style,
        ));

        if let Some(ref notice) = display.notice {
            let notice_style = match notice.kind {
                NotifyKind::RateLimited => Style::default().fg(theme::RATE_LIMIT_AMBER),
                NotifyKind::GenericError => Style::default().fg(theme::ERROR_RED),
            };
            spans.push(Span::styled(
                format!("  ▲ {}", notice.message),
                notice_style,
            ));
        } else {
            if transcript.scroll_offset > 0 {
                spans.push(Span::styled(
                    format!("  [↑{} lines · PgDn]", transcript.scroll_offset),
                    Style::default().fg(theme::DIM_GRAY),
                ));
            }
            spans.push(Span::styled(
                "  ·  Esc quit · Shift+Enter newline",
                Style::default().fg(theme::DIM_GRAY),
            ));
        }

        frame.render_widget(Line::from(spans), area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_height_grows_with_draft() {
        assert_eq!(App::input_height("", 80), 1);
        assert_eq!(App::input_height("short", 80), 1);
        assert_eq!(App::input_height("a\nb", 80), 2);

        let long = "word ".repeat(100);
        assert_eq!(App::input_height(&long, 40), MAX_INPUT_HEIGHT);
    }

    #[test]
    fn test_input_height_counts_explicit_newlines() {
        assert_eq!(App::input_height("a\nb\nc", 80), 3);
        assert_eq!(App::input_height("a\nb\nc\nd\ne\nf\ng", 80), MAX_INPUT_HEIGHT);
    }
}
