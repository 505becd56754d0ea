//! Transcript Widget
//!
//! A borderless, scrollable region of pre-wrapped styled lines. Lines are
//! produced by the markdown/plain renderers at the current width; this
//! widget only handles the scroll window.

use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::text::Line;
use ratatui::widgets::StatefulWidget;

/// Scroll state for a transcript
#[derive(Debug, Default)]
pub struct TranscriptState {
    /// Lines scrolled up from the bottom (0 = latest)
    pub scroll_offset: usize,
    /// Total content lines at last render
    pub total_lines: usize,
    /// Viewport height at last render
    pub viewport_height: usize,
}

impl TranscriptState {
    /// Scroll up by `lines` (toward older content)
    pub fn scroll_up(&mut self, lines: usize) {
        let max_scroll = self.max_scroll();
        self.scroll_offset = (self.scroll_offset + lines).min(max_scroll);
    }

    /// Scroll down by `lines` (toward newest content)
    pub fn scroll_down(&mut self, lines: usize) {
        self.scroll_offset = self.scroll_offset.saturating_sub(lines);
    }

    /// Jump to the newest content
    pub fn scroll_to_bottom(&mut self) {
        self.scroll_offset = 0;
    }

    /// Largest useful scroll offset
    pub fn max_scroll(&self) -> usize {
        self.total_lines.saturating_sub(self.viewport_height)
    }
}

/// A borderless, scrollable block of styled lines
pub struct Transcript<'a> {
    lines: &'a [Line<'a>],
}

impl<'a> Transcript<'a> {
    /// Create a transcript over already-wrapped lines
    pub fn new(lines: &'a [Line<'a>]) -> Self {
        Self { lines }
    }
}

impl<'a> StatefulWidget for Transcript<'a> {
    type State = TranscriptState;

    fn render(self, area: Rect, buf: &mut Buffer, state: &mut Self::State) {
        let height = area.height as usize;
        state.total_lines = self.lines.len();
        state.viewport_height = height;

        // Clamp scroll to the available content.
        state.scroll_offset = state.scroll_offset.min(state.max_scroll());

        // Anchor to the bottom: offset 0 shows the newest lines.
        let visible_end = state.total_lines.saturating_sub(state.scroll_offset);
        let visible_start = visible_end.saturating_sub(height);

        for (i, line) in self.lines[visible_start..visible_end].iter().enumerate() {
            let y = area.y + i as u16;
            if y >= area.y + area.height {
                break;
            }
            buf.set_line(area.x, y, line, area.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use ratatui::text::Line;

    use super::*;

    fn lines(n: usize) -> Vec<Line<'static>> {
        (0..n).map(|i| Line::from(format!("line {i}"))).collect()
    }

    fn render(lines: &[Line<'_>], height: u16, state: &mut TranscriptState) -> Buffer {
        let area = Rect::new(0, 0, 20, height);
        let mut buf = Buffer::empty(area);
        Transcript::new(lines).render(area, &mut buf, state);
        buf
    }

    fn row_text(buf: &Buffer, y: u16) -> String {
        let mut out = String::new();
        for x in 0..buf.area.width {
            out.push_str(buf[(x, y)].symbol());
        }
        out.trim_end().to_string()
    }

    #[test]
    fn test_bottom_anchored() {
        let content = lines(10);
        let mut state = TranscriptState::default();
        let buf = render(&content, 3, &mut state);

        assert_eq!(row_text(&buf, 0), "line 7");
        assert_eq!(row_text(&buf, 2), "line 9");
        assert_eq!(state.total_lines, 10);
    }

    #[test]
    fn test_scroll_up_shows_older_lines() {
        let content = lines(10);
        let mut state = TranscriptState::default();
        render(&content, 3, &mut state);

        state.scroll_up(2);
        let buf = render(&content, 3, &mut state);
        assert_eq!(row_text(&buf, 0), "line 5");
        assert_eq!(row_text(&buf, 2), "line 7");
    }

    #[test]
    fn test_scroll_clamps_at_top() {
        let content = lines(5);
        let mut state = TranscriptState::default();
        render(&content, 3, &mut state);

        state.scroll_up(100);
        let buf = render(&content, 3, &mut state);
        assert_eq!(state.scroll_offset, 2);
        assert_eq!(row_text(&buf, 0), "line 0");
    }

    #[test]
    fn test_scroll_to_bottom() {
        let content = lines(10);
        let mut state = TranscriptState::default();
        render(&content, 3, &mut state);

        state.scroll_up(5);
        state.scroll_to_bottom();
        let buf = render(&content, 3, &mut state);
        assert_eq!(row_text(&buf, 2), "line 9");
    }

    #[test]
    fn test_short_content_fills_from_top() {
        let content = lines(2);
        let mut state = TranscriptState::default();
        let buf = render(&content, 5, &mut state);

        assert_eq!(row_text(&buf, 0), "line 0");
        assert_eq!(row_text(&buf, 1), "line 1");
        assert_eq!(row_text(&buf, 2), "");
    }
}
