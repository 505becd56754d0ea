//! Markdown Rendering
//!
//! Turns assistant markdown into styled, width-wrapped ratatui lines:
//! emphasis, inline and fenced code, headings, lists, block quotes, tables,
//! and links. Link targets are always rendered next to the link text - a
//! terminal cannot open a browser tab, so the URL itself is the affordance.

use pulldown_cmark::{Event, Options, Parser, Tag, TagEnd};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::theme;

/// Render markdown into wrapped lines no wider than `width`
pub fn render_markdown(source: &str, width: usize) -> Vec<Line<'static>> {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(source, options);
    let mut builder = LineBuilder::new(width);

    for event in parser {
        builder.process_event(event);
    }

    builder.finish()
}

/// Render plain text (user/system messages): wrap, preserve newlines
pub fn render_plain(text: &str, width: usize, style: Style) -> Vec<Line<'static>> {
    let width = width.max(8);
    let mut lines = Vec::new();
    for raw_line in text.split('\n') {
        if raw_line.is_empty() {
            lines.push(Line::default());
            continue;
        }
        for wrapped in textwrap::wrap(raw_line, width) {
            lines.push(Line::from(Span::styled(wrapped.to_string(), style)));
        }
    }
    lines
}

/// Render a structured JSON payload (function results)
pub fn render_structured(value: &serde_json::Value, width: usize) -> Vec<Line<'static>> {
    let pretty = serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string());
    let style = Style::default().fg(theme::CODE_FG);
    let width = width.max(8);

    let mut lines = Vec::new();
    for raw_line in pretty.split('\n') {
        let mut rest: String = format!("  {raw_line}");
        // Hard-wrap overlong JSON lines; no word structure to respect.
        while rest.width() > width {
            let split_at = byte_index_at_width(&rest, width);
            let tail = rest.split_off(split_at);
            lines.push(Line::from(Span::styled(rest, style)));
            rest = format!("  {tail}");
        }
        lines.push(Line::from(Span::styled(rest, style)));
    }
    lines
}

/// Word token produced from styled spans
struct WordTok {
    text: String,
    style: Style,
    /// Joined to the previous token without a space
    glued: bool,
}

struct ListCtx {
    /// Next ordinal for ordered lists
    index: Option<u64>,
    /// Hanging indent contributed by this list level
    hang: usize,
}

#[derive(Default)]
struct TableCtx {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
    current_row: Vec<String>,
    current_cell: String,
    in_cell: bool,
    in_head: bool,
}

struct LineBuilder {
    width: usize,
    out: Vec<Line<'static>>,
    words: Vec<WordTok>,
    last_ended_with_ws: bool,
    style_stack: Vec<Style>,
    link_stack: Vec<String>,
    list_stack: Vec<ListCtx>,
    pending_marker: Option<String>,
    blockquote_depth: usize,
    in_code_block: bool,
    code_content: String,
    table: Option<TableCtx>,
}

impl LineBuilder {
    fn new(width: usize) -> Self {
        Self {
            width: width.max(12),
            out: Vec::new(),
            words: Vec::new(),
            last_ended_with_ws: true,
            style_stack: vec![Style::default()],
            link_stack: Vec::new(),
            list_stack: Vec::new(),
            pending_marker: None,
            blockquote_depth: 0,
            in_code_block: false,
            code_content: String::new(),
            table: None,
        }
    }

    fn process_event(&mut self, event: Event) {
        match event {
            Event::Start(tag) => self.start_tag(tag),
            Event::End(tag) => self.end_tag(tag),
            Event::Text(text) => self.push_text(&text),
            Event::Code(code) => self.push_word_block(&code, self.style().fg(theme::CODE_FG)),
            Event::SoftBreak | Event::HardBreak => self.last_ended_with_ws = true,
            Event::Rule => self.push_rule(),
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x]" } else { "[ ]" };
                self.push_word_block(marker, Style::default().fg(theme::DIM_GRAY));
                self.last_ended_with_ws = true;
            }
            Event::Html(html) | Event::InlineHtml(html) => self.push_text(&html),
            _ => {}
        }
    }

    fn start_tag(&mut self, tag: Tag) {
        match tag {
            Tag::Paragraph => {}
            Tag::Heading { .. } => {
                self.flush_block();
                self.push_style(
                    self.style()
                        .fg(theme::ACCENT_VIOLET)
                        .add_modifier(Modifier::BOLD),
                );
            }
            Tag::Emphasis => self.push_style(self.style().add_modifier(Modifier::ITALIC)),
            Tag::Strong => self.push_style(self.style().add_modifier(Modifier::BOLD)),
            Tag::Strikethrough => self.push_style(self.style().add_modifier(Modifier::CROSSED_OUT)),
            Tag::Link { dest_url, .. } => {
                self.link_stack.push(dest_url.to_string());
                self.push_style(
                    self.style()
                        .fg(theme::LINK_BLUE)
                        .add_modifier(Modifier::UNDERLINED),
                );
            }
            Tag::CodeBlock(_) => {
                self.flush_block();
                self.in_code_block = true;
                self.code_content.clear();
            }
            Tag::List(start) => {
                self.flush_block();
                let hang = match start {
                    Some(n) => format!("{n}. ").width().max(3),
                    None => 2,
                };
                self.list_stack.push(ListCtx { index: start, hang });
            }
            Tag::Item => {
                self.flush_block();
                let marker = match self.list_stack.last_mut() {
                    Some(ListCtx {
                        index: Some(index), ..
                    }) => {
                        let marker = format!("{index}. ");
                        *index += 1;
                        marker
                    }
                    _ => "- ".to_string(),
                };
                self.pending_marker = Some(marker);
            }
            Tag::BlockQuote(_) => {
                self.flush_block();
                self.blockquote_depth += 1;
            }
            Tag::Table(_) => {
                self.flush_block();
                self.table = Some(TableCtx::default());
            }
            Tag::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = true;
                }
            }
            Tag::TableRow => {}
            Tag::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.in_cell = true;
                    table.current_cell.clear();
                }
            }
            _ => {}
        }
    }

    fn end_tag(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                self.flush_block();
                self.blank_line();
            }
            TagEnd::Heading(_) => {
                self.pop_style();
                self.flush_block();
                self.blank_line();
            }
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough => self.pop_style(),
            TagEnd::Link => {
                self.pop_style();
                if let Some(url) = self.link_stack.pop() {
                    // The target stays visible; opening it happens outside
                    // the terminal.
                    self.last_ended_with_ws = true;
                    self.push_word_block(
                        &format!("({url})"),
                        Style::default().fg(theme::DIM_GRAY),
                    );
                }
            }
            TagEnd::CodeBlock => self.finish_code_block(),
            TagEnd::Item => self.flush_block(),
            TagEnd::List(_) => {
                self.list_stack.pop();
                if self.list_stack.is_empty() {
                    self.blank_line();
                }
            }
            TagEnd::BlockQuote(_) => {
                self.flush_block();
                self.blockquote_depth = self.blockquote_depth.saturating_sub(1);
                self.blank_line();
            }
            TagEnd::Table => self.finish_table(),
            TagEnd::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    table.in_head = false;
                    let row = std::mem::take(&mut table.current_row);
                    table.header = row;
                }
            }
            TagEnd::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.current_row);
                    table.rows.push(row);
                }
            }
            TagEnd::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    table.in_cell = false;
                    let cell = std::mem::take(&mut table.current_cell);
                    table.current_row.push(cell.trim().to_string());
                }
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Inline content
    // ------------------------------------------------------------------

    fn push_text(&mut self, text: &str) {
        if self.in_code_block {
            self.code_content.push_str(text);
            return;
        }
        if let Some(table) = self.table.as_mut() {
            if table.in_cell {
                table.current_cell.push_str(text);
                return;
            }
        }

        let style = self.style();
        let starts_with_ws = text.starts_with(char::is_whitespace);
        for (i, word) in text.split_whitespace().enumerate() {
            let glued = i == 0 && !starts_with_ws && !self.last_ended_with_ws;
            self.words.push(WordTok {
                text: word.to_string(),
                style,
                glued,
            });
        }
        if !text.is_empty() {
            self.last_ended_with_ws = text.ends_with(char::is_whitespace);
        }
    }

    /// Push a single pre-formed token (inline code, link target, marker)
    fn push_word_block(&mut self, text: &str, style: Style) {
        if let Some(table) = self.table.as_mut() {
            if table.in_cell {
                table.current_cell.push_str(text);
                return;
            }
        }
        let glued = !self.last_ended_with_ws && text.starts_with(|c: char| c.is_ascii_punctuation());
        self.words.push(WordTok {
            text: text.to_string(),
            style,
            glued,
        });
        self.last_ended_with_ws = false;
    }

    fn push_rule(&mut self) {
        self.flush_block();
        let width = self.width.min(40);
        self.out.push(Line::from(Span::styled(
            "─".repeat(width),
            Style::default().fg(theme::DIM_GRAY),
        )));
        self.blank_line();
    }

    // ------------------------------------------------------------------
    // Block flushing
    // ------------------------------------------------------------------

    /// Wrap accumulated words into output lines with the current prefixes
    fn flush_block(&mut self) {
        if self.words.is_empty() && self.pending_marker.is_none() {
            return;
        }

        let quote = "> ".repeat(self.blockquote_depth);
        let hang: usize = self.list_stack.iter().map(|l| l.hang).sum();

        let marker = self.pending_marker.take().unwrap_or_default();
        let first_prefix = if marker.is_empty() {
            format!("{}{}", quote, " ".repeat(hang))
        } else {
            let pad = hang.saturating_sub(marker.width());
            format!("{}{}{}", quote, " ".repeat(pad), marker)
        };
        let rest_prefix = format!("{}{}", quote, " ".repeat(hang));

        let avail = self.width.saturating_sub(rest_prefix.width()).max(8);
        let words = std::mem::take(&mut self.words);
        self.last_ended_with_ws = true;

        let quote_style = Style::default().fg(theme::DIM_GRAY);
        let mut wrapped: Vec<Vec<Span<'static>>> = Vec::new();
        let mut current: Vec<Span<'static>> = Vec::new();
        let mut current_width = 0usize;

        for word in words {
            let sep = usize::from(current_width > 0 && !word.glued);
            let word_width = word.text.width();

            if current_width > 0 && current_width + sep + word_width > avail {
                wrapped.push(std::mem::take(&mut current));
                current_width = 0;
            } else if sep == 1 {
                current.push(Span::raw(" "));
                current_width += 1;
            }

            // Hard-split tokens wider than a whole line.
            let mut text = word.text;
            while text.width() > avail {
                let split_at = byte_index_at_width(&text, avail);
                let tail = text.split_off(split_at);
                wrapped.push(vec![Span::styled(text, word.style)]);
                text = tail;
            }
            current_width += text.width();
            current.push(Span::styled(text, word.style));
        }
        if !current.is_empty() {
            wrapped.push(current);
        }

        for (i, spans) in wrapped.into_iter().enumerate() {
            let prefix = if i == 0 { &first_prefix } else { &rest_prefix };
            let mut line_spans = Vec::with_capacity(spans.len() + 1);
            if !prefix.is_empty() {
                line_spans.push(Span::styled(prefix.clone(), quote_style));
            }
            line_spans.extend(spans);
            self.out.push(Line::from(line_spans));
        }
    }

    fn finish_code_block(&mut self) {
        self.in_code_block = false;
        let style = Style::default().fg(theme::CODE_FG);
        let content = std::mem::take(&mut self.code_content);

        for raw_line in content.lines() {
            let mut rest = format!("    {raw_line}");
            while rest.width() > self.width {
                let split_at = byte_index_at_width(&rest, self.width);
                let tail = rest.split_off(split_at);
                self.out.push(Line::from(Span::styled(rest, style)));
                rest = format!("    {tail}");
            }
            self.out.push(Line::from(Span::styled(rest, style)));
        }
        self.blank_line();
    }

    fn finish_table(&mut self) {
        let Some(table) = self.table.take() else {
            return;
        };

        let ncols = table
            .rows
            .iter()
            .map(Vec::len)
            .chain(std::iter::once(table.header.len()))
            .max()
            .unwrap_or(0);
        if ncols == 0 {
            return;
        }

        // Column widths from content, shrunk until the table fits.
        let mut widths = vec![1usize; ncols];
        for row in std::iter::once(&table.header).chain(table.rows.iter()) {
            for (i, cell) in row.iter().enumerate() {
                widths[i] = widths[i].max(cell.width());
            }
        }
        let chrome = 3 * (ncols - 1);
        loop {
            let total: usize = widths.iter().sum::<usize>() + chrome;
            if total <= self.width {
                break;
            }
            let Some(widest) = widths
                .iter()
                .enumerate()
                .max_by_key(|(_, w)| **w)
                .map(|(i, _)| i)
            else {
                break;
            };
            if widths[widest] <= 4 {
                break;
            }
            widths[widest] -= 1;
        }

        let sep_style = Style::default().fg(theme::DIM_GRAY);
        let header_style = Style::default().add_modifier(Modifier::BOLD);

        if !table.header.is_empty() {
            self.out
                .push(table_row_line(&table.header, &widths, header_style, sep_style));
            let rule: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
            self.out.push(Line::from(Span::styled(
                rule.join("─┼─"),
                sep_style,
            )));
        }
        for row in &table.rows {
            self.out
                .push(table_row_line(row, &widths, Style::default(), sep_style));
        }
        self.blank_line();
    }

    fn blank_line(&mut self) {
        if !self.out.last().map_or(true, line_is_blank) {
            self.out.push(Line::default());
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        self.flush_block();
        while self.out.last().is_some_and(line_is_blank) {
            self.out.pop();
        }
        self.out
    }

    // ------------------------------------------------------------------
    // Style stack
    // ------------------------------------------------------------------

    fn style(&self) -> Style {
        *self.style_stack.last().unwrap_or(&Style::default())
    }

    fn push_style(&mut self, style: Style) {
        self.style_stack.push(style);
    }

    fn pop_style(&mut self) {
        if self.style_stack.len() > 1 {
            self.style_stack.pop();
        }
    }
}

fn line_is_blank(line: &Line<'_>) -> bool {
    line.spans.iter().all(|s| s.content.trim().is_empty())
}

/// Pad or truncate one table row into a styled line
fn table_row_line(
    row: &[String],
    widths: &[usize],
    cell_style: Style,
    sep_style: Style,
) -> Line<'static> {
    let mut spans = Vec::new();
    for (i, col_width) in widths.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" │ ".to_string(), sep_style));
        }
        let cell = row.get(i).map(String::as_str).unwrap_or("");
        let mut text: String = cell.to_string();
        if text.width() > *col_width {
            let split_at = byte_index_at_width(&text, col_width.saturating_sub(1));
            text.truncate(split_at);
            text.push('…');
        }
        let pad = col_width.saturating_sub(text.width());
        text.push_str(&" ".repeat(pad));
        spans.push(Span::styled(text, cell_style));
    }
    Line::from(spans)
}

/// Byte index of the widest prefix not exceeding `max_width` columns
fn byte_index_at_width(text: &str, max_width: usize) -> usize {
    let mut width = 0usize;
    for (idx, c) in text.char_indices() {
        let char_width = unicode_width::UnicodeWidthChar::width(c).unwrap_or(0);
        if width + char_width > max_width {
            return idx;
        }
        width += char_width;
    }
    text.len()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn flatten(lines: &[Line<'_>]) -> Vec<String> {
        lines
            .iter()
            .map(|l| {
                l.spans
                    .iter()
                    .map(|s| s.content.clone())
                    .collect::<String>()
            })
            .collect()
    }

    #[test]
    fn test_plain_paragraph_is_one_line() {
        let lines = render_markdown("Hello, world!", 40);
        assert_eq!(flatten(&lines), vec!["Hello, world!"]);
    }

    #[test]
    fn test_paragraph_wraps_to_width() {
        let lines = render_markdown("one two three four five six seven", 12);
        for line in flatten(&lines) {
            assert!(line.width() <= 12, "line too wide: {line:?}");
        }
        assert_eq!(flatten(&lines).join(" "), "one two three four five six seven");
    }

    #[test]
    fn test_strong_and_emphasis_styles() {
        let lines = render_markdown("a **bold** and *soft* word", 60);
        let bold = lines[0]
            .spans
            .iter()
            .find(|s| s.style.add_modifier.contains(Modifier::BOLD));
        assert_eq!(bold.map(|s| s.content.as_ref()), Some("bold"));
        let italic = lines[0]
            .spans
            .iter()
            .find(|s| s.style.add_modifier.contains(Modifier::ITALIC));
        assert_eq!(italic.map(|s| s.content.as_ref()), Some("soft"));
    }

    #[test]
    fn test_link_target_is_visible() {
        let lines = render_markdown("see [the docs](https://example.com/guide)", 80);
        let text = flatten(&lines).join(" ");
        assert!(text.contains("the docs"));
        assert!(text.contains("(https://example.com/guide)"));
    }

    #[test]
    fn test_inline_code_keeps_style() {
        let lines = render_markdown("run `cargo doc` now", 60);
        let code = lines[0]
            .spans
            .iter()
            .find(|s| s.style.fg == Some(theme::CODE_FG));
        assert_eq!(code.map(|s| s.content.as_ref()), Some("cargo doc"));
    }

    #[test]
    fn test_unordered_list_markers() {
        let lines = render_markdown("- first\n- second", 40);
        let flat = flatten(&lines);
        assert_eq!(flat[0], "- first");
        assert_eq!(flat[1], "- second");
    }

    #[test]
    fn test_ordered_list_counts() {
        let lines = render_markdown("1. one\n2. two\n3. three", 40);
        let flat = flatten(&lines);
        assert_eq!(flat[0], "1. one");
        assert_eq!(flat[1], "2. two");
        assert_eq!(flat[2], "3. three");
    }

    #[test]
    fn test_code_block_is_indented() {
        let lines = render_markdown("```\nlet x = 1;\n```", 40);
        let flat = flatten(&lines);
        assert_eq!(flat[0], "    let x = 1;");
    }

    #[test]
    fn test_blockquote_prefix() {
        let lines = render_markdown("> quoted words", 40);
        assert_eq!(flatten(&lines)[0], "> quoted words");
    }

    #[test]
    fn test_table_columns_align() {
        let source = "| name | count |\n| --- | --- |\n| alpha | 1 |\n| b | 22 |";
        let lines = render_markdown(source, 60);
        let flat = flatten(&lines);
        assert_eq!(flat[0], "name  │ count");
        assert_eq!(flat[1], "──────┼──────");
        assert_eq!(flat[2], "alpha │ 1    ");
        assert_eq!(flat[3], "b     │ 22   ");
    }

    #[test]
    fn test_heading_is_accented() {
        let lines = render_markdown("# Title\n\nbody", 40);
        assert!(lines[0]
            .spans
            .iter()
            .any(|s| s.style.add_modifier.contains(Modifier::BOLD)));
    }

    #[test]
    fn test_render_plain_preserves_newlines() {
        let lines = render_plain("a\n\nb", 20, Style::default());
        assert_eq!(flatten(&lines), vec!["a", "", "b"]);
    }

    #[test]
    fn test_render_structured_pretty_prints() {
        let value = serde_json::json!({"status": 200});
        let lines = render_structured(&value, 40);
        let text = flatten(&lines).join("\n");
        assert!(text.contains("\"status\": 200"));
    }
}
