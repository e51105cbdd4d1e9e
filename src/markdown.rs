//! Markdown to styled terminal text.
//!
//! Parsing is `pulldown-cmark` with the GitHub extensions switched on
//! (tables, strikethrough, footnotes, task lists). Bare URLs and emails are
//! linked by a pass over plain text, since CommonMark only links `<...>`.
//! Output is not sanitized.

use linkify::{LinkFinder, LinkKind};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TextMergeStream};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

const RULE_WIDTH: usize = 32;

pub fn options() -> Options {
    Options::ENABLE_TABLES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_TASKLISTS
}

pub fn render(source: &str) -> Text<'static> {
    let mut renderer = Renderer::default();
    for event in TextMergeStream::new(Parser::new_ext(source, options())) {
        renderer.event(event);
    }
    renderer.finish()
}

/// Concatenated span contents of each line, for callers that want text only.
pub fn plain_lines(text: &Text<'_>) -> Vec<String> {
    text.lines
        .iter()
        .map(|line| line.spans.iter().map(|s| s.content.as_ref()).collect())
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Container {
    Paragraph,
    Heading,
    BlockQuote,
    CodeBlock,
    List,
    Item,
    FootnoteDefinition,
    Table,
    TableHead,
    TableRow,
    TableCell,
    Styled,
    Link,
    Other,
}

#[derive(Debug, Default)]
struct TableBuffer {
    rows: Vec<Vec<Vec<Span<'static>>>>,
    header_rows: usize,
    row: Vec<Vec<Span<'static>>>,
    cell: Vec<Span<'static>>,
}

#[derive(Debug, Default)]
struct Renderer {
    lines: Vec<Line<'static>>,
    spans: Vec<Span<'static>>,
    styles: Vec<Style>,
    open: Vec<Container>,
    /// Next ordinal for each open list; `None` for bullet lists.
    lists: Vec<Option<u64>>,
    quote_depth: usize,
    in_code_block: bool,
    link_depth: usize,
    table: Option<TableBuffer>,
}

impl Renderer {
    fn event(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(_) => self.end(),
            Event::Text(text) => self.text(&text),
            Event::Code(code) => {
                let style = self.style().fg(Color::Yellow);
                self.push_span(Span::styled(code.into_string(), style));
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                let style = self.style().fg(Color::DarkGray);
                for (idx, line) in html.lines().enumerate() {
                    if idx > 0 {
                        self.flush_line();
                    }
                    self.push_span(Span::styled(line.to_string(), style));
                }
            }
            Event::FootnoteReference(label) => {
                self.push_span(Span::styled(
                    format!("[{}]", label),
                    Style::default().fg(Color::Cyan),
                ));
            }
            Event::TaskListMarker(done) => {
                let (marker, color) = if done {
                    ("[x] ", Color::Green)
                } else {
                    ("[ ] ", Color::Gray)
                };
                self.push_span(Span::styled(marker, Style::default().fg(color)));
            }
            Event::SoftBreak => self.push_span(Span::raw(" ")),
            Event::HardBreak => self.flush_line(),
            Event::Rule => {
                self.flush_line();
                self.lines.push(Line::from(Span::styled(
                    "─".repeat(RULE_WIDTH),
                    Style::default().fg(Color::DarkGray),
                )));
                self.blank_line();
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        let container = match tag {
            Tag::Paragraph => Container::Paragraph,
            Tag::Heading { level, .. } => {
                self.flush_line();
                self.styles.push(heading_style(level));
                Container::Heading
            }
            Tag::BlockQuote(_) => {
                self.flush_line();
                self.quote_depth += 1;
                Container::BlockQuote
            }
            Tag::CodeBlock(_) => {
                self.flush_line();
                self.in_code_block = true;
                Container::CodeBlock
            }
            Tag::List(start) => {
                self.flush_line();
                self.lists.push(start);
                Container::List
            }
            Tag::Item => {
                self.flush_line();
                let indent = "  ".repeat(self.lists.len().saturating_sub(1));
                let marker = match self.lists.last_mut() {
                    Some(Some(next)) => {
                        let marker = format!("{}{}. ", indent, next);
                        *next += 1;
                        marker
                    }
                    _ => format!("{}• ", indent),
                };
                self.push_span(Span::styled(marker, Style::default().fg(Color::DarkGray)));
                Container::Item
            }
            Tag::FootnoteDefinition(label) => {
                self.flush_line();
                self.push_span(Span::styled(
                    format!("[{}]: ", label),
                    Style::default().fg(Color::Cyan),
                ));
                Container::FootnoteDefinition
            }
            Tag::Table(_) => {
                self.flush_line();
                self.table = Some(TableBuffer::default());
                Container::Table
            }
            Tag::TableHead => Container::TableHead,
            Tag::TableRow => Container::TableRow,
            Tag::TableCell => Container::TableCell,
            Tag::Emphasis => {
                self.styles
                    .push(Style::default().add_modifier(Modifier::ITALIC));
                Container::Styled
            }
            Tag::Strong => {
                self.styles.push(Style::default().add_modifier(Modifier::BOLD));
                Container::Styled
            }
            Tag::Strikethrough => {
                self.styles
                    .push(Style::default().add_modifier(Modifier::CROSSED_OUT));
                Container::Styled
            }
            Tag::Link { .. } | Tag::Image { .. } => {
                self.styles.push(link_style());
                self.link_depth += 1;
                Container::Link
            }
            _ => Container::Other,
        };
        self.open.push(container);
    }

    fn end(&mut self) {
        let Some(container) = self.open.pop() else {
            return;
        };
        match container {
            Container::Paragraph => {
                self.flush_line();
                if !self.open.contains(&Container::Item) {
                    self.blank_line();
                }
            }
            Container::Heading => {
                self.styles.pop();
                self.flush_line();
                self.blank_line();
            }
            Container::BlockQuote => {
                self.flush_line();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank_line();
            }
            Container::CodeBlock => {
                self.flush_line();
                self.in_code_block = false;
                self.blank_line();
            }
            Container::List => {
                self.flush_line();
                self.lists.pop();
                if self.lists.is_empty() {
                    self.blank_line();
                }
            }
            Container::Item | Container::FootnoteDefinition => self.flush_line(),
            Container::Table => {
                if let Some(table) = self.table.take() {
                    self.lines.extend(table_lines(table));
                }
                self.blank_line();
            }
            Container::TableHead => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                    table.header_rows = table.rows.len();
                }
            }
            Container::TableRow => {
                if let Some(table) = self.table.as_mut() {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            Container::TableCell => {
                if let Some(table) = self.table.as_mut() {
                    let cell = std::mem::take(&mut table.cell);
                    table.row.push(cell);
                }
            }
            Container::Styled => {
                self.styles.pop();
            }
            Container::Link => {
                self.styles.pop();
                self.link_depth = self.link_depth.saturating_sub(1);
            }
            Container::Other => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_code_block {
            let style = Style::default().fg(Color::Yellow);
            for line in text.lines() {
                self.push_span(Span::styled(format!("  {}", line), style));
                self.flush_line();
            }
            return;
        }
        let style = self.style();
        if self.link_depth > 0 {
            self.push_span(Span::styled(text.to_string(), style));
            return;
        }
        for (segment, is_link) in autolink_segments(text) {
            let segment_style = if is_link {
                style.patch(link_style())
            } else {
                style
            };
            self.push_span(Span::styled(segment.to_string(), segment_style));
        }
    }

    fn style(&self) -> Style {
        self.styles
            .iter()
            .fold(Style::default(), |acc, style| acc.patch(*style))
    }

    fn push_span(&mut self, span: Span<'static>) {
        match self.table.as_mut() {
            Some(table) => table.cell.push(span),
            None => self.spans.push(span),
        }
    }

    fn flush_line(&mut self) {
        if self.spans.is_empty() {
            return;
        }
        let mut spans = Vec::with_capacity(self.spans.len() + 1);
        if self.quote_depth > 0 {
            spans.push(Span::styled(
                "│ ".repeat(self.quote_depth),
                Style::default().fg(Color::DarkGray),
            ));
        }
        spans.append(&mut self.spans);
        self.lines.push(Line::from(spans));
    }

    fn blank_line(&mut self) {
        let last_blank = self
            .lines
            .last()
            .map(|line| line.spans.is_empty())
            .unwrap_or(true);
        if !last_blank {
            self.lines.push(Line::default());
        }
    }

    fn finish(mut self) -> Text<'static> {
        self.flush_line();
        while self
            .lines
            .last()
            .map(|line| line.spans.is_empty())
            .unwrap_or(false)
        {
            self.lines.pop();
        }
        Text::from(self.lines)
    }
}

fn heading_style(level: HeadingLevel) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match level {
        HeadingLevel::H1 => base.fg(Color::Magenta).add_modifier(Modifier::UNDERLINED),
        HeadingLevel::H2 => base.fg(Color::Cyan),
        _ => base,
    }
}

fn link_style() -> Style {
    Style::default()
        .fg(Color::Blue)
        .add_modifier(Modifier::UNDERLINED)
}

fn table_lines(table: TableBuffer) -> Vec<Line<'static>> {
    let columns = table.rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut widths = vec![0usize; columns];
    for row in &table.rows {
        for (idx, cell) in row.iter().enumerate() {
            widths[idx] = widths[idx].max(cell_width(cell));
        }
    }

    let separator = Style::default().fg(Color::DarkGray);
    let mut lines = Vec::with_capacity(table.rows.len() + 1);
    for (row_idx, row) in table.rows.into_iter().enumerate() {
        let header = row_idx < table.header_rows;
        let mut spans = Vec::new();
        let mut cells = row.into_iter();
        for (col, width) in widths.iter().enumerate() {
            if col > 0 {
                spans.push(Span::styled(" │ ", separator));
            }
            let cell = cells.next().unwrap_or_default();
            let pad = width - cell_width(&cell);
            for span in cell {
                if header {
                    let style = span.style.add_modifier(Modifier::BOLD);
                    spans.push(span.style(style));
                } else {
                    spans.push(span);
                }
            }
            if pad > 0 && col + 1 < columns {
                spans.push(Span::raw(" ".repeat(pad)));
            }
        }
        lines.push(Line::from(spans));

        if header && row_idx + 1 == table.header_rows {
            let rule = widths
                .iter()
                .map(|w| "─".repeat(*w))
                .collect::<Vec<_>>()
                .join("─┼─");
            lines.push(Line::from(Span::styled(rule, separator)));
        }
    }
    lines
}

fn cell_width(cell: &[Span<'_>]) -> usize {
    cell.iter().map(Span::width).sum()
}

/// Split plain text into `(segment, is_link)` runs, linking bare
/// `http(s)://` URLs, `www.` hosts and email addresses.
fn autolink_segments(text: &str) -> Vec<(&str, bool)> {
    let mut finder = LinkFinder::new();
    finder
        .url_must_have_scheme(false)
        .kinds(&[LinkKind::Url, LinkKind::Email]);
    finder
        .spans(text)
        .map(|span| (span.as_str(), span.kind().is_some()))
        .collect()
}
