//! Split Markdown editor: raw text on the left, rendered preview on the right.

use ratatui::Frame;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Clear, Padding, Paragraph, Wrap};

use crate::markdown;
use crate::tui::input::{Direction, KeyAction};
use crate::tui::render::centered_rect;

/// The raw-text pane. Seeded once from the session content and owned locally
/// afterwards; every mutation hands back the full new text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorView {
    buffer: String,
    /// Cursor as a char index into `buffer`.
    cursor: usize,
}

impl EditorView {
    pub fn new(content: &str) -> Self {
        Self {
            buffer: content.to_string(),
            cursor: content.chars().count(),
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Apply a text-mode action. Returns the whole buffer after any edit;
    /// cursor motion returns `None`.
    pub fn handle(&mut self, action: &KeyAction) -> Option<String> {
        match action {
            KeyAction::InputChar(c) => {
                self.insert(*c);
                Some(self.buffer.clone())
            }
            KeyAction::Newline => {
                self.insert('\n');
                Some(self.buffer.clone())
            }
            KeyAction::Backspace => {
                if self.cursor == 0 {
                    return None;
                }
                self.cursor -= 1;
                self.remove_at_cursor();
                Some(self.buffer.clone())
            }
            KeyAction::DeleteChar => {
                if self.cursor >= self.char_len() {
                    return None;
                }
                self.remove_at_cursor();
                Some(self.buffer.clone())
            }
            KeyAction::Move(direction) => {
                self.move_cursor(*direction);
                None
            }
            KeyAction::LineStart => {
                let (line, _) = self.line_col();
                self.cursor = self.line_start(line);
                None
            }
            KeyAction::LineEnd => {
                let (line, _) = self.line_col();
                self.cursor = self.line_start(line) + self.line_len(line);
                None
            }
            _ => None,
        }
    }

    fn char_len(&self) -> usize {
        self.buffer.chars().count()
    }

    fn insert(&mut self, c: char) {
        let at = byte_index_for_cursor(&self.buffer, self.cursor);
        self.buffer.insert(at, c);
        self.cursor += 1;
    }

    fn remove_at_cursor(&mut self) {
        let at = byte_index_for_cursor(&self.buffer, self.cursor);
        self.buffer.remove(at);
    }

    /// Zero-based (line, column) of the cursor, in chars.
    fn line_col(&self) -> (usize, usize) {
        let mut line = 0;
        let mut col = 0;
        for c in self.buffer.chars().take(self.cursor) {
            if c == '\n' {
                line += 1;
                col = 0;
            } else {
                col += 1;
            }
        }
        (line, col)
    }

    fn line_count(&self) -> usize {
        self.buffer.split('\n').count()
    }

    fn line_start(&self, line: usize) -> usize {
        self.buffer
            .split('\n')
            .take(line)
            .map(|l| l.chars().count() + 1)
            .sum()
    }

    fn line_len(&self, line: usize) -> usize {
        self.buffer
            .split('\n')
            .nth(line)
            .map(|l| l.chars().count())
            .unwrap_or(0)
    }

    fn move_cursor(&mut self, direction: Direction) {
        match direction {
            Direction::Left => self.cursor = self.cursor.saturating_sub(1),
            Direction::Right => self.cursor = (self.cursor + 1).min(self.char_len()),
            Direction::Up | Direction::Down => {
                let (line, col) = self.line_col();
                let target = match direction {
                    Direction::Up if line == 0 => return,
                    Direction::Up => line - 1,
                    _ if line + 1 >= self.line_count() => return,
                    _ => line + 1,
                };
                self.cursor = self.line_start(target) + col.min(self.line_len(target));
            }
        }
    }
}

pub fn draw(frame: &mut Frame, view: &EditorView, title: &str, preview_source: &str) {
    let area = centered_rect(frame.area(), 86, 80);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .title(Line::from(vec![
            Span::styled(
                format!(" {} ", title),
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled("[Esc] close ", Style::default().fg(Color::DarkGray)),
        ]))
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(Color::Cyan));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let [raw_area, preview_area] =
        Layout::horizontal([Constraint::Percentage(50), Constraint::Percentage(50)]).areas(inner);
    draw_raw_pane(frame, view, raw_area);
    draw_preview_pane(frame, preview_source, preview_area);
}

fn draw_raw_pane(frame: &mut Frame, view: &EditorView, area: Rect) {
    let lines = lines_with_cursor(
        view.text(),
        view.cursor(),
        Style::default().fg(Color::White),
        Style::default()
            .fg(Color::Yellow)
            .add_modifier(Modifier::BOLD | Modifier::SLOW_BLINK),
    );
    let (cursor_line, _) = view.line_col();
    let visible = area.height.saturating_sub(2) as usize;
    let scroll = cursor_line.saturating_sub(visible.saturating_sub(1));

    let paragraph = Paragraph::new(lines)
        .scroll((scroll as u16, 0))
        .block(
            Block::default()
                .title(" markdown ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(paragraph, area);
}

fn draw_preview_pane(frame: &mut Frame, source: &str, area: Rect) {
    let paragraph = Paragraph::new(markdown::render(source))
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title(" preview ")
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(Color::DarkGray))
                .padding(Padding::horizontal(1)),
        );
    frame.render_widget(paragraph, area);
}

fn lines_with_cursor(
    text: &str,
    cursor: usize,
    text_style: Style,
    caret_style: Style,
) -> Vec<Line<'static>> {
    let mut remaining = cursor;
    let mut lines = Vec::new();
    let mut caret_placed = false;
    for raw in text.split('\n') {
        let len = raw.chars().count();
        if !caret_placed && remaining <= len {
            let split = byte_index_for_cursor(raw, remaining);
            let (left, right) = raw.split_at(split);
            let mut spans = Vec::new();
            if !left.is_empty() {
                spans.push(Span::styled(left.to_string(), text_style));
            }
            spans.push(Span::styled("▌", caret_style));
            if !right.is_empty() {
                spans.push(Span::styled(right.to_string(), text_style));
            }
            lines.push(Line::from(spans));
            caret_placed = true;
        } else {
            if !caret_placed {
                remaining -= len + 1;
            }
            lines.push(Line::from(Span::styled(raw.to_string(), text_style)));
        }
    }
    lines
}

fn byte_index_for_cursor(text: &str, cursor: usize) -> usize {
    text.char_indices()
        .nth(cursor)
        .map(|(idx, _)| idx)
        .unwrap_or(text.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn type_text(view: &mut EditorView, text: &str) -> Vec<String> {
        text.chars()
            .filter_map(|c| view.handle(&KeyAction::InputChar(c)))
            .collect()
    }

    #[test]
    fn every_keystroke_reports_the_full_text() {
        let mut view = EditorView::new("ab");
        let reported = type_text(&mut view, "cd");
        assert_eq!(reported, vec!["abc", "abcd"]);
    }

    #[test]
    fn cursor_motion_reports_nothing() {
        let mut view = EditorView::new("ab");
        assert_eq!(view.handle(&KeyAction::Move(Direction::Left)), None);
        assert_eq!(view.handle(&KeyAction::InputChar('x')), Some("axb".to_string()));
    }

    #[test]
    fn backspace_and_delete_respect_bounds() {
        let mut view = EditorView::new("");
        assert_eq!(view.handle(&KeyAction::Backspace), None);
        assert_eq!(view.handle(&KeyAction::DeleteChar), None);

        let mut view = EditorView::new("héllo");
        view.handle(&KeyAction::LineStart);
        view.handle(&KeyAction::Move(Direction::Right));
        assert_eq!(view.handle(&KeyAction::DeleteChar), Some("hllo".to_string()));
        assert_eq!(view.handle(&KeyAction::Backspace), Some("llo".to_string()));
    }

    #[test]
    fn vertical_motion_clamps_to_line_length() {
        let mut view = EditorView::new("long line\nab\nlonger line");
        view.handle(&KeyAction::Move(Direction::Up));
        assert_eq!(view.line_col(), (1, 2));
        view.handle(&KeyAction::Move(Direction::Up));
        assert_eq!(view.line_col(), (0, 2));
        view.handle(&KeyAction::Move(Direction::Up));
        assert_eq!(view.line_col(), (0, 2));
        view.handle(&KeyAction::LineEnd);
        view.handle(&KeyAction::Move(Direction::Down));
        assert_eq!(view.line_col(), (1, 2));
    }

    #[test]
    fn newline_splits_lines() {
        let mut view = EditorView::new("ab");
        view.handle(&KeyAction::Move(Direction::Left));
        assert_eq!(view.handle(&KeyAction::Newline), Some("a\nb".to_string()));
        assert_eq!(view.line_col(), (1, 0));
    }

    #[test]
    fn caret_lands_on_the_cursor_line() {
        let lines = lines_with_cursor("ab\ncd", 4, Style::default(), Style::default());
        assert_eq!(lines.len(), 2);
        let second: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(second, "c▌d");
    }
}
